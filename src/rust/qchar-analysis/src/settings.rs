// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Settings controlling how captured traces are reduced.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// First sample of the steady-state part of a readout capture.
pub const DEFAULT_IDX_LOW: usize = 1_500;
/// One past the last sample of the steady-state part of a readout capture.
pub const DEFAULT_IDX_HIGH: usize = 2_000;

#[derive(Debug, Clone)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

/// Sample range `[low, high)` of each capture that enters the reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub low: usize,
    pub high: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.high - self.low
    }

    pub fn is_empty(&self) -> bool {
        self.high == self.low
    }

    pub fn range(&self) -> Range<usize> {
        self.low..self.high
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub idx_low: usize,
    pub idx_high: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            idx_low: DEFAULT_IDX_LOW,
            idx_high: DEFAULT_IDX_HIGH,
        }
    }
}

impl AnalysisSettings {
    pub fn new(idx_low: usize, idx_high: usize) -> Self {
        AnalysisSettings { idx_low, idx_high }
    }

    /// Repair settings that have an obvious intended meaning.
    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        let mut changes = vec![];
        if self.idx_low == self.idx_high {
            return Err(Error::Settings(format!(
                "Sample window {}..{} is empty.",
                self.idx_low, self.idx_high
            )));
        }
        if self.idx_low > self.idx_high {
            changes.push(SanitizationChange {
                field: "idx_low",
                original: self.idx_low.to_string(),
                sanitized: self.idx_high.to_string(),
                reason: "Window bounds were given in reverse order.".to_string(),
            });
            changes.push(SanitizationChange {
                field: "idx_high",
                original: self.idx_high.to_string(),
                sanitized: self.idx_low.to_string(),
                reason: "Window bounds were given in reverse order.".to_string(),
            });
            std::mem::swap(&mut self.idx_low, &mut self.idx_high);
        }
        Ok(changes)
    }

    /// Window for captures of `nr_samples` samples.
    pub fn window(&self, nr_samples: usize) -> Result<Window> {
        if self.idx_low >= self.idx_high || self.idx_high > nr_samples {
            return Err(Error::Settings(format!(
                "Sample window {}..{} does not fit in a capture of {nr_samples} samples.",
                self.idx_low, self.idx_high
            )));
        }
        Ok(Window {
            low: self.idx_low,
            high: self.idx_high,
        })
    }
}
