// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Placement of a frequency sweep in the upper sideband of a digital mixer.
//!
//! The numerically controlled oscillator (NCO) of the mixer is parked at a
//! fixed `lo_offset` and the sweep itself is played as intermediate
//! frequencies centered at a quarter of the DAC sample rate, the middle of
//! the upper sideband. The RF frequency of every point is `lo_offset + if`.

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyPlan {
    center: f64,
    span: f64,
    if_array: Vec<f64>,
    lo_offset: f64,
}

impl FrequencyPlan {
    /// Plan `count` points spanning `span` around `center`.
    ///
    /// The span must fit in the upper sideband (`span < sample_rate / 2`) and
    /// the lowest RF frequency must stay positive (`center > span / 2`).
    pub fn new(center: f64, span: f64, count: usize, sample_rate: f64) -> Result<Self> {
        if !(center.is_finite() && span.is_finite() && sample_rate.is_finite()) {
            return Err(Error::configuration(format!(
                "Frequency plan parameters must be finite, got center={center}, span={span}, sample rate={sample_rate}."
            )));
        }
        if sample_rate <= 0.0 {
            return Err(Error::configuration(format!(
                "Sample rate must be positive, got {sample_rate}."
            )));
        }
        if count == 0 {
            return Err(Error::configuration(
                "Frequency sweep needs at least one point.",
            ));
        }
        if span < 0.0 || (count > 1 && span == 0.0) {
            return Err(Error::configuration(format!(
                "Frequency span of {span} Hz cannot hold {count} distinct points."
            )));
        }
        if span >= sample_rate / 2.0 {
            return Err(Error::configuration(format!(
                "Frequency span of {span} Hz does not fit in the upper sideband (must be below {} Hz).",
                sample_rate / 2.0
            )));
        }
        if center <= span / 2.0 {
            return Err(Error::configuration(format!(
                "Center frequency {center} Hz must exceed half the span ({} Hz).",
                span / 2.0
            )));
        }
        let if_center = sample_rate / 4.0;
        let if_array = if count == 1 {
            vec![if_center]
        } else {
            linspace(if_center - span / 2.0, if_center + span / 2.0, count)
        };
        Ok(FrequencyPlan {
            center,
            span,
            if_array,
            lo_offset: center - if_center,
        })
    }

    /// Rebuild a plan from the two persisted quantities.
    ///
    /// The RF frequencies of the rebuilt plan are bit-identical to those of
    /// the plan the quantities were taken from.
    pub fn from_parts(if_array: Vec<f64>, lo_offset: f64) -> Result<Self> {
        if if_array.is_empty() {
            return Err(Error::configuration("Intermediate frequency array is empty."));
        }
        if if_array.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::configuration(
                "Intermediate frequencies must be strictly increasing.",
            ));
        }
        let first = if_array[0];
        let last = if_array[if_array.len() - 1];
        let if_center = (first + last) / 2.0;
        Ok(FrequencyPlan {
            center: lo_offset + if_center,
            span: last - first,
            if_array,
            lo_offset,
        })
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn count(&self) -> usize {
        self.if_array.len()
    }

    pub fn if_array(&self) -> &[f64] {
        &self.if_array
    }

    /// Frequency of the mixer NCO.
    pub fn lo_offset(&self) -> f64 {
        self.lo_offset
    }

    pub fn rf_frequencies(&self) -> Vec<f64> {
        self.if_array.iter().map(|f| self.lo_offset + f).collect()
    }
}

/// Evenly spaced samples over `[start, stop]`, both ends included.
///
/// Computed as `start + k * step` with the last sample pinned to `stop`, so
/// the values agree to the bit with NumPy's `linspace`.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            let mut out: Vec<f64> = (0..count).map(|k| k as f64 * step + start).collect();
            out[count - 1] = stop;
            out
        }
    }
}
