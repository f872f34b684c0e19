// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use crate::{Error, Result};

/// Per-output table of carrier frequencies, stepped by frequency advances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyLut {
    pub output_port: u16,
    pub group: u8,
    pub frequencies: Vec<f64>,
    pub phases: Vec<f64>,
    pub phases_q: Vec<f64>,
}

impl FrequencyLut {
    /// Table placing every frequency in the upper sideband: the Q channel
    /// lags the I channel by a quarter period.
    pub fn upper_sideband(output_port: u16, group: u8, frequencies: &[f64]) -> Self {
        FrequencyLut {
            output_port,
            group,
            frequencies: frequencies.to_vec(),
            phases: vec![0.0; frequencies.len()],
            phases_q: vec![-FRAC_PI_2; frequencies.len()],
        }
    }

    /// Single-entry table with zero phases, as used for a tone generated
    /// entirely by the mixer NCO.
    pub fn single(output_port: u16, group: u8, frequency: f64) -> Self {
        FrequencyLut {
            output_port,
            group,
            frequencies: vec![frequency],
            phases: vec![0.0],
            phases_q: vec![0.0],
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::configuration(format!(
                "Frequency table for output {} is empty.",
                self.output_port
            )));
        }
        if self.phases.len() != self.len() || self.phases_q.len() != self.len() {
            return Err(Error::configuration(format!(
                "Frequency table for output {} has {} frequencies but {} I and {} Q phases.",
                self.output_port,
                self.len(),
                self.phases.len(),
                self.phases_q.len()
            )));
        }
        Ok(())
    }
}

/// Per-output table of amplitude scales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleLut {
    pub output_port: u16,
    pub group: u8,
    pub scales: Vec<f64>,
}

impl ScaleLut {
    pub fn single(output_port: u16, group: u8, scale: f64) -> Self {
        ScaleLut {
            output_port,
            group,
            scales: vec![scale],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupTables {
    frequency: Vec<FrequencyLut>,
    scale: Vec<ScaleLut>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frequency table. One table per output and group.
    pub fn add_frequency(&mut self, lut: FrequencyLut) -> Result<&mut Self> {
        lut.validate()?;
        if self.frequency_for(lut.output_port, lut.group).is_some() {
            return Err(Error::configuration(format!(
                "Frequency table for output {} group {} defined twice.",
                lut.output_port, lut.group
            )));
        }
        self.frequency.push(lut);
        Ok(self)
    }

    /// Add a scale table. One table per output and group.
    pub fn add_scale(&mut self, lut: ScaleLut) -> Result<&mut Self> {
        if lut.scales.is_empty() {
            return Err(Error::configuration(format!(
                "Scale table for output {} is empty.",
                lut.output_port
            )));
        }
        if let Some(bad) = lut.scales.iter().find(|s| !(-1.0..=1.0).contains(*s)) {
            return Err(Error::configuration(format!(
                "Scale {bad} for output {} is outside the full-scale range [-1, 1].",
                lut.output_port
            )));
        }
        if self.scale_for(lut.output_port, lut.group).is_some() {
            return Err(Error::configuration(format!(
                "Scale table for output {} group {} defined twice.",
                lut.output_port, lut.group
            )));
        }
        self.scale.push(lut);
        Ok(self)
    }

    pub fn frequency_for(&self, output_port: u16, group: u8) -> Option<&FrequencyLut> {
        self.frequency
            .iter()
            .find(|l| l.output_port == output_port && l.group == group)
    }

    pub fn scale_for(&self, output_port: u16, group: u8) -> Option<&ScaleLut> {
        self.scale
            .iter()
            .find(|l| l.output_port == output_port && l.group == group)
    }

    pub fn has_frequency_table(&self, output_port: u16) -> bool {
        self.frequency.iter().any(|l| l.output_port == output_port)
    }

    pub fn frequency_tables(&self) -> &[FrequencyLut] {
        &self.frequency
    }

    pub fn scale_tables(&self) -> &[ScaleLut] {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_sideband_phases() {
        let lut = FrequencyLut::upper_sideband(1, 0, &[0.9e9, 1.0e9, 1.1e9]);
        assert_eq!(lut.len(), 3);
        assert_eq!(lut.phases, vec![0.0; 3]);
        assert_eq!(lut.phases_q, vec![-FRAC_PI_2; 3]);
    }

    #[test]
    fn test_duplicate_tables() {
        let mut tables = LookupTables::new();
        tables
            .add_frequency(FrequencyLut::single(1, 0, 0.0))
            .unwrap();
        assert!(tables.add_frequency(FrequencyLut::single(1, 0, 0.0)).is_err());
        tables
            .add_frequency(FrequencyLut::single(1, 1, 0.0))
            .unwrap();
        assert_eq!(tables.frequency_tables().len(), 2);
    }

    #[test]
    fn test_invalid_tables() {
        let mut tables = LookupTables::new();
        assert!(tables.add_frequency(FrequencyLut::upper_sideband(1, 0, &[])).is_err());
        let mut lut = FrequencyLut::single(1, 0, 0.0);
        lut.phases_q.push(0.0);
        assert!(tables.add_frequency(lut).is_err());
        assert!(tables.add_scale(ScaleLut::single(1, 0, 1.5)).is_err());
        assert!(tables.add_scale(ScaleLut::single(1, 0, 0.5)).is_ok());
        assert_eq!(tables.scale_for(1, 0).unwrap().scales, vec![0.5]);
    }
}
