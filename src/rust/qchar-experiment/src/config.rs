// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Experiment configuration files and instrument settings.
//!
//! A configuration file is a JSON object naming the experiment in its
//! `experiment` field next to the experiment parameters. Optional `hardware`,
//! `analysis` and `device` sections override the defaults.

use std::ops::RangeInclusive;
use std::path::Path;

use qchar_analysis::{AnalysisSettings, SanitizationChange};
use serde::{Deserialize, Serialize};

use crate::excited_sweep::ExcitedSweepParams;
use crate::resonator_sweep::ResonatorSweepParams;
use crate::simulator::DeviceModel;
use crate::two_tone_pulsed::TwoTonePulsedParams;
use crate::{Error, Result};

/// Full-scale DAC current used for every output, in µA.
pub const DAC_CURRENT: u32 = 32_000;
/// Range the DAC full-scale current can be set in, in µA.
pub const DAC_CURRENT_RANGE: RangeInclusive<u32> = 2_250..=40_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcMode {
    Direct,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcFSample {
    G2,
    G3,
    G4,
}

impl AdcFSample {
    pub fn hz(self) -> f64 {
        match self {
            AdcFSample::G2 => 2e9,
            AdcFSample::G3 => 3e9,
            AdcFSample::G4 => 4e9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DacMode {
    Direct,
    Mixed02,
    Mixed04,
    Mixed42,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DacFSample {
    G2,
    G3,
    G4,
    G6,
    G8,
    G10,
}

impl DacFSample {
    pub fn hz(self) -> f64 {
        match self {
            DacFSample::G2 => 2e9,
            DacFSample::G3 => 3e9,
            DacFSample::G4 => 4e9,
            DacFSample::G6 => 6e9,
            DacFSample::G8 => 8e9,
            DacFSample::G10 => 10e9,
        }
    }
}

/// Converter modes and rates. DAC settings are listed per output port,
/// starting at port 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub adc_mode: AdcMode,
    pub adc_fsample: AdcFSample,
    pub dac_mode: Vec<DacMode>,
    pub dac_fsample: Vec<DacFSample>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            adc_mode: AdcMode::Mixed,
            adc_fsample: AdcFSample::G4,
            dac_mode: vec![
                DacMode::Mixed42,
                DacMode::Mixed02,
                DacMode::Mixed02,
                DacMode::Mixed02,
            ],
            dac_fsample: vec![
                DacFSample::G10,
                DacFSample::G6,
                DacFSample::G6,
                DacFSample::G6,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub dac_current: u32,
    pub converter: ConverterConfig,
    /// Sequencer clock, in Hz.
    pub clock_rate: f64,
    /// Sample rate of stored traces after decimation, in Hz.
    pub store_rate: f64,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        HardwareSettings {
            dac_current: DAC_CURRENT,
            converter: ConverterConfig::default(),
            clock_rate: 500e6,
            store_rate: 1e9,
        }
    }
}

impl HardwareSettings {
    pub fn dac_sample_rate(&self, port: u16) -> Result<f64> {
        usize::from(port)
            .checked_sub(1)
            .and_then(|index| self.converter.dac_fsample.get(index))
            .map(|fs| fs.hz())
            .ok_or_else(|| {
                Error::Hardware(format!(
                    "No DAC configured for output port {port}; ports 1 to {} are available.",
                    self.converter.dac_fsample.len()
                ))
            })
    }

    pub fn adc_sample_rate(&self) -> f64 {
        self.converter.adc_fsample.hz()
    }

    /// Clamp settings into the supported range, failing on settings that
    /// cannot be repaired.
    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        let mut changes = vec![];
        if self.converter.dac_fsample.is_empty()
            || self.converter.dac_mode.len() != self.converter.dac_fsample.len()
        {
            return Err(Error::Hardware(format!(
                "{} DAC modes and {} DAC sample rates given; need one of each per output port.",
                self.converter.dac_mode.len(),
                self.converter.dac_fsample.len()
            )));
        }
        for (name, rate) in [("clock_rate", self.clock_rate), ("store_rate", self.store_rate)] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::Hardware(format!("{name} must be positive, got {rate}.")));
            }
        }
        let clamped = self
            .dac_current
            .clamp(*DAC_CURRENT_RANGE.start(), *DAC_CURRENT_RANGE.end());
        if clamped != self.dac_current {
            changes.push(SanitizationChange {
                field: "dac_current",
                original: self.dac_current.to_string(),
                sanitized: clamped.to_string(),
                reason: format!(
                    "Outside the supported range {}..={} µA.",
                    DAC_CURRENT_RANGE.start(),
                    DAC_CURRENT_RANGE.end()
                ),
            });
            self.dac_current = clamped;
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "experiment", rename_all = "snake_case")]
pub enum ExperimentConfig {
    ExcitedSweep(ExcitedSweepParams),
    TwoTonePulsed(TwoTonePulsedParams),
    ResonatorSweep(ResonatorSweepParams),
}

impl ExperimentConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ExperimentConfig::ExcitedSweep(_) => crate::excited_sweep::KIND,
            ExperimentConfig::TwoTonePulsed(_) => crate::two_tone_pulsed::KIND,
            ExperimentConfig::ResonatorSweep(_) => crate::resonator_sweep::KIND,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub hardware: HardwareSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// Device seen by the simulated instrument.
    #[serde(default)]
    pub device: DeviceModel,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::new(format!("Invalid configuration: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(format!("Cannot read configuration {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Sanitize every section, collecting the changes made.
    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        let mut changes = self.hardware.sanitize()?;
        changes.extend(self.analysis.sanitize()?);
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dac_sample_rate_per_port() {
        let settings = HardwareSettings::default();
        assert_eq!(settings.dac_sample_rate(1).unwrap(), 10e9);
        assert_eq!(settings.dac_sample_rate(2).unwrap(), 6e9);
        assert!(settings.dac_sample_rate(0).is_err());
        assert!(settings.dac_sample_rate(5).is_err());
        assert_eq!(settings.adc_sample_rate(), 4e9);
    }

    #[test]
    fn test_sanitize_dac_current() {
        let mut settings = HardwareSettings {
            dac_current: 50_000,
            ..Default::default()
        };
        let changes = settings.sanitize().unwrap();
        assert_eq!(settings.dac_current, 40_500);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "dac_current");
        assert_eq!(changes[0].original, "50000");
        assert!(HardwareSettings::default().sanitize().unwrap().is_empty());
    }

    #[test]
    fn test_sanitize_rejects_broken_converter() {
        let mut settings = HardwareSettings::default();
        settings.converter.dac_mode.pop();
        assert!(matches!(settings.sanitize(), Err(Error::Hardware(_))));
        let mut settings = HardwareSettings {
            clock_rate: 0.0,
            ..Default::default()
        };
        assert!(settings.sanitize().is_err());
    }

    #[test]
    fn test_parse_config() {
        let text = r#"{
            "experiment": "resonator_sweep",
            "freq_center": 6.0e9,
            "freq_span": 10e6,
            "df": 100e3,
            "num_averages": 100,
            "amp": 0.1,
            "output_port": 1,
            "input_port": 1,
            "hardware": { "dac_current": 20000 },
            "analysis": { "idx_low": 100 }
        }"#;
        let config = Config::from_json(text).unwrap();
        assert_eq!(config.experiment.kind(), "resonator_sweep");
        assert_eq!(config.hardware.dac_current, 20_000);
        assert_eq!(config.hardware.clock_rate, 500e6);
        assert_eq!(config.analysis, AnalysisSettings::new(100, 2000));
        let ExperimentConfig::ResonatorSweep(params) = &config.experiment else {
            panic!("wrong experiment");
        };
        assert!(params.dither);
        assert_eq!(params.num_skip, 0);
    }

    #[test]
    fn test_unknown_experiment() {
        assert!(Config::from_json(r#"{ "experiment": "rabi" }"#).is_err());
    }
}
