// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod analyze;
pub mod plan;
pub mod sequence;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use qchar_experiment::Config;
use qchar_log::warn;

/// Load and sanitize an experiment configuration, reporting every change.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load(path)?;
    let changes = config
        .sanitize()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    for change in changes {
        warn!(
            "{}: {} -> {} ({})",
            change.field,
            change.original,
            change.sanitized,
            change.reason
        );
    }
    Ok(config)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};

    /// Small two-branch sweep that the simulator runs quickly.
    pub const EXCITED_SWEEP: &str = r#"{
        "experiment": "excited_sweep",
        "readout_freq_center": 5.9995e9,
        "readout_freq_span": 10e6,
        "readout_freq_nr": 21,
        "control_freq": 4.2e9,
        "readout_amp": 0.5,
        "control_amp": 0.5,
        "readout_duration": 2e-6,
        "control_duration": 20e-9,
        "sample_duration": 2.5e-6,
        "readout_port": 1,
        "control_port": 2,
        "sample_port": 1,
        "wait_delay": 10e-6,
        "readout_sample_delay": 0.0,
        "num_averages": 1,
        "hardware": { "dac_current": 50000 }
    }"#;

    pub const RESONATOR_SWEEP: &str = r#"{
        "experiment": "resonator_sweep",
        "freq_center": 6.0e9,
        "freq_span": 4e6,
        "df": 1e6,
        "num_averages": 2,
        "amp": 0.1,
        "output_port": 1,
        "input_port": 1
    }"#;

    pub fn write_config(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }
}
