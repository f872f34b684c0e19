// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use qchar_experiment::{
    Config, ExcitedSweep, ExperimentConfig, ResonatorSweep, Simulator, TwoTonePulsed,
};
use qchar_log::info;
use qchar_store::Persist;

use super::load_config;

pub fn execute(config_path: &Path, output_dir: &Path, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let path = run(&config, output_dir, output)?;
    println!("Saved {}", path.display());
    Ok(())
}

fn save(experiment: &impl Persist, output_dir: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let path = match output {
        Some(path) => {
            experiment.save(path)?;
            path.to_path_buf()
        }
        None => experiment.save_in(output_dir)?,
    };
    Ok(path)
}

/// Run the configured experiment on a simulator built from the configuration
/// and save the result.
pub fn run(config: &Config, output_dir: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let mut simulator = Simulator::new(&config.hardware, config.device.clone());
    let kind = config.experiment.kind();
    info!("Simulating {}", kind);
    let path = match &config.experiment {
        ExperimentConfig::ExcitedSweep(params) => {
            let mut sweep = ExcitedSweep::new(params.clone());
            sweep
                .run(&mut simulator, &config.hardware)
                .with_context(|| format!("Simulated {kind} failed"))?;
            save(&sweep, output_dir, output)
        }
        ExperimentConfig::TwoTonePulsed(params) => {
            let mut sweep = TwoTonePulsed::new(params.clone());
            sweep
                .run(&mut simulator, &config.hardware)
                .with_context(|| format!("Simulated {kind} failed"))?;
            save(&sweep, output_dir, output)
        }
        ExperimentConfig::ResonatorSweep(params) => {
            let mut sweep = ResonatorSweep::new(params.clone());
            sweep
                .run(&mut simulator, &config.hardware)
                .with_context(|| format!("Simulated {kind} failed"))?;
            save(&sweep, output_dir, output)
        }
    };
    path.context("Cannot save the result")
}
