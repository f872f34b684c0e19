// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use qchar_experiment::resonator_sweep::frequency_grid;
use qchar_experiment::{Config, ExcitedSweep, ExperimentConfig, TwoTonePulsed};
use qchar_sequencer::{EventKind, SequenceProgram};

use super::load_config;

pub fn execute(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let Some(program) = build(&config)? else {
        return Ok(());
    };
    print_summary(&program);
    if let Some(output) = output {
        let file = File::create(output)
            .with_context(|| format!("Cannot create {}", output.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &program)
            .with_context(|| format!("Cannot write the program to {}", output.display()))?;
        println!("Program written to {}", output.display());
    }
    Ok(())
}

/// Build the program of a pulsed experiment; lock-in sweeps have none and
/// only print their frequency grid.
fn build(config: &Config) -> Result<Option<SequenceProgram>> {
    let hardware = &config.hardware;
    match &config.experiment {
        ExperimentConfig::ExcitedSweep(params) => {
            params.validate()?;
            let sweep = ExcitedSweep::new(params.clone());
            let plan = sweep.plan(hardware.dac_sample_rate(params.readout_port)?)?;
            let program =
                sweep.build_program(&plan, hardware.dac_sample_rate(params.control_port)?)?;
            println!(
                "Readout NCO {} Hz, IF {} .. {} Hz",
                plan.lo_offset(),
                plan.if_array().first().copied().unwrap_or_default(),
                plan.if_array().last().copied().unwrap_or_default()
            );
            Ok(Some(program))
        }
        ExperimentConfig::TwoTonePulsed(params) => {
            params.validate()?;
            let sweep = TwoTonePulsed::new(params.clone());
            let control_rate = hardware.dac_sample_rate(params.control_port)?;
            let plan = sweep.plan(control_rate)?;
            let (program, correction) =
                sweep.build_program(&plan, control_rate, hardware.clock_rate)?;
            println!("Control NCO {} Hz", plan.lo_offset());
            if let Some(correction) = correction {
                println!(
                    "Idler at {}: period moved from {} to {} clock cycles",
                    correction.idler_if,
                    correction.original.value(),
                    correction.corrected.value()
                );
            }
            Ok(Some(program))
        }
        ExperimentConfig::ResonatorSweep(params) => {
            params.validate()?;
            let grid = frequency_grid(params.freq_center, params.freq_span, params.df);
            println!(
                "Lock-in sweep, no pulse sequence: {} pixels from {} Hz to {} Hz before tuning df",
                grid.len(),
                grid.first().copied().unwrap_or_default(),
                grid.last().copied().unwrap_or_default()
            );
            Ok(None)
        }
    }
}

fn print_summary(program: &SequenceProgram) {
    println!(
        "Period {}, {} repetitions, {} averages, {} in total",
        program.period(),
        program.repeat_count(),
        program.num_averages(),
        program.total_duration()
    );
    println!("{:>14}  {:<18}  event", "time [ns]", "port");
    for event in program.timeline().events() {
        let kind = match event.kind {
            EventKind::PhaseReset => "phase reset".to_string(),
            EventKind::PulseOutput(pulse) => format!("pulse #{}", pulse.index()),
            EventKind::StoreWindow => "store".to_string(),
            EventKind::FrequencyAdvance => "next frequency".to_string(),
        };
        println!(
            "{:>14.3}  {:<18}  {}",
            event.time * 1e9,
            event.port.to_string(),
            kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_excited_sweep_program_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "sweep.json", EXCITED_SWEEP);
        let output = dir.path().join("program.json");
        execute(&config, Some(&output)).unwrap();
        let value: serde_json::Value =
            serde_json::from_reader(File::open(&output).unwrap()).unwrap();
        assert_eq!(value["repeat_count"], 21);
        assert_eq!(value["timeline"]["events"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_lockin_has_no_program() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "sweep.json", RESONATOR_SWEEP);
        let config = load_config(&config).unwrap();
        assert!(build(&config).unwrap().is_none());
    }
}
