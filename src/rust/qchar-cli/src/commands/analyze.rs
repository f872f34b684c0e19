// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result, bail};
use qchar_analysis::{AnalysisSettings, SiScale};
use qchar_experiment::{
    ExcitedSweep, ResonatorSweep, TwoTonePulsed, excited_sweep, resonator_sweep, two_tone_pulsed,
};
use qchar_log::warn;
use qchar_store::{Persist, load_record};
use serde_json::{Value, json};

pub fn execute(
    file: &Path,
    idx_low: Option<usize>,
    idx_high: Option<usize>,
    as_json: bool,
) -> Result<()> {
    let defaults = AnalysisSettings::default();
    let mut settings = AnalysisSettings::new(
        idx_low.unwrap_or(defaults.idx_low),
        idx_high.unwrap_or(defaults.idx_high),
    );
    for change in settings.sanitize()? {
        warn!(
            "{}: {} -> {} ({})",
            change.field,
            change.original,
            change.sanitized,
            change.reason
        );
    }
    let summary = summarize(file, &settings)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_text(&summary);
    }
    Ok(())
}

/// Analyze a result file of any experiment kind.
///
/// No curve fitter is available here, so reported centers come from the
/// initial guesses.
pub fn summarize(file: &Path, settings: &AnalysisSettings) -> Result<Value> {
    let record =
        load_record(file).with_context(|| format!("Cannot load {}", file.display()))?;
    let summary = match record.kind() {
        excited_sweep::KIND => {
            let sweep = ExcitedSweep::from_record(&record)?;
            let analysis = sweep.analyze(settings, None)?;
            let scale = SiScale::for_data(analysis.separation.iter());
            let peak = analysis.separation.iter().copied().fold(0.0, f64::max);
            json!({
                "experiment": excited_sweep::KIND,
                "optimal_readout_frequency": analysis.optimal_frequency(),
                "max_separation": peak,
                "max_separation_scaled": format!("{:.3} {}FS", scale.apply(peak), scale.prefix),
                "phase_background_slope": analysis.phase.fit.slope,
            })
        }
        two_tone_pulsed::KIND => {
            let sweep = TwoTonePulsed::from_record(&record)?;
            let analysis = sweep.analyze(settings, None)?;
            let reference = analysis.rotated.first().copied().unwrap_or_default();
            let (index, _) = analysis.rotated.iter().enumerate().fold(
                (0, 0.0),
                |(bi, bv), (i, z)| {
                    let d = (z.re - reference.re).abs();
                    if d > bv { (i, d) } else { (bi, bv) }
                },
            );
            json!({
                "experiment": two_tone_pulsed::KIND,
                "qubit_frequency": analysis.control_freq_arr.get(index),
                "initial_guess": analysis.initial_guess,
                "rotation": analysis.rotation,
            })
        }
        resonator_sweep::KIND => {
            let sweep = ResonatorSweep::from_record(&record)?;
            let summary = sweep.analyze()?;
            json!({
                "experiment": resonator_sweep::KIND,
                "f_min": summary.f_min,
                "min_amplitude_db": summary
                    .amplitude_db
                    .iter()
                    .copied()
                    .fold(f64::INFINITY, f64::min),
            })
        }
        other => bail!("{} holds an unknown experiment kind '{other}'", file.display()),
    };
    Ok(summary)
}

fn print_text(summary: &Value) {
    if let Value::Object(fields) = summary {
        for (name, value) in fields {
            println!("{name}: {value}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{load_config, simulate};
    use super::*;

    #[test]
    fn test_summarize_simulated_excited_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "sweep.json", EXCITED_SWEEP);
        let config = load_config(&config).unwrap();
        let path = simulate::run(&config, dir.path(), None).unwrap();
        let summary = summarize(&path, &AnalysisSettings::default()).unwrap();
        assert_eq!(summary["experiment"], "excited_sweep");
        let optimal = summary["optimal_readout_frequency"].as_f64().unwrap();
        assert!((optimal - 5.9995e9).abs() < 600e3);
    }

    #[test]
    fn test_summarize_lockin() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_config(dir.path(), "sweep.json", RESONATOR_SWEEP);
        let config = load_config(&config).unwrap();
        let path = simulate::run(&config, dir.path(), None).unwrap();
        let summary = summarize(&path, &AnalysisSettings::default()).unwrap();
        assert_eq!(summary["f_min"], 6.0e9);
    }

    #[test]
    fn test_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        qchar_store::save_record(&qchar_store::Record::new("rabi"), &path).unwrap();
        let err = summarize(&path, &AnalysisSettings::default()).unwrap_err();
        assert!(err.to_string().contains("rabi"));
    }
}
