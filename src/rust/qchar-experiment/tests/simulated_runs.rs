// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use num_complex::Complex64;
use qchar_analysis::AnalysisSettings;
use qchar_experiment::{
    Call, DeviceModel, Error, ExcitedSweep, ExcitedSweepParams, HardwareSettings, JpaParams,
    ResonatorSweep, ResonatorSweepParams, Simulator, TwoTonePulsed, TwoTonePulsedParams,
};
use qchar_store::Persist;

fn simulator() -> Simulator {
    Simulator::new(&HardwareSettings::default(), DeviceModel::default())
}

fn excited_sweep_params() -> ExcitedSweepParams {
    ExcitedSweepParams {
        readout_freq_center: 5.9995e9,
        readout_freq_span: 10e6,
        readout_freq_nr: 51,
        control_freq: 4.2e9,
        readout_amp: 0.5,
        control_amp: 0.5,
        readout_duration: 2e-6,
        control_duration: 20e-9,
        sample_duration: 2.5e-6,
        readout_port: 1,
        control_port: 2,
        sample_port: 1,
        wait_delay: 10e-6,
        readout_sample_delay: 0.0,
        num_averages: 1,
        drag: 0.0,
    }
}

fn two_tone_params() -> TwoTonePulsedParams {
    TwoTonePulsedParams {
        readout_freq: 6.0e9,
        control_freq_center: 4.2e9,
        control_freq_span: 20e6,
        control_freq_nr: 41,
        readout_amp: 0.5,
        control_amp: 0.5,
        readout_duration: 2e-6,
        control_duration: 100e-9,
        sample_duration: 2.5e-6,
        readout_port: 1,
        control_port: 2,
        sample_port: 1,
        wait_delay: 10e-6,
        readout_sample_delay: 0.0,
        num_averages: 1,
        jpa_params: None,
        drag: 0.0,
    }
}

fn position(calls: &[Call], wanted: impl Fn(&Call) -> bool) -> usize {
    calls.iter().position(wanted).unwrap()
}

#[test]
fn excited_sweep_finds_dispersive_midpoint() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut sweep = ExcitedSweep::new(excited_sweep_params());
    sweep.run(&mut sim, &hardware).unwrap();
    assert_eq!(sim.release_count(), 1);
    assert_eq!(sim.calls().last(), Some(&Call::Release));

    let analysis = sweep.analyze(&AnalysisSettings::default(), None).unwrap();
    let device = sim.device();
    let midpoint = device.resonator_freq + device.dispersive_shift / 2.0;
    assert!((analysis.optimal_frequency() - midpoint).abs() < 300e3);
    // the ground branch dips at the bare resonator
    let (deepest, _) = analysis
        .amplitude_db
        .row(0)
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| {
            if v < bv { (i, v) } else { (bi, bv) }
        });
    assert!((analysis.readout_freq_arr[deepest] - device.resonator_freq).abs() < 300e3);
}

#[test]
fn excited_sweep_file_round_trip() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut sweep = ExcitedSweep::new(excited_sweep_params());
    sweep.run(&mut sim, &hardware).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = sweep.save_in(dir.path()).unwrap();
    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("excited_sweep_"));
    assert!(file_name.ends_with(".json"));

    let loaded = ExcitedSweep::load(&path).unwrap();
    assert_eq!(loaded, sweep);
    let data = loaded.data.as_ref().unwrap();
    for (rf, intermediate) in data.readout_freq_arr.iter().zip(&data.readout_if_arr) {
        assert_eq!(*rf, data.readout_nco + intermediate);
    }
    assert_eq!(data.store_arr.dim(), (102, 1, 2500));

    assert!(matches!(
        TwoTonePulsed::load(&path),
        Err(qchar_store::Error::KindMismatch { .. })
    ));
}

#[test]
fn failed_run_still_releases_instrument() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    sim.fail_next_execute("trigger timeout");
    let mut sweep = ExcitedSweep::new(excited_sweep_params());
    let err = sweep.run(&mut sim, &hardware).unwrap_err();
    assert!(matches!(err, Error::Anyhow(_)));
    assert!(format!("{err:#}").contains("trigger timeout"));
    assert_eq!(sim.release_count(), 1);
    assert!(sweep.data.is_none());
}

#[test]
fn invalid_parameters_never_touch_instrument() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut params = excited_sweep_params();
    params.control_port = params.readout_port;
    let mut sweep = ExcitedSweep::new(params);
    assert!(matches!(
        sweep.run(&mut sim, &hardware),
        Err(Error::Parameter { .. })
    ));
    assert!(sim.calls().is_empty());
}

#[test]
fn two_tone_resolves_qubit_line() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut sweep = TwoTonePulsed::new(two_tone_params());
    sweep.run(&mut sim, &hardware).unwrap();

    let analysis = sweep.analyze(&AnalysisSettings::default(), None).unwrap();
    let reference = analysis.response[0];
    let (peak, _) = analysis
        .response
        .iter()
        .enumerate()
        .fold((0, 0.0), |(bi, bv), (i, r)| {
            let d = (r - reference).norm();
            if d > bv { (i, d) } else { (bi, bv) }
        });
    assert!((analysis.control_freq_arr[peak] - sim.device().qubit_freq).abs() < 1e3);

    // a two-level response lies on a line, which the rotation puts on the real axis
    let imag: Vec<f64> = analysis.rotated.iter().map(|z| z.im).collect();
    let spread = imag.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        - imag.iter().cloned().fold(f64::INFINITY, f64::min);
    assert!(spread < 1e-6);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_tone.json");
    sweep.save(&path).unwrap();
    assert_eq!(TwoTonePulsed::load(&path).unwrap(), sweep);
}

#[test]
fn two_tone_switches_amplifier_around_capture() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut params = two_tone_params();
    params.jpa_params = Some(JpaParams {
        pump_freq: 12.01e9,
        pump_pwr: 11,
        pump_port: 3,
        bias: 0.4,
        bias_port: 1,
    });
    let mut sweep = TwoTonePulsed::new(params);
    sweep.run(&mut sim, &hardware).unwrap();

    let calls = sim.calls();
    let pump_on = position(calls, |c| matches!(c, Call::Lmx { frequency, .. } if *frequency > 0.0));
    let execute = position(calls, |c| matches!(c, Call::Execute { .. }));
    let pump_off = position(calls, |c| matches!(c, Call::Lmx { frequency, .. } if *frequency == 0.0));
    let release = position(calls, |c| matches!(c, Call::Release));
    assert!(pump_on < execute && execute < pump_off && pump_off < release);
    assert!(calls.contains(&Call::Sleep(1.0)));
}

#[test]
fn failed_pumped_run_switches_amplifier_off() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    sim.fail_next_execute("trigger timeout");
    let mut params = two_tone_params();
    params.jpa_params = Some(JpaParams {
        pump_freq: 12.01e9,
        pump_pwr: 11,
        pump_port: 3,
        bias: 0.4,
        bias_port: 1,
    });
    let mut sweep = TwoTonePulsed::new(params);
    let err = sweep.run(&mut sim, &hardware).unwrap_err();
    assert!(format!("{err:#}").contains("trigger timeout"));
    assert!(sweep.data.is_none());

    let calls = sim.calls();
    let execute = position(calls, |c| matches!(c, Call::Execute { .. }));
    let pump_off = position(calls, |c| {
        matches!(c, Call::Lmx { frequency, power: 0, port: 3 } if *frequency == 0.0)
    });
    let bias_off = position(calls, |c| {
        matches!(c, Call::DcBias { bias, port: 1 } if *bias == 0.0)
    });
    let release = position(calls, |c| matches!(c, Call::Release));
    assert!(execute < pump_off && pump_off < bias_off && bias_off < release);
    assert_eq!(sim.release_count(), 1);
}

#[test]
fn resonator_sweep_lockin() {
    let hardware = HardwareSettings::default();
    let mut sim = simulator();
    let mut sweep = ResonatorSweep::new(ResonatorSweepParams {
        freq_center: 6.0e9,
        freq_span: 10e6,
        df: 0.9e6,
        num_averages: 4,
        amp: 0.5,
        output_port: 1,
        input_port: 1,
        dither: true,
        num_skip: 2,
    });
    sweep.run(&mut sim, &hardware).unwrap();

    // 4 GS/s / 0.9 MHz is not an integer; the tuned df replaces the request
    let df = sweep.params.df;
    assert!((df - 4e9 / 4444.0).abs() < 1e-6);
    let data = sweep.data.as_ref().unwrap();
    assert_eq!(data.freq_arr.len(), data.resp_arr.len());
    assert!(sim.calls().contains(&Call::Pixels { port: 1, count: 6 }));
    let tail: Vec<_> = sim.calls().iter().rev().take(3).cloned().collect();
    assert_eq!(tail, [
        Call::Release,
        Call::ApplySettings,
        Call::OutputAmplitude {
            port: 1,
            amplitude: 0.0
        },
    ]);

    let summary = sweep.analyze().unwrap();
    assert!((summary.f_min - 6.0e9).abs() <= df);
    assert!(data.resp_arr.iter().all(|r| r.norm() <= 0.5 + 1e-12));
    assert!(data.resp_arr.iter().any(|r| *r != Complex64::new(0.0, 0.0)));

    let dir = tempfile::tempdir().unwrap();
    let path = sweep.save_in(dir.path()).unwrap();
    assert_eq!(ResonatorSweep::load(&path).unwrap(), sweep);
}
