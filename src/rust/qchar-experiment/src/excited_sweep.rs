// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Pulsed readout frequency sweep with the qubit in the ground and in the
//! excited state.
//!
//! Every repetition period holds two branches. The first reads out the
//! resonator right away; the second applies the control pulse first. Only
//! the second branch advances the readout frequency table, so both branches
//! of a period see the same frequency.

use ndarray::{Array1, Array2, Array3, Ix3};
use num_complex::Complex64;
use qchar_analysis::fit::separation_guess;
use qchar_analysis::{
    AnalysisSettings, CurveFitter, FitParameters, Model, PhaseCorrection, demodulate,
    fit_or_warn, remove_phase_background, separation, to_db, untwist,
};
use qchar_log::info;
use qchar_sequencer::{
    FrequencyLut, FrequencyPlan, LookupTables, PulseTemplate, ScaleLut, SequenceProgram, Timeline,
};
use qchar_store::{Persist, Record};
use qchar_units::seconds;
use serde::{Deserialize, Serialize};

use crate::config::HardwareSettings;
use crate::instrument::PulsedInstrument;
use crate::session::Session;
use crate::setup::prepare_pulsed_ports;
use crate::state::{RunState, RunTracker};
use crate::validate::{amplitude, at_least_one, distinct_ports, non_negative, positive};
use crate::{Error, Result};

pub const KIND: &str = "excited_sweep";

/// Ground state, then excited state.
pub const BRANCHES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcitedSweepParams {
    pub readout_freq_center: f64,
    pub readout_freq_span: f64,
    pub readout_freq_nr: usize,
    pub control_freq: f64,
    pub readout_amp: f64,
    pub control_amp: f64,
    pub readout_duration: f64,
    pub control_duration: f64,
    pub sample_duration: f64,
    pub readout_port: u16,
    pub control_port: u16,
    pub sample_port: u16,
    pub wait_delay: f64,
    pub readout_sample_delay: f64,
    pub num_averages: usize,
    #[serde(default)]
    pub drag: f64,
}

impl ExcitedSweepParams {
    pub fn validate(&self) -> Result<()> {
        positive("readout_freq_center", self.readout_freq_center)?;
        positive("readout_freq_span", self.readout_freq_span)?;
        at_least_one("readout_freq_nr", self.readout_freq_nr)?;
        non_negative("control_freq", self.control_freq)?;
        amplitude("readout_amp", self.readout_amp)?;
        amplitude("control_amp", self.control_amp)?;
        positive("readout_duration", self.readout_duration)?;
        positive("control_duration", self.control_duration)?;
        positive("sample_duration", self.sample_duration)?;
        non_negative("wait_delay", self.wait_delay)?;
        non_negative("readout_sample_delay", self.readout_sample_delay)?;
        at_least_one("num_averages", self.num_averages)?;
        if !self.drag.is_finite() {
            return Err(Error::parameter("drag", "must be finite"));
        }
        distinct_ports("control_port", self.control_port, self.readout_port)
    }
}

/// Arrays measured by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcitedSweepData {
    pub readout_freq_arr: Vec<f64>,
    pub readout_if_arr: Vec<f64>,
    pub readout_nco: f64,
    pub t_arr: Vec<f64>,
    pub store_arr: Array3<Complex64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcitedSweep {
    pub params: ExcitedSweepParams,
    pub data: Option<ExcitedSweepData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcitedSweepAnalysis {
    pub readout_freq_arr: Vec<f64>,
    /// Upper-sideband response, `[branch, point]`.
    pub response: Array2<Complex64>,
    pub amplitude_db: Array2<f64>,
    pub phase: PhaseCorrection,
    /// `|H_e - H_g|` per point.
    pub separation: Array1<f64>,
    pub initial_guess: [f64; 4],
    pub fit: Option<FitParameters>,
}

impl ExcitedSweepAnalysis {
    /// Readout frequency that best distinguishes the two states.
    pub fn optimal_frequency(&self) -> f64 {
        self.fit
            .map_or(self.initial_guess[0], |fit| fit.center())
    }
}

impl ExcitedSweep {
    pub fn new(params: ExcitedSweepParams) -> Self {
        ExcitedSweep { params, data: None }
    }

    pub fn plan(&self, readout_sample_rate: f64) -> Result<FrequencyPlan> {
        let p = &self.params;
        Ok(FrequencyPlan::new(
            p.readout_freq_center,
            p.readout_freq_span,
            p.readout_freq_nr,
            readout_sample_rate,
        )?)
    }

    pub fn build_program(
        &self,
        plan: &FrequencyPlan,
        control_sample_rate: f64,
    ) -> Result<SequenceProgram> {
        let p = &self.params;
        let mut tables = LookupTables::new();
        tables
            .add_frequency(FrequencyLut::upper_sideband(
                p.readout_port,
                0,
                plan.if_array(),
            ))?
            .add_frequency(FrequencyLut::single(p.control_port, 0, 0.0))?
            .add_scale(ScaleLut::single(p.readout_port, 0, p.readout_amp))?
            .add_scale(ScaleLut::single(p.control_port, 0, p.control_amp))?;

        let mut timeline = Timeline::new();
        let readout_pulse = timeline.register_pulse(PulseTemplate::long_drive(
            p.readout_port,
            0,
            seconds(p.readout_duration),
            1.0,
        ));
        let control_pulse = timeline.register_pulse(PulseTemplate::sin2(
            p.control_port,
            0,
            seconds(p.control_duration),
            control_sample_rate,
            p.drag,
        )?);
        timeline.set_store(vec![p.sample_port], seconds(p.sample_duration))?;

        let mut t = seconds(0.0);
        for branch in 0..BRANCHES {
            let excited = branch > 0;
            if excited {
                timeline.append_phase_reset(t, p.control_port)?;
                timeline.append_pulse(t, p.control_port, control_pulse)?;
            }
            t += seconds(p.control_duration);
            timeline.append_phase_reset(t, p.readout_port)?;
            timeline.append_pulse(t, p.readout_port, readout_pulse)?;
            timeline.append_store(t + seconds(p.readout_sample_delay))?;
            t += seconds(p.readout_duration);
            if excited {
                timeline.append_frequency_advance(t, p.readout_port)?;
            }
            t += seconds(p.wait_delay);
        }
        Ok(SequenceProgram::new(
            tables,
            timeline,
            t,
            p.readout_freq_nr,
            p.num_averages,
        )?)
    }

    pub fn run<I: PulsedInstrument>(
        &mut self,
        instrument: &mut I,
        hardware: &HardwareSettings,
    ) -> Result<()> {
        let mut tracker = RunTracker::new(KIND);
        let outcome = self.run_tracked(instrument, hardware, &mut tracker);
        if outcome.is_err() {
            tracker.fail();
        }
        outcome
    }

    fn run_tracked<I: PulsedInstrument>(
        &mut self,
        instrument: &mut I,
        hardware: &HardwareSettings,
        tracker: &mut RunTracker,
    ) -> Result<()> {
        let p = &self.params;
        p.validate()?;
        let mut session = Session::open(instrument);
        tracker.advance(RunState::BuildingTimeline)?;

        let plan = self.plan(session.dac_sample_rate(p.readout_port)?)?;
        prepare_pulsed_ports(
            &mut *session,
            hardware.dac_current,
            p.sample_port,
            (p.readout_port, plan.lo_offset()),
            (p.control_port, p.control_freq),
        )?;
        let program = self.build_program(&plan, session.dac_sample_rate(p.control_port)?)?;
        info!(
            "{}: {} points, period {}, {} averages, {} total",
            KIND,
            p.readout_freq_nr,
            program.period(),
            p.num_averages,
            program.total_duration()
        );

        tracker.advance(RunState::Submitted)?;
        let capture = session.execute(&program)?;
        tracker.advance(RunState::Captured)?;
        capture.check(&program)?;

        self.data = Some(ExcitedSweepData {
            readout_freq_arr: plan.rf_frequencies(),
            readout_if_arr: plan.if_array().to_vec(),
            readout_nco: plan.lo_offset(),
            t_arr: capture.t_array,
            store_arr: capture.store_array,
        });
        tracker.advance(RunState::Assembled)?;
        session.close()?;
        tracker.advance(RunState::Terminal)
    }

    pub fn analyze(
        &self,
        settings: &AnalysisSettings,
        fitter: Option<&dyn CurveFitter>,
    ) -> Result<ExcitedSweepAnalysis> {
        let data = self.data.as_ref().ok_or(Error::NoData)?;
        let window = settings.window(data.t_arr.len())?;
        let quadratures = demodulate(
            &data.t_arr,
            data.store_arr.view(),
            0,
            &data.readout_if_arr,
            BRANCHES,
            window,
        )?;
        let (_, response) = untwist(&quadratures);
        let amplitude_db = response.mapv(|r| to_db(r.norm()));
        let phase = remove_phase_background(&data.readout_freq_arr, &response)?;
        let separation = separation(&response)?;
        let separation_vec = separation.to_vec();
        let initial_guess = separation_guess(
            &data.readout_freq_arr,
            &separation_vec,
            self.params.readout_duration,
        )?;
        let fit = fitter.and_then(|fitter| {
            fit_or_warn(
                fitter,
                Model::Gaussian,
                &data.readout_freq_arr,
                &separation_vec,
                initial_guess,
            )
        });
        let analysis = ExcitedSweepAnalysis {
            readout_freq_arr: data.readout_freq_arr.clone(),
            response,
            amplitude_db,
            phase,
            separation,
            initial_guess,
            fit,
        };
        info!(
            "Optimal readout frequency: {:.6} GHz",
            analysis.optimal_frequency() * 1e-9
        );
        Ok(analysis)
    }
}

impl Persist for ExcitedSweep {
    const KIND: &'static str = KIND;

    fn to_record(&self) -> qchar_store::Result<Record> {
        let p = &self.params;
        let mut record = Record::new(KIND);
        record
            .set_attr("readout_freq_center", p.readout_freq_center)
            .set_attr("readout_freq_span", p.readout_freq_span)
            .set_attr("readout_freq_nr", p.readout_freq_nr)
            .set_attr("control_freq", p.control_freq)
            .set_attr("readout_amp", p.readout_amp)
            .set_attr("control_amp", p.control_amp)
            .set_attr("readout_duration", p.readout_duration)
            .set_attr("control_duration", p.control_duration)
            .set_attr("sample_duration", p.sample_duration)
            .set_attr("readout_port", p.readout_port)
            .set_attr("control_port", p.control_port)
            .set_attr("sample_port", p.sample_port)
            .set_attr("wait_delay", p.wait_delay)
            .set_attr("readout_sample_delay", p.readout_sample_delay)
            .set_attr("num_averages", p.num_averages)
            .set_attr("drag", p.drag);
        if let Some(data) = &self.data {
            record
                .set_attr("readout_nco", data.readout_nco)
                .set_dataset("readout_freq_arr", data.readout_freq_arr.clone())
                .set_dataset("readout_if_arr", data.readout_if_arr.clone())
                .set_dataset("t_arr", data.t_arr.clone())
                .set_dataset("store_arr", data.store_arr.clone().into_dyn());
        }
        Ok(record)
    }

    fn from_record(record: &Record) -> qchar_store::Result<Self> {
        let params = ExcitedSweepParams {
            readout_freq_center: record.float("readout_freq_center")?,
            readout_freq_span: record.float("readout_freq_span")?,
            readout_freq_nr: record.int_as("readout_freq_nr")?,
            control_freq: record.float("control_freq")?,
            readout_amp: record.float("readout_amp")?,
            control_amp: record.float("control_amp")?,
            readout_duration: record.float("readout_duration")?,
            control_duration: record.float("control_duration")?,
            sample_duration: record.float("sample_duration")?,
            readout_port: record.int_as("readout_port")?,
            control_port: record.int_as("control_port")?,
            sample_port: record.int_as("sample_port")?,
            wait_delay: record.float("wait_delay")?,
            readout_sample_delay: record.float("readout_sample_delay")?,
            num_averages: record.int_as("num_averages")?,
            drag: record.float_or("drag", 0.0)?,
        };
        let data = match record.dataset("store_arr") {
            None => None,
            Some(_) => Some(ExcitedSweepData {
                readout_freq_arr: record.float_vec("readout_freq_arr")?,
                readout_if_arr: record.float_vec("readout_if_arr")?,
                readout_nco: record.float("readout_nco")?,
                t_arr: record.float_vec("t_arr")?,
                store_arr: captures_from_record(record)?,
            }),
        };
        Ok(ExcitedSweep { params, data })
    }
}

pub(crate) fn captures_from_record(record: &Record) -> qchar_store::Result<Array3<Complex64>> {
    record
        .complex_dataset("store_arr")?
        .clone()
        .into_dimensionality::<Ix3>()
        .map_err(|err| qchar_store::Error::new(format!("Dataset 'store_arr': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use qchar_sequencer::{EventKind, Port};

    fn params() -> ExcitedSweepParams {
        ExcitedSweepParams {
            readout_freq_center: 6.0e9,
            readout_freq_span: 10e6,
            readout_freq_nr: 8,
            control_freq: 4.2e9,
            readout_amp: 0.5,
            control_amp: 0.25,
            readout_duration: 2e-6,
            control_duration: 20e-9,
            sample_duration: 2.5e-6,
            readout_port: 1,
            control_port: 2,
            sample_port: 1,
            wait_delay: 50e-6,
            readout_sample_delay: 0.0,
            num_averages: 100,
            drag: 0.0,
        }
    }

    #[test]
    fn test_two_branch_period() {
        let sweep = ExcitedSweep::new(params());
        let plan = sweep.plan(10e9).unwrap();
        let program = sweep.build_program(&plan, 6e9).unwrap();
        let expected = 2.0 * (20e-9 + 2e-6) + 2.0 * 50e-6;
        assert!((program.period().value() - expected).abs() < 1e-15);
        assert_eq!(program.repeat_count(), 8);
        assert_eq!(program.stores_per_period(), 2);
        assert_eq!(program.total_stores(), 16);
    }

    #[test]
    fn test_frequency_advance_only_after_excited_branch() {
        let sweep = ExcitedSweep::new(params());
        let plan = sweep.plan(10e9).unwrap();
        let program = sweep.build_program(&plan, 6e9).unwrap();
        let timeline = program.timeline();
        let advances: Vec<_> = timeline
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::FrequencyAdvance)
            .collect();
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].port, Port::Output(1));
        assert!((advances[0].time - (2.0 * 20e-9 + 2.0 * 2e-6 + 50e-6)).abs() < 1e-15);
        // one control pulse per period, on the second branch
        let control_pulses = timeline
            .events_on(Port::Output(2))
            .filter(|e| matches!(e.kind, EventKind::PulseOutput(_)))
            .count();
        assert_eq!(control_pulses, 1);
        let lut = program.lookup_tables().frequency_for(1, 0).unwrap();
        assert_eq!(lut.frequencies, plan.if_array());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.control_port = p.readout_port;
        assert!(matches!(
            p.validate(),
            Err(Error::Parameter {
                name: "control_port",
                ..
            })
        ));
        let mut p = params();
        p.readout_freq_span = 6e9;
        let sweep = ExcitedSweep::new(p);
        assert!(matches!(
            sweep.plan(10e9),
            Err(Error::Sequencer(qchar_sequencer::Error::Configuration(_)))
        ));
    }

    #[test]
    fn test_analyze_without_data() {
        let sweep = ExcitedSweep::new(params());
        assert!(matches!(
            sweep.analyze(&AnalysisSettings::default(), None),
            Err(Error::NoData)
        ));
    }

    #[test]
    fn test_missing_drag_defaults_to_zero() {
        let mut sweep = ExcitedSweep::new(params());
        sweep.params.drag = 0.3;
        let mut record = sweep.to_record().unwrap();
        assert_eq!(ExcitedSweep::from_record(&record).unwrap().params.drag, 0.3);
        let mut stripped = Record::new(KIND);
        for (name, value) in record.attrs().filter(|(name, _)| *name != "drag") {
            stripped.set_attr(name, value.clone());
        }
        record = stripped;
        let loaded = ExcitedSweep::from_record(&record).unwrap();
        assert_eq!(loaded.params.drag, 0.0);
        assert!(loaded.data.is_none());
    }

    proptest! {
        #[test]
        fn period_covers_both_branches(
            control in 1e-9f64..1e-6,
            readout in 1e-7f64..1e-5,
            wait in 1e-7f64..1e-4,
        ) {
            let sweep = ExcitedSweep::new(ExcitedSweepParams {
                control_duration: control,
                readout_duration: readout,
                sample_duration: readout,
                wait_delay: wait,
                ..params()
            });
            let plan = sweep.plan(10e9).unwrap();
            let program = sweep.build_program(&plan, 6e9).unwrap();
            let expected = 2.0 * (control + readout) + 2.0 * wait;
            prop_assert!((program.period().value() - expected).abs() <= 1e-12 * expected);
            let advances = program
                .timeline()
                .events()
                .iter()
                .filter(|e| e.kind == EventKind::FrequencyAdvance)
                .count();
            prop_assert_eq!(advances, 1);
            prop_assert_eq!(program.stores_per_period(), 2);
        }
    }
}
