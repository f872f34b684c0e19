// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Two-tone spectroscopy in pulsed mode: the control frequency is swept at
//! fixed control power while the resonator is read out at a fixed frequency.

use ndarray::{Array1, Array3};
use num_complex::Complex64;
use qchar_analysis::fit::spectroscopy_guess;
use qchar_analysis::{
    AnalysisSettings, CurveFitter, FitParameters, Model, fit_or_warn, rotate_opt, window_mean,
};
use qchar_log::info;
use qchar_sequencer::{
    FrequencyLut, FrequencyPlan, LookupTables, PeriodCorrection, PulseTemplate, ScaleLut,
    SequenceProgram, Timeline, idler_intermediate_frequency, snap_period_to_idler,
};
use qchar_store::{Persist, Record};
use qchar_units::{hertz, seconds};
use serde::{Deserialize, Serialize};

use crate::config::HardwareSettings;
use crate::excited_sweep::captures_from_record;
use crate::instrument::PulsedInstrument;
use crate::jpa::{self, JpaParams, Pump};
use crate::session::Session;
use crate::setup::prepare_pulsed_ports;
use crate::state::{RunState, RunTracker};
use crate::validate::{amplitude, at_least_one, distinct_ports, non_negative, positive};
use crate::{Error, Result};

pub const KIND: &str = "two_tone_pulsed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoTonePulsedParams {
    pub readout_freq: f64,
    pub control_freq_center: f64,
    pub control_freq_span: f64,
    pub control_freq_nr: usize,
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
    pub jpa_params: Option<JpaParams>,
    #[serde(default)]
    pub drag: f64,
}

impl TwoTonePulsedParams {
    pub fn validate(&self) -> Result<()> {
        positive("readout_freq", self.readout_freq)?;
        positive("control_freq_center", self.control_freq_center)?;
        positive("control_freq_span", self.control_freq_span)?;
        at_least_one("control_freq_nr", self.control_freq_nr)?;
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
        if let Some(jpa) = &self.jpa_params {
            non_negative("jpa_params.pump_freq", jpa.pump_freq)?;
        }
        distinct_ports("control_port", self.control_port, self.readout_port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoTonePulsedData {
    pub control_freq_arr: Vec<f64>,
    pub control_if_arr: Vec<f64>,
    pub control_nco: f64,
    pub t_arr: Vec<f64>,
    pub store_arr: Array3<Complex64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoTonePulsed {
    pub params: TwoTonePulsedParams,
    pub data: Option<TwoTonePulsedData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoTonePulsedAnalysis {
    pub control_freq_arr: Vec<f64>,
    /// Mean of each capture over the analysis window.
    pub response: Array1<Complex64>,
    /// `response` rotated so the qubit signal lies along the real axis.
    pub rotated: Array1<Complex64>,
    pub rotation: f64,
    pub initial_guess: [f64; 4],
    pub fit: Option<FitParameters>,
}

impl TwoTonePulsed {
    pub fn new(params: TwoTonePulsedParams) -> Self {
        TwoTonePulsed { params, data: None }
    }

    pub fn plan(&self, control_sample_rate: f64) -> Result<FrequencyPlan> {
        let p = &self.params;
        Ok(FrequencyPlan::new(
            p.control_freq_center,
            p.control_freq_span,
            p.control_freq_nr,
            control_sample_rate,
        )?)
    }

    /// Build the program; with an amplifier pump the period is moved off the
    /// idler period, and the correction is returned too.
    pub fn build_program(
        &self,
        plan: &FrequencyPlan,
        control_sample_rate: f64,
        clock_rate: f64,
    ) -> Result<(SequenceProgram, Option<PeriodCorrection>)> {
        let p = &self.params;
        let mut tables = LookupTables::new();
        tables
            .add_frequency(FrequencyLut::single(p.readout_port, 0, 0.0))?
            .add_frequency(FrequencyLut::upper_sideband(
                p.control_port,
                0,
                plan.if_array(),
            ))?
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
        timeline.append_phase_reset(t, p.control_port)?;
        timeline.append_pulse(t, p.control_port, control_pulse)?;
        t += seconds(p.control_duration);
        timeline.append_phase_reset(t, p.readout_port)?;
        timeline.append_pulse(t, p.readout_port, readout_pulse)?;
        timeline.append_store(t + seconds(p.readout_sample_delay))?;
        t += seconds(p.readout_duration);
        timeline.append_frequency_advance(t, p.control_port)?;
        t += seconds(p.wait_delay);

        let correction = match &p.jpa_params {
            Some(jpa) => {
                let idler_if =
                    idler_intermediate_frequency(hertz(jpa.pump_freq), hertz(p.readout_freq));
                Some(snap_period_to_idler(t, idler_if, hertz(clock_rate))?)
            }
            None => None,
        };
        let period = correction.map_or(t, |c| c.period);
        let program =
            SequenceProgram::new(tables, timeline, period, p.control_freq_nr, p.num_averages)?;
        Ok((program, correction))
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

        let control_sample_rate = session.dac_sample_rate(p.control_port)?;
        let plan = self.plan(control_sample_rate)?;
        prepare_pulsed_ports(
            &mut *session,
            hardware.dac_current,
            p.sample_port,
            (p.readout_port, p.readout_freq),
            (p.control_port, plan.lo_offset()),
        )?;
        let mut pump = Pump::engage(p.jpa_params.as_ref(), &mut *session)?;
        let (program, correction) =
            self.build_program(&plan, control_sample_rate, pump.clock_rate())?;
        if let Some(correction) = correction {
            info!(
                "{}: period moved to {} to average out the {} idler",
                KIND,
                correction.period,
                correction.idler_if
            );
        }
        info!(
            "{}: {} points, period {}, {} averages, {} total",
            KIND,
            p.control_freq_nr,
            program.period(),
            p.num_averages,
            program.total_duration()
        );

        tracker.advance(RunState::Submitted)?;
        let capture = pump.execute(&program)?;
        tracker.advance(RunState::Captured)?;
        capture.check(&program)?;
        pump.finish()?;

        self.data = Some(TwoTonePulsedData {
            control_freq_arr: plan.rf_frequencies(),
            control_if_arr: plan.if_array().to_vec(),
            control_nco: plan.lo_offset(),
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
    ) -> Result<TwoTonePulsedAnalysis> {
        let data = self.data.as_ref().ok_or(Error::NoData)?;
        let window = settings.window(data.t_arr.len())?;
        let response = window_mean(&data.t_arr, data.store_arr.view(), 0, window)?;
        if response.len() != data.control_freq_arr.len() {
            return Err(Error::new(format!(
                "{} captures for {} control frequencies",
                response.len(),
                data.control_freq_arr.len()
            )));
        }
        let (rotated, rotation) = rotate_opt(response.view());
        let real: Vec<f64> = rotated.iter().map(|z| z.re).collect();
        let initial_guess = spectroscopy_guess(
            self.params.control_freq_center,
            self.params.control_freq_span,
            &real,
        )?;
        let fit = fitter.and_then(|fitter| {
            fit_or_warn(
                fitter,
                Model::Gaussian,
                &data.control_freq_arr,
                &real,
                initial_guess,
            )
        });
        if let Some(fit) = &fit {
            info!("f0 = {} Hz, sigma = {} Hz", fit.center(), fit.width());
        }
        Ok(TwoTonePulsedAnalysis {
            control_freq_arr: data.control_freq_arr.clone(),
            response,
            rotated,
            rotation,
            initial_guess,
            fit,
        })
    }
}

impl Persist for TwoTonePulsed {
    const KIND: &'static str = KIND;

    fn to_record(&self) -> qchar_store::Result<Record> {
        let p = &self.params;
        let mut record = Record::new(KIND);
        record
            .set_attr("readout_freq", p.readout_freq)
            .set_attr("control_freq_center", p.control_freq_center)
            .set_attr("control_freq_span", p.control_freq_span)
            .set_attr("control_freq_nr", p.control_freq_nr)
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
            .set_attr("jpa_params", jpa::to_text(p.jpa_params.as_ref())?)
            .set_attr("drag", p.drag);
        if let Some(data) = &self.data {
            record
                .set_attr("control_nco", data.control_nco)
                .set_dataset("control_freq_arr", data.control_freq_arr.clone())
                .set_dataset("control_if_arr", data.control_if_arr.clone())
                .set_dataset("t_arr", data.t_arr.clone())
                .set_dataset("store_arr", data.store_arr.clone().into_dyn());
        }
        Ok(record)
    }

    fn from_record(record: &Record) -> qchar_store::Result<Self> {
        let params = TwoTonePulsedParams {
            readout_freq: record.float("readout_freq")?,
            control_freq_center: record.float("control_freq_center")?,
            control_freq_span: record.float("control_freq_span")?,
            control_freq_nr: record.int_as("control_freq_nr")?,
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
            jpa_params: jpa::from_text(record.text("jpa_params")?)?,
            drag: record.float_or("drag", 0.0)?,
        };
        let data = match record.dataset("store_arr") {
            None => None,
            Some(_) => Some(TwoTonePulsedData {
                control_freq_arr: record.float_vec("control_freq_arr")?,
                control_if_arr: record.float_vec("control_if_arr")?,
                control_nco: record.float("control_nco")?,
                t_arr: record.float_vec("t_arr")?,
                store_arr: captures_from_record(record)?,
            }),
        };
        Ok(TwoTonePulsed { params, data })
    }
}
