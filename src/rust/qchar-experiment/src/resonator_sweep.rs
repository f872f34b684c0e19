// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Continuous-wave resonator sweep in lock-in mode.
//!
//! The tone is generated at zero IF and stepped by retuning the mixer, so
//! every frequency lands on the pixel grid `n * df`.

use ndarray::{Array1, Ix1};
use num_complex::Complex64;
use qchar_analysis::LockinSummary;
use qchar_log::info;
use qchar_store::{Persist, Record};
use qchar_units::seconds;
use serde::{Deserialize, Serialize};

use crate::config::HardwareSettings;
use crate::instrument::{LockinInstrument, MixerConfig};
use crate::session::Session;
use crate::state::{RunState, RunTracker};
use crate::validate::{amplitude, at_least_one, positive};
use crate::{Error, Result};

pub const KIND: &str = "resonator_sweep";

const SETTLE_TIME: f64 = 1e-3;

fn default_dither() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonatorSweepParams {
    pub freq_center: f64,
    pub freq_span: f64,
    /// Requested pixel bandwidth; replaced by the tuned value after a run.
    pub df: f64,
    pub num_averages: usize,
    pub amp: f64,
    pub output_port: u16,
    pub input_port: u16,
    #[serde(default = "default_dither")]
    pub dither: bool,
    /// Pixels discarded after every retune.
    #[serde(default)]
    pub num_skip: usize,
}

impl ResonatorSweepParams {
    pub fn validate(&self) -> Result<()> {
        positive("freq_center", self.freq_center)?;
        positive("freq_span", self.freq_span)?;
        positive("df", self.df)?;
        at_least_one("num_averages", self.num_averages)?;
        amplitude("amp", self.amp)?;
        if self.freq_span / 2.0 >= self.freq_center {
            return Err(Error::parameter(
                "freq_span",
                format!(
                    "sweep would reach below 0 Hz: center {} Hz, span {} Hz",
                    self.freq_center, self.freq_span
                ),
            ));
        }
        Ok(())
    }
}

/// Pixel grid `n_start..=n_stop` covering the span at resolution `df`.
pub fn frequency_grid(center: f64, span: f64, df: f64) -> Vec<f64> {
    let n_start = ((center - span / 2.0) / df).round() as i64;
    let n_stop = ((center + span / 2.0) / df).round() as i64;
    (n_start..=n_stop).map(|n| df * n as f64).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResonatorSweepData {
    pub freq_arr: Vec<f64>,
    pub resp_arr: Array1<Complex64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResonatorSweep {
    pub params: ResonatorSweepParams,
    pub data: Option<ResonatorSweepData>,
}

impl ResonatorSweep {
    pub fn new(params: ResonatorSweepParams) -> Self {
        ResonatorSweep { params, data: None }
    }

    pub fn run<I: LockinInstrument>(
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

    fn run_tracked<I: LockinInstrument>(
        &mut self,
        instrument: &mut I,
        hardware: &HardwareSettings,
        tracker: &mut RunTracker,
    ) -> Result<()> {
        self.params.validate()?;
        let p = self.params.clone();
        let mut session = Session::open(instrument);
        tracker.advance(RunState::BuildingTimeline)?;

        session.set_adc_attenuation(p.input_port, 0.0)?;
        session.set_dac_current(p.output_port, hardware.dac_current)?;
        session.set_inv_sinc(p.output_port, 0)?;

        let df = session.tune(p.df)?;
        if !df.is_finite() || df <= 0.0 {
            return Err(Error::Hardware(format!("instrument tuned df to {df} Hz")));
        }
        let freq_arr = frequency_grid(p.freq_center, p.freq_span, df);
        let Some(&first) = freq_arr.first() else {
            return Err(Error::parameter("freq_span", "no pixel in the sweep range"));
        };
        info!(
            "{}: {} points at df = {} Hz, {} averages",
            KIND,
            freq_arr.len(),
            df,
            p.num_averages
        );

        let mixer = |frequency| MixerConfig {
            frequency,
            in_ports: vec![p.input_port],
            out_ports: vec![p.output_port],
            sync: true,
        };
        session.configure_mixer(&mixer(first))?;
        session.set_df(df)?;
        session.configure_output(p.output_port, p.amp, p.dither)?;
        session.configure_input(p.input_port)?;
        session.apply_settings()?;

        tracker.advance(RunState::Submitted)?;
        let mut resp_arr = Array1::zeros(freq_arr.len());
        for (response, &frequency) in resp_arr.iter_mut().zip(&freq_arr) {
            session.configure_mixer(&mixer(frequency))?;
            session.sleep(seconds(SETTLE_TIME))?;
            let pixels = session.get_pixels(p.input_port, p.num_skip + p.num_averages)?;
            if pixels.len() < p.num_averages {
                return Err(Error::Hardware(format!(
                    "got {} pixels, expected {}",
                    pixels.len(),
                    p.num_skip + p.num_averages
                )));
            }
            let tail = &pixels[pixels.len() - p.num_averages..];
            *response = tail.iter().sum::<Complex64>() / tail.len() as f64;
        }
        tracker.advance(RunState::Captured)?;

        session.set_output_amplitude(p.output_port, 0.0)?;
        session.apply_settings()?;

        self.params.df = df;
        self.data = Some(ResonatorSweepData { freq_arr, resp_arr });
        tracker.advance(RunState::Assembled)?;
        session.close()?;
        tracker.advance(RunState::Terminal)
    }

    pub fn analyze(&self) -> Result<LockinSummary> {
        let data = self.data.as_ref().ok_or(Error::NoData)?;
        let summary = LockinSummary::new(&data.freq_arr, data.resp_arr.view())?;
        info!("f_min = {} Hz", summary.f_min);
        Ok(summary)
    }
}

impl Persist for ResonatorSweep {
    const KIND: &'static str = KIND;

    fn to_record(&self) -> qchar_store::Result<Record> {
        let p = &self.params;
        let mut record = Record::new(KIND);
        record
            .set_attr("freq_center", p.freq_center)
            .set_attr("freq_span", p.freq_span)
            .set_attr("df", p.df)
            .set_attr("num_averages", p.num_averages)
            .set_attr("amp", p.amp)
            .set_attr("output_port", p.output_port)
            .set_attr("input_port", p.input_port)
            .set_attr("dither", p.dither)
            .set_attr("num_skip", p.num_skip);
        if let Some(data) = &self.data {
            record
                .set_dataset("freq_arr", data.freq_arr.clone())
                .set_dataset("resp_arr", data.resp_arr.clone());
        }
        Ok(record)
    }

    fn from_record(record: &Record) -> qchar_store::Result<Self> {
        let params = ResonatorSweepParams {
            freq_center: record.float("freq_center")?,
            freq_span: record.float("freq_span")?,
            df: record.float("df")?,
            num_averages: record.int_as("num_averages")?,
            amp: record.float("amp")?,
            output_port: record.int_as("output_port")?,
            input_port: record.int_as("input_port")?,
            dither: record.flag("dither")?,
            num_skip: record.int_as("num_skip")?,
        };
        let data = match record.dataset("resp_arr") {
            None => None,
            Some(_) => Some(ResonatorSweepData {
                freq_arr: record.float_vec("freq_arr")?,
                resp_arr: record
                    .complex_dataset("resp_arr")?
                    .clone()
                    .into_dimensionality::<Ix1>()
                    .map_err(|err| {
                        qchar_store::Error::new(format!("Dataset 'resp_arr': {err}"))
                    })?,
            }),
        };
        Ok(ResonatorSweep { params, data })
    }
}
