// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Capabilities the sweeps need from an instrument.
//!
//! The sweeps are written against these traits only. A driver for real
//! hardware implements them outside this workspace; [`crate::Simulator`]
//! implements them for tests and dry runs. Driver failures are passed
//! through as [`anyhow::Error`].

use ndarray::Array3;
use num_complex::Complex64;
use qchar_sequencer::SequenceProgram;
use qchar_units::Seconds;

#[derive(Debug, Clone, PartialEq)]
pub struct MixerConfig {
    /// Frequency of the digital NCO, in Hz.
    pub frequency: f64,
    pub in_ports: Vec<u16>,
    pub out_ports: Vec<u16>,
    /// Apply this and all previously configured mixers at once.
    pub sync: bool,
}

/// Analog front end settings shared by every acquisition mode.
pub trait Hardware {
    fn set_adc_attenuation(&mut self, port: u16, attenuation_db: f64) -> anyhow::Result<()>;

    /// Full-scale output current of a DAC, in µA.
    fn set_dac_current(&mut self, port: u16, current: u32) -> anyhow::Result<()>;

    fn set_inv_sinc(&mut self, port: u16, order: u8) -> anyhow::Result<()>;

    fn configure_mixer(&mut self, config: &MixerConfig) -> anyhow::Result<()>;

    /// Drive the pump synthesizer on `port`; zero frequency and power turn it off.
    fn set_lmx(&mut self, frequency: f64, power: i64, port: u16) -> anyhow::Result<()>;

    fn set_dc_bias(&mut self, bias: f64, port: u16) -> anyhow::Result<()>;

    /// Wait on the instrument side, for example to let a bias settle.
    fn sleep(&mut self, duration: Seconds) -> anyhow::Result<()>;
}

/// An instrument connection held for the duration of one run.
pub trait Instrument: Hardware {
    /// Mute all outputs and close the connection.
    fn release(&mut self) -> anyhow::Result<()>;
}

/// Data returned by a pulsed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Time axis of one capture, in seconds.
    pub t_array: Vec<f64>,
    /// Captures indexed `[capture, store port, sample]`, where capture counts
    /// every store of every repetition in order.
    pub store_array: Array3<Complex64>,
}

impl Capture {
    /// Check the capture against the program it was recorded with.
    pub fn check(&self, program: &SequenceProgram) -> anyhow::Result<()> {
        let (captures, ports, samples) = self.store_array.dim();
        let expected_ports = program.timeline().store().map_or(0, |s| s.ports.len());
        anyhow::ensure!(
            captures == program.total_stores() && ports == expected_ports,
            "instrument returned {captures} captures on {ports} ports, expected {} on {expected_ports}",
            program.total_stores()
        );
        anyhow::ensure!(
            samples == self.t_array.len(),
            "captures have {samples} samples but the time axis has {}",
            self.t_array.len()
        );
        Ok(())
    }
}

/// Instrument executing timed pulse sequences.
pub trait PulsedInstrument: Instrument {
    /// DAC sample rate of an output port, in Hz.
    fn dac_sample_rate(&self, port: u16) -> anyhow::Result<f64>;

    /// Rate of the sequencer clock that periods are realized on, in Hz.
    fn clock_rate(&self) -> f64;

    /// Upload and run `program`, blocking until all averages are done.
    fn execute(&mut self, program: &SequenceProgram) -> anyhow::Result<Capture>;
}

/// Instrument in continuous-wave lock-in mode.
pub trait LockinInstrument: Instrument {
    /// Round the pixel bandwidth to one the instrument can realize.
    fn tune(&mut self, df: f64) -> anyhow::Result<f64>;

    fn set_df(&mut self, df: f64) -> anyhow::Result<()>;

    /// Single-tone output group at zero IF.
    fn configure_output(&mut self, port: u16, amplitude: f64, dither: bool) -> anyhow::Result<()>;

    /// Single-tone input group at zero IF.
    fn configure_input(&mut self, port: u16) -> anyhow::Result<()>;

    fn set_output_amplitude(&mut self, port: u16, amplitude: f64) -> anyhow::Result<()>;

    /// Push the pending output and input group settings to the instrument.
    fn apply_settings(&mut self) -> anyhow::Result<()>;

    /// Acquire `count` pixels on `port`, as `I + iQ` of the zero-IF tone.
    fn get_pixels(&mut self, port: u16, count: usize) -> anyhow::Result<Vec<Complex64>>;
}
