// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Qubit characterization sweeps.
//!
//! Each experiment validates its parameters, plans its frequencies, builds a
//! [`qchar_sequencer::SequenceProgram`] and hands it to an instrument, then
//! keeps the captured arrays for analysis and persistence. Instruments are
//! reached through the traits in [`instrument`]; [`Simulator`] stands in for
//! real hardware.

pub mod config;
pub mod error;
pub mod excited_sweep;
pub mod instrument;
pub mod jpa;
pub mod resonator_sweep;
pub mod session;
mod setup;
pub mod simulator;
pub mod state;
pub mod two_tone_pulsed;
mod validate;

pub use crate::config::{Config, ExperimentConfig, HardwareSettings};
pub use crate::error::{Error, Result};
pub use crate::excited_sweep::{ExcitedSweep, ExcitedSweepAnalysis, ExcitedSweepParams};
pub use crate::instrument::{
    Capture, Hardware, Instrument, LockinInstrument, MixerConfig, PulsedInstrument,
};
pub use crate::jpa::JpaParams;
pub use crate::resonator_sweep::{ResonatorSweep, ResonatorSweepParams};
pub use crate::session::Session;
pub use crate::simulator::{Call, DeviceModel, Simulator};
pub use crate::state::{RunState, RunTracker};
pub use crate::two_tone_pulsed::{TwoTonePulsed, TwoTonePulsedAnalysis, TwoTonePulsedParams};
