// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Frequency planning and timed pulse sequence composition.
//!
//! The crate turns a requested frequency sweep into sideband settings and
//! records pulse, store and frequency-table events on a shared clock. The
//! result, a [`SequenceProgram`], is what an instrument executes; nothing in
//! here talks to hardware.

pub mod error;
pub mod frequency_plan;
pub mod lut;
pub mod period;
pub mod program;
pub mod pulse;
pub mod timeline;

pub use crate::error::{Error, Result};
pub use crate::frequency_plan::FrequencyPlan;
pub use crate::lut::{FrequencyLut, LookupTables, ScaleLut};
pub use crate::period::{PeriodCorrection, idler_intermediate_frequency, snap_period_to_idler};
pub use crate::program::SequenceProgram;
pub use crate::pulse::{Envelope, PulseRef, PulseTemplate};
pub use crate::timeline::{EventKind, Port, StoreSettings, Timeline, TimelineEvent};
