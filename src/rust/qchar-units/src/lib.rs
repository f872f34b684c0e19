// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Unit-carrying quantities used when laying out pulse sequences.

pub mod clock;
pub mod duration;
pub mod frequency;
pub mod unit;

pub use clock::{ClockCycles, clock_cycles};
pub use duration::{Seconds, seconds};
pub use frequency::{Hz, hertz};
