// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter, Result as FormatterResult};

use crate::duration::{Duration, Second, Seconds, seconds};
use crate::frequency::Hz;

/// One cycle of the sequencer clock.
///
/// Periods handed to the instrument are realized on this grid, so any timing
/// correction that must survive the hardware has to be computed in cycles.
#[derive(Debug, Clone, Copy, Default, PartialOrd, PartialEq, Ord, Eq)]
pub struct ClockCycle;

impl Display for ClockCycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatterResult {
        write!(f, "clk")
    }
}

/// A duration expressed in whole clock cycles.
pub type ClockCycles<T = i64> = Duration<ClockCycle, T>;

pub fn clock_cycles(value: i64) -> ClockCycles {
    Duration {
        value,
        unit: ClockCycle,
    }
}

pub fn seconds_to_clock_cycles(duration: Duration<Second>, clock_rate: Hz) -> ClockCycles {
    clock_cycles((duration.value() * clock_rate.value()).round() as i64)
}

pub fn clock_cycles_to_seconds(cycles: ClockCycles, clock_rate: Hz) -> Seconds {
    let clock_period = 1.0 / clock_rate.value();
    seconds(cycles.value() as f64 * clock_period)
}

pub fn floor_to_grid(value: i64, grid: i64) -> i64 {
    value - value % grid
}

pub fn ceil_to_grid(value: i64, grid: i64) -> i64 {
    value + (grid - (value % grid)) % grid
}
