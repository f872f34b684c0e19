// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Repetition period adjustment against a parametric amplifier idler.
//!
//! A pumped amplifier produces an idler tone that leaks into the capture. With
//! the readout NCO at `f_ro`, the idler lands at an intermediate frequency of
//! `|(f_pump - f_ro) - f_ro|`. Making the period one clock cycle longer than a
//! multiple of the idler period shifts the idler phase by a fixed small step
//! between repetitions, so it averages out instead of adding coherently.

use qchar_log::diagnostic;
use qchar_units::clock::{ceil_to_grid, clock_cycles_to_seconds, seconds_to_clock_cycles};
use qchar_units::{ClockCycles, Hz, Seconds, clock_cycles};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodCorrection {
    pub idler_if: Hz,
    pub idler_period: ClockCycles,
    pub original: ClockCycles,
    pub corrected: ClockCycles,
    pub period: Seconds,
}

pub fn idler_intermediate_frequency(pump_frequency: Hz, readout_frequency: Hz) -> Hz {
    let idler = pump_frequency - readout_frequency;
    (idler - readout_frequency).abs()
}

/// Snap `period` to a multiple of the idler period plus one clock cycle.
pub fn snap_period_to_idler(
    period: Seconds,
    idler_if: Hz,
    clock_rate: Hz,
) -> Result<PeriodCorrection> {
    if clock_rate.value().is_nan() || clock_rate.value() <= 0.0 {
        return Err(Error::configuration(format!(
            "Clock rate must be positive, got {clock_rate}."
        )));
    }
    if !idler_if.value().is_finite() || idler_if.value() <= 0.0 {
        return Err(Error::configuration(format!(
            "Idler sits at zero intermediate frequency ({idler_if}); the pump frequency cannot be decorrelated."
        )));
    }
    let idler_period = seconds_to_clock_cycles(idler_if.period(), clock_rate);
    if idler_period.value() < 1 {
        return Err(Error::configuration(format!(
            "Idler period at {idler_if} is shorter than one clock cycle at {clock_rate}."
        )));
    }
    let original = seconds_to_clock_cycles(period, clock_rate);
    let corrected = clock_cycles(ceil_to_grid(original.value(), idler_period.value()) + 1);
    let period = clock_cycles_to_seconds(corrected, clock_rate);
    diagnostic!(
        "Repetition period moved from {} to {} clock cycles (idler period {} cycles at {}).",
        original.value(),
        corrected.value(),
        idler_period.value(),
        idler_if
    );
    Ok(PeriodCorrection {
        idler_if,
        idler_period,
        original,
        corrected,
        period,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qchar_units::{hertz, seconds};

    #[test]
    fn test_idler_frequency() {
        // pump at 2 f_ro + 10 MHz gives a 10 MHz idler
        let f = idler_intermediate_frequency(hertz(12.01e9), hertz(6e9));
        assert!((f.value() - 10e6).abs() < 1e-3);
        let f = idler_intermediate_frequency(hertz(11.99e9), hertz(6e9));
        assert!((f.value() - 10e6).abs() < 1e-3);
    }

    #[test]
    fn test_snap_to_multiple_plus_one() {
        // 500 MHz clock, 10 MHz idler -> 50 cycle idler period
        let correction =
            snap_period_to_idler(seconds(52.02e-6), hertz(10e6), hertz(500e6)).unwrap();
        assert_eq!(correction.idler_period.value(), 50);
        assert_eq!(correction.original.value(), 26010);
        assert_eq!(correction.corrected.value(), 26051);
        assert!((correction.period.value() - 26051.0 * 2e-9).abs() < 1e-15);
    }

    #[test]
    fn test_exact_multiple_still_offset() {
        let correction = snap_period_to_idler(seconds(100e-9), hertz(10e6), hertz(500e6)).unwrap();
        assert_eq!(correction.original.value(), 50);
        assert_eq!(correction.corrected.value(), 51);
    }

    #[test]
    fn test_invalid_idler() {
        assert!(matches!(
            snap_period_to_idler(seconds(1e-6), hertz(0.0), hertz(500e6)),
            Err(Error::Configuration(_))
        ));
        assert!(snap_period_to_idler(seconds(1e-6), hertz(2e9), hertz(500e6)).is_err());
        assert!(snap_period_to_idler(seconds(1e-6), hertz(1e6), hertz(0.0)).is_err());
    }
}
