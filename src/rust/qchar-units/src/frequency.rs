// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter, Result as FormatterResult};

use crate::duration::{Seconds, seconds};
use crate::quantity;

quantity!(Frequency);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hertz;

impl Display for Hertz {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatterResult {
        write!(f, "Hz")
    }
}

pub type Hz<T = f64> = Frequency<Hertz, T>;

pub const fn hertz<T>(value: T) -> Frequency<Hertz, T> {
    Frequency { value, unit: Hertz }
}

impl Frequency<Hertz, f64> {
    /// Duration of one cycle. Infinite for a zero frequency.
    pub fn period(self) -> Seconds {
        seconds(1.0 / self.value)
    }

    pub fn abs(self) -> Self {
        hertz(self.value.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period() {
        assert_eq!(hertz(1e9).period(), seconds(1e-9));
        assert!(hertz(0.0).period().value().is_infinite());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", hertz(6e9)), "6000000000.0 Hz");
        assert_eq!(format!("{:#}", hertz(5.0)), "5 Hz");
    }

    #[test]
    fn test_abs() {
        assert_eq!((hertz(1e6) - hertz(3e6)).abs(), hertz(2e6));
    }
}
