// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter, Result as FormatterResult};

use crate::quantity;

quantity!(Duration);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Second;

impl Display for Second {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatterResult {
        write!(f, "s")
    }
}

/// A duration in seconds, the unit every timeline event is expressed in.
pub type Seconds<T = f64> = Duration<Second, T>;

pub const fn seconds<T>(value: T) -> Duration<Second, T> {
    Duration {
        value,
        unit: Second,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        let duration: Seconds = 2e-6.into();
        assert_eq!(duration.value(), 2e-6);
        assert_eq!(f64::from(seconds(50e-6)), 50e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", seconds(1e-6)), "1e-6 s");
        assert_eq!(format!("{}", seconds(20e-9) + seconds(2e-6)), "2.02e-6 s");
    }

    #[test]
    fn test_accumulate() {
        let mut t = seconds(0.0);
        t += seconds(20e-9);
        t += seconds(2e-6);
        assert_eq!(t, seconds(20e-9 + 2e-6));
        let total: Seconds = [seconds(1.0), seconds(2.0)].into_iter().sum();
        assert_eq!(total, seconds(3.0));
    }

    #[test]
    fn test_ordering() {
        assert!(seconds(1e-9) < seconds(2e-9));
        assert_eq!(seconds(0.0), seconds(-0.0));
        let mut c = vec![seconds(2e-6), seconds(1e-6)];
        c.sort();
        assert_eq!(c, vec![seconds(1e-6), seconds(2e-6)]);
    }
}
