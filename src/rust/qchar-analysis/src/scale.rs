// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Amplitude relative to full scale, in dB.
pub fn to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

/// Factor and SI prefix bringing a set of amplitudes to a readable range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiScale {
    pub factor: f64,
    pub prefix: &'static str,
}

impl SiScale {
    /// Pick the prefix for data whose largest absolute value is `max`.
    pub fn for_max(max: f64) -> Self {
        let (factor, prefix) = if max < 1e-6 {
            (1e9, "n")
        } else if max < 1e-3 {
            (1e6, "μ")
        } else if max < 1.0 {
            (1e3, "m")
        } else {
            (1.0, "")
        };
        SiScale { factor, prefix }
    }

    pub fn for_data<'a>(data: impl IntoIterator<Item = &'a f64>) -> Self {
        Self::for_max(data.into_iter().fold(0.0, |m: f64, x| m.max(x.abs())))
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db() {
        assert_eq!(to_db(1.0), 0.0);
        assert!((to_db(0.1) + 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(SiScale::for_max(5e-7).prefix, "n");
        assert_eq!(SiScale::for_max(5e-4).prefix, "μ");
        assert_eq!(SiScale::for_max(0.5).prefix, "m");
        assert_eq!(SiScale::for_max(1.0).prefix, "");
        let scale = SiScale::for_data(&[1e-5, -2e-4]);
        assert_eq!(scale.factor, 1e6);
        assert!((scale.apply(-2e-4) + 200.0).abs() < 1e-9);
    }
}
