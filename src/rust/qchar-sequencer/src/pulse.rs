// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::PI;

use num_complex::Complex64;
use qchar_units::{Seconds, seconds};
use serde::Serialize;

use crate::{Error, Result};

/// Handle of a pulse template registered on a [`crate::Timeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PulseRef(pub(crate) usize);

impl PulseRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Envelope {
    /// Flat-top drive of arbitrary length, generated on the instrument.
    Square {
        rise_time: f64,
        fall_time: f64,
    },
    /// Sampled envelope. The real part drives I, the imaginary part carries
    /// the DRAG quadrature correction.
    Template { samples: Vec<Complex64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseTemplate {
    pub output_port: u16,
    pub group: u8,
    pub duration: f64,
    pub amplitude: f64,
    pub envelope: Envelope,
}

impl PulseTemplate {
    /// Square pulse with instantaneous edges.
    pub fn long_drive(output_port: u16, group: u8, duration: Seconds, amplitude: f64) -> Self {
        PulseTemplate {
            output_port,
            group,
            duration: duration.value(),
            amplitude,
            envelope: Envelope::Square {
                rise_time: 0.0,
                fall_time: 0.0,
            },
        }
    }

    /// Sine-squared pulse sampled at the DAC rate of the output.
    ///
    /// The template length is `round(duration * sample_rate)` samples, so the
    /// realized duration can differ from `duration` by half a sample.
    pub fn sin2(
        output_port: u16,
        group: u8,
        duration: Seconds,
        sample_rate: f64,
        drag: f64,
    ) -> Result<Self> {
        let nr_samples = (duration.value() * sample_rate).round();
        if nr_samples.is_nan() || nr_samples < 1.0 {
            return Err(Error::configuration(format!(
                "Pulse of {duration} is shorter than one sample at {sample_rate} Sa/s."
            )));
        }
        let nr_samples = nr_samples as usize;
        Ok(PulseTemplate {
            output_port,
            group,
            duration: nr_samples as f64 / sample_rate,
            amplitude: 1.0,
            envelope: Envelope::Template {
                samples: sin2_envelope(nr_samples, drag),
            },
        })
    }

    pub fn duration(&self) -> Seconds {
        seconds(self.duration)
    }
}

/// Sine-squared envelope of `nr_samples` samples.
///
/// Sample `k` is `sin²(πk/n)`; with a nonzero `drag` the imaginary part holds
/// `drag` times the derivative with respect to the normalized time `k/n`.
pub fn sin2_envelope(nr_samples: usize, drag: f64) -> Vec<Complex64> {
    let n = nr_samples as f64;
    (0..nr_samples)
        .map(|k| {
            let x = k as f64 / n;
            let envelope = (PI * x).sin().powi(2);
            let derivative = PI * (2.0 * PI * x).sin();
            Complex64::new(envelope, drag * derivative)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sin2_shape() {
        let env = sin2_envelope(4, 0.0);
        assert_eq!(env.len(), 4);
        assert_eq!(env[0], Complex64::new(0.0, 0.0));
        assert!((env[2].re - 1.0).abs() < 1e-15);
        assert!(env.iter().all(|s| s.im == 0.0));
    }

    #[test]
    fn test_sin2_drag_quadrature() {
        let env = sin2_envelope(8, 0.5);
        // Derivative vanishes at the peak and is antisymmetric around it.
        assert!(env[4].im.abs() < 1e-12);
        assert!((env[2].im + env[6].im).abs() < 1e-12);
        assert!(env[2].im > 0.0);
    }

    #[test]
    fn test_sin2_template_length() {
        let pulse = PulseTemplate::sin2(2, 0, seconds(20e-9), 6e9, 0.0).unwrap();
        match &pulse.envelope {
            Envelope::Template { samples } => assert_eq!(samples.len(), 120),
            _ => panic!("expected a sampled template"),
        }
        assert!((pulse.duration().value() - 20e-9).abs() < 1e-18);
        assert!(PulseTemplate::sin2(2, 0, seconds(0.01e-9), 6e9, 0.0).is_err());
    }

    #[test]
    fn test_long_drive() {
        let pulse = PulseTemplate::long_drive(1, 0, seconds(2e-6), 1.0);
        assert_eq!(pulse.duration(), seconds(2e-6));
        assert!(matches!(pulse.envelope, Envelope::Square { .. }));
    }
}
