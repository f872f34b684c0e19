// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use ndarray::{Array1, ArrayView1, Zip};
use num_complex::Complex64;
use serde::Serialize;

use crate::scale::to_db;
use crate::{Error, Result};

/// Amplitude and phase of a continuous-wave resonator sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockinSummary {
    pub amplitude_db: Array1<f64>,
    pub phase: Array1<f64>,
    /// Frequency of the deepest point of the response.
    pub f_min: f64,
}

impl LockinSummary {
    pub fn new(frequencies: &[f64], response: ArrayView1<'_, Complex64>) -> Result<Self> {
        if frequencies.is_empty() || frequencies.len() != response.len() {
            return Err(Error::shape(format!(
                "{} frequencies for {} response points",
                frequencies.len(),
                response.len()
            )));
        }
        let amplitude_db = response.mapv(|r| to_db(r.norm()));
        let phase = response.mapv(|r| r.arg());
        let (index, _) = amplitude_db
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(bi, bv), (i, &v)| {
                if v < bv { (i, v) } else { (bi, bv) }
            });
        Ok(LockinSummary {
            amplitude_db,
            phase,
            f_min: frequencies[index],
        })
    }
}

/// Amplifier gain in dB, per point: the pumped response relative to the
/// unpumped reference taken at the same frequencies.
pub fn gain_db(
    reference: ArrayView1<'_, Complex64>,
    pumped: ArrayView1<'_, Complex64>,
) -> Result<Array1<f64>> {
    if reference.len() != pumped.len() {
        return Err(Error::shape(format!(
            "{} reference points for {} pumped points",
            reference.len(),
            pumped.len()
        )));
    }
    Ok(Zip::from(&pumped)
        .and(&reference)
        .map_collect(|p, r| to_db(p.norm()) - to_db(r.norm())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_minimum() {
        let response = array![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.01),
            Complex64::new(0.0, -0.5)
        ];
        let summary = LockinSummary::new(&[1e9, 2e9, 3e9], response.view()).unwrap();
        assert_eq!(summary.f_min, 2e9);
        assert_eq!(summary.amplitude_db[0], 0.0);
        assert!((summary.phase[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert!(LockinSummary::new(&[1e9], response.view()).is_err());
    }

    #[test]
    fn test_gain_against_unpumped_reference() {
        let reference = array![Complex64::new(0.01, 0.0), Complex64::new(0.0, -0.02)];
        let pumped = array![Complex64::new(0.0, 0.1), Complex64::new(0.02, 0.0)];
        let gain = gain_db(reference.view(), pumped.view()).unwrap();
        assert!((gain[0] - 20.0).abs() < 1e-12);
        assert!(gain[1].abs() < 1e-12);
        assert!(gain_db(reference.view(), pumped.slice(ndarray::s![..1])).is_err());
    }
}
