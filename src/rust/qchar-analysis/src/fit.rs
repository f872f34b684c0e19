// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Peak models and the seam to an external least-squares fitter.
//!
//! Fitting itself is left to a [`CurveFitter`] implementation. This module
//! provides the model functions and the initial guesses for the sweeps.

use qchar_log::warn;
use serde::Serialize;

use crate::{Error, Result};

pub fn gaussian(x: f64, x0: f64, s: f64, a: f64, o: f64) -> f64 {
    a * (-0.5 * ((x - x0) / s).powi(2)).exp() + o
}

pub fn lorentzian(x: f64, x0: f64, gamma: f64, a: f64, o: f64) -> f64 {
    let half_width = (gamma / 2.0).powi(2);
    a * half_width / ((x - x0).powi(2) + half_width) + o
}

/// Peak shape with parameters `[x0, width, amplitude, offset]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Model {
    Gaussian,
    Lorentzian,
}

impl Model {
    pub fn eval(self, x: f64, p: &[f64; 4]) -> f64 {
        match self {
            Model::Gaussian => gaussian(x, p[0], p[1], p[2], p[3]),
            Model::Lorentzian => lorentzian(x, p[0], p[1], p[2], p[3]),
        }
    }

    pub fn parameter_names(self) -> [&'static str; 4] {
        match self {
            Model::Gaussian => ["x0", "sigma", "amplitude", "offset"],
            Model::Lorentzian => ["x0", "gamma", "amplitude", "offset"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitParameters {
    pub model: Model,
    pub values: [f64; 4],
}

impl FitParameters {
    pub fn center(&self) -> f64 {
        self.values[0]
    }

    /// Width parameter; the sign is irrelevant for both models.
    pub fn width(&self) -> f64 {
        self.values[1].abs()
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.model.eval(x, &self.values)
    }
}

/// Least-squares fitter of a [`Model`] to sampled data.
pub trait CurveFitter {
    fn fit(
        &self,
        model: Model,
        x: &[f64],
        y: &[f64],
        initial: [f64; 4],
    ) -> anyhow::Result<[f64; 4]>;
}

/// Run `fitter`; a failed fit is logged and reported as `None`.
pub fn fit_or_warn(
    fitter: &dyn CurveFitter,
    model: Model,
    x: &[f64],
    y: &[f64],
    initial: [f64; 4],
) -> Option<FitParameters> {
    match fitter.fit(model, x, y, initial) {
        Ok(values) => Some(FitParameters { model, values }),
        Err(err) => {
            warn!("{:?} fit failed: {:#}", model, err);
            None
        }
    }
}

/// Initial guess for a Gaussian on the state separation of a two-branch
/// sweep: peak at the largest separation, width from the readout length.
pub fn separation_guess(
    frequencies: &[f64],
    separation: &[f64],
    readout_duration: f64,
) -> Result<[f64; 4]> {
    let (peak, max) = frequencies
        .iter()
        .zip(separation)
        .fold(None, |best: Option<(f64, f64)>, (&f, &s)| match best {
            Some((_, m)) if m >= s => best,
            _ => Some((f, s)),
        })
        .ok_or_else(|| Error::shape("cannot guess a peak in empty data"))?;
    Ok([peak, 1.0 / readout_duration, max, 0.0])
}

/// Initial guess for a Gaussian on the rotated response of a spectroscopy
/// sweep centered at `center` with `span`.
pub fn spectroscopy_guess(center: f64, span: f64, data: &[f64]) -> Result<[f64; 4]> {
    if data.is_empty() {
        return Err(Error::shape("cannot guess a peak in empty data"));
    }
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok([center, span / 4.0, max - min, min])
}
