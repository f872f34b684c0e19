// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Phase background removal for two-branch sweeps.
//!
//! Cables and electronics add a phase that grows linearly with frequency and
//! is the same for both qubit states. Fitting it on the edges of the sweep,
//! away from the resonance, and subtracting it leaves the state-dependent
//! part of the phase.

use std::f64::consts::{PI, TAU};

use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use num_complex::Complex64;

use crate::{Error, Result};

/// Remove 2π jumps between consecutive samples.
pub fn unwrap(phase: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut unwrapped = phase.to_owned();
    let mut correction = 0.0;
    for k in 1..phase.len() {
        let step = phase[k] - phase[k - 1];
        let mut wrapped = (step + PI).rem_euclid(TAU) - PI;
        if wrapped == -PI && step > 0.0 {
            wrapped = PI;
        }
        if step.abs() >= PI {
            correction += wrapped - step;
        }
        unwrapped[k] += correction;
    }
    unwrapped
}

/// First-order polynomial `slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Least-squares fit through the selected points.
    ///
    /// A single point, or points sharing one abscissa, give a flat line
    /// through their mean.
    pub fn fit<'a>(points: impl Iterator<Item = (&'a f64, &'a f64)> + Clone) -> Result<Self> {
        let n = points.clone().count();
        if n == 0 {
            return Err(Error::shape("no points to fit"));
        }
        let n = n as f64;
        let (sx, sy) = points
            .clone()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let (x_mean, y_mean) = (sx / n, sy / n);
        let (sxx, sxy) = points.fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - x_mean;
            (sxx + dx * dx, sxy + dx * (y - y_mean))
        });
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Ok(LinearFit {
            slope,
            intercept: y_mean - slope * x_mean,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    pub fn average(&self, other: &LinearFit) -> LinearFit {
        LinearFit {
            slope: 0.5 * (self.slope + other.slope),
            intercept: 0.5 * (self.intercept + other.intercept),
        }
    }
}

/// Points used for the background fit: the first and last `count / 4`, or
/// every point if that is zero.
pub fn edge_mask(count: usize) -> Vec<bool> {
    let edge = count / 4;
    if edge == 0 {
        return vec![true; count];
    }
    (0..count)
        .map(|k| k < edge || k >= count - edge)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCorrection {
    /// Unwrapped phase with the background removed, `[branch, point]`.
    pub phase: Array2<f64>,
    pub background: Array1<f64>,
    pub fit: LinearFit,
}

impl PhaseCorrection {
    /// `response` with the background phase rotated out.
    pub fn apply(&self, response: ArrayView1<'_, Complex64>) -> Array1<Complex64> {
        Zip::from(&response)
            .and(&self.background)
            .map_collect(|&r, &b| r * Complex64::from_polar(1.0, -b))
    }
}

/// Fit and subtract the phase background shared by both branches.
///
/// `response` is indexed `[branch, point]` and must have exactly two branches.
pub fn remove_phase_background(
    frequencies: &[f64],
    response: &Array2<Complex64>,
) -> Result<PhaseCorrection> {
    let (branches, points) = response.dim();
    if branches != 2 || points != frequencies.len() {
        return Err(Error::shape(format!(
            "expected 2 branches of {} points, got {branches} x {points}",
            frequencies.len()
        )));
    }
    let mut phase = response.mapv(|r| r.arg());
    for mut row in phase.axis_iter_mut(Axis(0)) {
        let unwrapped = unwrap(row.view());
        row.assign(&unwrapped);
    }

    let mask = edge_mask(points);
    let fit_branch = |branch: usize| {
        let row = phase.row(branch);
        let selected = frequencies
            .iter()
            .zip(row.iter())
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(pair, _)| pair);
        LinearFit::fit(selected)
    };
    let fit = fit_branch(0)?.average(&fit_branch(1)?);
    let background = Array1::from_iter(frequencies.iter().map(|&f| fit.eval(f)));
    for mut row in phase.axis_iter_mut(Axis(0)) {
        row -= &background;
    }
    Ok(PhaseCorrection {
        phase,
        background,
        fit,
    })
}

/// Distance between the responses of the two branches, per point.
pub fn separation(response: &Array2<Complex64>) -> Result<Array1<f64>> {
    if response.nrows() != 2 {
        return Err(Error::shape(format!(
            "separation needs 2 branches, got {}",
            response.nrows()
        )));
    }
    Ok(Zip::from(response.row(1))
        .and(response.row(0))
        .map_collect(|&e, &g| (e - g).norm()))
}
