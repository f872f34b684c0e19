// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Digital down-conversion of captured traces.
//!
//! Captures arrive as `(repeats, store ports, samples)` complex arrays where
//! the real part holds the I channel and the imaginary part the Q channel of
//! the analog mixer. Each channel still carries the intermediate frequency and
//! is demodulated on its own; [`untwist`] then combines both into the
//! single-sideband responses.

use std::f64::consts::TAU;

use ndarray::{Array1, Array2, ArrayView3, Axis, Zip, s};
use num_complex::Complex64;

use crate::settings::Window;
use crate::{Error, Result};

/// Demodulated I and Q channels, indexed by `[branch, point]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadratures {
    pub i: Array2<Complex64>,
    pub q: Array2<Complex64>,
}

fn check_capture(
    t_array: &[f64],
    store: &ArrayView3<'_, Complex64>,
    store_port: usize,
    window: Window,
) -> Result<()> {
    let (_, ports, samples) = store.dim();
    if t_array.len() != samples {
        return Err(Error::shape(format!(
            "time axis has {} samples, captures have {samples}",
            t_array.len()
        )));
    }
    if store_port >= ports {
        return Err(Error::shape(format!(
            "store port index {store_port} out of range for {ports} captured ports"
        )));
    }
    if window.is_empty() || window.high > samples {
        return Err(Error::shape(format!(
            "window {}..{} does not fit in {samples} samples",
            window.low, window.high
        )));
    }
    Ok(())
}

/// Demodulate every capture at the intermediate frequency of its sweep point.
///
/// Captures are ordered point-major: capture `point * branches + branch`
/// belongs to `if_array[point]`. The reference time axis restarts at zero at
/// the window start.
pub fn demodulate(
    t_array: &[f64],
    store: ArrayView3<'_, Complex64>,
    store_port: usize,
    if_array: &[f64],
    branches: usize,
    window: Window,
) -> Result<Quadratures> {
    check_capture(t_array, &store, store_port, window)?;
    if branches == 0 || t_array.len() < 2 {
        return Err(Error::shape("need at least one branch and two samples"));
    }
    let points = if_array.len();
    if store.len_of(Axis(0)) != points * branches {
        return Err(Error::shape(format!(
            "{} captures for {points} points with {branches} branches",
            store.len_of(Axis(0))
        )));
    }

    let dt = t_array[1] - t_array[0];
    let nr_samples = window.len() as f64;
    let t = Array1::from_shape_fn(window.len(), |k| dt * k as f64);
    let mut i = Array2::zeros((branches, points));
    let mut q = Array2::zeros((branches, points));
    for (point, &frequency) in if_array.iter().enumerate() {
        let cos = t.mapv(|t| (TAU * frequency * t).cos());
        let sin = t.mapv(|t| (TAU * frequency * t).sin());
        for branch in 0..branches {
            let trace = store.slice(s![point * branches + branch, store_port, window.range()]);
            let (mut ic, mut is, mut qc, mut qs) = (0.0, 0.0, 0.0, 0.0);
            Zip::from(&trace)
                .and(&cos)
                .and(&sin)
                .for_each(|x, &c, &sn| {
                    ic += x.re * c;
                    is += x.re * sn;
                    qc += x.im * c;
                    qs += x.im * sn;
                });
            i[[branch, point]] = Complex64::new(ic / nr_samples, -is / nr_samples);
            q[[branch, point]] = Complex64::new(qc / nr_samples, -qs / nr_samples);
        }
    }
    Ok(Quadratures { i, q })
}

/// Separate the lower and upper sideband from demodulated I and Q channels.
///
/// Returns `(L, H)` with `L = (I + iQ) / 2` and `H = (I - iQ) / 2`; `H` is the
/// response of a tone placed in the upper sideband.
pub fn untwist(quadratures: &Quadratures) -> (Array2<Complex64>, Array2<Complex64>) {
    let j = Complex64::i();
    let low = Zip::from(&quadratures.i)
        .and(&quadratures.q)
        .map_collect(|&i, &q| (i + j * q) * 0.5);
    let high = Zip::from(&quadratures.i)
        .and(&quadratures.q)
        .map_collect(|&i, &q| (i - j * q) * 0.5);
    (low, high)
}

/// Average every capture over the window, one value per capture.
pub fn window_mean(
    t_array: &[f64],
    store: ArrayView3<'_, Complex64>,
    store_port: usize,
    window: Window,
) -> Result<Array1<Complex64>> {
    check_capture(t_array, &store, store_port, window)?;
    let nr_samples = window.len() as f64;
    Ok(store
        .slice(s![.., store_port, window.range()])
        .map_axis(Axis(1), |trace| trace.sum() / nr_samples))
}
