// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use ndarray::{Array1, ArrayView1};
use num_complex::Complex64;

/// Rotate `data` in the complex plane so that its variance lies along the
/// real axis.
///
/// Returns the rotated data and the angle it was rotated by (clockwise).
/// The principal axis is found in closed form from the covariance of the
/// real and imaginary parts.
pub fn rotate_opt(data: ArrayView1<'_, Complex64>) -> (Array1<Complex64>, f64) {
    if data.is_empty() {
        return (Array1::zeros(0), 0.0);
    }
    let n = data.len() as f64;
    let mean = data.sum() / n;
    let (sxx, syy, sxy) = data.iter().fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), z| {
        let d = z - mean;
        (sxx + d.re * d.re, syy + d.im * d.im, sxy + d.re * d.im)
    });
    let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let rotation = Complex64::from_polar(1.0, -angle);
    (data.mapv(|z| z * rotation), angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
        let n = values.clone().count() as f64;
        let mean = values.clone().sum::<f64>() / n;
        values.map(|v| (v - mean).powi(2)).sum::<f64>() / n
    }

    #[test]
    fn test_points_on_a_tilted_line() {
        let direction = Complex64::from_polar(1.0, 0.7);
        let data: Array1<Complex64> = (0..20)
            .map(|k| Complex64::new(0.3, -0.1) + direction * (k as f64 * 0.01))
            .collect();
        let (rotated, angle) = rotate_opt(data.view());
        assert!((angle - 0.7).abs() < 1e-9);
        assert!(variance(rotated.iter().map(|z| z.im)) < 1e-20);
    }

    #[test]
    fn test_rotation_maximizes_real_variance() {
        let data: Array1<Complex64> = (0..50)
            .map(|k| {
                let t = k as f64 * 0.37;
                Complex64::new(t.sin() * 0.2 + 0.05 * t.cos(), -0.5 * t.sin())
            })
            .collect();
        let (rotated, _) = rotate_opt(data.view());
        let best = variance(rotated.iter().map(|z| z.re));
        for step in 0..36 {
            let phi = step as f64 * std::f64::consts::PI / 36.0;
            let turn = Complex64::from_polar(1.0, phi);
            let other = variance(data.iter().map(|z| (z * turn).re));
            assert!(other <= best + 1e-12);
        }
    }

    #[test]
    fn test_empty() {
        let (rotated, angle) = rotate_opt(Array1::<Complex64>::zeros(0).view());
        assert!(rotated.is_empty());
        assert_eq!(angle, 0.0);
    }
}
