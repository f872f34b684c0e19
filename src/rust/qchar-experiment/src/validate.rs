// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::{Error, Result};

pub(crate) fn positive(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::parameter(name, format!("must be positive, got {value}")));
    }
    Ok(())
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::parameter(
            name,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(())
}

pub(crate) fn at_least_one(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::parameter(name, "must be at least 1"));
    }
    Ok(())
}

/// Output amplitudes are relative to full scale.
pub(crate) fn amplitude(name: &'static str, value: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&value) {
        return Err(Error::parameter(
            name,
            format!("must be within [-1, 1] of full scale, got {value}"),
        ));
    }
    Ok(())
}

pub(crate) fn distinct_ports(name: &'static str, port: u16, other: u16) -> Result<()> {
    if port == other {
        return Err(Error::parameter(
            name,
            format!("port {port} is already used by another tone"),
        ));
    }
    Ok(())
}
