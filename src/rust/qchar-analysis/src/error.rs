// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Input arrays do not have the layout the routine expects.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Invalid analysis settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }

    pub fn shape<T: Display>(msg: T) -> Self {
        Error::Shape(msg.to_string())
    }
}
