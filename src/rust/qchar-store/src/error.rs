// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing attribute '{0}'")]
    MissingAttribute(String),

    #[error("Missing dataset '{0}'")]
    MissingDataset(String),

    #[error("Attribute or dataset '{name}' holds {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Record holds a '{found}' experiment, expected '{expected}'")]
    KindMismatch { expected: String, found: String },

    /// JSON has no representation for NaN and infinities.
    #[error("'{0}' contains a non-finite value and cannot be stored")]
    NonFinite(String),

    #[error("Failed to access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record")]
    Format(#[from] serde_json::Error),

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
}
