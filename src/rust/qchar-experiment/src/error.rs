// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use crate::state::RunState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sequencer(#[from] qchar_sequencer::Error),

    #[error(transparent)]
    Store(#[from] qchar_store::Error),

    #[error(transparent)]
    Analysis(#[from] qchar_analysis::Error),

    /// Experiment parameters that no instrument setting can satisfy.
    #[error("Invalid parameter '{name}': {message}")]
    Parameter { name: &'static str, message: String },

    #[error("Invalid hardware settings: {0}")]
    Hardware(String),

    #[error("Cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: RunState, to: RunState },

    /// Analysis or saving was requested before any data was captured.
    #[error("No measured data; run the experiment or load it from a file first")]
    NoData,

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

    pub fn parameter<T: Display>(name: &'static str, msg: T) -> Self {
        Error::Parameter {
            name,
            message: msg.to_string(),
        }
    }
}
