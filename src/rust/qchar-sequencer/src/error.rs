// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use crate::timeline::Port;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Requested sweep or timing parameters cannot be realized.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Events were recorded in an order the hardware cannot execute.
    #[error("Sequencing error on {port}: {message}")]
    Sequencing { port: Port, message: String },

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

    pub fn configuration<T: Display>(msg: T) -> Self {
        Error::Configuration(msg.to_string())
    }

    pub fn sequencing<T: Display>(port: Port, msg: T) -> Self {
        Error::Sequencing {
            port,
            message: msg.to_string(),
        }
    }
}
