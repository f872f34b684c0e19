// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Persistence of experiment parameters and captured arrays.
//!
//! Every experiment is stored as one [`Record`]: scalar attributes for its
//! parameters and named datasets for its arrays. Loading a saved record gives
//! back bit-identical floats and arrays.

pub mod error;
pub mod file;
pub mod record;

use std::path::{Path, PathBuf};

pub use crate::error::{Error, Result};
pub use crate::file::{default_file_name, load_record, save_record, save_record_in};
pub use crate::record::{Attribute, Dataset, Record};

/// Conversion between an experiment and its persisted record.
pub trait Persist: Sized {
    /// Record kind, also the stem of default file names.
    const KIND: &'static str;

    fn to_record(&self) -> Result<Record>;

    fn from_record(record: &Record) -> Result<Self>;

    fn save(&self, path: &Path) -> Result<()> {
        save_record(&self.to_record()?, path)
    }

    /// Save under a timestamped name in `directory`.
    fn save_in(&self, directory: &Path) -> Result<PathBuf> {
        save_record_in(&self.to_record()?, directory)
    }

    fn load(path: &Path) -> Result<Self> {
        let record = load_record(path)?;
        record.expect_kind(Self::KIND)?;
        Self::from_record(&record)
    }
}
