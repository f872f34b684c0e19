// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use qchar_log::debug;

use crate::record::Record;
use crate::{Error, Result};

pub const FILE_EXTENSION: &str = "json";

/// `<kind>_<YYYYMMDD_HHMMSS>.json`, the name a run is saved under unless the
/// caller picks one.
pub fn default_file_name(kind: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{kind}_{}.{FILE_EXTENSION}",
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `record` to `path`, replacing any existing file.
///
/// Floats are written with enough digits to read back bit-identical.
pub fn save_record(record: &Record, path: &Path) -> Result<()> {
    record.check_finite()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let file = fs::File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, record)?;
    writer.flush().map_err(io_error(path))?;
    debug!("Saved '{}' record to {}", record.kind(), path.display());
    Ok(())
}

/// Save under [`default_file_name`] inside `directory`, returning the path.
pub fn save_record_in(record: &Record, directory: &Path) -> Result<PathBuf> {
    let path = directory.join(default_file_name(record.kind(), Local::now()));
    save_record(record, &path)?;
    Ok(path)
}

pub fn load_record(path: &Path) -> Result<Record> {
    let file = fs::File::open(path).map_err(io_error(path))?;
    let record: Record = serde_json::from_reader(BufReader::new(file))?;
    debug!("Loaded '{}' record from {}", record.kind(), path.display());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_file_name() {
        let timestamp = Local.with_ymd_and_hms(2021, 3, 4, 9, 6, 31).unwrap();
        assert_eq!(
            default_file_name("two_tone_pulsed", timestamp),
            "two_tone_pulsed_20210304_090631.json"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_record(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("sweep.json");
        save_record(&Record::new("sweep"), &path).unwrap();
        assert_eq!(load_record(&path).unwrap().kind(), "sweep");
    }

    #[test]
    fn test_save_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_record_in(&Record::new("excited_sweep"), dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("excited_sweep_"));
        assert!(name.ends_with(".json"));
    }
}
