// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging macros for the experiment crates.
//!
//! All records go through the `log` facade with a `qchar::<module>` target, so
//! a single filter such as `RUST_LOG=qchar=info` selects every crate at once.

use std::sync::{atomic::AtomicBool, atomic::Ordering};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        qchar_log::_log::info!(target: concat!("qchar::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        qchar_log::_log::info!(target: concat!("qchar::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        qchar_log::_log::warn!(target: concat!("qchar::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        qchar_log::_log::warn!(target: concat!("qchar::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal, $($arg:tt)+) => {
        qchar_log::_log::debug!(target: concat!("qchar::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        qchar_log::_log::debug!(target: concat!("qchar::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at info level if diagnostics logging is enabled.
///
/// Diagnostics cover sequencing details (state transitions, every timing
/// adjustment) that are too chatty for a normal run.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if qchar_log::is_diagnostics_enabled() {
            qchar_log::_log::info!(target: concat!("qchar::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if qchar_log::is_diagnostics_enabled() {
            qchar_log::_log::info!(target: concat!("qchar::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Initialize the logging.
///
/// Meant to be called once at program start. The concrete logger is installed
/// by the binary (the CLI uses `env_logger`); library users bring their own.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}
