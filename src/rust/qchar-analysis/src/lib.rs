// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Reduction of captured traces to per-frequency responses.

pub mod demod;
pub mod error;
pub mod fit;
pub mod lockin;
pub mod phase;
pub mod rotate;
pub mod scale;
pub mod settings;

pub use crate::demod::{Quadratures, demodulate, untwist, window_mean};
pub use crate::error::{Error, Result};
pub use crate::fit::{CurveFitter, FitParameters, Model, fit_or_warn};
pub use crate::lockin::{LockinSummary, gain_db};
pub use crate::phase::{LinearFit, PhaseCorrection, remove_phase_background, separation, unwrap};
pub use crate::rotate::rotate_opt;
pub use crate::scale::{SiScale, to_db};
pub use crate::settings::{AnalysisSettings, SanitizationChange, Window};
