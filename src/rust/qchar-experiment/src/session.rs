// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::ops::{Deref, DerefMut};

use qchar_log::{debug, warn};

use crate::instrument::Instrument;

/// Exclusive use of an instrument for one run.
///
/// The instrument is released when the session is closed or dropped, so an
/// early return or a failed step still mutes the outputs. Use
/// [`Session::close`] on the success path to see release failures.
pub struct Session<'a, I: Instrument> {
    instrument: Option<&'a mut I>,
}

impl<'a, I: Instrument> Session<'a, I> {
    pub fn open(instrument: &'a mut I) -> Self {
        debug!("Instrument session opened");
        Session {
            instrument: Some(instrument),
        }
    }

    /// Release the instrument, reporting failures to the caller.
    pub fn close(mut self) -> anyhow::Result<()> {
        match self.instrument.take() {
            Some(instrument) => instrument.release(),
            None => Ok(()),
        }
    }
}

impl<I: Instrument> Deref for Session<'_, I> {
    type Target = I;

    fn deref(&self) -> &Self::Target {
        match &self.instrument {
            Some(instrument) => instrument,
            None => unreachable!("instrument is only taken when the session is consumed"),
        }
    }
}

impl<I: Instrument> DerefMut for Session<'_, I> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.instrument {
            Some(instrument) => instrument,
            None => unreachable!("instrument is only taken when the session is consumed"),
        }
    }
}

impl<I: Instrument> Drop for Session<'_, I> {
    fn drop(&mut self) {
        if let Some(instrument) = self.instrument.take()
            && let Err(err) = instrument.release()
        {
            warn!("Failed to release instrument: {:#}", err);
        }
    }
}
