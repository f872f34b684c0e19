// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use qchar_units::{Seconds, seconds};
use serde::Serialize;

use crate::lut::LookupTables;
use crate::timeline::{EventKind, Port, Timeline};
use crate::{Error, Result};

/// Everything an instrument needs to execute one sweep.
///
/// The timeline describes a single period; the instrument repeats it
/// `repeat_count` times and averages the whole run `num_averages` times.
#[derive(Debug, Clone, Serialize)]
pub struct SequenceProgram {
    lookup_tables: LookupTables,
    timeline: Timeline,
    period: f64,
    repeat_count: usize,
    num_averages: usize,
}

impl SequenceProgram {
    pub fn new(
        lookup_tables: LookupTables,
        timeline: Timeline,
        period: Seconds,
        repeat_count: usize,
        num_averages: usize,
    ) -> Result<Self> {
        if repeat_count == 0 || num_averages == 0 {
            return Err(Error::configuration(format!(
                "Repeat count ({repeat_count}) and number of averages ({num_averages}) must be at least one."
            )));
        }
        let end = timeline.end_time();
        if !period.value().is_finite() || period < end || period.value() <= 0.0 {
            return Err(Error::configuration(format!(
                "Period {period} does not cover the last event, which ends at {end}."
            )));
        }
        for event in timeline.events() {
            let Port::Output(port) = event.port else {
                continue;
            };
            match event.kind {
                EventKind::FrequencyAdvance if !lookup_tables.has_frequency_table(port) => {
                    return Err(Error::sequencing(
                        event.port,
                        "frequency advance without a frequency table",
                    ));
                }
                EventKind::PulseOutput(pulse) => {
                    let Some(template) = timeline.pulse(pulse) else {
                        return Err(Error::sequencing(event.port, "unknown pulse"));
                    };
                    if lookup_tables
                        .frequency_for(port, template.group)
                        .is_none()
                        || lookup_tables.scale_for(port, template.group).is_none()
                    {
                        return Err(Error::sequencing(
                            event.port,
                            format!(
                                "pulse uses group {} which has no frequency and scale table",
                                template.group
                            ),
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(SequenceProgram {
            lookup_tables,
            timeline,
            period: period.value(),
            repeat_count,
            num_averages,
        })
    }

    pub fn lookup_tables(&self) -> &LookupTables {
        &self.lookup_tables
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn period(&self) -> Seconds {
        seconds(self.period)
    }

    pub fn repeat_count(&self) -> usize {
        self.repeat_count
    }

    pub fn num_averages(&self) -> usize {
        self.num_averages
    }

    pub fn stores_per_period(&self) -> usize {
        self.timeline.store_count()
    }

    /// Number of captured traces per store port.
    pub fn total_stores(&self) -> usize {
        self.stores_per_period() * self.repeat_count
    }

    /// Wall-clock time of the run, ignoring instrument overhead.
    pub fn total_duration(&self) -> Seconds {
        self.period() * (self.repeat_count as f64) * (self.num_averages as f64)
    }
}
