// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Append-only record of timed events within one repetition period.
//!
//! Output ports and the capture timeline are independent sequences that share
//! one clock. Every port must see its events in non-decreasing time, and two
//! pulses on one output must not overlap. Advancing time is up to the caller.

use std::collections::HashMap;
use std::fmt;

use qchar_units::{Seconds, seconds};
use serde::Serialize;

use crate::pulse::{PulseRef, PulseTemplate};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Port {
    Output(u16),
    /// The capture timeline shared by every store port.
    Sample,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Output(n) => write!(f, "output port {n}"),
            Port::Sample => write!(f, "sample timeline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    PhaseReset,
    PulseOutput(PulseRef),
    StoreWindow,
    FrequencyAdvance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub time: f64,
    pub port: Port,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn time(&self) -> Seconds {
        seconds(self.time)
    }
}

/// Input ports captured by store events, and the length of each capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSettings {
    pub ports: Vec<u16>,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    pulses: Vec<PulseTemplate>,
    store: Option<StoreSettings>,
    #[serde(skip)]
    latest: HashMap<Port, Seconds>,
    #[serde(skip)]
    busy_until: HashMap<u16, Seconds>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pulse(&mut self, template: PulseTemplate) -> PulseRef {
        self.pulses.push(template);
        PulseRef(self.pulses.len() - 1)
    }

    pub fn set_store(&mut self, ports: Vec<u16>, duration: Seconds) -> Result<()> {
        if ports.is_empty() {
            return Err(Error::configuration("At least one store port is required."));
        }
        if !duration.value().is_finite() || duration.value() <= 0.0 {
            return Err(Error::configuration(format!(
                "Store duration must be positive, got {duration}."
            )));
        }
        self.store = Some(StoreSettings {
            ports,
            duration: duration.value(),
        });
        Ok(())
    }

    pub fn append_phase_reset(&mut self, time: Seconds, port: u16) -> Result<()> {
        let port = Port::Output(port);
        self.claim(port, time)?;
        self.push(time, port, EventKind::PhaseReset);
        Ok(())
    }

    pub fn append_pulse(&mut self, time: Seconds, port: u16, pulse: PulseRef) -> Result<()> {
        let target = Port::Output(port);
        let template = self.pulses.get(pulse.0).ok_or_else(|| {
            Error::sequencing(target, format!("unknown pulse #{}", pulse.0))
        })?;
        if template.output_port != port {
            return Err(Error::sequencing(
                target,
                format!(
                    "pulse #{} was set up for output port {}",
                    pulse.0, template.output_port
                ),
            ));
        }
        let end = time + template.duration();
        if let Some(&busy) = self.busy_until.get(&port)
            && time < busy
        {
            return Err(Error::sequencing(
                target,
                format!("pulse at {time} starts before the previous pulse ends at {busy}"),
            ));
        }
        self.claim(target, time)?;
        self.busy_until.insert(port, end);
        self.push(time, target, EventKind::PulseOutput(pulse));
        Ok(())
    }

    pub fn append_store(&mut self, time: Seconds) -> Result<()> {
        if self.store.is_none() {
            return Err(Error::sequencing(
                Port::Sample,
                "store requested before any store port was configured",
            ));
        }
        self.claim(Port::Sample, time)?;
        self.push(time, Port::Sample, EventKind::StoreWindow);
        Ok(())
    }

    pub fn append_frequency_advance(&mut self, time: Seconds, port: u16) -> Result<()> {
        let port = Port::Output(port);
        self.claim(port, time)?;
        self.push(time, port, EventKind::FrequencyAdvance);
        Ok(())
    }

    /// Check the per-port ordering and record `time` as the port's latest.
    fn claim(&mut self, port: Port, time: Seconds) -> Result<()> {
        let value = time.value();
        if !value.is_finite() || value < 0.0 {
            return Err(Error::sequencing(
                port,
                format!("event time {time} is not a finite, non-negative offset"),
            ));
        }
        if let Some(&latest) = self.latest.get(&port)
            && time < latest
        {
            return Err(Error::sequencing(
                port,
                format!("event at {time} is earlier than the previous event at {latest}"),
            ));
        }
        self.latest.insert(port, time);
        Ok(())
    }

    fn push(&mut self, time: Seconds, port: Port, kind: EventKind) {
        self.events.push(TimelineEvent {
            time: time.value(),
            port,
            kind,
        });
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn events_on(&self, port: Port) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter().filter(move |e| e.port == port)
    }

    pub fn pulses(&self) -> &[PulseTemplate] {
        &self.pulses
    }

    pub fn pulse(&self, pulse: PulseRef) -> Option<&PulseTemplate> {
        self.pulses.get(pulse.0)
    }

    pub fn store(&self) -> Option<&StoreSettings> {
        self.store.as_ref()
    }

    pub fn store_count(&self) -> usize {
        self.events_on(Port::Sample).count()
    }

    pub fn last_time(&self, port: Port) -> Option<Seconds> {
        self.latest.get(&port).copied()
    }

    /// Latest instant touched by any event, including the end of pulses and
    /// store windows.
    pub fn end_time(&self) -> Seconds {
        let store_duration = self.store.as_ref().map_or(0.0, |s| s.duration);
        self.events
            .iter()
            .map(|e| match e.kind {
                EventKind::PulseOutput(p) => e.time + self.pulses[p.0].duration,
                EventKind::StoreWindow => e.time + store_duration,
                _ => e.time,
            })
            .fold(seconds(0.0), |acc, t| acc.max(seconds(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn readout_pulse(timeline: &mut Timeline, port: u16) -> PulseRef {
        timeline.register_pulse(PulseTemplate::long_drive(port, 0, seconds(2e-6), 1.0))
    }

    #[test]
    fn test_ports_are_independent() {
        let mut timeline = Timeline::new();
        timeline.append_phase_reset(seconds(5e-6), 1).unwrap();
        // Earlier time on another port is fine.
        timeline.append_phase_reset(seconds(1e-6), 2).unwrap();
        timeline.append_frequency_advance(seconds(5e-6), 1).unwrap();
        assert_eq!(timeline.events().len(), 3);
        assert_eq!(timeline.last_time(Port::Output(2)), Some(seconds(1e-6)));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut timeline = Timeline::new();
        timeline.append_phase_reset(seconds(5e-6), 1).unwrap();
        let err = timeline
            .append_frequency_advance(seconds(4e-6), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Sequencing {
                port: Port::Output(1),
                ..
            }
        ));
        assert_eq!(timeline.events().len(), 1);
    }

    #[test]
    fn test_store_requires_ports() {
        let mut timeline = Timeline::new();
        assert!(timeline.append_store(seconds(0.0)).is_err());
        timeline.set_store(vec![1], seconds(2.5e-6)).unwrap();
        timeline.append_store(seconds(0.2e-6)).unwrap();
        assert!(timeline.append_store(seconds(0.1e-6)).is_err());
        assert_eq!(timeline.store_count(), 1);
    }

    #[test]
    fn test_overlapping_pulses_rejected() {
        let mut timeline = Timeline::new();
        let pulse = readout_pulse(&mut timeline, 1);
        timeline.append_pulse(seconds(0.0), 1, pulse).unwrap();
        assert!(timeline.append_pulse(seconds(1e-6), 1, pulse).is_err());
        timeline.append_pulse(seconds(2e-6), 1, pulse).unwrap();
        assert_eq!(timeline.end_time(), seconds(4e-6));
    }

    #[test]
    fn test_pulse_port_mismatch() {
        let mut timeline = Timeline::new();
        let pulse = readout_pulse(&mut timeline, 1);
        assert!(timeline.append_pulse(seconds(0.0), 2, pulse).is_err());
        assert!(timeline.append_pulse(seconds(0.0), 1, PulseRef(7)).is_err());
    }

    #[test]
    fn test_negative_time_rejected() {
        let mut timeline = Timeline::new();
        assert!(timeline.append_phase_reset(seconds(-1e-9), 1).is_err());
        assert!(timeline.append_phase_reset(seconds(f64::NAN), 1).is_err());
    }

    proptest! {
        #[test]
        fn non_decreasing_appends_never_fail(
            steps in proptest::collection::vec((0u16..3, 0.0f64..1e-6, 0u8..3), 1..60)
        ) {
            let mut timeline = Timeline::new();
            timeline.set_store(vec![0], seconds(1e-9)).unwrap();
            let mut clock = [0.0f64; 4];
            for (port, delta, kind) in steps {
                let slot = port as usize;
                clock[slot] += delta;
                let t = seconds(clock[slot]);
                let result = match kind {
                    0 => timeline.append_phase_reset(t, port),
                    1 => timeline.append_frequency_advance(t, port),
                    _ => {
                        clock[3] += delta;
                        timeline.append_store(seconds(clock[3]))
                    }
                };
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn single_regression_fails(start in 1e-9f64..1e-3, back in 1e-12f64..1e-9) {
            let mut timeline = Timeline::new();
            timeline.append_phase_reset(seconds(start), 0).unwrap();
            let earlier = seconds(start - back);
            prop_assert!(earlier < seconds(start));
            let is_sequencing_error = matches!(
                timeline.append_frequency_advance(earlier, 0),
                Err(Error::Sequencing { .. })
            );
            prop_assert!(is_sequencing_error);
        }
    }
}
