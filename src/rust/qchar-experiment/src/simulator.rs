// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Simulated instrument for dry runs and tests.
//!
//! A dispersively coupled qubit-resonator pair is read out in notch
//! geometry. Pulsed runs walk the program period by period and synthesize
//! every capture, lock-in runs return the steady-state response of the
//! resonator. There is no noise, so averaging has no effect.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::{FRAC_PI_2, PI};

use anyhow::{Context, anyhow, bail};
use ndarray::Array3;
use num_complex::Complex64;
use qchar_log::debug;
use qchar_sequencer::{Envelope, EventKind, Port, PulseTemplate, SequenceProgram};
use qchar_units::Seconds;
use serde::{Deserialize, Serialize};

use crate::config::{DAC_CURRENT_RANGE, HardwareSettings};
use crate::instrument::{
    Capture, Hardware, Instrument, LockinInstrument, MixerConfig, PulsedInstrument,
};

/// Device parameters seen by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceModel {
    /// Resonator frequency with the qubit in the ground state, in Hz.
    pub resonator_freq: f64,
    /// Resonator shift when the qubit is excited, in Hz.
    pub dispersive_shift: f64,
    /// Resonator linewidth, in Hz.
    pub kappa: f64,
    /// Depth of the notch at resonance, between 0 and 1.
    pub coupling: f64,
    pub qubit_freq: f64,
    pub qubit_linewidth: f64,
    /// Control amplitude of a resonant pi pulse.
    pub pi_amplitude: f64,
    /// Round-trip delay between output and input, in seconds.
    pub cable_delay: f64,
}

impl Default for DeviceModel {
    fn default() -> Self {
        DeviceModel {
            resonator_freq: 6.0e9,
            dispersive_shift: -1.0e6,
            kappa: 1.0e6,
            coupling: 0.9,
            qubit_freq: 4.2e9,
            qubit_linewidth: 2.0e6,
            pi_amplitude: 0.5,
            cable_delay: 50e-9,
        }
    }
}

impl DeviceModel {
    fn notch(&self, frequency: f64, resonator_freq: f64) -> Complex64 {
        let detuning = 2.0 * (frequency - resonator_freq) / self.kappa;
        Complex64::new(1.0, 0.0) - self.coupling / Complex64::new(1.0, detuning)
    }

    /// Resonator transmission with the qubit excited with probability
    /// `excited`.
    pub fn transmission(&self, frequency: f64, excited: f64) -> Complex64 {
        let ground = self.notch(frequency, self.resonator_freq);
        let shifted = self.notch(frequency, self.resonator_freq + self.dispersive_shift);
        ground * (1.0 - excited) + shifted * excited
    }

    /// Excited state population after a control pulse.
    pub fn excitation(&self, frequency: f64, amplitude: f64) -> f64 {
        if self.pi_amplitude <= 0.0 {
            return 0.0;
        }
        let half_width = self.qubit_linewidth / 2.0;
        let detuning = frequency - self.qubit_freq;
        let line = half_width.powi(2) / (detuning.powi(2) + half_width.powi(2));
        (FRAC_PI_2 * amplitude / self.pi_amplitude).sin().powi(2) * line
    }

    fn delay_phase(&self, frequency: f64) -> Complex64 {
        Complex64::cis(-2.0 * PI * frequency * self.cable_delay)
    }
}

/// Instrument call recorded by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AdcAttenuation { port: u16, attenuation_db: f64 },
    DacCurrent { port: u16, current: u32 },
    InvSinc { port: u16, order: u8 },
    Mixer(MixerConfig),
    Lmx { frequency: f64, power: i64, port: u16 },
    DcBias { bias: f64, port: u16 },
    Sleep(f64),
    Execute { repeat_count: usize, num_averages: usize },
    Tune(f64),
    SetDf(f64),
    ConfigureOutput { port: u16, amplitude: f64, dither: bool },
    ConfigureInput(u16),
    OutputAmplitude { port: u16, amplitude: f64 },
    ApplySettings,
    Pixels { port: u16, count: usize },
    Release,
}

/// A readout pulse as emitted during one period.
struct Emission<'a> {
    output_port: u16,
    start: f64,
    template: &'a PulseTemplate,
    rf: f64,
    intermediate: f64,
    phase: f64,
    reset: f64,
    amplitude: f64,
    excited: f64,
}

impl Emission<'_> {
    fn envelope_at(&self, offset: f64) -> Option<Complex64> {
        if offset < 0.0 || offset >= self.template.duration {
            return None;
        }
        match &self.template.envelope {
            Envelope::Square { .. } => Some(Complex64::new(1.0, 0.0)),
            Envelope::Template { samples } => {
                let index = (offset / self.template.duration * samples.len() as f64) as usize;
                samples.get(index.min(samples.len().saturating_sub(1))).copied()
            }
        }
    }
}

#[derive(Debug)]
pub struct Simulator {
    hardware: HardwareSettings,
    device: DeviceModel,
    calls: Vec<Call>,
    /// NCO frequency per output port.
    nco: BTreeMap<u16, f64>,
    /// Output ports looped back into each input port, with the input NCO.
    routes: BTreeMap<u16, (f64, Vec<u16>)>,
    df: f64,
    pending_amplitude: BTreeMap<u16, f64>,
    amplitude: BTreeMap<u16, f64>,
    releases: usize,
    fail_execute: Option<String>,
}

impl Simulator {
    pub fn new(hardware: &HardwareSettings, device: DeviceModel) -> Self {
        Simulator {
            hardware: hardware.clone(),
            device,
            calls: vec![],
            nco: BTreeMap::new(),
            routes: BTreeMap::new(),
            df: 0.0,
            pending_amplitude: BTreeMap::new(),
            amplitude: BTreeMap::new(),
            releases: 0,
            fail_execute: None,
        }
    }

    pub fn device(&self) -> &DeviceModel {
        &self.device
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn release_count(&self) -> usize {
        self.releases
    }

    pub fn is_released(&self) -> bool {
        self.releases > 0
    }

    /// Make the next pulsed execution fail with `message`.
    pub fn fail_next_execute(&mut self, message: impl Into<String>) {
        self.fail_execute = Some(message.into());
    }

    fn synthesize(&self, program: &SequenceProgram) -> anyhow::Result<Capture> {
        let tables = program.lookup_tables();
        let timeline = program.timeline();
        let store = timeline
            .store()
            .ok_or_else(|| anyhow!("program has no store settings"))?;
        let nr_samples = (store.duration * self.hardware.store_rate).round() as usize;
        let dt = 1.0 / self.hardware.store_rate;
        let t_array: Vec<f64> = (0..nr_samples).map(|k| k as f64 * dt).collect();
        let stores_per_period = program.stores_per_period();
        let mut store_array = Array3::<Complex64>::zeros((
            program.total_stores(),
            store.ports.len(),
            nr_samples,
        ));

        let mut events: Vec<_> = timeline.events().iter().collect();
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let readout_ports: Vec<u16> = store
            .ports
            .iter()
            .filter_map(|p| self.routes.get(p))
            .flat_map(|(_, outputs)| outputs.iter().copied())
            .collect();

        let mut lut_index: HashMap<u16, usize> = HashMap::new();
        for repeat in 0..program.repeat_count() {
            let mut resets: HashMap<u16, f64> = HashMap::new();
            let mut excited = 0.0;
            let mut emissions = vec![];
            let mut store_times = vec![];
            for event in &events {
                let Port::Output(port) = event.port else {
                    store_times.push(event.time);
                    continue;
                };
                match event.kind {
                    EventKind::PhaseReset => {
                        resets.insert(port, event.time);
                    }
                    EventKind::FrequencyAdvance => *lut_index.entry(port).or_default() += 1,
                    EventKind::StoreWindow => {}
                    EventKind::PulseOutput(pulse) => {
                        let template = timeline
                            .pulse(pulse)
                            .ok_or_else(|| anyhow!("unknown pulse #{}", pulse.index()))?;
                        let lut = tables
                            .frequency_for(port, template.group)
                            .ok_or_else(|| anyhow!("no frequency table on output {port}"))?;
                        let scale = tables
                            .scale_for(port, template.group)
                            .and_then(|s| s.scales.first())
                            .ok_or_else(|| anyhow!("no scale table on output {port}"))?;
                        let k = lut_index.get(&port).copied().unwrap_or(0) % lut.len();
                        let intermediate = lut.frequencies[k];
                        let rf = self.nco.get(&port).copied().unwrap_or(0.0) + intermediate;
                        let amplitude = template.amplitude * scale;
                        if readout_ports.contains(&port) {
                            emissions.push(Emission {
                                output_port: port,
                                start: event.time,
                                template,
                                rf,
                                intermediate,
                                phase: lut.phases[k],
                                reset: resets.get(&port).copied().unwrap_or(0.0),
                                amplitude,
                                excited,
                            });
                            excited = 0.0;
                        } else {
                            excited = self.device.excitation(rf, amplitude);
                        }
                    }
                }
            }

            for (slot, &store_time) in store_times.iter().enumerate() {
                let capture = repeat * stores_per_period + slot;
                for (column, store_port) in store.ports.iter().enumerate() {
                    let Some((_, outputs)) = self.routes.get(store_port) else {
                        continue;
                    };
                    for emission in emissions.iter().filter(|e| outputs.contains(&e.output_port)) {
                        let tone = emission.amplitude
                            * self.device.transmission(emission.rf, emission.excited)
                            * self.device.delay_phase(emission.rf);
                        for (k, &t) in t_array.iter().enumerate() {
                            let t = store_time + t;
                            let Some(envelope) =
                                emission.envelope_at(t - self.device.cable_delay - emission.start)
                            else {
                                continue;
                            };
                            let carrier = Complex64::cis(
                                2.0 * PI * emission.intermediate * (t - emission.reset)
                                    + emission.phase,
                            );
                            store_array[[capture, column, k]] += (tone * envelope * carrier).conj();
                        }
                    }
                }
            }
        }
        Ok(Capture {
            t_array,
            store_array,
        })
    }
}

impl Hardware for Simulator {
    fn set_adc_attenuation(&mut self, port: u16, attenuation_db: f64) -> anyhow::Result<()> {
        self.calls.push(Call::AdcAttenuation {
            port,
            attenuation_db,
        });
        Ok(())
    }

    fn set_dac_current(&mut self, port: u16, current: u32) -> anyhow::Result<()> {
        if !DAC_CURRENT_RANGE.contains(&current) {
            bail!("DAC current {current} µA on output {port} is out of range");
        }
        self.calls.push(Call::DacCurrent { port, current });
        Ok(())
    }

    fn set_inv_sinc(&mut self, port: u16, order: u8) -> anyhow::Result<()> {
        self.calls.push(Call::InvSinc { port, order });
        Ok(())
    }

    fn configure_mixer(&mut self, config: &MixerConfig) -> anyhow::Result<()> {
        for &port in &config.out_ports {
            self.nco.insert(port, config.frequency);
        }
        for &port in &config.in_ports {
            self.routes
                .insert(port, (config.frequency, config.out_ports.clone()));
        }
        self.calls.push(Call::Mixer(config.clone()));
        Ok(())
    }

    fn set_lmx(&mut self, frequency: f64, power: i64, port: u16) -> anyhow::Result<()> {
        self.calls.push(Call::Lmx {
            frequency,
            power,
            port,
        });
        Ok(())
    }

    fn set_dc_bias(&mut self, bias: f64, port: u16) -> anyhow::Result<()> {
        self.calls.push(Call::DcBias { bias, port });
        Ok(())
    }

    fn sleep(&mut self, duration: Seconds) -> anyhow::Result<()> {
        self.calls.push(Call::Sleep(duration.value()));
        Ok(())
    }
}

impl Instrument for Simulator {
    fn release(&mut self) -> anyhow::Result<()> {
        self.amplitude.clear();
        self.pending_amplitude.clear();
        self.releases += 1;
        self.calls.push(Call::Release);
        debug!("Simulator released");
        Ok(())
    }
}

impl PulsedInstrument for Simulator {
    fn dac_sample_rate(&self, port: u16) -> anyhow::Result<f64> {
        Ok(self.hardware.dac_sample_rate(port)?)
    }

    fn clock_rate(&self) -> f64 {
        self.hardware.clock_rate
    }

    fn execute(&mut self, program: &SequenceProgram) -> anyhow::Result<Capture> {
        self.calls.push(Call::Execute {
            repeat_count: program.repeat_count(),
            num_averages: program.num_averages(),
        });
        if let Some(message) = self.fail_execute.take() {
            bail!(message);
        }
        self.synthesize(program)
            .context("Simulated execution failed")
    }
}

impl LockinInstrument for Simulator {
    fn tune(&mut self, df: f64) -> anyhow::Result<f64> {
        if !df.is_finite() || df <= 0.0 {
            bail!("cannot tune to a pixel bandwidth of {df} Hz");
        }
        let fs = self.hardware.adc_sample_rate();
        let tuned = fs / (fs / df).round().max(1.0);
        self.calls.push(Call::Tune(tuned));
        Ok(tuned)
    }

    fn set_df(&mut self, df: f64) -> anyhow::Result<()> {
        self.df = df;
        self.calls.push(Call::SetDf(df));
        Ok(())
    }

    fn configure_output(&mut self, port: u16, amplitude: f64, dither: bool) -> anyhow::Result<()> {
        self.pending_amplitude.insert(port, amplitude);
        self.calls.push(Call::ConfigureOutput {
            port,
            amplitude,
            dither,
        });
        Ok(())
    }

    fn configure_input(&mut self, port: u16) -> anyhow::Result<()> {
        self.calls.push(Call::ConfigureInput(port));
        Ok(())
    }

    fn set_output_amplitude(&mut self, port: u16, amplitude: f64) -> anyhow::Result<()> {
        self.pending_amplitude.insert(port, amplitude);
        self.calls.push(Call::OutputAmplitude { port, amplitude });
        Ok(())
    }

    fn apply_settings(&mut self) -> anyhow::Result<()> {
        self.amplitude
            .extend(self.pending_amplitude.iter().map(|(&p, &a)| (p, a)));
        self.calls.push(Call::ApplySettings);
        Ok(())
    }

    fn get_pixels(&mut self, port: u16, count: usize) -> anyhow::Result<Vec<Complex64>> {
        if self.df <= 0.0 {
            bail!("pixel bandwidth not set");
        }
        let (frequency, outputs) = self
            .routes
            .get(&port)
            .ok_or_else(|| anyhow!("input {port} has no mixer configured"))?;
        let drive: f64 = outputs
            .iter()
            .filter_map(|p| self.amplitude.get(p))
            .sum();
        let pixel = drive
            * self.device.transmission(*frequency, 0.0)
            * self.device.delay_phase(*frequency);
        self.calls.push(Call::Pixels { port, count });
        Ok(vec![pixel; count])
    }
}
