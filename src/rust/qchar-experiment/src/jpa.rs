// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::ops::{Deref, DerefMut};

use qchar_log::{info, warn};
use qchar_units::seconds;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::instrument::Hardware;

/// Settle time after switching the pump and bias on.
const SETTLE_TIME: f64 = 1.0;

/// Operating point of a Josephson parametric amplifier on the readout line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JpaParams {
    pub pump_freq: f64,
    pub pump_pwr: i64,
    pub pump_port: u16,
    pub bias: f64,
    pub bias_port: u16,
}

impl JpaParams {
    pub fn switch_on(&self, hardware: &mut impl Hardware) -> Result<()> {
        info!(
            "Pumping amplifier at {} Hz, power {}, bias {} on port {}",
            self.pump_freq,
            self.pump_pwr,
            self.bias,
            self.bias_port
        );
        hardware.set_lmx(self.pump_freq, self.pump_pwr, self.pump_port)?;
        hardware.set_dc_bias(self.bias, self.bias_port)?;
        hardware.sleep(seconds(SETTLE_TIME))?;
        Ok(())
    }

    pub fn switch_off(&self, hardware: &mut impl Hardware) -> Result<()> {
        hardware.set_lmx(0.0, 0, self.pump_port)?;
        hardware.set_dc_bias(0.0, self.bias_port)?;
        Ok(())
    }
}

/// Amplifier operating point held for the duration of a capture.
///
/// The pump and bias are zeroed when the guard is finished or dropped, so a
/// failed capture does not leave the amplifier pumped. Without parameters
/// the guard only passes the hardware through.
pub struct Pump<'a, H: Hardware> {
    hardware: &'a mut H,
    params: Option<&'a JpaParams>,
}

impl<'a, H: Hardware> Pump<'a, H> {
    pub fn engage(params: Option<&'a JpaParams>, hardware: &'a mut H) -> Result<Self> {
        let mut pump = Pump { hardware, params };
        if let Some(params) = pump.params {
            params.switch_on(pump.hardware)?;
        }
        Ok(pump)
    }

    /// Switch the amplifier off, reporting failures to the caller.
    pub fn finish(mut self) -> Result<()> {
        match self.params.take() {
            Some(params) => params.switch_off(self.hardware),
            None => Ok(()),
        }
    }
}

impl<H: Hardware> Deref for Pump<'_, H> {
    type Target = H;

    fn deref(&self) -> &Self::Target {
        self.hardware
    }
}

impl<H: Hardware> DerefMut for Pump<'_, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.hardware
    }
}

impl<H: Hardware> Drop for Pump<'_, H> {
    fn drop(&mut self) {
        if let Some(params) = self.params.take()
            && let Err(err) = params.switch_off(self.hardware)
        {
            warn!("Failed to switch off the amplifier pump: {:#}", err);
        }
    }
}

/// Text form stored in experiment files; `null` when no amplifier is used.
pub(crate) fn to_text(params: Option<&JpaParams>) -> qchar_store::Result<String> {
    Ok(serde_json::to_string(&params)?)
}

pub(crate) fn from_text(text: &str) -> qchar_store::Result<Option<JpaParams>> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::MixerConfig;
    use qchar_units::Seconds;

    /// Records pump and bias settings; the bias source can be made to fail.
    #[derive(Default)]
    struct Bench {
        lmx: Vec<f64>,
        bias: Vec<f64>,
        fail_bias: bool,
    }

    impl Hardware for Bench {
        fn set_adc_attenuation(&mut self, _: u16, _: f64) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_dac_current(&mut self, _: u16, _: u32) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_inv_sinc(&mut self, _: u16, _: u8) -> anyhow::Result<()> {
            Ok(())
        }
        fn configure_mixer(&mut self, _: &MixerConfig) -> anyhow::Result<()> {
            Ok(())
        }
        fn set_lmx(&mut self, frequency: f64, _: i64, _: u16) -> anyhow::Result<()> {
            self.lmx.push(frequency);
            Ok(())
        }
        fn set_dc_bias(&mut self, bias: f64, _: u16) -> anyhow::Result<()> {
            anyhow::ensure!(!(self.fail_bias && bias != 0.0), "bias source not connected");
            self.bias.push(bias);
            Ok(())
        }
        fn sleep(&mut self, _: Seconds) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn params() -> JpaParams {
        JpaParams {
            pump_freq: 12.01e9,
            pump_pwr: 11,
            pump_port: 3,
            bias: 0.4321,
            bias_port: 1,
        }
    }

    #[test]
    fn test_pump_switched_off_when_dropped() {
        let params = params();
        let mut bench = Bench::default();
        {
            let mut pump = Pump::engage(Some(&params), &mut bench).unwrap();
            pump.sleep(seconds(1e-3)).unwrap();
        }
        assert_eq!(bench.lmx, vec![12.01e9, 0.0]);
        assert_eq!(bench.bias, vec![0.4321, 0.0]);
    }

    #[test]
    fn test_pump_finished_once() {
        let params = params();
        let mut bench = Bench::default();
        Pump::engage(Some(&params), &mut bench)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(bench.lmx, vec![12.01e9, 0.0]);
        Pump::engage(None, &mut bench).unwrap().finish().unwrap();
        assert_eq!(bench.lmx.len(), 2);
    }

    #[test]
    fn test_failed_switch_on_turns_pump_off() {
        let params = params();
        let mut bench = Bench {
            fail_bias: true,
            ..Default::default()
        };
        assert!(Pump::engage(Some(&params), &mut bench).is_err());
        assert_eq!(bench.lmx, vec![12.01e9, 0.0]);
        assert_eq!(bench.bias, vec![0.0]);
    }

    #[test]
    fn test_text_form() {
        let params = JpaParams {
            pump_freq: 12.01e9,
            pump_pwr: 11,
            pump_port: 3,
            bias: 0.4321,
            bias_port: 1,
        };
        let text = to_text(Some(&params)).unwrap();
        assert_eq!(from_text(&text).unwrap(), Some(params));
        assert_eq!(to_text(None).unwrap(), "null");
        assert_eq!(from_text("null").unwrap(), None);
        assert!(from_text("{'pump_freq': 1}").is_err());
    }
}
