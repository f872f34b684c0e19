// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use crate::instrument::{Hardware, MixerConfig};

/// Front end of a pulsed two-tone measurement: full input range on the
/// sample port, the same DAC current on both outputs, no inverse-sinc filter.
/// The readout mixer also down-converts the sample port; both mixers are
/// applied together.
pub(crate) fn prepare_pulsed_ports(
    hardware: &mut impl Hardware,
    dac_current: u32,
    sample_port: u16,
    (readout_port, readout_nco): (u16, f64),
    (control_port, control_nco): (u16, f64),
) -> Result<()> {
    hardware.set_adc_attenuation(sample_port, 0.0)?;
    for port in [readout_port, control_port] {
        hardware.set_dac_current(port, dac_current)?;
        hardware.set_inv_sinc(port, 0)?;
    }
    hardware.configure_mixer(&MixerConfig {
        frequency: readout_nco,
        in_ports: vec![sample_port],
        out_ports: vec![readout_port],
        sync: false,
    })?;
    hardware.configure_mixer(&MixerConfig {
        frequency: control_nco,
        in_ports: vec![],
        out_ports: vec![control_port],
        sync: true,
    })?;
    Ok(())
}
