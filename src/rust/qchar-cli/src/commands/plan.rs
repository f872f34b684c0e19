// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use qchar_sequencer::FrequencyPlan;
use serde_json::json;

pub fn execute(center: f64, span: f64, count: usize, sample_rate: f64, json: bool) -> Result<()> {
    let plan = FrequencyPlan::new(center, span, count, sample_rate)
        .context("Cannot place the sweep in the upper sideband")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&plan))?);
        return Ok(());
    }
    println!("NCO (LO offset): {} Hz", plan.lo_offset());
    println!("{:>6}  {:>18}  {:>18}", "index", "IF [Hz]", "RF [Hz]");
    for (index, (intermediate, rf)) in plan
        .if_array()
        .iter()
        .zip(plan.rf_frequencies())
        .enumerate()
    {
        println!("{index:>6}  {intermediate:>18.3}  {rf:>18.3}");
    }
    Ok(())
}

fn to_json(plan: &FrequencyPlan) -> serde_json::Value {
    json!({
        "center": plan.center(),
        "span": plan.span(),
        "lo_offset": plan.lo_offset(),
        "if_array": plan.if_array(),
        "rf_frequencies": plan.rf_frequencies(),
    })
}
