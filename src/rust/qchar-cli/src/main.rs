// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! `qchar`: plan, sequence, simulate and analyze qubit characterization sweeps.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

mod commands;

use commands::{analyze, plan, sequence, simulate};

#[derive(Parser)]
#[command(name = "qchar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also log sequencing diagnostics (state transitions, period adjustments)
    #[arg(long, global = true)]
    diagnostics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a frequency sweep in the upper sideband of a DAC
    Plan {
        /// Center of the sweep, in Hz
        #[arg(long)]
        center: f64,

        /// Width of the sweep, in Hz
        #[arg(long)]
        span: f64,

        /// Number of frequencies
        #[arg(long)]
        count: usize,

        /// DAC sample rate, in Hz
        #[arg(long, default_value = "10e9")]
        sample_rate: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Build the pulse sequence of an experiment without running it
    Sequence {
        /// Experiment configuration (JSON)
        config: PathBuf,

        /// Write the full program as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run an experiment against the simulated instrument and save the result
    Simulate {
        /// Experiment configuration (JSON)
        config: PathBuf,

        /// Directory for the timestamped result file
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,

        /// Exact result file name, overriding --output-dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a saved experiment
    Analyze {
        /// Result file written by `simulate` or a measurement
        file: PathBuf,

        /// First sample of the analysis window
        #[arg(long)]
        idx_low: Option<usize>,

        /// End of the analysis window (exclusive)
        #[arg(long)]
        idx_high: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn init_logger(verbose: u8, diagnostics: bool) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Diagnostics are emitted at info level.
    let level = if diagnostics {
        level.max(LevelFilter::Info)
    } else {
        level
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    qchar_log::init_logging(diagnostics);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.diagnostics);

    match cli.command {
        Commands::Plan {
            center,
            span,
            count,
            sample_rate,
            json,
        } => plan::execute(center, span, count, sample_rate, json),
        Commands::Sequence { config, output } => sequence::execute(&config, output.as_deref()),
        Commands::Simulate {
            config,
            output_dir,
            output,
        } => simulate::execute(&config, &output_dir, output.as_deref()),
        Commands::Analyze {
            file,
            idx_low,
            idx_high,
            json,
        } => analyze::execute(&file, idx_low, idx_high, json),
    }
}
