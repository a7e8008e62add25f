use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "sonde",
    version,
    about = "Split-trust grading for the I2C sensor exercise"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the hardware-less checks: source structure plus marker gates
    Grade {
        /// Root of the submission tree
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Optional git commit hash for tool metadata
        #[arg(long)]
        commit: Option<String>,
    },

    /// Run on the device with the sensors attached; writes attestation markers
    Validate {
        /// Root of the submission tree
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// I2C bus number
        #[arg(long, default_value_t = 1)]
        bus: u8,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
