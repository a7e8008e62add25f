use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sonde_core::MARKERS_DIR;
use sonde_core::hardware::probe::I2cToolsProbe;
use sonde_core::hardware::validate::run_validation;
use sonde_core::markers::store::MarkerStore;
use sonde_core::report::{model::ToolInfo, render, sink::ConsoleSink};
use sonde_core::rules::catalog::Catalog;

mod args;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = args::Args::parse();

    match args.command {
        args::Command::Grade {
            root,
            format,
            out,
            commit,
        } => {
            let tool = ToolInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                commit,
            };

            let report = sonde_core::grade(&root, tool)?;

            let output = match format {
                args::OutputFormat::Json => serde_json::to_string_pretty(&report)?,
                args::OutputFormat::Text => render::render_text(&report),
            };

            match out {
                Some(path) => std::fs::write(path, &output)?,
                None => print!("{output}"),
            }

            std::process::exit(report.summary.exit_code);
        }

        args::Command::Validate {
            root,
            bus,
            no_color,
        } => {
            let catalog = Catalog::standard().context("check catalogue is invalid")?;
            let store = MarkerStore::new(root.join(MARKERS_DIR));
            let mut probe = I2cToolsProbe::new(bus);
            let mut sink = ConsoleSink::new(!no_color);

            let outcome = run_validation(&mut probe, &store, &root, &catalog, &mut sink)?;

            std::process::exit(outcome.exit_code);
        }
    }
}
