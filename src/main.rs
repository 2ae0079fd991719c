use anyhow::{Context, Result};

use nvml_exporter::cli::build_cli;
use nvml_exporter::commands;
use nvml_exporter::core::config::ExporterConfig;

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    if matches.get_flag("version") {
        println!("nvml-exporter version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    nvml_exporter::init_logging();

    let config = ExporterConfig::from_matches(&matches).context("Invalid configuration")?;

    commands::serve(config)
}
