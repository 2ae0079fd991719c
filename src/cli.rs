use clap::{Arg, ArgAction, Command};

use crate::core::config::{DEFAULT_LISTEN_ADDRESS, DEFAULT_TELEMETRY_PATH};

/// Command-line definition. Flag names follow the Prometheus exporter convention.
pub fn build_cli() -> Command {
    Command::new("nvml-exporter")
        .about("Prometheus exporter for NVIDIA GPU telemetry (NVML)")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("listen-address")
                .long("web.listen-address")
                .value_name("ADDRESS")
                .help("Address to listen on")
                .default_value(DEFAULT_LISTEN_ADDRESS),
        )
        .arg(
            Arg::new("telemetry-path")
                .long("web.telemetry-path")
                .value_name("PATH")
                .help("Path under which to expose metrics")
                .default_value(DEFAULT_TELEMETRY_PATH),
        )
        .arg(
            Arg::new("failure-policy")
                .long("collector.failure-policy")
                .value_name("POLICY")
                .help("What a scrape does when a device query fails")
                .long_help(
                    "What a scrape does when a device query fails.\n\n\
                     abort        stop polling at the first failure (later devices report nothing)\n\
                     skip-device  keep polling the remaining devices\n\n\
                     nvml_up reports 0 in both cases.",
                )
                .value_parser(["abort", "skip-device"])
                .default_value("abort"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Serve readings from a built-in mock GPU instead of NVML")
                .action(ArgAction::SetTrue),
        )
}
