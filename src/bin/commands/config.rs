use anyhow::Result;
use clap::Args;
use nginx_ipfilter::{IpfilterConfig, OutputFormat};

use super::print_stdout;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Print a commented configuration file template instead
    #[clap(long)]
    pub example: bool,
}

pub fn run(config: &IpfilterConfig, args: ConfigArgs, output_format: OutputFormat) -> Result<()> {
    let ConfigArgs { example } = args;

    if example {
        return print_stdout(IpfilterConfig::example_config());
    }

    let text = match output_format {
        OutputFormat::Json => serde_json::to_string(config)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(config)?,
        _ => config.summary(),
    };
    print_stdout(&format!("{}\n", text))
}
