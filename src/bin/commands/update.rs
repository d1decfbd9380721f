use anyhow::Result;
use clap::Args;
use nginx_ipfilter::lens::allowlist::{AllowlistLens, AllowlistReport, AllowlistUpdateArgs};
use nginx_ipfilter::{IpfilterConfig, OutputFormat};

use super::print_stdout;

/// Arguments for the Update command
#[derive(Args, Default)]
pub struct UpdateArgs {
    #[clap(flatten)]
    pub allowlist: AllowlistUpdateArgs,
}

pub fn run(config: &IpfilterConfig, args: UpdateArgs, output_format: OutputFormat) -> Result<()> {
    let UpdateArgs { allowlist } = args;
    let lens = AllowlistLens::new(config);

    if allowlist.dry_run {
        let document = lens.collect()?;
        return print_stdout(&document.render());
    }

    let report = lens.update()?;
    print_report(&lens, &report, output_format)
}

fn print_report(
    lens: &AllowlistLens,
    report: &AllowlistReport,
    output_format: OutputFormat,
) -> Result<()> {
    let mut text = lens.format_report(report, &output_format);
    text.push('\n');
    print_stdout(&text)
}
