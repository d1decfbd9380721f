use anyhow::Result;
use clap::Args;
use nginx_ipfilter::lens::allowlist::{AllowlistLens, AllowlistPreviewArgs};
use nginx_ipfilter::IpfilterConfig;

use super::print_stdout;

/// Arguments for the Preview command
#[derive(Args)]
pub struct PreviewArgs {
    #[clap(flatten)]
    pub snapshots: AllowlistPreviewArgs,
}

pub fn run(config: &IpfilterConfig, args: PreviewArgs) -> Result<()> {
    let PreviewArgs { snapshots } = args;

    let lens = AllowlistLens::new(config);
    let document = lens.preview(&snapshots)?;
    print_stdout(&document.render())
}
