#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::{Parser, Subcommand};
use nginx_ipfilter::*;
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::preview::PreviewArgs;
use commands::update::UpdateArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default the platform config dir's nginx-ipfilter.toml is used if present
    #[clap(short, long, global = true)]
    config: Option<String>,

    /// Print debug information to stderr
    #[clap(long, global = true)]
    debug: bool,

    /// Output format for summaries: table (default), markdown, json, json-pretty, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feeds and rewrite the allow-list (default)
    Update(UpdateArgs),

    /// Render an allow-list from local or remote feed snapshots without writing it
    Preview(PreviewArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match IpfilterConfig::new(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        None => commands::update::run(&config, UpdateArgs::default(), cli.format),
        Some(Commands::Update(args)) => commands::update::run(&config, args, cli.format),
        Some(Commands::Preview(args)) => commands::preview::run(&config, args),
        Some(Commands::Config(args)) => commands::config::run(&config, args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
