use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let mut config = config::LumenConfig::load(&cli.config)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    init_tracing(&config, cli.verbose);
    commands::run_command(cli, &config)
}

/// `RUST_LOG` wins over `--verbose`, which wins over the config file.
fn init_tracing(config: &config::LumenConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_filter.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
