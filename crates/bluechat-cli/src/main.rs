//! BlueChat CLI entry point

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};

use bluechat_cli::{cli::Cli, commands::CommandDispatcher, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = load_configuration(&cli).context("Failed to load configuration")?;

    // Initialize logging
    setup_logging(cli.verbose || config.chat.verbose);
    debug!("Configuration: {:?}", config);

    // Execute the command
    if let Err(e) = CommandDispatcher::execute(cli, config).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Setup logging based on verbosity level; logs go to stderr, the chat to stdout
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load layered configuration and apply command line overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(kind) = cli.transport {
        config.transport.kind = kind;
    }
    if let Some(addr) = cli.listen_addr {
        config.transport.tcp.listen_addr = addr;
    }
    config.validate()?;
    Ok(config)
}
