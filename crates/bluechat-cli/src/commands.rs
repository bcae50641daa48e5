//! Command handlers for the BlueChat CLI

use std::time::Duration;

use tracing::info;

use crate::app::{build_transport, ChatApp, OutputMode};
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::Result;

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
        let output = if cli.json {
            OutputMode::Json
        } else {
            OutputMode::Transcript
        };

        match cli.command {
            Commands::Config => {
                Self::handle_config_command();
                Ok(())
            }
            Commands::Listen => Self::handle_listen_command(config, output).await,
            Commands::Connect { address } => {
                Self::handle_connect_command(config, output, address).await
            }
            Commands::Send {
                address,
                message,
                timeout_secs,
            } => Self::handle_send_command(config, output, address, message, timeout_secs).await,
        }
    }

    fn handle_config_command() {
        println!("{}", AppConfig::example_config());
    }

    async fn handle_listen_command(config: AppConfig, output: OutputMode) -> Result<()> {
        let transport = build_transport(&config).await?;
        info!("Listening for a peer over {}", transport.name());
        let mut app = ChatApp::new(config, transport, output)?;
        app.listen();
        app.run_interactive().await
    }

    /// Listen first, then dial after the configured delay, so either side can win
    async fn handle_connect_command(
        config: AppConfig,
        output: OutputMode,
        address: String,
    ) -> Result<()> {
        let transport = build_transport(&config).await?;
        info!("Connecting to {} over {}", address, transport.name());
        let mut app = ChatApp::new(config, transport, output)?;
        app.dial_later(&address);
        app.run_interactive().await
    }

    async fn handle_send_command(
        mut config: AppConfig,
        output: OutputMode,
        address: String,
        message: String,
        timeout_secs: u64,
    ) -> Result<()> {
        let message = message.trim().to_string();
        if message.is_empty() {
            println!("Nothing to send");
            return Ok(());
        }

        config.reconnect.enabled = false;
        let transport = build_transport(&config).await?;
        let mut app = ChatApp::new(config, transport, output)?;
        app.send_once(&address, &message, Duration::from_secs(timeout_secs))
            .await?;
        println!("Message sent to {}", address);
        Ok(())
    }
}
