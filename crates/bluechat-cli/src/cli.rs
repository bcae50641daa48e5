//! Command-line interface definitions and parsing

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::TransportKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Transport to use, overriding the configuration
    #[arg(short, long, value_enum, global = true)]
    pub transport: Option<TransportKind>,

    /// Local address for the TCP transport's rendezvous socket
    #[arg(long, global = true)]
    pub listen_addr: Option<SocketAddr>,

    /// Print session events as JSON lines instead of a chat transcript
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Wait for a peer to connect, then chat interactively
    Listen,
    /// Dial a peer and chat interactively
    Connect {
        /// Peer address (`AA:BB:CC:DD:EE:FF` for bluez, `ip:port` for tcp)
        address: String,
    },
    /// Send a single message and exit
    Send {
        /// Peer address
        address: String,
        /// Message content
        message: String,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 15)]
        timeout_secs: u64,
    },
    /// Print an example configuration file
    Config,
}
