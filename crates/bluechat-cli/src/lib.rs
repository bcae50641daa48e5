//! BlueChat CLI library
//!
//! Components of the `bluechat` terminal client: argument parsing, layered
//! configuration, the chat transcript, the redial policy, and the app that drives a
//! `bluechat-core` session manager.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod reconnect;
pub mod transcript;

pub use app::{ChatApp, InputOutcome, OutputMode};
pub use cli::{Cli, Commands};
pub use config::{AppConfig, TransportKind};
pub use error::{CliError, Result};
