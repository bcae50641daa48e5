//! Chat application driving one session manager
//!
//! [`ChatApp`] turns session events into transcript lines, stdin lines into writes, and
//! applies the redial policy. Rendering is separated from I/O: the handlers return the
//! lines to print so they can be exercised without a terminal.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, info};

use bluechat_core::{
    EventReceiver, PeerIdentity, SessionEvent, SessionManager, SessionState, SessionWarning,
    Transport,
};
use bluechat_rfcomm::TcpTransport;

use crate::config::{AppConfig, TransportKind};
use crate::error::{CliError, Result};
use crate::reconnect::ReconnectPolicy;
use crate::transcript::{render_payload, Transcript};

/// What the interactive loop should do after handling a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable transcript lines
    Transcript,
    /// One JSON object per session event
    Json,
}

// ----------------------------------------------------------------------------
// Transport Construction
// ----------------------------------------------------------------------------

/// Build the transport selected in the configuration
pub async fn build_transport(config: &AppConfig) -> Result<Arc<dyn Transport>> {
    match config.transport.kind {
        TransportKind::Tcp => Ok(Arc::new(TcpTransport::new(config.transport.tcp.clone()))),
        TransportKind::Bluez => build_bluez(config).await,
    }
}

#[cfg(all(feature = "bluez", target_os = "linux"))]
async fn build_bluez(config: &AppConfig) -> Result<Arc<dyn Transport>> {
    let transport = bluechat_rfcomm::BluezTransport::new(config.transport.bluez.clone())
        .await
        .map_err(|e| CliError::TransportInit(e.to_string()))?;
    Ok(Arc::new(transport))
}

#[cfg(not(all(feature = "bluez", target_os = "linux")))]
async fn build_bluez(_config: &AppConfig) -> Result<Arc<dyn Transport>> {
    Err(CliError::FeatureNotAvailable(
        "bluez transport (rebuild with --features bluez on Linux)".to_string(),
    ))
}

// ----------------------------------------------------------------------------
// Chat Application
// ----------------------------------------------------------------------------

pub struct ChatApp {
    config: AppConfig,
    manager: SessionManager,
    events: EventReceiver,
    transcript: Transcript,
    reconnect: ReconnectPolicy,
    peer: Option<PeerIdentity>,
    output: OutputMode,
}

impl ChatApp {
    /// Create the app and its session manager on the current runtime
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>, output: OutputMode) -> Result<Self> {
        let (manager, events) = SessionManager::with_channel(transport, config.session.clone())?;
        let reconnect = ReconnectPolicy::new(config.reconnect.clone());
        Ok(Self {
            config,
            manager,
            events,
            transcript: Transcript::new(),
            reconnect,
            peer: None,
            output,
        })
    }

    pub fn state(&self) -> SessionState {
        self.manager.current_state()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Wait for an inbound peer
    pub fn listen(&mut self) {
        self.manager.start();
    }

    /// Listen now and dial `address` after the configured delay
    pub fn dial_later(&mut self, address: &str) {
        self.reconnect.set_target(address);
        self.manager.start();
        self.reconnect
            .schedule(self.config.chat.connect_delay(), Instant::now());
    }

    pub fn stop(&mut self) {
        self.reconnect.cancel();
        self.manager.stop();
    }

    // ------------------------------------------------------------------------
    // Event Handling
    // ------------------------------------------------------------------------

    /// Apply one session event, returning the lines to print
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<Vec<String>> {
        self.reconnect.observe(&event, Instant::now());

        let mut lines = Vec::new();
        if self.output == OutputMode::Json {
            lines.push(serde_json::to_string(&event)?);
        }
        let human = self.output == OutputMode::Transcript;

        match event {
            SessionEvent::StateChanged { state } => match state {
                SessionState::Listening if human => lines.push("Waiting for a peer...".to_string()),
                SessionState::Connecting if human => lines.push("Connecting...".to_string()),
                SessionState::Connected => {
                    let name = self
                        .peer
                        .as_ref()
                        .map(|p| p.name.clone())
                        .unwrap_or_default();
                    let line = self.transcript.system(format!("Connected to {}", name)).to_string();
                    if human {
                        lines.push(line);
                    }
                }
                _ => {}
            },
            SessionEvent::PeerIdentified { peer } => {
                info!("Peer identified: {}", peer);
                self.peer = Some(peer);
            }
            SessionEvent::InboundFrame(frame) => {
                debug!("Received {} bytes", frame.byte_count);
                let (name, address) = match &self.peer {
                    Some(peer) => (peer.name.clone(), peer.address.to_string()),
                    None => (self.config.session.unknown_peer_name.clone(), String::new()),
                };
                let line = self
                    .transcript
                    .incoming(render_payload(&frame.payload), name, address)
                    .to_string();
                if human {
                    lines.push(line);
                }
            }
            SessionEvent::OutboundFrame { payload } => {
                if self.transcript.mark_sent(&payload).is_none() {
                    debug!("Write echo with no pending message ({} bytes)", payload.len());
                }
            }
            SessionEvent::Warning { warning } => {
                if let SessionWarning::WriteFailed(_) = warning {
                    self.transcript.mark_failed();
                }
                debug!("Session warning: {}", warning);
                if human {
                    lines.push(warning.to_string());
                }
            }
            SessionEvent::ConnectionFailed => {
                if human {
                    lines.push("Unable to connect to device".to_string());
                }
            }
            SessionEvent::ConnectionLost => {
                self.peer = None;
                let line = self.transcript.system("Connection lost").to_string();
                if human {
                    lines.push("Device connection was lost".to_string());
                    lines.push(line);
                }
            }
        }
        Ok(lines)
    }

    // ------------------------------------------------------------------------
    // Input Handling
    // ------------------------------------------------------------------------

    /// Apply one line typed by the user, returning the lines to print
    pub fn handle_input(&mut self, line: &str) -> (InputOutcome, Vec<String>) {
        let text = line.trim();
        if text.is_empty() {
            return (InputOutcome::Continue, Vec::new());
        }

        match text {
            "/quit" | "/exit" => return (InputOutcome::Quit, Vec::new()),
            "/clear" => {
                self.transcript.clear();
                return (InputOutcome::Continue, vec!["Chat cleared".to_string()]);
            }
            "/info" => return (InputOutcome::Continue, self.info()),
            _ => {}
        }

        if !self.state().is_connected() {
            return (
                InputOutcome::Continue,
                vec!["Not connected to device".to_string()],
            );
        }

        let line = self
            .transcript
            .outgoing(text, self.config.chat.display_name.clone())
            .to_string();
        self.manager.write(text.as_bytes().to_vec());
        let lines = match self.output {
            OutputMode::Transcript => vec![line],
            OutputMode::Json => Vec::new(),
        };
        (InputOutcome::Continue, lines)
    }

    fn info(&self) -> Vec<String> {
        let (name, address) = match &self.peer {
            Some(peer) => (peer.name.clone(), peer.address.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let state = self.state();
        let status = if state.is_connected() {
            "Connected"
        } else {
            "Disconnected"
        };
        let workers = self.manager.active_workers();
        vec![
            format!("Device: {}", name),
            format!("Address: {}", address),
            format!("Status: {}", status),
            format!("Messages: {}", self.transcript.len()),
            format!("Connection state: {}", state),
            format!(
                "Workers: listener={} connector={} pump={}",
                workers.listener, workers.connector, workers.pump
            ),
        ]
    }

    // ------------------------------------------------------------------------
    // Event Loops
    // ------------------------------------------------------------------------

    /// Next session event, or a due redial, whichever comes first
    async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            let deadline = self.reconnect.deadline();
            tokio::select! {
                event = self.events.recv() => return event,
                _ = sleep_until_some(deadline) => {
                    if let Some(target) = self.reconnect.due(Instant::now()) {
                        info!("Dialing {}", target);
                        self.manager.connect(&target);
                    }
                }
            }
        }
    }

    /// Chat on stdin/stdout until `/quit`, end of input, or Ctrl+C
    pub async fn run_interactive(&mut self) -> Result<()> {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut input_open = true;
        println!("Type a message and press Enter. Commands: /info /clear /quit");

        loop {
            tokio::select! {
                event = self.next_event() => {
                    let Some(event) = event else {
                        return Err(CliError::SessionEnded("event stream closed".to_string()));
                    };
                    for line in self.handle_event(event)? {
                        println!("{}", line);
                    }
                }
                line = stdin.next_line(), if input_open => {
                    match line? {
                        Some(line) => {
                            let (outcome, lines) = self.handle_input(&line);
                            for line in lines {
                                println!("{}", line);
                            }
                            if outcome == InputOutcome::Quit {
                                break;
                            }
                        }
                        None => {
                            debug!("Input closed");
                            input_open = false;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.stop();
        Ok(())
    }

    /// Dial `address`, send one message, wait for it to be written, and stop
    pub async fn send_once(&mut self, address: &str, message: &str, limit: Duration) -> Result<()> {
        let payload = message.as_bytes().to_vec();
        self.manager.connect(address);

        let outcome = tokio::time::timeout(limit, async {
            let mut written = false;
            while let Some(event) = self.events.recv().await {
                for line in self.handle_event(event.clone())? {
                    println!("{}", line);
                }
                match event {
                    SessionEvent::StateChanged {
                        state: SessionState::Connected,
                    } if !written => {
                        self.transcript
                            .outgoing(message, self.config.chat.display_name.clone());
                        self.manager.write(payload.clone());
                        written = true;
                    }
                    SessionEvent::OutboundFrame { payload: sent } if sent == payload => {
                        return Ok(());
                    }
                    SessionEvent::ConnectionFailed => {
                        return Err(CliError::ConnectFailed(address.to_string()));
                    }
                    SessionEvent::ConnectionLost => {
                        return Err(CliError::SessionEnded("connection lost before send".to_string()));
                    }
                    SessionEvent::Warning {
                        warning: SessionWarning::WriteFailed(reason),
                    } => {
                        return Err(CliError::SessionEnded(reason));
                    }
                    _ => {}
                }
            }
            Err(CliError::SessionEnded("event stream closed".to_string()))
        })
        .await;

        self.stop();
        match outcome {
            Ok(result) => result,
            Err(_) => Err(CliError::Timeout(format!("message delivery to {}", address))),
        }
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
