//! Delayed redial policy
//!
//! The session core already falls back to listening the moment a dial fails or a session
//! drops. This policy sits on top of that and, when the user asked to dial a specific
//! peer, schedules another attempt at it a little later.

use bluechat_core::{SessionEvent, SessionState};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::config::ReconnectConfig;

#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    target: Option<String>,
    deadline: Option<Instant>,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            target: None,
            deadline: None,
        }
    }

    /// Remember `address` as the peer to redial
    pub fn set_target(&mut self, address: impl Into<String>) {
        self.target = Some(address.into());
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Schedule a dial of the target after `delay`, regardless of `enabled`
    ///
    /// Used for the initial dial of `connect`.
    pub fn schedule(&mut self, delay: Duration, now: Instant) {
        if self.target.is_some() {
            self.deadline = Some(now + delay);
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Feed a session event; failures and drops schedule a redial
    pub fn observe(&mut self, event: &SessionEvent, now: Instant) {
        match event {
            SessionEvent::ConnectionFailed if self.config.enabled => {
                self.schedule(self.config.after_failure(), now);
            }
            SessionEvent::ConnectionLost if self.config.enabled => {
                self.schedule(self.config.after_loss(), now);
            }
            SessionEvent::StateChanged {
                state: SessionState::Connected,
            } => {
                if self.deadline.take().is_some() {
                    debug!("Session came up, dropping pending redial");
                }
            }
            _ => {}
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the target if its redial is due
    pub fn due(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.target.clone()
            }
            _ => None,
        }
    }
}
