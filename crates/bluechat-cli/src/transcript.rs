//! In-memory chat transcript

use std::fmt;

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Message Types
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
    System,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender_name: String,
    pub sender_address: Option<String>,
    pub direction: Direction,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub status: MessageStatus,
    pub message_type: MessageType,
}

impl ChatMessage {
    /// `HH:MM` in the local time zone
    pub fn formatted_time(&self) -> String {
        Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|time| time.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string())
    }

    pub fn is_outgoing(&self) -> bool {
        self.direction == Direction::Outgoing
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::System => write!(f, "[{}] * {}", self.formatted_time(), self.content),
            _ => write!(
                f,
                "[{}] {}: {}",
                self.formatted_time(),
                self.sender_name,
                self.content
            ),
        }
    }
}

/// Text for a received payload; bytes that are not UTF-8 are shown as hex
pub fn render_payload(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<{} bytes: {}>", payload.len(), hex::encode(payload)),
    }
}

// ----------------------------------------------------------------------------
// Transcript
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    sequence: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        content: String,
        sender_name: String,
        sender_address: Option<String>,
        direction: Direction,
        status: MessageStatus,
    ) -> &ChatMessage {
        let timestamp = Utc::now().timestamp_millis();
        self.sequence += 1;
        self.messages.push(ChatMessage {
            id: format!("MSG_{}_{}", timestamp, self.sequence),
            content,
            sender_name,
            sender_address,
            direction,
            timestamp,
            status,
            message_type: MessageType::Text,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Record a message we are about to send
    pub fn outgoing(&mut self, content: impl Into<String>, sender_name: impl Into<String>) -> &ChatMessage {
        self.push(
            content.into(),
            sender_name.into(),
            None,
            Direction::Outgoing,
            MessageStatus::Sending,
        )
    }

    pub fn incoming(
        &mut self,
        content: impl Into<String>,
        sender_name: impl Into<String>,
        sender_address: impl Into<String>,
    ) -> &ChatMessage {
        self.push(
            content.into(),
            sender_name.into(),
            Some(sender_address.into()),
            Direction::Incoming,
            MessageStatus::Delivered,
        )
    }

    pub fn system(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(
            content.into(),
            "System".to_string(),
            None,
            Direction::System,
            MessageStatus::Delivered,
        )
    }

    /// Mark the latest pending outgoing message carrying `payload` as sent
    pub fn mark_sent(&mut self, payload: &[u8]) -> Option<&ChatMessage> {
        self.update_latest_pending(|m| m.content.as_bytes() == payload, MessageStatus::Sent)
    }

    /// Mark the latest pending outgoing message as failed
    pub fn mark_failed(&mut self) -> Option<&ChatMessage> {
        self.update_latest_pending(|_| true, MessageStatus::Failed)
    }

    fn update_latest_pending<F>(&mut self, matches: F, status: MessageStatus) -> Option<&ChatMessage>
    where
        F: Fn(&ChatMessage) -> bool,
    {
        let message = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.is_outgoing() && m.status == MessageStatus::Sending && matches(m))?;
        message.status = status;
        Some(message)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
