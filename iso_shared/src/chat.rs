//! Chat log.
//!
//! The core does not interpret chat. Room messages and connection notices
//! both land here as lines for whatever UI displays them.
//!
//! # Line sources
//! - **Room**: `chat_msg` events relayed by the server
//! - **System**: connection state changes reported by the network task
//! - **Room events**: joins, departures and room entry

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum outgoing message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 160;

/// Lines kept before the oldest are dropped.
pub const DEFAULT_HISTORY: usize = 200;

/// Sender name used for client-generated notices.
pub const SYSTEM_NAME: &str = "System";

/// One displayed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    pub name: String,
    pub msg: String,
    pub received_at: DateTime<Utc>,
}

impl ChatLine {
    pub fn new(name: &str, msg: &str) -> Self {
        ChatLine {
            name: name.to_string(),
            msg: msg.to_string(),
            received_at: Utc::now(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.name == SYSTEM_NAME
    }
}

impl std::fmt::Display for ChatLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.received_at.format("%H:%M:%S"), self.name, self.msg)
    }
}

/// Bounded chat history.
#[derive(Debug, Clone)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    max: usize,
    /// Lines ever pushed, including dropped ones.
    total: u64,
}

impl Default for ChatLog {
    fn default() -> Self {
        ChatLog::new(DEFAULT_HISTORY)
    }
}

impl ChatLog {
    pub fn new(max: usize) -> Self {
        ChatLog {
            lines: VecDeque::with_capacity(max.min(DEFAULT_HISTORY)),
            max: max.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, line: ChatLine) {
        self.lines.push_back(line);
        self.total += 1;
        while self.lines.len() > self.max {
            self.lines.pop_front();
        }
    }

    pub fn system(&mut self, msg: &str) {
        self.push(ChatLine::new(SYSTEM_NAME, msg));
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&ChatLine> {
        self.lines.back()
    }

    /// Lines pushed after the first `seen` of [`total`](Self::total), as far
    /// as they are still kept.
    pub fn since(&self, seen: u64) -> impl Iterator<Item = &ChatLine> {
        let new = self.total.saturating_sub(seen).min(self.lines.len() as u64) as usize;
        self.lines.iter().skip(self.lines.len() - new)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Prepares user text for sending: trimmed, non-empty, at most
/// [`MAX_MESSAGE_LENGTH`] characters.
pub fn sanitize_outgoing(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_MESSAGE_LENGTH).collect())
}
