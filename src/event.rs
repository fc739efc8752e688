use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::session::SessionState;

pub const DEFAULT_EVENT_LOG_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDomain {
    Connection,
    Outbound,
    Inbound,
    Market,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub domain: LogDomain,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERR ",
        };
        let domain = match self.domain {
            LogDomain::Connection => "conn",
            LogDomain::Outbound => "send",
            LogDomain::Inbound => "recv",
            LogDomain::Market => "mkt",
        };
        write!(
            f,
            "{} {} {:<4} {}",
            self.at.format("%H:%M:%S"),
            level,
            domain,
            self.message
        )
    }
}

/// Last-N ring of user-facing session events. Best effort: nothing consumes
/// it except display.
#[derive(Debug, Clone)]
pub struct EventLog {
    limit: usize,
    records: VecDeque<LogRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_LEN)
    }
}

impl EventLog {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            records: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, level: LogLevel, domain: LogDomain, message: impl Into<String>) {
        if self.records.len() >= self.limit {
            self.records.pop_front();
        }
        self.records.push_back(LogRecord {
            at: Utc::now(),
            level,
            domain,
            message: message.into(),
        });
    }

    /// Up to `n` most recent records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<LogRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Connectivity snapshot published by the feed task.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStatus {
    pub state: SessionState,
    pub symbol: String,
    pub public_fallback: bool,
    pub window_len: usize,
    pub last_price: Option<f64>,
    pub last_error: Option<String>,
}

impl FeedStatus {
    pub fn is_connected(&self) -> bool {
        !matches!(
            self.state,
            SessionState::Disconnected | SessionState::Connecting
        )
    }
}
