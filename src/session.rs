//! Feed session state machine.
//!
//! `FeedSession` performs no I/O. Every transport event and user action goes
//! through [`FeedSession::handle`], which mutates state and the tick window and
//! returns the commands the driver must execute (open/close the transport,
//! send a request, arm or cancel a timer).

use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::deriv::types::{parse_inbound, ApiError, Inbound, Request};
use crate::error::AppError;
use crate::event::{EventLog, FeedStatus, LogDomain, LogLevel, LogRecord};
use crate::model::signal::Recommendation;
use crate::model::tick::Tick;
use crate::model::window::TickWindow;
use crate::signal::{self, AnalysisError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Authorizing,
    Authorized,
    Subscribed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Subscribed => "subscribed",
        }
    }

    pub fn accepts_ticks(self) -> bool {
        matches!(self, Self::Authorized | Self::Subscribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// Manual reconnect or the reconnect timer firing.
    Connect,
    TransportOpened,
    TransportClosed { reason: String },
    Message(String),
    SelectInstrument(String),
    ResubscribeDue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    OpenTransport { generation: u64 },
    CloseTransport,
    Send(Request),
    ScheduleReconnect(Duration),
    CancelReconnect,
    ScheduleResubscribe(Duration),
    CancelResubscribe,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub symbol: String,
    pub api_token: Option<String>,
    pub reconnect_delay: Duration,
    pub resubscribe_delay: Duration,
    pub window_capacity: usize,
    pub event_log_len: usize,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        let symbol = config
            .deriv
            .tradable_symbols()
            .into_iter()
            .next()
            .unwrap_or_else(|| config.deriv.symbol.clone());
        Self {
            symbol,
            api_token: config.deriv.api_token.clone(),
            reconnect_delay: config.session.reconnect_delay(),
            resubscribe_delay: config.session.resubscribe_delay(),
            window_capacity: config.window.capacity,
            event_log_len: config.logging.event_log_len,
        }
    }
}

#[derive(Debug)]
pub struct FeedSession {
    settings: SessionSettings,
    state: SessionState,
    symbol: String,
    public_fallback: bool,
    generation: u64,
    has_transport: bool,
    window: TickWindow,
    events: EventLog,
    last_error: Option<String>,
    tick_count: u64,
}

impl FeedSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            symbol: settings.symbol.clone(),
            window: TickWindow::new(settings.window_capacity),
            events: EventLog::new(settings.event_log_len),
            settings,
            state: SessionState::Disconnected,
            public_fallback: false,
            generation: 0,
            has_transport: false,
            last_error: None,
            tick_count: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_public_fallback(&self) -> bool {
        self.public_fallback
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ticks accepted since the session was created.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn window(&self) -> &TickWindow {
        &self.window
    }

    pub fn snapshot(&self) -> Vec<Tick> {
        self.window.snapshot()
    }

    pub fn recent_events(&self, n: usize) -> Vec<LogRecord> {
        self.events.recent(n)
    }

    pub fn analyze(&self) -> Result<Recommendation, AnalysisError> {
        signal::analyze(&self.symbol, &self.window.snapshot())
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            state: self.state,
            symbol: self.symbol.clone(),
            public_fallback: self.public_fallback,
            window_len: self.window.len(),
            last_price: self.window.latest().map(|t| t.price),
            last_error: self.last_error.clone(),
        }
    }

    pub fn handle(&mut self, input: SessionInput) -> Vec<SessionCommand> {
        match input {
            SessionInput::Connect => self.on_connect(),
            SessionInput::TransportOpened => self.on_opened(),
            SessionInput::TransportClosed { reason } => self.on_closed(&reason),
            SessionInput::Message(text) => self.on_message(&text),
            SessionInput::SelectInstrument(symbol) => self.on_select_instrument(&symbol),
            SessionInput::ResubscribeDue => self.on_resubscribe_due(),
        }
    }

    fn on_connect(&mut self) -> Vec<SessionCommand> {
        let mut cmds = vec![SessionCommand::CancelReconnect, SessionCommand::CancelResubscribe];
        if self.has_transport {
            cmds.push(SessionCommand::CloseTransport);
        }
        self.generation += 1;
        self.has_transport = true;
        self.public_fallback = false;
        self.transition(SessionState::Connecting);
        self.log(
            LogLevel::Info,
            LogDomain::Connection,
            format!("connecting (attempt #{})", self.generation),
        );
        cmds.push(SessionCommand::OpenTransport {
            generation: self.generation,
        });
        cmds
    }

    fn on_opened(&mut self) -> Vec<SessionCommand> {
        if self.state != SessionState::Connecting {
            tracing::debug!(state = %self.state, "ignoring transport open outside connecting");
            return Vec::new();
        }
        self.transition(SessionState::Connected);

        match self.settings.api_token.clone() {
            Some(token) => {
                let cmd = self.send(Request::authorize(&token));
                self.transition(SessionState::Authorizing);
                vec![cmd]
            }
            None => {
                self.log(
                    LogLevel::Info,
                    LogDomain::Connection,
                    "no credential configured, subscribing to public ticks",
                );
                self.public_fallback = true;
                self.transition(SessionState::Authorized);
                vec![self.subscribe()]
            }
        }
    }

    fn on_closed(&mut self, reason: &str) -> Vec<SessionCommand> {
        self.has_transport = false;
        self.transition(SessionState::Disconnected);
        self.last_error = Some(format!("connection lost: {}", reason));
        let delay = self.settings.reconnect_delay;
        self.log(
            LogLevel::Warn,
            LogDomain::Connection,
            format!(
                "connection closed ({}), reconnecting in {}ms",
                reason,
                delay.as_millis()
            ),
        );
        vec![
            SessionCommand::CloseTransport,
            SessionCommand::CancelResubscribe,
            SessionCommand::ScheduleReconnect(delay),
        ]
    }

    fn on_message(&mut self, text: &str) -> Vec<SessionCommand> {
        let inbound = match parse_inbound(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed message");
                self.log(
                    LogLevel::Warn,
                    LogDomain::Inbound,
                    format!("discarded malformed message: {}", e),
                );
                return Vec::new();
            }
        };

        match inbound {
            Inbound::Error { error, msg_type } => self.on_api_error(error, msg_type.as_deref()),
            Inbound::Authorized { loginid } => self.on_authorized(loginid.as_deref()),
            Inbound::Tick {
                symbol,
                epoch,
                tick,
            } => {
                self.on_tick(symbol.as_deref(), epoch, tick);
                Vec::new()
            }
            Inbound::Other { msg_type } => {
                let msg_type = msg_type.as_deref().unwrap_or("unknown");
                tracing::debug!(msg_type, "informational message");
                self.log(
                    LogLevel::Info,
                    LogDomain::Inbound,
                    format!("received {}", msg_type),
                );
                Vec::new()
            }
        }
    }

    fn on_api_error(&mut self, error: ApiError, msg_type: Option<&str>) -> Vec<SessionCommand> {
        tracing::warn!(code = %error.code, detail = %error.message, "venue error");
        self.last_error = Some(
            AppError::Venue {
                code: error.code.clone(),
                message: error.message.clone(),
            }
            .to_string(),
        );

        let awaiting_auth = matches!(
            self.state,
            SessionState::Connecting
                | SessionState::Connected
                | SessionState::Authorizing
                | SessionState::Authorized
        );
        if error.is_authorization_failure(msg_type) && awaiting_auth && !self.public_fallback {
            self.log(
                LogLevel::Info,
                LogDomain::Inbound,
                format!(
                    "authorization failed ({}), using public tick stream",
                    error.code
                ),
            );
            self.public_fallback = true;
            self.transition(SessionState::Authorized);
            return vec![self.subscribe()];
        }

        self.log(
            LogLevel::Error,
            LogDomain::Inbound,
            format!("error {}: {}", error.code, error.message),
        );
        Vec::new()
    }

    fn on_authorized(&mut self, loginid: Option<&str>) -> Vec<SessionCommand> {
        if !matches!(
            self.state,
            SessionState::Connected | SessionState::Authorizing
        ) {
            self.log(
                LogLevel::Info,
                LogDomain::Inbound,
                format!("authorize ack ignored in state {}", self.state),
            );
            return Vec::new();
        }
        self.log(
            LogLevel::Info,
            LogDomain::Inbound,
            format!("authorized as {}", loginid.unwrap_or("unknown account")),
        );
        self.transition(SessionState::Authorized);
        vec![self.subscribe()]
    }

    fn on_tick(&mut self, symbol: Option<&str>, epoch: u64, tick: Option<Tick>) {
        if !self.state.accepts_ticks() {
            tracing::debug!(state = %self.state, epoch, "dropping tick outside subscription");
            return;
        }
        if symbol.is_some_and(|s| s != self.symbol) {
            tracing::debug!(?symbol, expected = %self.symbol, "dropping tick for stale instrument");
            return;
        }
        let Some(tick) = tick else {
            self.log(
                LogLevel::Warn,
                LogDomain::Market,
                format!("rejected tick at {} with unparsable quote", epoch),
            );
            return;
        };

        tracing::trace!(epoch = tick.epoch, price = tick.price, "tick");
        self.window.push(tick);
        self.tick_count += 1;
        if self.state == SessionState::Authorized {
            self.transition(SessionState::Subscribed);
            self.log(
                LogLevel::Info,
                LogDomain::Market,
                format!("streaming {} (first quote {})", self.symbol, tick.price),
            );
        }
    }

    fn on_select_instrument(&mut self, symbol: &str) -> Vec<SessionCommand> {
        let symbol = symbol.trim();
        if symbol.is_empty() || symbol == self.symbol {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.symbol, symbol.to_string());
        self.window.clear();
        self.log(
            LogLevel::Info,
            LogDomain::Market,
            format!("instrument {} -> {}", previous, self.symbol),
        );

        if !self.state.accepts_ticks() {
            return Vec::new();
        }
        let forget = self.send(Request::forget_all_ticks());
        self.transition(SessionState::Authorized);
        vec![
            forget,
            SessionCommand::ScheduleResubscribe(self.settings.resubscribe_delay),
        ]
    }

    fn on_resubscribe_due(&mut self) -> Vec<SessionCommand> {
        if self.state != SessionState::Authorized {
            tracing::debug!(state = %self.state, "skipping resubscribe");
            return Vec::new();
        }
        vec![self.subscribe()]
    }

    fn subscribe(&mut self) -> SessionCommand {
        let request = Request::subscribe_ticks(&self.symbol);
        self.send(request)
    }

    fn send(&mut self, request: Request) -> SessionCommand {
        tracing::info!(request = %request.describe(), generation = self.generation, "send");
        self.log(LogLevel::Info, LogDomain::Outbound, request.describe());
        SessionCommand::Send(request)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        tracing::info!(from = %self.state, to = %next, symbol = %self.symbol, "session state");
        self.state = next;
    }

    fn log(&mut self, level: LogLevel, domain: LogDomain, message: impl Into<String>) {
        self.events.push(level, domain, message);
    }
}
