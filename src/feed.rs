use std::pin::Pin;

use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::config::Config;
use crate::deriv::ws::{Connector, DerivWsConnector, TransportEvent, TransportHandle};
use crate::error::AppError;
use crate::event::{FeedStatus, LogRecord};
use crate::model::signal::Recommendation;
use crate::session::{FeedSession, SessionCommand, SessionInput, SessionSettings};
use crate::signal::AnalysisError;

const REQUEST_CHANNEL_LEN: usize = 64;
const TRANSPORT_CHANNEL_LEN: usize = 1024;

#[derive(Debug)]
enum FeedRequest {
    SelectInstrument(String),
    Reconnect,
    Analyze(oneshot::Sender<Result<Recommendation, AnalysisError>>),
    RecentEvents(usize, oneshot::Sender<Vec<LogRecord>>),
    Shutdown,
}

/// Client side of the feed task. Cheap to clone; every call is serialized
/// onto the task that owns the session.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    requests: mpsc::Sender<FeedRequest>,
    status: watch::Receiver<FeedStatus>,
}

impl FeedHandle {
    pub async fn select_instrument(&self, symbol: &str) -> Result<(), AppError> {
        self.request(FeedRequest::SelectInstrument(symbol.to_string()))
            .await
    }

    pub async fn reconnect(&self) -> Result<(), AppError> {
        self.request(FeedRequest::Reconnect).await
    }

    /// The outer error only means the feed task has stopped; an
    /// insufficient window is reported through the inner result.
    pub async fn analyze(&self) -> Result<Result<Recommendation, AnalysisError>, AppError> {
        let (tx, rx) = oneshot::channel();
        self.request(FeedRequest::Analyze(tx)).await?;
        rx.await.map_err(|_| AppError::FeedStopped)
    }

    pub async fn recent_events(&self, n: usize) -> Result<Vec<LogRecord>, AppError> {
        let (tx, rx) = oneshot::channel();
        self.request(FeedRequest::RecentEvents(n, tx)).await?;
        rx.await.map_err(|_| AppError::FeedStopped)
    }

    pub fn status(&self) -> FeedStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<FeedStatus> {
        self.status.clone()
    }

    pub async fn shutdown(&self) {
        let _ = self.requests.send(FeedRequest::Shutdown).await;
    }

    async fn request(&self, req: FeedRequest) -> Result<(), AppError> {
        self.requests
            .send(req)
            .await
            .map_err(|_| AppError::FeedStopped)
    }
}

/// Start the live feed against the configured venue endpoint.
pub fn spawn_feed(config: &Config) -> Result<(FeedHandle, JoinHandle<()>)> {
    let connector = DerivWsConnector::new(config.deriv.ws_url()?);
    let session = FeedSession::new(SessionSettings::from_config(config));
    Ok(spawn_feed_with(session, connector))
}

pub fn spawn_feed_with<C: Connector>(
    session: FeedSession,
    connector: C,
) -> (FeedHandle, JoinHandle<()>) {
    let (req_tx, req_rx) = mpsc::channel(REQUEST_CHANNEL_LEN);
    let (status_tx, status_rx) = watch::channel(session.status());
    let task = tokio::spawn(run_feed(session, connector, req_rx, status_tx));
    (
        FeedHandle {
            requests: req_tx,
            status: status_rx,
        },
        task,
    )
}

type TimerSlot = Option<Pin<Box<Sleep>>>;

struct Driver<C> {
    connector: C,
    events_tx: mpsc::Sender<(u64, TransportEvent)>,
    transport: Option<TransportHandle>,
    reconnect: TimerSlot,
    resubscribe: TimerSlot,
}

impl<C: Connector> Driver<C> {
    fn execute(&mut self, cmds: Vec<SessionCommand>) {
        for cmd in cmds {
            match cmd {
                SessionCommand::OpenTransport { generation } => {
                    if let Some(stale) = self.transport.take() {
                        stale.close();
                    }
                    self.transport = Some(self.connector.open(generation, self.events_tx.clone()));
                }
                SessionCommand::CloseTransport => {
                    if let Some(transport) = self.transport.take() {
                        transport.close();
                    }
                }
                SessionCommand::Send(request) => {
                    let Some(transport) = self.transport.as_ref() else {
                        tracing::warn!(request = %request.describe(), "no transport, dropping request");
                        continue;
                    };
                    match request.to_json() {
                        Ok(text) => {
                            if !transport.send(text) {
                                tracing::warn!(request = %request.describe(), "transport gone, request not sent");
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "failed to encode request"),
                    }
                }
                SessionCommand::ScheduleReconnect(delay) => {
                    self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
                }
                SessionCommand::CancelReconnect => self.reconnect = None,
                SessionCommand::ScheduleResubscribe(delay) => {
                    self.resubscribe = Some(Box::pin(tokio::time::sleep(delay)));
                }
                SessionCommand::CancelResubscribe => self.resubscribe = None,
            }
        }
    }
}

async fn wait_timer(slot: &mut TimerSlot) {
    match slot {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

enum Wake {
    Request(Option<FeedRequest>),
    Transport(u64, TransportEvent),
    ReconnectDue,
    ResubscribeDue,
}

async fn run_feed<C: Connector>(
    mut session: FeedSession,
    connector: C,
    mut requests: mpsc::Receiver<FeedRequest>,
    status_tx: watch::Sender<FeedStatus>,
) {
    let (events_tx, mut events_rx) = mpsc::channel(TRANSPORT_CHANNEL_LEN);
    let mut driver = Driver {
        connector,
        events_tx,
        transport: None,
        reconnect: None,
        resubscribe: None,
    };

    let cmds = session.handle(SessionInput::Connect);
    driver.execute(cmds);
    status_tx.send_replace(session.status());

    loop {
        let wake = tokio::select! {
            req = requests.recv() => Wake::Request(req),
            Some((generation, event)) = events_rx.recv() => Wake::Transport(generation, event),
            _ = wait_timer(&mut driver.reconnect) => Wake::ReconnectDue,
            _ = wait_timer(&mut driver.resubscribe) => Wake::ResubscribeDue,
        };

        let input = match wake {
            Wake::Request(None) | Wake::Request(Some(FeedRequest::Shutdown)) => break,
            Wake::Request(Some(FeedRequest::SelectInstrument(symbol))) => {
                SessionInput::SelectInstrument(symbol)
            }
            Wake::Request(Some(FeedRequest::Reconnect)) => SessionInput::Connect,
            Wake::Request(Some(FeedRequest::Analyze(reply))) => {
                let _ = reply.send(session.analyze());
                continue;
            }
            Wake::Request(Some(FeedRequest::RecentEvents(n, reply))) => {
                let _ = reply.send(session.recent_events(n));
                continue;
            }
            Wake::Transport(generation, event) => {
                if generation != session.generation() {
                    tracing::debug!(generation, current = session.generation(), "dropping event from stale transport");
                    continue;
                }
                match event {
                    TransportEvent::Opened => SessionInput::TransportOpened,
                    TransportEvent::Message(text) => SessionInput::Message(text),
                    TransportEvent::Closed { reason } => SessionInput::TransportClosed { reason },
                }
            }
            Wake::ReconnectDue => {
                driver.reconnect = None;
                SessionInput::Connect
            }
            Wake::ResubscribeDue => {
                driver.resubscribe = None;
                SessionInput::ResubscribeDue
            }
        };

        let cmds = session.handle(input);
        driver.execute(cmds);
        status_tx.send_replace(session.status());
    }

    if let Some(transport) = driver.transport.take() {
        transport.close();
    }
    tracing::info!("feed task stopped");
}
