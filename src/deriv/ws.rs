use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const CLOSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed { reason: String },
}

/// Events tagged with the connection generation that produced them.
pub type TransportEventTx = mpsc::Sender<(u64, TransportEvent)>;

/// Write side of one live connection. Dropping the handle aborts the
/// connection task; `close` lets it finish the close handshake first.
#[derive(Debug)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<String>,
    task: Option<JoinHandle<()>>,
}

impl TransportHandle {
    pub fn new(outbound: mpsc::UnboundedSender<String>, task: Option<JoinHandle<()>>) -> Self {
        Self { outbound, task }
    }

    /// Returns false when the connection task is gone.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Drops the write side so the connection task sends a Close frame, then
    /// aborts the task if it has not finished within `CLOSE_GRACE`.
    pub fn close(mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        drop(self);
        tokio::spawn(async move {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                tracing::debug!("connection task did not close in time, aborting");
                task.abort();
            }
        });
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Opens transports for the feed task. Swapped for an in-memory connector in
/// tests.
pub trait Connector: Send + 'static {
    fn open(&self, generation: u64, events: TransportEventTx) -> TransportHandle;
}

#[derive(Debug, Clone)]
pub struct DerivWsConnector {
    url: Url,
}

impl DerivWsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for DerivWsConnector {
    fn open(&self, generation: u64, events: TransportEventTx) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let url = self.url.clone();
        let task = tokio::spawn(async move {
            let reason = run_connection(&url, generation, &events, outbound_rx).await;
            let _ = events
                .send((generation, TransportEvent::Closed { reason }))
                .await;
        });
        TransportHandle::new(outbound_tx, Some(task))
    }
}

/// Drive one WebSocket connection until it ends. Returns the close reason.
async fn run_connection(
    url: &Url,
    generation: u64,
    events: &TransportEventTx,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) -> String {
    tracing::info!(url = %url, generation, "connecting");
    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws_stream, _resp)) => ws_stream,
        Err(e) => return format!("connect failed: {}", e),
    };
    if events
        .send((generation, TransportEvent::Opened))
        .await
        .is_err()
    {
        return "feed task gone".to_string();
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                match out {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            return format!("write failed: {}", e);
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        return "closed locally".to_string();
                    }
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if events
                            .send((generation, TransportEvent::Message(text)))
                            .await
                            .is_err()
                        {
                            return "feed task gone".to_string();
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(f) => format!("peer closed ({}): {}", f.code, f.reason),
                            None => "peer closed".to_string(),
                        };
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tokio-tungstenite answers pings on the next write/flush
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return format!("read error: {}", e),
                    None => return "stream ended".to_string(),
                }
            }
        }
    }
}
