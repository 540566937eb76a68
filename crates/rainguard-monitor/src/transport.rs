//! WebSocket supervisor. One task owns the connection for its whole life:
//! it connects, pumps frames into the store, sends keep-alives while open and
//! sleeps a fixed delay before every reconnect. Because a single loop drives
//! every attempt, a second connect can never start while one is in flight.

use crate::store::DashboardStore;
use futures_util::{SinkExt, StreamExt};
use rainguard_core::pipeline_ipc::{DEFAULT_MAX_FRAME_BYTES, KEEPALIVE_FRAME};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const MIN_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(1);
const MAX_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Open => "open",
            ConnectionPhase::Closing => "closing",
            ConnectionPhase::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: Url,
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
    pub max_frame_bytes: usize,
}

impl TransportConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Owner of the supervisor task. Dropping the handle aborts the task, which
/// cancels whichever await it is parked on (next frame or reconnect timer).
pub struct TransportHandle {
    phase: watch::Receiver<ConnectionPhase>,
    attempts: Arc<AtomicU64>,
    keepalives: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.clone()
    }

    /// Connection attempts started so far, including the first.
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn keepalives_sent(&self) -> u64 {
        self.keepalives.load(Ordering::SeqCst)
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn spawn_transport(config: TransportConfig, store: DashboardStore) -> TransportHandle {
    let (phase_tx, phase_rx) = watch::channel(ConnectionPhase::Closed);
    let attempts = Arc::new(AtomicU64::new(0));
    let keepalives = Arc::new(AtomicU64::new(0));
    let supervisor = Supervisor {
        config,
        store,
        phase_tx,
        attempts: attempts.clone(),
        keepalives: keepalives.clone(),
    };
    let task = tokio::spawn(supervisor.run());
    TransportHandle {
        phase: phase_rx,
        attempts,
        keepalives,
        task,
    }
}

/// Interval period actually used; `interval_at` panics on zero and
/// `Instant + period` overflows on absurd values.
fn keepalive_period(requested: Duration) -> Duration {
    requested.clamp(MIN_KEEPALIVE_INTERVAL, MAX_KEEPALIVE_INTERVAL)
}

struct Supervisor {
    config: TransportConfig,
    store: DashboardStore,
    phase_tx: watch::Sender<ConnectionPhase>,
    attempts: Arc<AtomicU64>,
    keepalives: Arc<AtomicU64>,
}

impl Supervisor {
    async fn run(self) {
        let period = keepalive_period(self.config.keepalive_interval);
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.set_phase(ConnectionPhase::Connecting);
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(event = "ws_connect", url = %self.config.url, attempt);

            let connect = connect_async(self.config.url.clone());
            tokio::pin!(connect);
            let connected = loop {
                tokio::select! {
                    result = &mut connect => break result,
                    _ = keepalive.tick() => self.skip_keepalive(),
                }
            };

            match connected {
                Ok((ws, _response)) => {
                    self.set_phase(ConnectionPhase::Open);
                    info!(event = "ws_open", url = %self.config.url, attempt);
                    self.store.mark_online();
                    self.pump(ws, &mut keepalive).await;
                }
                Err(err) => {
                    warn!(event = "ws_connect_error", error = %err, attempt);
                    self.store.mark_error();
                }
            }

            self.set_phase(ConnectionPhase::Closed);
            self.store.mark_disconnected();
            info!(
                event = "ws_reconnect_scheduled",
                delay_ms = self.config.reconnect_delay.as_millis() as u64
            );

            let delay = tokio::time::sleep(self.config.reconnect_delay);
            tokio::pin!(delay);
            loop {
                tokio::select! {
                    _ = &mut delay => break,
                    _ = keepalive.tick() => self.skip_keepalive(),
                }
            }
        }
    }

    async fn pump(&self, mut ws: WsStream, keepalive: &mut Interval) {
        loop {
            tokio::select! {
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_text(&text),
                    Some(Ok(Message::Close(reason))) => {
                        debug!(event = "ws_close_frame", reason = ?reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(event = "ws_read_error", error = %err);
                        self.store.mark_error();
                        break;
                    }
                    None => break,
                },
                _ = keepalive.tick() => {
                    if *self.phase_tx.borrow() != ConnectionPhase::Open {
                        self.skip_keepalive();
                        continue;
                    }
                    if let Err(err) = ws.send(Message::Text(KEEPALIVE_FRAME.to_string())).await {
                        warn!(event = "ws_keepalive_error", error = %err);
                        self.store.mark_error();
                        break;
                    }
                    self.keepalives.fetch_add(1, Ordering::SeqCst);
                    debug!(event = "ws_keepalive_sent");
                }
            }
        }

        self.set_phase(ConnectionPhase::Closing);
        let _ = ws.close(None).await;
        info!(event = "ws_closed", url = %self.config.url);
    }

    fn handle_text(&self, text: &str) {
        if let Err(err) = self.store.apply_frame(text, self.config.max_frame_bytes) {
            warn!(event = "ws_decode_error", error = %err);
        }
    }

    fn skip_keepalive(&self) {
        debug!(event = "ws_keepalive_skipped", phase = self.phase_tx.borrow().as_str());
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        let previous = self.phase_tx.send_replace(phase);
        if previous != phase {
            debug!(
                event = "ws_phase",
                from = previous.as_str(),
                to = phase.as_str()
            );
        }
    }
}
