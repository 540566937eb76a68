use rainguard_core::pipeline_ipc::{decode_frame, FrameError, InboundFrame, PipelineEvent};
use rainguard_core::{AggregateStats, DashboardState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Single writer for the dashboard state. Every mutation is applied whole
/// before observers are woken, and observers only ever get read access.
#[derive(Clone)]
pub struct DashboardStore {
    tx: Arc<watch::Sender<DashboardState>>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DashboardState::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    pub fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn apply_event(&self, event: PipelineEvent) {
        self.tx.send_modify(|state| state.apply_event(event));
    }

    /// Decodes one inbound text frame and routes it. Unknown types are
    /// dropped here; malformed frames come back as errors for the caller to
    /// log and discard.
    pub fn apply_frame(&self, text: &str, max_frame_bytes: usize) -> Result<(), FrameError> {
        match decode_frame(text, max_frame_bytes)? {
            InboundFrame::Event(event) => {
                debug!(
                    event = "frame_applied",
                    kind = %event.kind(),
                    farmer_id = event.farmer_id().unwrap_or("-")
                );
                self.apply_event(event);
            }
            InboundFrame::Ignored { kind } => {
                debug!(event = "frame_ignored", kind = %kind);
            }
        }
        Ok(())
    }

    pub fn apply_snapshot(&self, stats: AggregateStats) {
        self.tx.send_modify(|state| state.apply_snapshot(stats));
    }

    pub fn mark_online(&self) {
        self.tx.send_modify(DashboardState::mark_online);
    }

    pub fn mark_error(&self) {
        self.tx.send_modify(DashboardState::mark_error);
    }

    pub fn mark_disconnected(&self) {
        self.tx.send_modify(DashboardState::mark_disconnected);
    }
}
