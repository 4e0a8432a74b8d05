use piece_core::model::{Piece, PieceId};
use tokio::sync::mpsc;
use tracing::debug;

use super::pacer::RevealedTakeaway;
use super::session::SessionPhase;

/// Everything the UI needs to draw the reveal area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealView {
    pub piece_id: PieceId,
    pub phase: SessionPhase,
    pub revealed: Vec<Option<RevealedTakeaway>>,
    /// Indices changed by the tick that produced this view.
    pub changed: Vec<usize>,
    pub is_revealing: bool,
    pub error: Option<String>,
    /// Completion came from a transport close rather than a `complete` event.
    pub closed_without_complete: bool,
}

impl RevealView {
    /// An inactive view carrying only an error, for sessions that never started.
    #[must_use]
    pub fn failed(piece_id: PieceId, error: impl Into<String>) -> Self {
        Self {
            piece_id,
            phase: SessionPhase::Idle,
            revealed: Vec::new(),
            changed: Vec::new(),
            is_revealing: false,
            error: Some(error.into()),
            closed_without_complete: false,
        }
    }

    /// Revealed items with holes skipped, in index order.
    pub fn shown(&self) -> impl Iterator<Item = &RevealedTakeaway> {
        self.revealed.iter().flatten()
    }
}

/// Updates pushed to the UI sink.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealUpdate {
    /// A batch of revealed state, or a lifecycle change.
    View(RevealView),
    /// A newly streamed title, surfaced without pacing.
    Title(String),
    /// The durable piece from the initial load.
    Loaded(Piece),
    /// The durable piece re-read after a session caught up.
    Reconciled(Piece),
}

/// Consumer of reveal updates.
pub trait RevealSink: Send + Sync {
    fn publish(&self, update: RevealUpdate);
}

/// Sink forwarding every update over an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RevealUpdate>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RevealUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RevealSink for ChannelSink {
    fn publish(&self, update: RevealUpdate) {
        if self.tx.send(update).is_err() {
            debug!("reveal sink receiver dropped");
        }
    }
}
