//! Extraction stream: event shapes, wire parsing and transports.

mod channel;
mod websocket;
mod wire;

use std::fmt;

use async_trait::async_trait;
use piece_core::model::{PieceId, Takeaway, TitleFields};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::StreamClientError;

pub use channel::{ChannelStreamClient, ScriptedStream};
pub use websocket::{WebSocketStreamClient, extract_url};
pub use wire::parse_frame;

/// Accumulated extraction state carried by a `partial` event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialSnapshot {
    /// Full list of items so far. `None` when the frame carried no list,
    /// in which case only the title fields are meaningful.
    pub takeaways: Option<Vec<Takeaway>>,
    pub titles: TitleFields,
}

impl PartialSnapshot {
    #[must_use]
    pub fn new(takeaways: Vec<Takeaway>) -> Self {
        Self {
            takeaways: Some(takeaways),
            titles: TitleFields::default(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.titles.title = Some(title.into());
        self
    }
}

/// A parsed event from one stream session, delivered in transport order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Partial(PartialSnapshot),
    Complete,
    Error { message: String },
    /// The transport closed. Always the last event of a session.
    Closed,
}

/// A frame that could not be parsed. Never touches the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad stream message: {reason}")]
pub struct MalformedMessage {
    pub reason: String,
}

impl MalformedMessage {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type StreamItem = Result<StreamEvent, MalformedMessage>;

/// Bearer credentials for opening a stream.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    /// `None` for a blank token.
    #[must_use]
    pub fn bearer(token: &str) -> Option<Self> {
        let token = token.trim();
        (!token.is_empty()).then(|| Self {
            token: token.to_owned(),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Opens extraction streams for pieces.
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Open a stream session for `piece_id`.
    ///
    /// # Errors
    ///
    /// Returns `StreamClientError` when the connection cannot be established.
    async fn open(
        &self,
        piece_id: &PieceId,
        credentials: &Credentials,
    ) -> Result<StreamHandle, StreamClientError>;
}

/// One open stream session.
///
/// Dropping the handle closes the session.
pub struct StreamHandle {
    piece_id: PieceId,
    events: mpsc::UnboundedReceiver<StreamItem>,
    reader: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StreamHandle {
    #[must_use]
    pub fn new(
        piece_id: PieceId,
        events: mpsc::UnboundedReceiver<StreamItem>,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            piece_id,
            events,
            reader,
            shutdown: None,
        }
    }

    /// Let the reader finish on its own after `close`, instead of aborting it.
    /// The reader observes `shutdown` (fired or dropped) and ends the
    /// transport cleanly.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: oneshot::Sender<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[must_use]
    pub fn piece_id(&self) -> &PieceId {
        &self.piece_id
    }

    /// Next event in arrival order. `None` once the transport is gone.
    pub async fn next(&mut self) -> Option<StreamItem> {
        self.events.recv().await
    }

    /// Stop the reader and refuse further events.
    pub fn close(&mut self) {
        self.stop_reader();
        self.events.close();
        debug!(piece_id = %self.piece_id, "stream handle closed");
    }

    fn stop_reader(&mut self) {
        match self.shutdown.take() {
            Some(shutdown) => {
                let _ = shutdown.send(());
                // Detached: it exits once the transport is shut down.
                self.reader = None;
            }
            None => {
                if let Some(reader) = self.reader.take() {
                    reader.abort();
                }
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("piece_id", &self.piece_id)
            .finish_non_exhaustive()
    }
}
