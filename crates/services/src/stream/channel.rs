use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use piece_core::model::{PieceId, Takeaway};
use tokio::sync::mpsc;

use super::wire::parse_frame;
use super::{
    Credentials, MalformedMessage, PartialSnapshot, StreamClient, StreamEvent, StreamHandle,
    StreamItem,
};
use crate::error::StreamClientError;

/// In-process `StreamClient` for tests, demos and offline runs.
///
/// Every `open` creates a fresh session whose events are pushed through the
/// matching [`ScriptedStream`].
#[derive(Clone, Default)]
pub struct ChannelStreamClient {
    inner: Arc<Mutex<ChannelState>>,
}

#[derive(Default)]
struct ChannelState {
    streams: Vec<ScriptedStream>,
    fail_next: Option<String>,
}

impl ChannelStreamClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with a connection error.
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.inner.lock() {
            state.fail_next = Some(reason.into());
        }
    }

    /// Number of sessions opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.lock().map(|s| s.streams.len()).unwrap_or_default()
    }

    /// Producer side of the `n`-th opened session.
    #[must_use]
    pub fn stream(&self, n: usize) -> Option<ScriptedStream> {
        self.inner.lock().ok()?.streams.get(n).cloned()
    }

    /// Producer side of the most recently opened session.
    #[must_use]
    pub fn latest(&self) -> Option<ScriptedStream> {
        self.inner.lock().ok()?.streams.last().cloned()
    }
}

#[async_trait]
impl StreamClient for ChannelStreamClient {
    async fn open(
        &self,
        piece_id: &PieceId,
        _credentials: &Credentials,
    ) -> Result<StreamHandle, StreamClientError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|e| StreamClientError::Connect(e.to_string()))?;
        if let Some(reason) = state.fail_next.take() {
            return Err(StreamClientError::Connect(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.streams.push(ScriptedStream {
            piece_id: piece_id.clone(),
            tx,
        });
        Ok(StreamHandle::new(piece_id.clone(), rx, None))
    }
}

/// Producer side of a [`ChannelStreamClient`] session.
///
/// Sends are best-effort: once the consumer closed the session they are
/// silently dropped, like frames arriving on a torn-down socket.
#[derive(Clone)]
pub struct ScriptedStream {
    piece_id: PieceId,
    tx: mpsc::UnboundedSender<StreamItem>,
}

impl ScriptedStream {
    #[must_use]
    pub fn piece_id(&self) -> &PieceId {
        &self.piece_id
    }

    pub fn send(&self, item: StreamItem) {
        let _ = self.tx.send(item);
    }

    /// Push a raw protocol frame through the same parser the socket uses.
    pub fn frame(&self, text: &str) {
        match parse_frame(text) {
            Ok(Some(event)) => self.send(Ok(event)),
            Ok(None) => {}
            Err(err) => self.send(Err(err)),
        }
    }

    pub fn partial(&self, takeaways: Vec<Takeaway>) {
        self.send(Ok(StreamEvent::Partial(PartialSnapshot::new(takeaways))));
    }

    pub fn complete(&self) {
        self.send(Ok(StreamEvent::Complete));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Ok(StreamEvent::Error {
            message: message.into(),
        }));
    }

    pub fn malformed(&self, reason: impl Into<String>) {
        self.send(Err(MalformedMessage::new(reason)));
    }

    pub fn close(&self) {
        self.send(Ok(StreamEvent::Closed));
    }

    /// True once the consuming session has closed or dropped its handle.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
