// WebSocket transport for the extraction stream.
//
// Connects to `{ws_base}/ws/extract?piece_id=..&token=..` and forwards every
// text frame, parsed, into the session's event channel. Closing the handle
// sends a Close frame before the socket is dropped.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use piece_core::model::PieceId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;

use super::{Credentials, MalformedMessage, StreamClient, StreamEvent, StreamHandle, StreamItem};
use super::wire::parse_frame;
use crate::error::StreamClientError;

/// Upper bound on waiting for the Close frame to be written.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Production `StreamClient` speaking the extraction WebSocket protocol.
#[derive(Clone, Debug)]
pub struct WebSocketStreamClient {
    base_url: String,
}

impl WebSocketStreamClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// Build the stream URL from the HTTP API base.
///
/// # Errors
///
/// Returns `StreamClientError::InvalidUrl` when the base is not an http(s) or ws(s) URL.
pub fn extract_url(
    base_url: &str,
    piece_id: &PieceId,
    credentials: &Credentials,
) -> Result<Url, StreamClientError> {
    let mut url =
        Url::parse(base_url).map_err(|e| StreamClientError::InvalidUrl(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(StreamClientError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| StreamClientError::InvalidUrl(base_url.to_owned()))?;

    let path = format!("{}/ws/extract", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("piece_id", piece_id.as_str())
        .append_pair("token", credentials.token());
    Ok(url)
}

#[async_trait]
impl StreamClient for WebSocketStreamClient {
    async fn open(
        &self,
        piece_id: &PieceId,
        credentials: &Credentials,
    ) -> Result<StreamHandle, StreamClientError> {
        let url = extract_url(&self.base_url, piece_id, credentials)?;
        info!(%piece_id, "opening extraction stream");

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| StreamClientError::Connect(e.to_string()))?;
        let (write, read) = ws_stream.split();

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let reader = tokio::spawn(run_socket(write, read, tx, shutdown_rx));
        Ok(StreamHandle::new(piece_id.clone(), rx, Some(reader)).with_shutdown(shutdown_tx))
    }
}

/// Drive one socket: forward frames until the server ends the stream, or send
/// a Close frame once the handle shuts down.
pub(crate) async fn run_socket<W, R>(
    mut write: W,
    read: R,
    tx: mpsc::UnboundedSender<StreamItem>,
    shutdown: oneshot::Receiver<()>,
) where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    tokio::select! {
        () = forward_frames(read, tx) => {}
        _ = shutdown => {
            match timeout(CLOSE_FRAME_TIMEOUT, write.send(Message::Close(None))).await {
                Ok(Ok(())) => debug!("sent close frame"),
                Ok(Err(err)) => debug!(%err, "close frame not sent"),
                Err(_) => warn!("timed out sending close frame"),
            }
        }
    }
}

/// Pump frames into the session channel until the socket closes or the
/// session stops listening.
pub(crate) async fn forward_frames<S>(mut read: S, tx: mpsc::UnboundedSender<StreamItem>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let item = match message {
            Ok(Message::Text(text)) => match parse_frame(text.as_str()) {
                Ok(Some(event)) => Ok(event),
                Ok(None) => {
                    debug!("skipping unknown stream event");
                    continue;
                }
                Err(err) => {
                    warn!(%err, "malformed stream frame");
                    Err(err)
                }
            },
            Ok(Message::Binary(_)) => Err(MalformedMessage::new("unexpected binary frame")),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Err(err) => {
                warn!(%err, "stream socket error");
                let _ = tx.send(Ok(StreamEvent::Error {
                    message: format!("socket error: {err}"),
                }));
                return;
            }
        };
        if tx.send(item).is_err() {
            debug!("stream receiver dropped");
            return;
        }
    }

    let _ = tx.send(Ok(StreamEvent::Closed));
}
