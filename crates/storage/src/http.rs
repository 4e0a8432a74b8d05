use async_trait::async_trait;
use piece_core::model::{Piece, PieceId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::repository::{PieceRepository, StorageError};

/// `PieceRepository` backed by the mini-program HTTP API.
#[derive(Clone)]
pub struct ApiPieceRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiPieceRepository {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn piece_url(&self, id: &PieceId) -> String {
        format!("{}/pieces/{}", self.base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl PieceRepository for ApiPieceRepository {
    async fn get_piece(&self, id: &PieceId) -> Result<Piece, StorageError> {
        let url = self.piece_url(id);
        debug!(%url, "fetching piece");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }

        // Failed calls still carry `{success: false, error}`; prefer that message.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match piece_from_body(&body) {
            Err(StorageError::Serialization(_)) if !status.is_success() => Err(
                StorageError::Connection(format!("request failed with status {status}")),
            ),
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PieceEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    piece: Option<Piece>,
    #[serde(default)]
    error: Option<String>,
}

fn piece_from_body(body: &str) -> Result<Piece, StorageError> {
    let envelope: PieceEnvelope =
        serde_json::from_str(body).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if !envelope.success {
        return Err(StorageError::Rejected(
            envelope
                .error
                .unwrap_or_else(|| "failed to load piece".to_owned()),
        ));
    }
    envelope.piece.ok_or(StorageError::NotFound)
}
