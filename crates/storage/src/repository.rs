use async_trait::async_trait;
use piece_core::model::{Piece, PieceId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),
}

/// Read access to the durable copy of a piece.
///
/// Used for the initial load of a detail view and for the reconciliation
/// read once a reveal session has caught up.
#[async_trait]
pub trait PieceRepository: Send + Sync {
    /// Fetch a piece by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_piece(&self, id: &PieceId) -> Result<Piece, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    pieces: Arc<Mutex<HashMap<PieceId, Piece>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pieces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persist or replace a piece.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn upsert_piece(&self, piece: Piece) -> Result<(), StorageError> {
        let mut guard = self
            .pieces
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(piece.id.clone(), piece);
        Ok(())
    }
}

#[async_trait]
impl PieceRepository for InMemoryRepository {
    async fn get_piece(&self, id: &PieceId) -> Result<Piece, StorageError> {
        let guard = self
            .pieces
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_core::model::Takeaway;

    #[tokio::test]
    async fn upsert_replaces_existing_piece() {
        let repo = InMemoryRepository::new();
        let id = PieceId::new("p1").unwrap();
        repo.upsert_piece(Piece::new(id.clone())).unwrap();
        repo.upsert_piece(
            Piece::new(id.clone()).with_takeaways(vec![Takeaway::new("Q", "Answer")]),
        )
        .unwrap();

        let fetched = repo.get_piece(&id).await.unwrap();
        assert_eq!(fetched.takeaways().len(), 1);
    }

    #[tokio::test]
    async fn missing_piece_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .get_piece(&PieceId::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
