use std::sync::Arc;

use piece_core::model::PieceId;
use services::{Clock, RevealService};

/// What the composition root hands to the UI.
pub trait UiApp: Send + Sync {
    fn piece_id(&self) -> PieceId;
    fn clock(&self) -> Clock;
    fn reveal_service(&self) -> Arc<RevealService>;
}

#[derive(Clone)]
pub struct AppContext {
    piece_id: PieceId,
    clock: Clock,
    reveal_service: Arc<RevealService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            piece_id: app.piece_id(),
            clock: app.clock(),
            reveal_service: app.reveal_service(),
        }
    }

    /// Piece opened on launch.
    #[must_use]
    pub fn piece_id(&self) -> PieceId {
        self.piece_id.clone()
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn reveal_service(&self) -> Arc<RevealService> {
        Arc::clone(&self.reveal_service)
    }
}

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
