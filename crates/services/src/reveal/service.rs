use std::sync::Arc;

use piece_core::model::PieceId;
use storage::PieceRepository;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::controller::{RevealCommand, RevealController};
use super::sink::RevealSink;
use crate::config::RevealConfig;
use crate::render::{MarkdownRenderer, RenderAdapter};
use crate::stream::{Credentials, StreamClient};

/// Wires the reveal controller to its collaborators.
#[derive(Clone)]
pub struct RevealService {
    client: Arc<dyn StreamClient>,
    pieces: Arc<dyn PieceRepository>,
    renderer: Arc<dyn RenderAdapter>,
    config: RevealConfig,
    credentials: Option<Credentials>,
}

impl RevealService {
    #[must_use]
    pub fn new(client: Arc<dyn StreamClient>, pieces: Arc<dyn PieceRepository>) -> Self {
        Self {
            client,
            pieces,
            renderer: Arc::new(MarkdownRenderer),
            config: RevealConfig::default(),
            credentials: None,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn RenderAdapter>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RevealConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Spawn a controller for one view, publishing into `sink`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn spawn(&self, sink: Arc<dyn RevealSink>) -> RevealHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = RevealController::new(
            Arc::clone(&self.client),
            Arc::clone(&self.pieces),
            Arc::clone(&self.renderer),
            sink,
            self.config,
            self.credentials.clone(),
            rx,
        );
        RevealHandle {
            commands: tx,
            task: tokio::spawn(controller.run()),
        }
    }
}

/// User-facing triggers for one running controller.
///
/// Dropping the handle tears the controller down.
#[derive(Debug)]
pub struct RevealHandle {
    commands: mpsc::UnboundedSender<RevealCommand>,
    task: JoinHandle<()>,
}

impl RevealHandle {
    /// Load the piece and start generating if it has no items yet.
    pub fn open(&self, piece_id: PieceId) {
        self.send(RevealCommand::Open(piece_id));
    }

    /// Start a reveal session. A no-op while one is streaming for the same piece.
    pub fn request_generation(&self, piece_id: PieceId) {
        self.send(RevealCommand::Generate(piece_id));
    }

    /// Cancel any session and start over with empty state.
    pub fn request_regeneration(&self, piece_id: PieceId) {
        self.send(RevealCommand::Regenerate(piece_id));
    }

    /// Cancel the session and stop the controller.
    pub fn view_torn_down(&self) {
        self.send(RevealCommand::TearDown);
    }

    /// Wait for the controller task to stop.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(%err, "reveal controller task failed");
        }
    }

    fn send(&self, command: RevealCommand) {
        if self.commands.send(command).is_err() {
            debug!("reveal controller already stopped");
        }
    }
}
