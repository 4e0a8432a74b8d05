use std::future;
use std::sync::Arc;

use piece_core::model::PieceId;
use storage::PieceRepository;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::session::RevealSession;
use super::sink::{RevealSink, RevealUpdate, RevealView};
use crate::config::RevealConfig;
use crate::error::StreamClientError;
use crate::render::RenderAdapter;
use crate::stream::{Credentials, StreamClient, StreamEvent, StreamHandle, StreamItem};

/// Error prefix on the final view when the reconciliation fetch fails.
pub const RECONCILIATION_FAILED_ERROR: &str = "reconciliation failed";

/// User actions delivered to the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RevealCommand {
    Open(PieceId),
    Generate(PieceId),
    Regenerate(PieceId),
    TearDown,
}

/// The live parts of a session: the session value plus its stream and timer.
struct ActiveSession {
    session: RevealSession,
    stream: Option<StreamHandle>,
    /// The pacer timer. At most one per session; `None` when not pacing.
    timer: Option<Interval>,
}

impl ActiveSession {
    fn shut_down(mut self) {
        self.timer = None;
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
    }
}

enum Wake {
    Command(Option<RevealCommand>),
    Stream(Option<StreamItem>),
    Tick,
}

/// Session lifecycle manager.
///
/// Runs as a single task: commands, stream events and pacer ticks are
/// handled one at a time, so session state needs no locking.
pub(crate) struct RevealController {
    client: Arc<dyn StreamClient>,
    pieces: Arc<dyn PieceRepository>,
    renderer: Arc<dyn RenderAdapter>,
    sink: Arc<dyn RevealSink>,
    config: RevealConfig,
    credentials: Option<Credentials>,
    commands: mpsc::UnboundedReceiver<RevealCommand>,
    active: Option<ActiveSession>,
    /// Title currently on screen, per piece.
    known_title: Option<(PieceId, String)>,
}

impl RevealController {
    pub(crate) fn new(
        client: Arc<dyn StreamClient>,
        pieces: Arc<dyn PieceRepository>,
        renderer: Arc<dyn RenderAdapter>,
        sink: Arc<dyn RevealSink>,
        config: RevealConfig,
        credentials: Option<Credentials>,
        commands: mpsc::UnboundedReceiver<RevealCommand>,
    ) -> Self {
        Self {
            client,
            pieces,
            renderer,
            sink,
            config,
            credentials,
            commands,
            active: None,
            known_title: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let (stream, timer) = match self.active.as_mut() {
                Some(active) => (active.stream.as_mut(), active.timer.as_mut()),
                None => (None, None),
            };

            // User actions win over stream events, which win over ticks.
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => Wake::Command(command),
                item = next_item(stream) => Wake::Stream(item),
                () = next_tick(timer) => Wake::Tick,
            };

            match wake {
                Wake::Command(None | Some(RevealCommand::TearDown)) => {
                    self.cancel("view torn down");
                    break;
                }
                Wake::Command(Some(command)) => self.handle_command(command).await,
                // A transport that vanishes without a close frame still closed.
                Wake::Stream(item) => self.handle_stream(item.unwrap_or(Ok(StreamEvent::Closed))),
                Wake::Tick => self.handle_tick().await,
            }
        }
        debug!("reveal controller stopped");
    }

    async fn handle_command(&mut self, command: RevealCommand) {
        match command {
            RevealCommand::Open(piece_id) => self.open(piece_id).await,
            RevealCommand::Generate(piece_id) => self.start(piece_id).await,
            RevealCommand::Regenerate(piece_id) => {
                self.cancel("regenerate requested");
                self.start(piece_id).await;
            }
            RevealCommand::TearDown => self.cancel("view torn down"),
        }
    }

    /// Initial load: show the durable piece, stream only when nothing was extracted yet.
    async fn open(&mut self, piece_id: PieceId) {
        match self.pieces.get_piece(&piece_id).await {
            Ok(piece) => {
                let needs_generation = !piece.has_takeaways();
                self.known_title = Some((piece_id.clone(), piece.display_title().to_owned()));
                self.sink.publish(RevealUpdate::Loaded(piece));
                if needs_generation {
                    self.start(piece_id).await;
                } else {
                    debug!(%piece_id, "piece already extracted");
                }
            }
            Err(err) => {
                warn!(%piece_id, %err, "piece load failed");
                self.sink.publish(RevealUpdate::View(RevealView::failed(
                    piece_id,
                    format!("piece load failed: {err}"),
                )));
            }
        }
    }

    async fn start(&mut self, piece_id: PieceId) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.session.piece_id() == &piece_id)
        {
            debug!(%piece_id, "reveal already streaming");
            return;
        }
        self.cancel("superseded by another piece");

        let Some(credentials) = self.credentials.clone() else {
            self.fail_start(piece_id, &StreamClientError::MissingCredentials);
            return;
        };

        match self.client.open(&piece_id, &credentials).await {
            Ok(stream) => {
                info!(%piece_id, "reveal session started");
                let title = self
                    .known_title
                    .as_ref()
                    .filter(|(id, _)| id == &piece_id)
                    .map(|(_, title)| title.clone());
                let session = RevealSession::new(piece_id, self.config.reveal_threshold)
                    .with_surfaced_title(title);
                self.sink.publish(RevealUpdate::View(session.view(None)));
                self.active = Some(ActiveSession {
                    session,
                    stream: Some(stream),
                    timer: None,
                });
            }
            Err(err) => self.fail_start(piece_id, &err),
        }
    }

    fn fail_start(&self, piece_id: PieceId, err: &StreamClientError) {
        warn!(%piece_id, %err, "failed to open extraction stream");
        self.sink
            .publish(RevealUpdate::View(RevealView::failed(piece_id, err.to_string())));
    }

    fn cancel(&mut self, reason: &str) {
        if let Some(mut active) = self.active.take() {
            active.session.cancel();
            info!(piece_id = %active.session.piece_id(), reason, "reveal session cancelled");
            active.shut_down();
        }
    }

    fn handle_stream(&mut self, item: StreamItem) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let outcome = active.session.apply(item);

        if let Some(title) = outcome.title {
            self.known_title = Some((active.session.piece_id().clone(), title.clone()));
            self.sink.publish(RevealUpdate::Title(title));
        }
        if outcome.stream_finished {
            if let Some(mut stream) = active.stream.take() {
                stream.close();
            }
        }
        if outcome.publish {
            self.sink
                .publish(RevealUpdate::View(active.session.view(None)));
        }

        if !active.session.phase().is_active() {
            info!(piece_id = %active.session.piece_id(), phase = ?active.session.phase(), "reveal session ended");
            if let Some(active) = self.active.take() {
                active.shut_down();
            }
            return;
        }

        if outcome.start_pacer && active.timer.is_none() {
            active.timer = Some(pacer_timer(&self.config));
        }
    }

    async fn handle_tick(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let outcome = active.session.tick(self.renderer.as_ref());

        if outcome.batch.is_some() || outcome.completed {
            self.sink.publish(RevealUpdate::View(
                active.session.view(outcome.batch.as_ref()),
            ));
        }

        if !outcome.completed {
            return;
        }
        if let Some(active) = self.active.take() {
            let piece_id = active.session.piece_id().clone();
            let final_view = active.session.view(None);
            active.shut_down();
            self.reconcile(piece_id, final_view).await;
        }
    }

    /// Re-read the durable piece once the streamed view has caught up.
    async fn reconcile(&mut self, piece_id: PieceId, final_view: RevealView) {
        match self.pieces.get_piece(&piece_id).await {
            Ok(piece) => {
                info!(%piece_id, items = piece.takeaways().len(), "reconciled with backing store");
                self.known_title = Some((piece_id, piece.display_title().to_owned()));
                self.sink.publish(RevealUpdate::Reconciled(piece));
            }
            Err(err) => {
                warn!(%piece_id, %err, "reconciliation fetch failed");
                let mut view = final_view;
                view.error = Some(format!("{RECONCILIATION_FAILED_ERROR}: {err}"));
                self.sink.publish(RevealUpdate::View(view));
            }
        }
    }
}

fn pacer_timer(config: &RevealConfig) -> Interval {
    let period = config.tick_interval;
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn next_item(stream: Option<&mut StreamHandle>) -> Option<StreamItem> {
    match stream {
        Some(stream) => stream.next().await,
        None => future::pending().await,
    }
}

async fn next_tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}
