use piece_core::model::PieceId;
use tracing::{debug, info, warn};

use super::completion::CompletionDetector;
use super::pacer::{Pacer, RevealBatch, RevealedState};
use super::sink::RevealView;
use super::snapshot::SnapshotStore;
use crate::render::RenderAdapter;
use crate::stream::{StreamEvent, StreamItem};

/// Error surfaced for a frame that could not be parsed.
pub const MALFORMED_MESSAGE_ERROR: &str = "bad stream message";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
    CaughtUpComplete,
    Errored,
    Cancelled,
}

impl SessionPhase {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// What the lifecycle manager must do after a stream event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// A title that differs from the one already surfaced.
    pub title: Option<String>,
    /// Make sure the pacer timer is running.
    pub start_pacer: bool,
    /// Session state visible to the sink changed outside a tick.
    pub publish: bool,
    /// The stream has nothing more to deliver; drop its handle.
    pub stream_finished: bool,
}

/// Result of one pacer tick.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub batch: Option<RevealBatch>,
    /// The session just reached `CaughtUpComplete`.
    pub completed: bool,
}

/// State of one streaming + reveal cycle for a single piece.
///
/// Owns the snapshot store and the revealed state. Timers and transports
/// live with the lifecycle manager; this type only reacts to events and
/// ticks, so it can be driven synchronously.
#[derive(Debug)]
pub struct RevealSession {
    piece_id: PieceId,
    phase: SessionPhase,
    snapshot: SnapshotStore,
    pacer: Pacer,
    completion: CompletionDetector,
    surfaced_title: Option<String>,
    error: Option<String>,
}

impl RevealSession {
    /// A freshly opened session: empty snapshot, nothing revealed, `Streaming`.
    #[must_use]
    pub fn new(piece_id: PieceId, reveal_threshold: usize) -> Self {
        Self {
            piece_id,
            phase: SessionPhase::Streaming,
            snapshot: SnapshotStore::new(),
            pacer: Pacer::new(reveal_threshold),
            completion: CompletionDetector::new(),
            surfaced_title: None,
            error: None,
        }
    }

    /// Seed the title already on screen so an identical streamed title is not re-surfaced.
    #[must_use]
    pub fn with_surfaced_title(mut self, title: Option<String>) -> Self {
        self.surfaced_title = title;
        self
    }

    #[must_use]
    pub fn piece_id(&self) -> &PieceId {
        &self.piece_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    #[must_use]
    pub fn revealed(&self) -> &RevealedState {
        self.pacer.revealed()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn is_marked_complete(&self) -> bool {
        self.completion.is_marked_complete()
    }

    /// Apply one stream item in arrival order.
    pub fn apply(&mut self, item: StreamItem) -> EventOutcome {
        if !self.phase.is_active() {
            debug!(piece_id = %self.piece_id, phase = ?self.phase, "ignoring event for inactive session");
            return EventOutcome::default();
        }

        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!(piece_id = %self.piece_id, %err, "malformed stream message");
                self.error = Some(MALFORMED_MESSAGE_ERROR.to_owned());
                return EventOutcome {
                    publish: true,
                    ..EventOutcome::default()
                };
            }
        };

        match event {
            StreamEvent::Partial(partial) => {
                let mut outcome = EventOutcome::default();
                if let Some(title) = partial
                    .titles
                    .display_title()
                    .filter(|title| self.surfaced_title.as_deref() != Some(*title))
                {
                    self.surfaced_title = Some(title.to_owned());
                    outcome.title = Some(title.to_owned());
                }
                if let Some(takeaways) = partial.takeaways {
                    self.snapshot.apply_partial(takeaways);
                    outcome.start_pacer = true;
                }
                outcome
            }
            StreamEvent::Complete => {
                debug!(piece_id = %self.piece_id, "stream marked complete");
                self.completion.mark_complete();
                EventOutcome {
                    start_pacer: true,
                    ..EventOutcome::default()
                }
            }
            StreamEvent::Error { message } => {
                warn!(piece_id = %self.piece_id, %message, "stream error");
                self.error = Some(message);
                self.phase = SessionPhase::Errored;
                EventOutcome {
                    publish: true,
                    stream_finished: true,
                    ..EventOutcome::default()
                }
            }
            StreamEvent::Closed => {
                self.completion.mark_closed();
                if self.completion.closed_without_complete() {
                    warn!(piece_id = %self.piece_id, "stream closed without complete");
                }
                EventOutcome {
                    start_pacer: true,
                    stream_finished: true,
                    ..EventOutcome::default()
                }
            }
        }
    }

    /// One pacer tick: reveal what is ready, then check for completion.
    pub fn tick(&mut self, renderer: &dyn RenderAdapter) -> TickOutcome {
        if !self.phase.is_active() {
            return TickOutcome::default();
        }

        let batch = self.pacer.tick(self.snapshot.current(), renderer);
        let completed = self
            .completion
            .should_shut_down(self.snapshot.current(), self.pacer.revealed());
        if completed {
            info!(
                piece_id = %self.piece_id,
                items = self.snapshot.len(),
                "reveal caught up with completed stream"
            );
            self.phase = SessionPhase::CaughtUpComplete;
        }

        TickOutcome { batch, completed }
    }

    /// Stop the session without waiting for catch-up.
    pub fn cancel(&mut self) {
        if self.phase.is_active() {
            self.phase = SessionPhase::Cancelled;
        }
    }

    /// Current view for the sink; `changed` lists the indices touched by `batch`.
    #[must_use]
    pub fn view(&self, batch: Option<&RevealBatch>) -> RevealView {
        RevealView {
            piece_id: self.piece_id.clone(),
            phase: self.phase,
            revealed: self.pacer.revealed().items().to_vec(),
            changed: batch.map(RevealBatch::indices).unwrap_or_default(),
            is_revealing: self.phase.is_active(),
            error: self.error.clone(),
            closed_without_complete: self.completion.closed_without_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MarkdownRenderer;
    use crate::stream::{MalformedMessage, PartialSnapshot};
    use piece_core::model::Takeaway;

    fn session() -> RevealSession {
        RevealSession::new(PieceId::new("p1").unwrap(), 2)
    }

    fn partial(answers: &[&str]) -> StreamItem {
        Ok(StreamEvent::Partial(PartialSnapshot::new(
            answers
                .iter()
                .enumerate()
                .map(|(i, a)| Takeaway::new(format!("Q{}", i + 1), *a))
                .collect(),
        )))
    }

    #[test]
    fn partial_writes_snapshot_and_requests_pacer() {
        let mut s = session();
        let outcome = s.apply(partial(&["Hello"]));
        assert!(outcome.start_pacer);
        assert!(!outcome.publish);
        assert_eq!(s.snapshot().len(), 1);
        assert!(s.revealed().is_empty(), "nothing is revealed before a tick");
    }

    #[test]
    fn changed_title_is_surfaced_once() {
        let mut s = session().with_surfaced_title(Some("Untitled".into()));
        let event = |title: &str| {
            Ok(StreamEvent::Partial(PartialSnapshot::default().with_title(title)))
        };

        let outcome = s.apply(event("Deep Work"));
        assert_eq!(outcome.title.as_deref(), Some("Deep Work"));
        assert!(!outcome.start_pacer, "title-only frames leave the snapshot alone");

        assert_eq!(s.apply(event("Deep Work")).title, None);
    }

    #[test]
    fn malformed_message_flags_error_but_keeps_streaming() {
        let mut s = session();
        let outcome = s.apply(Err(MalformedMessage::new("eof")));
        assert!(outcome.publish);
        assert_eq!(s.error(), Some(MALFORMED_MESSAGE_ERROR));
        assert_eq!(s.phase(), SessionPhase::Streaming);

        s.apply(partial(&["Still arriving"]));
        assert!(s.tick(&MarkdownRenderer).batch.is_some());
    }

    #[test]
    fn error_event_is_terminal() {
        let mut s = session();
        s.apply(partial(&["Visible soon"]));
        let outcome = s.apply(Ok(StreamEvent::Error {
            message: "quota exceeded".into(),
        }));
        assert!(outcome.publish && outcome.stream_finished);
        assert_eq!(s.phase(), SessionPhase::Errored);
        assert_eq!(s.tick(&MarkdownRenderer), TickOutcome::default());

        let view = s.view(None);
        assert!(!view.is_revealing);
        assert_eq!(view.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn events_after_cancel_are_ignored() {
        let mut s = session();
        s.cancel();
        assert_eq!(s.phase(), SessionPhase::Cancelled);
        assert_eq!(s.apply(partial(&["Late answer"])), EventOutcome::default());
        assert!(s.snapshot().is_empty());
    }

    #[test]
    fn close_without_complete_finishes_and_is_flagged() {
        let mut s = session();
        s.apply(partial(&["Only answer"]));
        let outcome = s.apply(Ok(StreamEvent::Closed));
        assert!(outcome.stream_finished && outcome.start_pacer);

        let tick = s.tick(&MarkdownRenderer);
        assert!(tick.completed);
        assert!(s.view(tick.batch.as_ref()).closed_without_complete);
    }
}
