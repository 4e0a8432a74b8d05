use piece_core::model::Takeaway;

use super::pacer::RevealedState;

/// True when every snapshot item is revealed with exactly its current answer.
#[must_use]
pub fn is_caught_up(snapshot: &[Takeaway], revealed: &RevealedState) -> bool {
    snapshot.len() == revealed.len()
        && snapshot.iter().enumerate().all(|(index, item)| {
            revealed
                .get(index)
                .is_some_and(|shown| shown.answer == item.answer)
        })
}

/// Decides when a session may shut down.
///
/// The network finishing is not enough: the pacer must also have caught up
/// with the last burst of content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionDetector {
    marked_complete: bool,
    closed_without_complete: bool,
}

impl CompletionDetector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A `complete` event arrived.
    pub fn mark_complete(&mut self) {
        self.marked_complete = true;
    }

    /// The transport closed. Counts as completion; remembered separately when
    /// no `complete` preceded it.
    pub fn mark_closed(&mut self) {
        if !self.marked_complete {
            self.marked_complete = true;
            self.closed_without_complete = true;
        }
    }

    #[must_use]
    pub fn is_marked_complete(&self) -> bool {
        self.marked_complete
    }

    #[must_use]
    pub fn closed_without_complete(&self) -> bool {
        self.closed_without_complete
    }

    #[must_use]
    pub fn should_shut_down(&self, snapshot: &[Takeaway], revealed: &RevealedState) -> bool {
        self.marked_complete && is_caught_up(snapshot, revealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::pacer::RevealedTakeaway;

    fn shown(question: &str, answer: &str) -> RevealedTakeaway {
        RevealedTakeaway {
            question: question.into(),
            answer: answer.into(),
            answer_html: String::new(),
        }
    }

    #[test]
    fn caught_up_requires_equal_length_and_answers() {
        let snapshot = vec![Takeaway::new("Q1", "one"), Takeaway::new("Q2", "two")];
        let mut revealed = RevealedState::default();
        assert!(!is_caught_up(&snapshot, &revealed));

        revealed.set(1, shown("Q2", "two"));
        assert!(!is_caught_up(&snapshot, &revealed), "hole at index 0");

        revealed.set(0, shown("Q1", "on"));
        assert!(!is_caught_up(&snapshot, &revealed), "stale answer");

        revealed.set(0, shown("Q1", "one"));
        assert!(is_caught_up(&snapshot, &revealed));
    }

    #[test]
    fn empty_snapshot_is_trivially_caught_up() {
        assert!(is_caught_up(&[], &RevealedState::default()));
    }

    #[test]
    fn shutdown_needs_both_conditions() {
        let snapshot = vec![Takeaway::new("Q1", "one")];
        let mut revealed = RevealedState::default();
        revealed.set(0, shown("Q1", "one"));

        let mut detector = CompletionDetector::new();
        assert!(!detector.should_shut_down(&snapshot, &revealed));
        detector.mark_complete();
        assert!(!detector.should_shut_down(&snapshot, &RevealedState::default()));
        assert!(detector.should_shut_down(&snapshot, &revealed));
    }

    #[test]
    fn close_after_complete_is_not_flagged() {
        let mut detector = CompletionDetector::new();
        detector.mark_complete();
        detector.mark_closed();
        assert!(!detector.closed_without_complete());

        let mut detector = CompletionDetector::new();
        detector.mark_closed();
        assert!(detector.is_marked_complete());
        assert!(detector.closed_without_complete());
    }
}
