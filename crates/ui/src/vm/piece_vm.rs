use chrono::{DateTime, Utc};
use piece_core::model::{BadgeType, Piece, PieceId};
use piece_core::time::{MISSING_TIME, format_full_time, format_ticker_time};
use services::{RenderAdapter, RevealUpdate, RevealView, SessionPhase};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TakeawayCardVm {
    pub index: usize,
    pub question: String,
    pub answer_html: String,
    /// Changed by the latest reveal batch.
    pub fresh: bool,
}

/// Display state of the piece detail page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceVm {
    pub piece_id: PieceId,
    pub loaded: bool,
    pub title: String,
    pub badge: String,
    pub badge_type: BadgeType,
    pub source: String,
    pub author: String,
    pub time_text: String,
    pub age_text: String,
    pub tags: Vec<String>,
    pub cards: Vec<TakeawayCardVm>,
    pub streaming: bool,
    pub error: Option<String>,
    pub closed_without_complete: bool,
}

impl PieceVm {
    #[must_use]
    pub fn new(piece_id: PieceId) -> Self {
        Self {
            piece_id,
            loaded: false,
            title: "Piece".into(),
            badge: "—".into(),
            badge_type: BadgeType::Default,
            source: "SOURCE".into(),
            author: String::new(),
            time_text: MISSING_TIME.into(),
            age_text: MISSING_TIME.into(),
            tags: Vec::new(),
            cards: Vec::new(),
            streaming: false,
            error: None,
            closed_without_complete: false,
        }
    }

    #[must_use]
    pub fn has_takeaways(&self) -> bool {
        !self.cards.is_empty()
    }

    #[must_use]
    pub fn badge_class(&self) -> String {
        format!("badge badge-{}", self.badge_type.as_str().to_ascii_lowercase())
    }

    pub fn apply(&mut self, update: RevealUpdate, renderer: &dyn RenderAdapter, now: DateTime<Utc>) {
        match update {
            RevealUpdate::Loaded(piece) => {
                self.show_piece(&piece, now);
                self.error = None;
                // A session already pacing owns the cards.
                if !self.streaming {
                    self.cards = stored_cards(&piece, renderer);
                }
            }
            RevealUpdate::Reconciled(piece) => {
                self.show_piece(&piece, now);
                self.streaming = false;
                if piece.has_takeaways() {
                    self.cards = stored_cards(&piece, renderer);
                }
            }
            RevealUpdate::Title(title) => self.title = title,
            RevealUpdate::View(view) => self.show_view(&view),
        }
    }

    fn show_piece(&mut self, piece: &Piece, now: DateTime<Utc>) {
        self.loaded = true;
        self.title = piece.display_title().to_owned();
        self.badge = piece.badge();
        self.badge_type = piece.badge_type();
        self.source = piece.source_label();
        self.author = piece.metadata_author().unwrap_or_default().to_owned();
        self.time_text = format_full_time(piece.shown_at());
        self.age_text = format_ticker_time(piece.shown_at(), now);
        self.tags = piece.tags().to_vec();
    }

    fn show_view(&mut self, view: &RevealView) {
        self.streaming = view.is_revealing;
        self.error.clone_from(&view.error);
        self.closed_without_complete = view.closed_without_complete;

        // Sessions that never started leave the current cards alone.
        if view.phase == SessionPhase::Idle {
            return;
        }
        self.cards = view
            .revealed
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                item.as_ref().map(|item| TakeawayCardVm {
                    index,
                    question: item.question.clone(),
                    answer_html: item.answer_html.clone(),
                    fresh: view.changed.contains(&index),
                })
            })
            .collect();
    }
}

fn stored_cards(piece: &Piece, renderer: &dyn RenderAdapter) -> Vec<TakeawayCardVm> {
    piece
        .takeaways()
        .iter()
        .enumerate()
        .map(|(index, item)| TakeawayCardVm {
            index,
            question: item.question.clone(),
            answer_html: renderer.render(&item.answer),
            fresh: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piece_core::model::Takeaway;
    use piece_core::time::fixed_now;
    use services::{MarkdownRenderer, RevealedTakeaway};

    fn piece_id() -> PieceId {
        PieceId::new("p1").unwrap()
    }

    fn stored_piece() -> Piece {
        let mut piece = Piece::new(piece_id())
            .with_title("Deep Work")
            .with_takeaways(vec![Takeaway::new("Why?", "Because **focus**")]);
        piece.source_type = Some("pdf".into());
        piece.publisher = Some("Grand Central".into());
        piece.ai_extracted_tags = Some(vec!["focus".into()]);
        piece.created_at = Some(fixed_now() - chrono::Duration::hours(3));
        piece
    }

    fn revealed(question: &str, answer: &str) -> Option<RevealedTakeaway> {
        Some(RevealedTakeaway {
            question: question.into(),
            answer: answer.into(),
            answer_html: MarkdownRenderer.render(answer),
        })
    }

    fn streaming_view(revealed: Vec<Option<RevealedTakeaway>>, changed: Vec<usize>) -> RevealView {
        RevealView {
            piece_id: piece_id(),
            phase: SessionPhase::Streaming,
            revealed,
            changed,
            is_revealing: true,
            error: None,
            closed_without_complete: false,
        }
    }

    #[test]
    fn loaded_piece_fills_header_and_cards() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(RevealUpdate::Loaded(stored_piece()), &MarkdownRenderer, fixed_now());

        assert!(vm.loaded);
        assert_eq!(vm.title, "Deep Work");
        assert_eq!(vm.badge, "PDF");
        assert_eq!(vm.badge_class(), "badge badge-pdf");
        assert_eq!(vm.source, "GRAND CENTRAL");
        assert_eq!(vm.tags, vec!["focus".to_owned()]);
        assert_eq!(vm.age_text, "3H");
        assert_ne!(vm.time_text, MISSING_TIME);
        assert_eq!(vm.cards.len(), 1);
        assert!(vm.cards[0].answer_html.contains("<strong>focus</strong>"));
    }

    #[test]
    fn views_replace_cards_and_mark_fresh_items() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(RevealUpdate::Loaded(stored_piece()), &MarkdownRenderer, fixed_now());

        vm.apply(
            RevealUpdate::View(streaming_view(Vec::new(), Vec::new())),
            &MarkdownRenderer,
            fixed_now(),
        );
        assert!(vm.streaming);
        assert!(!vm.has_takeaways());

        vm.apply(
            RevealUpdate::View(streaming_view(
                vec![revealed("Q1", "First"), None, revealed("Q3", "Third")],
                vec![2],
            )),
            &MarkdownRenderer,
            fixed_now(),
        );
        let indices: Vec<_> = vm.cards.iter().map(|c| (c.index, c.fresh)).collect();
        assert_eq!(indices, vec![(0, false), (2, true)]);
    }

    #[test]
    fn loaded_while_streaming_keeps_revealed_cards() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(
            RevealUpdate::View(streaming_view(vec![revealed("Q1", "Live")], vec![0])),
            &MarkdownRenderer,
            fixed_now(),
        );
        vm.apply(RevealUpdate::Loaded(stored_piece()), &MarkdownRenderer, fixed_now());

        assert_eq!(vm.title, "Deep Work");
        assert_eq!(vm.cards[0].question, "Q1");
    }

    #[test]
    fn streamed_title_wins_until_reconciled() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(RevealUpdate::Title("流式标题".into()), &MarkdownRenderer, fixed_now());
        assert_eq!(vm.title, "流式标题");

        vm.apply(RevealUpdate::Reconciled(stored_piece()), &MarkdownRenderer, fixed_now());
        assert_eq!(vm.title, "Deep Work");
        assert!(!vm.streaming);
        assert_eq!(vm.cards[0].question, "Why?");
    }

    #[test]
    fn empty_reconciliation_keeps_streamed_cards() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(
            RevealUpdate::View(streaming_view(vec![revealed("Q1", "Live")], vec![0])),
            &MarkdownRenderer,
            fixed_now(),
        );
        vm.apply(
            RevealUpdate::Reconciled(Piece::new(piece_id())),
            &MarkdownRenderer,
            fixed_now(),
        );
        assert_eq!(vm.cards.len(), 1);
        assert_eq!(vm.title, "Untitled");
    }

    #[test]
    fn failed_start_only_surfaces_the_error() {
        let mut vm = PieceVm::new(piece_id());
        vm.apply(RevealUpdate::Loaded(stored_piece()), &MarkdownRenderer, fixed_now());
        vm.apply(
            RevealUpdate::View(RevealView::failed(piece_id(), "not signed in")),
            &MarkdownRenderer,
            fixed_now(),
        );
        assert_eq!(vm.error.as_deref(), Some("not signed in"));
        assert!(!vm.streaming);
        assert_eq!(vm.cards.len(), 1);
    }
}
