use piece_core::model::Takeaway;
use tracing::warn;

use crate::render::RenderAdapter;

/// An item as currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedTakeaway {
    pub question: String,
    pub answer: String,
    pub answer_html: String,
}

impl RevealedTakeaway {
    fn from_snapshot(item: &Takeaway, renderer: &dyn RenderAdapter) -> Self {
        Self {
            question: item.question.clone(),
            answer: item.answer.clone(),
            answer_html: renderer.render(&item.answer),
        }
    }
}

/// What the user has been shown, in the snapshot's index space.
///
/// `None` marks an index that exists in the snapshot but has not been
/// revealed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealedState {
    items: Vec<Option<RevealedTakeaway>>,
}

impl RevealedState {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RevealedTakeaway> {
        self.items.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn items(&self) -> &[Option<RevealedTakeaway>] {
        &self.items
    }

    /// Number of indices actually shown.
    #[must_use]
    pub fn shown_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }

    pub(crate) fn set(&mut self, index: usize, item: RevealedTakeaway) {
        if index >= self.items.len() {
            self.items.resize(index + 1, None);
        }
        self.items[index] = Some(item);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}

/// One per-index change produced by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedUpdate {
    pub index: usize,
    pub item: RevealedTakeaway,
    /// First appearance rather than a growing answer.
    pub appeared: bool,
}

/// Every change of one tick, applied to the sink as a single update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealBatch {
    pub updates: Vec<RevealedUpdate>,
    /// Indices dropped because the snapshot shrank.
    pub truncated: bool,
}

impl RevealBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && !self.truncated
    }

    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.updates.iter().map(|update| update.index).collect()
    }
}

/// Diffs the snapshot against the revealed state once per tick.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    revealed: RevealedState,
    threshold: usize,
}

impl Pacer {
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            revealed: RevealedState::default(),
            threshold,
        }
    }

    #[must_use]
    pub fn revealed(&self) -> &RevealedState {
        &self.revealed
    }

    pub fn reset(&mut self) {
        self.revealed.clear();
    }

    /// Run one tick against `snapshot`.
    ///
    /// New indices appear once their answer is longer than the threshold;
    /// shown indices whose answer changed are replaced and re-rendered.
    /// Returns `None` when nothing changed.
    pub fn tick(
        &mut self,
        snapshot: &[Takeaway],
        renderer: &dyn RenderAdapter,
    ) -> Option<RevealBatch> {
        let mut batch = RevealBatch::default();

        if self.revealed.len() > snapshot.len() {
            warn!(
                revealed = self.revealed.len(),
                snapshot = snapshot.len(),
                "snapshot shrank below revealed items"
            );
            self.revealed.truncate(snapshot.len());
            batch.truncated = true;
        }

        for (index, item) in snapshot.iter().enumerate() {
            match self.revealed.get(index) {
                None if item.answer_len() > self.threshold => {
                    batch.updates.push(RevealedUpdate {
                        index,
                        item: RevealedTakeaway::from_snapshot(item, renderer),
                        appeared: true,
                    });
                }
                Some(shown) if shown.answer != item.answer => {
                    batch.updates.push(RevealedUpdate {
                        index,
                        item: RevealedTakeaway::from_snapshot(item, renderer),
                        appeared: false,
                    });
                }
                _ => {}
            }
        }

        for update in &batch.updates {
            self.revealed.set(update.index, update.item.clone());
        }

        (!batch.is_empty()).then_some(batch)
    }
}
