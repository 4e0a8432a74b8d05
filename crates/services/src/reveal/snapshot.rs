use piece_core::model::Takeaway;

/// Latest full list of items reported by the stream.
///
/// Written only by stream events; every write replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    items: Vec<Takeaway>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot. No merging and no shrink checks: the
    /// producer only grows the list.
    pub fn apply_partial(&mut self, snapshot: Vec<Takeaway>) {
        self.items = snapshot;
    }

    #[must_use]
    pub fn current(&self) -> &[Takeaway] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
