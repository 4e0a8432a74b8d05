use serde::{Deserialize, Serialize};

/// Title-like metadata carried alongside streamed snapshots and persisted pieces.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_zh: Option<String>,
}

impl TitleFields {
    #[must_use]
    pub fn new(title: Option<String>, title_zh: Option<String>) -> Self {
        Self { title, title_zh }
    }

    /// The title to surface: the localized one when present, otherwise the
    /// original. Blank values count as missing.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        non_blank(self.title_zh.as_deref()).or_else(|| non_blank(self.title.as_deref()))
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
