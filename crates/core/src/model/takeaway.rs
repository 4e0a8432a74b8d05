use serde::{Deserialize, Deserializer, Serialize};

/// A single question/answer item extracted from a piece.
///
/// Answers grow over the life of a stream but are always replaced wholesale
/// by newer snapshots, never appended to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Takeaway {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub answer: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Takeaway {
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Answer length in characters, which is what the reveal threshold counts.
    #[must_use]
    pub fn answer_len(&self) -> usize {
        self.answer.chars().count()
    }
}
