use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::PieceId;
use super::takeaway::Takeaway;
use super::title::{TitleFields, non_blank};

/// Metadata block attached to a persisted piece.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PieceMetadata {
    #[serde(flatten)]
    pub titles: TitleFields,
    #[serde(default)]
    pub author: Option<String>,
}

/// Short source code rendered on the piece avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeType {
    Pdf,
    YouTube,
    WeChat,
    Default,
}

impl BadgeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::YouTube => "YTB",
            Self::WeChat => "WX",
            Self::Default => "DEFAULT",
        }
    }
}

/// A piece as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub metadata: Option<PieceMetadata>,
    #[serde(default, deserialize_with = "lenient")]
    pub key_takeaways: Option<Vec<Takeaway>>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pub extracted_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub ai_extracted_tags: Option<Vec<String>>,
}

/// A display-only field: anything of the wrong shape reads as absent.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Value(value)) => Some(value),
        Some(Lenient::Other(IgnoredAny)) | None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Text(String),
    Millis(i64),
}

fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match lenient::<D, RawTime>(deserializer)? {
        Some(RawTime::Text(text)) => parse_time(&text),
        Some(RawTime::Millis(millis)) => DateTime::from_timestamp_millis(millis),
        None => None,
    })
}

/// RFC 3339, or a zone-less `YYYY-MM-DD hh:mm:ss` taken as UTC.
fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

impl Piece {
    /// A bare piece with nothing extracted yet.
    #[must_use]
    pub fn new(id: PieceId) -> Self {
        Self {
            id,
            filename: None,
            metadata: None,
            key_takeaways: None,
            source_type: None,
            media_type: None,
            publisher: None,
            author: None,
            created_at: None,
            extracted_at: None,
            ai_extracted_tags: None,
        }
    }

    #[must_use]
    pub fn with_takeaways(mut self, takeaways: Vec<Takeaway>) -> Self {
        self.key_takeaways = Some(takeaways);
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let metadata = self.metadata.get_or_insert_with(PieceMetadata::default);
        metadata.titles.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn takeaways(&self) -> &[Takeaway] {
        self.key_takeaways.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn has_takeaways(&self) -> bool {
        !self.takeaways().is_empty()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        self.ai_extracted_tags.as_deref().unwrap_or_default()
    }

    /// Localized title, original title, filename, then `"Untitled"`.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.titles.display_title())
            .or_else(|| non_blank(self.filename.as_deref()))
            .unwrap_or("Untitled")
    }

    #[must_use]
    pub fn metadata_author(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| non_blank(m.author.as_deref()))
    }

    /// Timestamp shown on the detail page: creation, else extraction time.
    #[must_use]
    pub fn shown_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.extracted_at)
    }

    fn source_kind(&self) -> String {
        non_blank(self.source_type.as_deref())
            .or_else(|| non_blank(self.media_type.as_deref()))
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Two or three letter source code for the piece avatar.
    #[must_use]
    pub fn badge(&self) -> String {
        let kind = self.source_kind();
        if kind.contains("PDF") {
            return "PDF".into();
        }
        if kind.contains("WECHAT") || kind.contains("WX") {
            return "WX".into();
        }
        if kind.contains("LINK") || kind.contains("URL") {
            return "LNK".into();
        }
        if kind.contains("YOUTUBE") || kind.contains("YTB") {
            return "YTB".into();
        }
        if kind.is_empty() {
            return "—".into();
        }
        kind.chars().take(3).collect()
    }

    #[must_use]
    pub fn badge_type(&self) -> BadgeType {
        let kind = self.source_kind();
        if kind.contains("PDF") {
            BadgeType::Pdf
        } else if kind.contains("YOUTUBE") || kind.contains("YTB") {
            BadgeType::YouTube
        } else if kind.contains("WECHAT") || kind.contains("WX") {
            BadgeType::WeChat
        } else {
            BadgeType::Default
        }
    }

    /// Upper-cased publisher or author, `"SOURCE"` when neither is known.
    #[must_use]
    pub fn source_label(&self) -> String {
        non_blank(self.publisher.as_deref())
            .or_else(|| non_blank(self.author.as_deref()))
            .unwrap_or("SOURCE")
            .to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece() -> Piece {
        Piece::new(PieceId::new("p1").unwrap())
    }

    #[test]
    fn display_title_falls_back_in_order() {
        let mut p = piece();
        assert_eq!(p.display_title(), "Untitled");
        p.filename = Some("report.pdf".into());
        assert_eq!(p.display_title(), "report.pdf");
        p = p.with_title("Report");
        assert_eq!(p.display_title(), "Report");
        p.metadata.as_mut().unwrap().titles.title_zh = Some("报告".into());
        assert_eq!(p.display_title(), "报告");
    }

    #[test]
    fn badge_maps_known_sources() {
        let mut p = piece();
        assert_eq!(p.badge(), "—");
        assert_eq!(p.badge_type(), BadgeType::Default);

        p.source_type = Some("pdf_upload".into());
        assert_eq!(p.badge(), "PDF");
        assert_eq!(p.badge_type(), BadgeType::Pdf);

        p.source_type = Some("wechat_article".into());
        assert_eq!(p.badge(), "WX");
        assert_eq!(p.badge_type(), BadgeType::WeChat);

        p.source_type = Some("url".into());
        assert_eq!(p.badge(), "LNK");
        assert_eq!(p.badge_type(), BadgeType::Default);

        p.source_type = None;
        p.media_type = Some("youtube".into());
        assert_eq!(p.badge(), "YTB");
        assert_eq!(p.badge_type().as_str(), "YTB");

        p.media_type = Some("podcast".into());
        assert_eq!(p.badge(), "POD");
    }

    #[test]
    fn source_label_prefers_publisher() {
        let mut p = piece();
        assert_eq!(p.source_label(), "SOURCE");
        p.author = Some("Jane".into());
        assert_eq!(p.source_label(), "JANE");
        p.publisher = Some("The Paper".into());
        assert_eq!(p.source_label(), "THE PAPER");
    }

    #[test]
    fn deserializes_backend_shape() {
        let json = r#"{
            "id": "p9",
            "filename": "a.pdf",
            "metadata": {"title": "A", "title_zh": null, "author": "Ann"},
            "key_takeaways": [{"question": "Q", "answer": "A long answer"}],
            "created_at": "2024-01-02T03:04:05Z",
            "ai_extracted_tags": ["ai"]
        }"#;
        let p: Piece = serde_json::from_str(json).unwrap();
        assert_eq!(p.display_title(), "A");
        assert_eq!(p.metadata_author(), Some("Ann"));
        assert_eq!(p.takeaways().len(), 1);
        assert_eq!(p.tags(), ["ai".to_string()]);
        assert!(p.shown_at().is_some());
    }

    #[test]
    fn zone_less_timestamps_read_as_utc() {
        let p: Piece =
            serde_json::from_str(r#"{"id":"p1","created_at":"2024-01-01 12:00:00"}"#).unwrap();
        assert_eq!(
            p.shown_at().unwrap().to_rfc3339(),
            "2024-01-01T12:00:00+00:00"
        );

        let p: Piece =
            serde_json::from_str(r#"{"id":"p1","extracted_at":1704110400000}"#).unwrap();
        assert_eq!(
            p.shown_at().unwrap().to_rfc3339(),
            "2024-01-01T12:00:00+00:00"
        );
    }

    #[test]
    fn unreadable_timestamps_do_not_fail_the_piece() {
        let json = r#"{
            "id": "p1",
            "created_at": "last tuesday",
            "extracted_at": {"seconds": 1},
            "key_takeaways": [{"question": "Q", "answer": "Kept answer"}]
        }"#;
        let p: Piece = serde_json::from_str(json).unwrap();
        assert_eq!(p.shown_at(), None);
        assert_eq!(p.takeaways().len(), 1);
    }

    #[test]
    fn non_list_takeaways_read_as_nothing_extracted() {
        let p: Piece =
            serde_json::from_str(r#"{"id":"p1","key_takeaways":"pending","ai_extracted_tags":3}"#)
                .unwrap();
        assert!(!p.has_takeaways());
        assert!(p.tags().is_empty());
    }

    #[test]
    fn null_takeaways_mean_nothing_extracted() {
        let p: Piece = serde_json::from_str(r#"{"id":"p","key_takeaways":null}"#).unwrap();
        assert!(!p.has_takeaways());
    }
}
