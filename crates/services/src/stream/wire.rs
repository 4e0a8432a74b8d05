use piece_core::model::{Takeaway, TitleFields};
use serde::Deserialize;
use serde_json::Value;

use super::{MalformedMessage, PartialSnapshot, StreamEvent};

const DEFAULT_ERROR_MESSAGE: &str = "stream error";

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialData {
    #[serde(default)]
    accumulated: Option<Accumulated>,
}

#[derive(Debug, Default, Deserialize)]
struct Accumulated {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    title_zh: Option<String>,
    #[serde(default)]
    key_takeaways: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: Option<String>,
}

/// Parse one text frame of the extraction protocol.
///
/// Returns `Ok(None)` for well-formed frames with an event name this client
/// does not know.
///
/// # Errors
///
/// Returns `MalformedMessage` when the frame is not JSON or a known event
/// carries a payload of the wrong shape.
pub fn parse_frame(text: &str) -> Result<Option<StreamEvent>, MalformedMessage> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| MalformedMessage::new(e.to_string()))?;

    match frame.event.as_str() {
        "partial" => {
            let data = frame
                .data
                .ok_or_else(|| MalformedMessage::new("partial without data"))?;
            parse_partial(data).map(|partial| Some(StreamEvent::Partial(partial)))
        }
        "complete" => Ok(Some(StreamEvent::Complete)),
        "error" => {
            let message = frame
                .data
                .and_then(|data| serde_json::from_value::<ErrorData>(data).ok())
                .and_then(|data| data.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_owned());
            Ok(Some(StreamEvent::Error { message }))
        }
        _ => Ok(None),
    }
}

fn parse_partial(data: Value) -> Result<PartialSnapshot, MalformedMessage> {
    let data: PartialData =
        serde_json::from_value(data).map_err(|e| MalformedMessage::new(e.to_string()))?;
    let accumulated = data.accumulated.unwrap_or_default();

    // Anything but an array leaves the snapshot alone.
    let takeaways = match accumulated.key_takeaways {
        Some(list @ Value::Array(_)) => Some(
            serde_json::from_value::<Vec<Takeaway>>(list)
                .map_err(|e| MalformedMessage::new(format!("key_takeaways: {e}")))?,
        ),
        _ => None,
    };

    Ok(PartialSnapshot {
        takeaways,
        titles: TitleFields::new(accumulated.title, accumulated.title_zh),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_carries_items_and_titles() {
        let event = parse_frame(
            r#"{"event":"partial","data":{"accumulated":{
                "title":"T","title_zh":"标题",
                "key_takeaways":[{"question":"Q1","answer":"Hi there"}]
            }}}"#,
        )
        .unwrap()
        .unwrap();

        let StreamEvent::Partial(partial) = event else {
            panic!("expected partial, got {event:?}");
        };
        assert_eq!(partial.takeaways, Some(vec![Takeaway::new("Q1", "Hi there")]));
        assert_eq!(partial.titles.display_title(), Some("标题"));
    }

    #[test]
    fn partial_without_list_only_updates_titles() {
        let event = parse_frame(r#"{"event":"partial","data":{"accumulated":{"title":"T","key_takeaways":"soon"}}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            StreamEvent::Partial(PartialSnapshot {
                takeaways: None,
                titles: TitleFields::new(Some("T".into()), None),
            })
        );

        let event = parse_frame(r#"{"event":"partial","data":{}}"#).unwrap().unwrap();
        assert_eq!(event, StreamEvent::Partial(PartialSnapshot::default()));
    }

    #[test]
    fn complete_and_error_events() {
        assert_eq!(
            parse_frame(r#"{"event":"complete"}"#).unwrap(),
            Some(StreamEvent::Complete)
        );
        assert_eq!(
            parse_frame(r#"{"event":"error","data":{"message":"quota"}}"#).unwrap(),
            Some(StreamEvent::Error {
                message: "quota".into()
            })
        );
        assert_eq!(
            parse_frame(r#"{"event":"error"}"#).unwrap(),
            Some(StreamEvent::Error {
                message: "stream error".into()
            })
        );
    }

    #[test]
    fn unknown_events_are_skipped() {
        assert_eq!(parse_frame(r#"{"event":"progress","data":{"pct":40}}"#).unwrap(), None);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"data":{}}"#).is_err());
        assert!(parse_frame(r#"{"event":"partial"}"#).is_err());
        assert!(
            parse_frame(r#"{"event":"partial","data":{"accumulated":{"key_takeaways":[1,2]}}}"#)
                .is_err()
        );
    }
}
