use console_logging::{console_debug, console_warn};
use serde::Deserialize;
use serde_json::Value;

const DONE_SENTINEL: &str = "[DONE]";
const ERROR_SENTINEL: &str = "[ERROR]";
const DEFAULT_SERVER_ERROR: &str = "Generation failed on the server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFrameKind {
    Started,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedDataFrame {
    pub status: Option<String>,
    pub step_name: Option<String>,
    pub steps_in_progress: Option<Vec<String>>,
    pub completed_steps: Option<Vec<String>>,
}

/// A step event as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFrame {
    pub kind: StepFrameKind,
    pub step_name: String,
    pub data: String,
    pub summary: String,
    pub timestamp: String,
    pub parsed_data: ParsedDataFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Step(StepFrame),
    /// `[DONE]` sentinel: the generation finished.
    Done,
    /// `[ERROR]` sentinel or an error-typed event.
    Error(String),
    /// Not understood; callers log and skip it.
    Malformed(String),
}

impl ParsedMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParsedMessage::Done | ParsedMessage::Error(_))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    step_name: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    parsed_data: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Decodes the `data:` payload of one frame.
pub fn parse_payload(payload: &str) -> ParsedMessage {
    let trimmed = payload.trim();

    if trimmed == DONE_SENTINEL {
        return ParsedMessage::Done;
    }
    if let Some(rest) = trimmed.strip_prefix(ERROR_SENTINEL) {
        let reason = rest.trim_start_matches(':').trim();
        return ParsedMessage::Error(if reason.is_empty() {
            DEFAULT_SERVER_ERROR.to_string()
        } else {
            reason.to_string()
        });
    }

    let raw: RawEvent = match serde_json::from_str(trimmed) {
        Ok(raw) => raw,
        Err(err) => return ParsedMessage::Malformed(format!("invalid json: {err}")),
    };

    let kind = match raw.kind.to_ascii_lowercase().as_str() {
        "started" => StepFrameKind::Started,
        "completed" => StepFrameKind::Completed,
        "error" => {
            let message = [&raw.message, &raw.error, &raw.data, &raw.summary]
                .into_iter()
                .flatten()
                .map(error_text)
                .find(|text| !text.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER_ERROR.to_string());
            return ParsedMessage::Error(message);
        }
        other => return ParsedMessage::Malformed(format!("unknown event type '{other}'")),
    };

    let parsed_data = raw.parsed_data.map(parse_parsed_data).unwrap_or_default();
    let step_name = raw
        .step_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| parsed_data.step_name.clone())
        .unwrap_or_default();
    if step_name.is_empty() {
        return ParsedMessage::Malformed("event without step name".to_string());
    }

    ParsedMessage::Step(StepFrame {
        kind,
        step_name,
        data: raw.data.as_ref().map(value_text).unwrap_or_default(),
        summary: raw.summary.as_ref().map(value_text).unwrap_or_default(),
        timestamp: raw.timestamp.as_ref().map(value_text).unwrap_or_default(),
        parsed_data,
    })
}

/// Like [`parse_payload`] but logs and drops malformed payloads.
pub fn parse_or_skip(payload: &str) -> Option<ParsedMessage> {
    match parse_payload(payload) {
        ParsedMessage::Malformed(reason) => {
            console_warn!("Skipping malformed stream message ({}): {:.120}", reason, payload);
            None
        }
        message => Some(message),
    }
}

fn parse_parsed_data(value: Value) -> ParsedDataFrame {
    let result = match value {
        Value::String(text) => serde_json::from_str(&text),
        Value::Object(_) => serde_json::from_value(value),
        _ => return ParsedDataFrame::default(),
    };
    result.unwrap_or_else(|err| {
        console_debug!("Ignoring undecodable parsedData: {}", err);
        ParsedDataFrame::default()
    })
}

/// Error detail, preferring a nested `message` when the server sends an object.
fn error_text(value: &Value) -> String {
    match value.get("message") {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        _ => value_text(value),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_tolerate_whitespace() {
        assert_eq!(parse_payload("  [DONE]\n"), ParsedMessage::Done);
        assert_eq!(
            parse_payload("[ERROR]"),
            ParsedMessage::Error(DEFAULT_SERVER_ERROR.to_string())
        );
        assert_eq!(
            parse_payload("[ERROR]: quota exceeded"),
            ParsedMessage::Error("quota exceeded".to_string())
        );
    }

    #[test]
    fn completed_event_is_decoded() {
        let payload = r#"{"type":"completed","stepName":"logo","data":"<svg/>","summary":"Logo","timestamp":"2024-05-01T10:00:00Z"}"#;
        let ParsedMessage::Step(frame) = parse_payload(payload) else {
            panic!("expected step");
        };
        assert_eq!(frame.kind, StepFrameKind::Completed);
        assert_eq!(frame.step_name, "logo");
        assert_eq!(frame.data, "<svg/>");
        assert_eq!(frame.summary, "Logo");
        assert_eq!(frame.timestamp, "2024-05-01T10:00:00Z");
    }

    #[test]
    fn parsed_data_as_string_supplies_step_name() {
        let payload = r#"{"type":"started","parsedData":"{\"stepName\":\"colors\",\"stepsInProgress\":[\"colors\"]}"}"#;
        let ParsedMessage::Step(frame) = parse_payload(payload) else {
            panic!("expected step");
        };
        assert_eq!(frame.step_name, "colors");
        assert_eq!(
            frame.parsed_data.steps_in_progress,
            Some(vec!["colors".to_string()])
        );
    }

    #[test]
    fn structured_data_is_kept_as_json_text() {
        let payload = r#"{"type":"completed","stepName":"plan","data":{"sections":2}}"#;
        let ParsedMessage::Step(frame) = parse_payload(payload) else {
            panic!("expected step");
        };
        assert_eq!(frame.data, r#"{"sections":2}"#);
    }

    #[test]
    fn error_typed_event_carries_message() {
        let payload = r#"{"type":"error","message":"model unavailable"}"#;
        assert_eq!(
            parse_payload(payload),
            ParsedMessage::Error("model unavailable".to_string())
        );
    }

    #[test]
    fn error_event_with_object_detail_ends_the_stream() {
        let payload = r#"{"type":"error","error":{"code":500,"message":"boom"}}"#;
        assert_eq!(parse_payload(payload), ParsedMessage::Error("boom".to_string()));

        let payload = r#"{"type":"error","error":{"code":503}}"#;
        assert_eq!(
            parse_payload(payload),
            ParsedMessage::Error(r#"{"code":503}"#.to_string())
        );
    }

    #[test]
    fn error_event_with_numeric_message_is_still_an_error() {
        let payload = r#"{"type":"error","message":42}"#;
        assert_eq!(parse_payload(payload), ParsedMessage::Error("42".to_string()));

        let payload = r#"{"type":"error","message":null,"error":"quota exceeded"}"#;
        assert_eq!(
            parse_payload(payload),
            ParsedMessage::Error("quota exceeded".to_string())
        );
    }

    #[test]
    fn step_event_with_stray_message_field_is_kept() {
        let payload = r#"{"type":"completed","stepName":"logo","data":"<svg/>","message":1}"#;
        let ParsedMessage::Step(frame) = parse_payload(payload) else {
            panic!("expected step");
        };
        assert_eq!(frame.step_name, "logo");
        assert_eq!(frame.data, "<svg/>");
    }

    #[test]
    fn malformed_payloads_are_reported() {
        assert!(matches!(parse_payload("not json"), ParsedMessage::Malformed(_)));
        assert!(matches!(
            parse_payload(r#"{"type":"progress","stepName":"x"}"#),
            ParsedMessage::Malformed(_)
        ));
        assert!(matches!(
            parse_payload(r#"{"type":"started"}"#),
            ParsedMessage::Malformed(_)
        ));
        assert_eq!(parse_or_skip("{"), None);
    }
}
