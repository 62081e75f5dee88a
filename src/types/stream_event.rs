use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::null_as_default;

/// A progress update, e.g. `started` or `keepAlive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: String,
    pub message: Option<String>,
}

impl StatusEvent {
    pub fn is_started(&self) -> bool {
        self.status == "started"
    }
}

/// An incremental token of the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamTokenEvent {
    pub token: String,
}

/// The complete reply; always the last event of a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswerEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchSource {
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostname: String,
}

/// Web search progress; `sources` is set once the search is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchEvent {
    pub message_type: Option<String>,
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<WebSearchSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleEvent {
    pub title: String,
}

/// A file produced by a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEvent {
    pub name: String,
    pub sha: String,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningEvent {
    pub subtype: Option<String>,
    pub token: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// One line of a streamed chat reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    Status(StatusEvent),
    Stream(StreamTokenEvent),
    FinalAnswer(FinalAnswerEvent),
    WebSearch(WebSearchEvent),
    Title(TitleEvent),
    File(FileEvent),
    Reasoning(ReasoningEvent),
    Error(ErrorEvent),
    /// The connection dropped mid-reply and the request was sent again;
    /// anything received before this belongs to the abandoned attempt.
    Restarted,
    #[serde(untagged)]
    Unknown(Value),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum KnownEvent {
    Status(StatusEvent),
    Stream(StreamTokenEvent),
    FinalAnswer(FinalAnswerEvent),
    WebSearch(WebSearchEvent),
    Title(TitleEvent),
    File(FileEvent),
    Reasoning(ReasoningEvent),
    Error(ErrorEvent),
}

impl StreamEvent {
    /// Classify a decoded line.
    ///
    /// Objects with an unrecognised `type`, or whose payload does not match
    /// the shape of their `type`, are passed through as `Unknown`.
    pub fn from_value(value: Value) -> Self {
        if value.get("type").and_then(Value::as_str).is_none() {
            tracing::error!(event = %value, "stream event without a type");
            return StreamEvent::Unknown(value);
        }
        match serde_json::from_value::<KnownEvent>(value.clone()) {
            Ok(KnownEvent::Status(event)) => StreamEvent::Status(event),
            Ok(KnownEvent::Stream(mut event)) => {
                event.token = event.token.trim_end_matches('\0').to_string();
                StreamEvent::Stream(event)
            }
            Ok(KnownEvent::FinalAnswer(event)) => StreamEvent::FinalAnswer(event),
            Ok(KnownEvent::WebSearch(event)) => StreamEvent::WebSearch(event),
            Ok(KnownEvent::Title(event)) => StreamEvent::Title(event),
            Ok(KnownEvent::File(event)) => StreamEvent::File(event),
            Ok(KnownEvent::Reasoning(event)) => StreamEvent::Reasoning(event),
            Ok(KnownEvent::Error(event)) => StreamEvent::Error(event),
            Err(_) => StreamEvent::Unknown(value),
        }
    }

    /// Returns true if no events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::FinalAnswer(_))
    }

    /// The incremental text carried by this event, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            StreamEvent::Stream(event) => Some(&event.token),
            _ => None,
        }
    }

    /// The `type` discriminator as sent on the wire.
    pub fn event_type(&self) -> &str {
        match self {
            StreamEvent::Status(_) => "status",
            StreamEvent::Stream(_) => "stream",
            StreamEvent::FinalAnswer(_) => "finalAnswer",
            StreamEvent::WebSearch(_) => "webSearch",
            StreamEvent::Title(_) => "title",
            StreamEvent::File(_) => "file",
            StreamEvent::Reasoning(_) => "reasoning",
            StreamEvent::Error(_) => "error",
            StreamEvent::Restarted => "restarted",
            StreamEvent::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}
