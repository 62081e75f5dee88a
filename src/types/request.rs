use serde::Serialize;
use serde_json::Value;

/// Body of a conversation creation request.
///
/// A conversation is seeded either with a system prompt or with a published
/// assistant, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRequest {
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprompt: Option<String>,

    #[serde(rename = "assistantId", skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

impl ConversationRequest {
    /// A conversation seeded with a system prompt.
    pub fn with_preprompt(model: impl Into<String>, preprompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            preprompt: Some(preprompt.into()),
            assistant_id: None,
        }
    }

    /// A conversation seeded with a published assistant.
    pub fn with_assistant(model: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            preprompt: None,
            assistant_id: Some(assistant_id.into()),
        }
    }
}

/// Payload of the multipart `data` field sent for each chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Id of the message this turn attaches to.
    pub id: String,
    pub inputs: String,
    pub is_continue: bool,
    pub is_retry: bool,
    pub web_search: bool,
    pub tools: Vec<Value>,
}

impl ChatRequest {
    /// A new turn attached to `message_id`.
    pub fn new(message_id: impl Into<String>, inputs: impl Into<String>) -> Self {
        Self {
            id: message_id.into(),
            inputs: inputs.into(),
            is_continue: false,
            is_retry: false,
            web_search: false,
            tools: Vec::new(),
        }
    }

    /// Sets whether the service should search the web first.
    pub fn with_web_search(mut self, web_search: bool) -> Self {
        self.web_search = web_search;
        self
    }

    /// Marks the request as a retry (or an edit of an earlier user message).
    pub fn with_retry(mut self, is_retry: bool) -> Self {
        self.is_retry = is_retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_request_with_preprompt() {
        let request = ConversationRequest::with_preprompt("m", "be brief");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"model": "m", "preprompt": "be brief"})
        );
    }

    #[test]
    fn conversation_request_with_assistant() {
        let request = ConversationRequest::with_assistant("m", "65bf2ddbf4017c8048ae43a3");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"model": "m", "assistantId": "65bf2ddbf4017c8048ae43a3"})
        );
    }

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest::new("root", "hello").with_web_search(true);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "id": "root",
                "inputs": "hello",
                "is_continue": false,
                "is_retry": false,
                "web_search": true,
                "tools": []
            })
        );
    }
}
