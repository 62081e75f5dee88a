use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::null_as_default;

/// Who authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    #[serde(other)]
    Unknown,
}

/// One message in a remote chat thread.
///
/// Messages form a tree: `ancestors` lists the ids from the root down to the
/// parent, `children` lists the ids of direct replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNode {
    pub id: String,

    #[serde(rename = "from")]
    pub role: MessageRole,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub ancestors: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<String>,

    #[serde(default, with = "crate::utils::time")]
    pub created_at: Option<OffsetDateTime>,

    #[serde(default, with = "crate::utils::time")]
    pub updated_at: Option<OffsetDateTime>,
}

impl MessageNode {
    /// Returns true if the node was authored by the user.
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// A conversation known to this session.
///
/// `model`, `title`, `system_prompt` and `history` are only populated after
/// the conversation's info has been fetched from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub history: Vec<MessageNode>,
}

impl Conversation {
    /// Create a conversation handle with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The id of the last message in the history; new messages are attached here.
    pub fn last_message_id(&self) -> Option<&str> {
        self.history.last().map(|node| node.id.as_str())
    }

    /// Find a message node by id.
    pub fn message_node(&self, id: &str) -> Option<&MessageNode> {
        self.history.iter().find(|node| node.id == id)
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The `json` payload of a conversation info response.
#[derive(Debug, Deserialize)]
pub(crate) struct ConversationInfo {
    pub model: Option<String>,
    pub preprompt: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<MessageNode>,
}

impl ConversationInfo {
    /// Apply the fetched info onto a conversation, replacing its history.
    pub(crate) fn apply_to(self, conversation: &mut Conversation) {
        conversation.model = self.model;
        conversation.system_prompt = self.preprompt;
        conversation.title = self.title;
        conversation.history = self.messages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn message_node_from_wire() {
        let json = r#"{
            "id": "a1",
            "from": "user",
            "content": "hello",
            "ancestors": ["root"],
            "children": [],
            "createdAt": "2024-05-17T10:04:31.000Z",
            "updatedAt": "2024-05-17T10:04:32.000+00:00"
        }"#;
        let node: MessageNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.role, MessageRole::User);
        assert!(node.is_user());
        assert_eq!(node.ancestors, vec!["root".to_string()]);
        assert_eq!(node.created_at, Some(datetime!(2024-05-17 10:04:31 UTC)));
        assert_eq!(node.updated_at, Some(datetime!(2024-05-17 10:04:32 UTC)));
    }

    #[test]
    fn unknown_role_and_missing_fields() {
        let node: MessageNode = serde_json::from_str(r#"{"id": "x", "from": "tool"}"#).unwrap();
        assert_eq!(node.role, MessageRole::Unknown);
        assert!(node.content.is_empty());
        assert!(node.children.is_empty());
        assert!(node.created_at.is_none());
    }

    #[test]
    fn info_applies_to_conversation() {
        let info: ConversationInfo = serde_json::from_str(
            r#"{
                "model": "m",
                "preprompt": "be nice",
                "title": "Greeting",
                "messages": [
                    {"id": "root", "from": "system", "content": "be nice", "ancestors": [], "children": ["u1"]},
                    {"id": "u1", "from": "user", "content": "hi", "ancestors": ["root"], "children": []}
                ]
            }"#,
        )
        .unwrap();
        let mut conversation = Conversation::new("c1");
        info.apply_to(&mut conversation);
        assert_eq!(conversation.model.as_deref(), Some("m"));
        assert_eq!(conversation.system_prompt.as_deref(), Some("be nice"));
        assert_eq!(conversation.title.as_deref(), Some("Greeting"));
        assert_eq!(conversation.last_message_id(), Some("u1"));
        assert_eq!(conversation.message_node("root").unwrap().role, MessageRole::System);
        assert_eq!(conversation.to_string(), "c1");
    }
}
