// Public modules
pub mod assistant;
pub mod conversation;
pub mod message;
pub mod model;
pub mod request;
pub mod stream_event;

// Re-exports
pub use assistant::Assistant;
pub use conversation::{Conversation, MessageNode, MessageRole};
pub use message::Message;
pub use model::{Model, ModelSelector};
pub use request::{ChatRequest, ConversationRequest};
pub use stream_event::{
    ErrorEvent, FileEvent, FinalAnswerEvent, ReasoningEvent, StatusEvent, StreamEvent,
    StreamTokenEvent, TitleEvent, WebSearchEvent, WebSearchSource,
};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that the service sometimes sends as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
