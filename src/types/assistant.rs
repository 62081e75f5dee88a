use serde::{Deserialize, Serialize};

/// A community assistant published on the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    /// Assistant id, as found in the assistant's URL.
    pub assistant_id: String,
    pub author: String,
    pub name: String,
    pub model_name: String,
    pub pre_prompt: String,
    pub description: String,
}
