//! Configuration types for chat sessions.

use serde::Deserialize;

use crate::types::ModelSelector;

/// Default number of attempts per chat turn.
pub const DEFAULT_RETRY_COUNT: u32 = 5;

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Which remote model the session starts with.
    pub model: ModelSelector,

    /// System prompt for new conversations; empty means the model's default.
    pub system_prompt: String,

    /// Attempts per chat turn.
    pub retry_count: u32,

    /// Whether chat turns search the web first.
    pub web_search: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: the first listed model
    /// - System prompt: the model's own
    /// - Retries: 5
    /// - Web search: disabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: ModelSelector::default(),
            system_prompt: String::new(),
            retry_count: DEFAULT_RETRY_COUNT,
            web_search: false,
            use_color: true,
        }
    }

    /// Sets the model selector.
    pub fn with_model(mut self, model: ModelSelector) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the number of attempts per chat turn.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Enables or disables web search.
    pub fn with_web_search(mut self, web_search: bool) -> Self {
        self.web_search = web_search;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The `chat` section of the assistant's YAML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatSection {
    pub cookie_path: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub retry_count: Option<u32>,
    pub web_search: Option<bool>,
}

impl From<&ChatSection> for ChatConfig {
    fn from(section: &ChatSection) -> Self {
        let mut config = ChatConfig::new();
        if let Some(model) = &section.model {
            config.model = model.parse().unwrap_or_default();
        }
        if let Some(prompt) = &section.system_prompt {
            config.system_prompt = prompt.clone();
        }
        if let Some(retry_count) = section.retry_count {
            config.retry_count = retry_count;
        }
        if let Some(web_search) = section.web_search {
            config.web_search = web_search;
        }
        config
    }
}

/// Per-turn chat options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatOptions {
    /// Search the web before answering; `None` uses the session default.
    pub web_search: Option<bool>,

    /// Regenerate from this earlier user message instead of appending.
    pub edit_message_id: Option<String>,

    /// Attempts for this turn; `None` uses the session default.
    pub retry_count: Option<u32>,
}

impl ChatOptions {
    pub fn with_web_search(mut self, web_search: bool) -> Self {
        self.web_search = Some(web_search);
        self
    }

    pub fn editing(mut self, message_id: impl Into<String>) -> Self {
        self.edit_message_id = Some(message_id.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }
}
