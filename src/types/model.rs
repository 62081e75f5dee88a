use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::null_as_default;

/// A conversational model offered by the remote chat service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Model identifier used when creating conversations.
    pub id: String,

    /// Short model name, used for lookups by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Human-friendly display name.
    pub display_name: Option<String>,

    /// Default system prompt for new conversations with this model.
    #[serde(default, deserialize_with = "null_as_default")]
    pub preprompt: String,

    pub website_url: Option<String>,
    pub description: Option<String>,
    pub model_url: Option<String>,

    /// Unlisted models are hidden from the model list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub unlisted: bool,

    pub logo_url: Option<String>,
    pub reasoning: Option<Value>,
    pub multimodal: Option<bool>,
    pub tools: Option<bool>,

    #[serde(rename = "hasInferenceAPI")]
    pub has_inference_api: Option<bool>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt_examples: Vec<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
}

impl Model {
    /// Create a model descriptor with only an id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            preprompt: String::new(),
            website_url: None,
            description: None,
            model_url: None,
            unlisted: false,
            logo_url: None,
            reasoning: None,
            multimodal: None,
            tools: None,
            has_inference_api: None,
            prompt_examples: Vec::new(),
            parameters: Map::new(),
        }
    }

    /// Sets the default preprompt.
    pub fn with_preprompt(mut self, preprompt: impl Into<String>) -> Self {
        self.preprompt = preprompt.into();
        self
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Selects a model from the remote list either by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelector {
    Index(usize),
    Name(String),
}

impl Default for ModelSelector {
    fn default() -> Self {
        ModelSelector::Index(0)
    }
}

impl FromStr for ModelSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(index) => ModelSelector::Index(index),
            Err(_) => ModelSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSelector::Index(index) => write!(f, "#{index}"),
            ModelSelector::Name(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_model() {
        let json = r#"{
            "id": "meta-llama/Llama-3.3-70B-Instruct",
            "name": "meta-llama/Llama-3.3-70B-Instruct",
            "displayName": "Llama 3.3 70B",
            "preprompt": "",
            "websiteUrl": "https://llama.meta.com/",
            "description": "Ideal for everyday use.",
            "unlisted": false,
            "multimodal": false,
            "tools": true,
            "hasInferenceAPI": true,
            "promptExamples": [{"title": "Write an email", "prompt": "..."}],
            "parameters": {"temperature": 0.6, "max_new_tokens": 1024}
        }"#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.id, "meta-llama/Llama-3.3-70B-Instruct");
        assert_eq!(model.display_name.as_deref(), Some("Llama 3.3 70B"));
        assert_eq!(model.tools, Some(true));
        assert_eq!(model.has_inference_api, Some(true));
        assert_eq!(model.prompt_examples.len(), 1);
        assert_eq!(model.parameters["max_new_tokens"], 1024);
        assert_eq!(model.to_string(), "meta-llama/Llama-3.3-70B-Instruct");
    }

    #[test]
    fn deserialize_sparse_model() {
        let json = r#"{"id": "m", "preprompt": null, "promptExamples": null, "parameters": null}"#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.preprompt, "");
        assert_eq!(model.name, "");
        assert!(!model.unlisted);
        assert!(model.prompt_examples.is_empty());
        assert!(model.parameters.is_empty());
    }

    #[test]
    fn selector_from_str() {
        assert_eq!("2".parse::<ModelSelector>().unwrap(), ModelSelector::Index(2));
        assert_eq!(
            " mistral ".parse::<ModelSelector>().unwrap(),
            ModelSelector::Name("mistral".to_string())
        );
        assert_eq!(ModelSelector::default(), ModelSelector::Index(0));
    }
}
