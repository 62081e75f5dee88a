use super::{StreamEvent, WebSearchSource};

/// A complete reply collected from a stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub conversation_id: String,
    pub text: String,
    pub events: Vec<StreamEvent>,
    pub web_search_sources: Vec<WebSearchSource>,
    pub title: Option<String>,
    pub interrupted: bool,
}

impl Message {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::default()
        }
    }

    /// Fold one event into the reply.
    ///
    /// Tokens accumulate into `text` until a non-empty final answer replaces
    /// them. A restart discards what the abandoned attempt produced.
    pub fn push(&mut self, event: StreamEvent) {
        match &event {
            StreamEvent::Stream(token) => self.text.push_str(&token.token),
            StreamEvent::FinalAnswer(answer) => {
                if !answer.text.is_empty() {
                    self.text = answer.text.clone();
                }
                self.interrupted = answer.interrupted;
            }
            StreamEvent::WebSearch(search) => {
                self.web_search_sources.extend(search.sources.iter().cloned());
            }
            StreamEvent::Title(title) => self.title = Some(title.title.clone()),
            StreamEvent::Restarted => {
                self.text.clear();
                self.web_search_sources.clear();
            }
            _ => {}
        }
        self.events.push(event);
    }

    /// Returns true if the reply ended with a final answer.
    pub fn is_complete(&self) -> bool {
        self.events.last().is_some_and(StreamEvent::is_terminal)
    }
}
