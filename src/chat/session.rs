//! Chat session management.
//!
//! This module provides the `ChatBot` struct which owns a HuggingChat
//! session together with the model list, the local conversation list and the
//! current conversation.

use std::time::Duration;

use futures::StreamExt;

use crate::Error;
use crate::chat::config::{ChatConfig, ChatOptions};
use crate::client::HuggingChat;
use crate::error::Result;
use crate::render::Renderer;
use crate::stream::MessageStream;
use crate::types::{
    Assistant, ChatRequest, Conversation, ConversationRequest, Message, MessageNode, Model,
    ModelSelector, StreamEvent,
};

/// How often a streamed reply checks the renderer's interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The active model's id.
    pub model: String,
    /// The current conversation, if any.
    pub conversation_id: Option<String>,
    /// Conversations known to the session.
    pub conversation_count: usize,
    /// Messages in the current conversation.
    pub message_count: usize,
    /// Attempts per chat turn.
    pub retry_count: u32,
    /// Whether turns search the web.
    pub web_search: bool,
    /// Chat turns that completed.
    pub completed_turns: u64,
    /// Chat turns the user interrupted.
    pub interrupted_turns: u64,
    /// Chat turns that failed.
    pub failed_turns: u64,
}

/// A chat session against HuggingChat.
#[derive(Debug)]
pub struct ChatBot {
    client: HuggingChat,
    config: ChatConfig,
    llms: Vec<Model>,
    active_model: usize,
    conversations: Vec<Conversation>,
    current: Option<String>,
    completed_turns: u64,
    interrupted_turns: u64,
    failed_turns: u64,
}

fn validate_retry_count(retry_count: u32) -> Result<()> {
    if retry_count == 0 {
        return Err(Error::validation(
            "retry_count must be greater than 0",
            Some("retry_count".to_string()),
        ));
    }
    Ok(())
}

/// Resolve a model selector against the model list.
pub(crate) fn resolve_model(llms: &[Model], selector: &ModelSelector) -> Result<usize> {
    match selector {
        ModelSelector::Index(index) => {
            if *index < llms.len() {
                Ok(*index)
            } else {
                Err(Error::index_out_of_range(*index, llms.len()))
            }
        }
        ModelSelector::Name(name) => llms
            .iter()
            .position(|model| model.name == *name || model.id == *name)
            .ok_or_else(|| {
                Error::model_not_found(
                    name.clone(),
                    llms.iter().map(|model| model.id.clone()).collect(),
                )
            }),
    }
}

/// Find the message a new turn attaches to, and whether it regenerates.
pub(crate) fn reply_target(
    conversation: &Conversation,
    edit_message_id: Option<&str>,
) -> Result<(String, bool)> {
    if let Some(edit) = edit_message_id {
        let node = conversation.message_node(edit).ok_or_else(|| {
            Error::validation(
                format!("message {edit} is not in conversation {conversation}"),
                Some("edit_message_id".to_string()),
            )
        })?;
        if !node.is_user() {
            return Err(Error::validation(
                "only user messages can be edited",
                Some("edit_message_id".to_string()),
            ));
        }
        return Ok((node.id.clone(), true));
    }
    match conversation.last_message_id() {
        Some(id) => Ok((id.to_string(), false)),
        None => Err(Error::validation(
            format!("conversation {conversation} has no message history"),
            None,
        )),
    }
}

impl ChatBot {
    /// Creates a chat session: fetches the models, selects the configured one
    /// and opens a first conversation with the configured system prompt.
    pub async fn new(client: HuggingChat, config: ChatConfig) -> Result<Self> {
        validate_retry_count(config.retry_count)?;
        let llms = client.remote_llms().await?;
        let active_model = resolve_model(&llms, &config.model)?;
        let mut bot = Self {
            client,
            config,
            llms,
            active_model,
            conversations: Vec::new(),
            current: None,
            completed_turns: 0,
            interrupted_turns: 0,
            failed_turns: 0,
        };
        let system_prompt = bot.config.system_prompt.clone();
        bot.new_conversation(None, &system_prompt, true, None).await?;
        Ok(bot)
    }

    /// The underlying HuggingChat session.
    pub fn client(&self) -> &HuggingChat {
        &self.client
    }

    /// The session's configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Creates a conversation and appends it to the local list.
    ///
    /// `model_index` defaults to the active model. An empty `system_prompt`
    /// falls back to the model's own; an `assistant` id replaces the prompt.
    pub async fn new_conversation(
        &mut self,
        model_index: Option<usize>,
        system_prompt: &str,
        switch_to: bool,
        assistant: Option<&str>,
    ) -> Result<Conversation> {
        let index = match model_index {
            Some(index) => resolve_model(&self.llms, &ModelSelector::Index(index))?,
            None => self.active_model,
        };
        let model = &self.llms[index];
        let (request, preprompt) = match assistant {
            Some(assistant_id) => (
                ConversationRequest::with_assistant(&model.id, assistant_id),
                None,
            ),
            None => {
                let preprompt = if system_prompt.is_empty() {
                    model.preprompt.clone()
                } else {
                    system_prompt.to_string()
                };
                (
                    ConversationRequest::with_preprompt(&model.id, preprompt.clone()),
                    Some(preprompt),
                )
            }
        };
        let id = self.client.create_conversation(&request).await?;
        let mut conversation = Conversation::new(id);
        conversation.model = Some(model.id.clone());
        conversation.system_prompt = preprompt;
        self.client.refresh_conversation(&mut conversation).await?;
        if switch_to {
            self.current = Some(conversation.id.clone());
        }
        self.conversations.push(conversation.clone());
        Ok(conversation)
    }

    /// Makes a locally known conversation current and refreshes it.
    pub async fn change_conversation(&mut self, conversation_id: &str) -> Result<()> {
        if self.local_conversation(conversation_id).is_none() {
            return Err(Error::invalid_conversation_id(format!(
                "Invalid conversation id, not in conversation list: {conversation_id}"
            )));
        }
        self.current = Some(conversation_id.to_string());
        self.conversation_info(Some(conversation_id)).await?;
        Ok(())
    }

    /// The current conversation, if any.
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current
            .as_deref()
            .and_then(|id| self.local_conversation(id))
    }

    fn local_conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| conversation.id == conversation_id)
    }

    fn target_id(&self, conversation_id: Option<&str>) -> Result<String> {
        conversation_id
            .or(self.current.as_deref())
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_conversation_id("No conversation selected"))
    }

    /// Returns a share link for a conversation (default: the current one).
    pub async fn share_conversation(&self, conversation_id: Option<&str>) -> Result<String> {
        let id = self.target_id(conversation_id)?;
        self.client.share_conversation(&id).await
    }

    /// Deletes a conversation (default: the current one).
    pub async fn delete_conversation(&mut self, conversation_id: Option<&str>) -> Result<()> {
        let id = self.target_id(conversation_id)?;
        self.client.delete_conversation(&id).await?;
        self.conversations.retain(|conversation| conversation.id != id);
        if self.current.as_deref() == Some(id.as_str()) {
            self.current = None;
        }
        Ok(())
    }

    /// Deletes every conversation on the account.
    pub async fn delete_all_conversations(&mut self) -> Result<()> {
        self.client.delete_all_conversations().await?;
        self.conversations.clear();
        self.current = None;
        Ok(())
    }

    /// The models offered by the service.
    pub fn available_llms(&self) -> &[Model] {
        &self.llms
    }

    /// Makes the model at `index` active for new conversations.
    pub fn switch_llm(&mut self, index: usize) -> Result<()> {
        self.active_model = resolve_model(&self.llms, &ModelSelector::Index(index))?;
        Ok(())
    }

    /// Makes the selected model active for new conversations.
    pub fn select_llm(&mut self, selector: &ModelSelector) -> Result<&Model> {
        self.active_model = resolve_model(&self.llms, selector)?;
        Ok(self.active_llm())
    }

    /// Finds a model by name or id.
    pub fn llm_from_name(&self, name: &str) -> Option<&Model> {
        self.llms
            .iter()
            .find(|model| model.name == name || model.id == name)
    }

    pub fn active_llm_index(&self) -> usize {
        self.active_model
    }

    pub fn active_llm(&self) -> &Model {
        &self.llms[self.active_model]
    }

    /// A copy of the local conversation list.
    pub fn conversation_list(&self) -> Vec<Conversation> {
        self.conversations.clone()
    }

    /// Lists the account's conversations, optionally replacing the local list.
    pub async fn remote_conversations(&mut self, replace_local: bool) -> Result<Vec<Conversation>> {
        let conversations = self.client.remote_conversations().await?;
        if replace_local {
            self.conversations = conversations.clone();
        }
        Ok(conversations)
    }

    /// Fetches a conversation's info (default: the current one) and updates
    /// the local copy.
    pub async fn conversation_info(&mut self, conversation_id: Option<&str>) -> Result<Conversation> {
        let id = self.target_id(conversation_id)?;
        let mut fetched = self.client.conversation_info(&id).await?;
        if let Some(local) = self.conversations.iter_mut().find(|c| c.id == id) {
            if fetched.model.is_none() {
                fetched.model = local.model.clone();
            }
            *local = fetched.clone();
        }
        Ok(fetched)
    }

    /// Fetches any conversation by id, known locally or not.
    pub async fn conversation_from_id(&self, conversation_id: &str) -> Result<Conversation> {
        self.client.conversation_info(conversation_id).await
    }

    /// Finds a message in the current conversation.
    pub fn message_node(&self, message_id: &str) -> Option<&MessageNode> {
        self.current_conversation()?.message_node(message_id)
    }

    /// One page of published assistants; `None` past the last page.
    pub async fn assistants_page(&self, page: u32) -> Result<Option<Vec<Assistant>>> {
        self.client.assistants_page(page).await
    }

    /// Opt in or out of sharing conversations with model authors.
    pub async fn set_share_conversations(&self, share: bool) -> Result<()> {
        self.client.set_share_conversations(share).await
    }

    /// Sets whether chat turns search the web by default.
    pub fn set_web_search(&mut self, web_search: bool) {
        self.config.web_search = web_search;
    }

    /// Sets the default number of attempts per chat turn.
    pub fn set_retry_count(&mut self, retry_count: u32) -> Result<()> {
        validate_retry_count(retry_count)?;
        self.config.retry_count = retry_count;
        Ok(())
    }

    /// Sends a turn in the current conversation and returns the reply stream.
    ///
    /// The conversation is not refreshed; call [`Self::conversation_info`]
    /// once the stream is done, or use [`Self::chat_and_wait`].
    pub fn chat(&self, text: &str, options: &ChatOptions) -> Result<MessageStream> {
        if text.is_empty() {
            return Err(Error::validation("text cannot be empty", Some("text".to_string())));
        }
        let conversation = self
            .current_conversation()
            .ok_or_else(|| Error::invalid_conversation_id("No conversation selected"))?;
        let (message_id, is_retry) = reply_target(conversation, options.edit_message_id.as_deref())?;
        let request = ChatRequest::new(message_id, text)
            .with_web_search(options.web_search.unwrap_or(self.config.web_search))
            .with_retry(is_retry);
        let retry_count = options.retry_count.unwrap_or(self.config.retry_count);
        self.client.stream(&conversation.id, request, retry_count)
    }

    /// Sends a turn, collects the reply and refreshes the conversation.
    pub async fn chat_and_wait(&mut self, text: &str, options: &ChatOptions) -> Result<Message> {
        let result = match self.chat(text, options) {
            Ok(stream) => stream.wait_until_done().await,
            Err(err) => Err(err),
        };
        self.finish_turn(result).await
    }

    /// Sends a turn and renders the reply as it streams.
    ///
    /// The renderer's interrupt flag is checked while waiting; an interrupt
    /// drops the stream, closing the connection.
    pub async fn chat_streaming(
        &mut self,
        text: &str,
        options: &ChatOptions,
        renderer: &mut dyn Renderer,
    ) -> Result<Message> {
        let result = match self.chat(text, options) {
            Ok(stream) => render_stream(stream, renderer).await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            renderer.print_error(&err.to_string());
        }
        self.finish_turn(result).await
    }

    async fn finish_turn(&mut self, result: Result<Message>) -> Result<Message> {
        match result {
            Ok(message) => {
                if message.interrupted {
                    self.interrupted_turns += 1;
                } else {
                    self.completed_turns += 1;
                }
                self.conversation_info(Some(&message.conversation_id)).await?;
                Ok(message)
            }
            Err(err) => {
                self.failed_turns += 1;
                Err(err)
            }
        }
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.active_llm().id.clone(),
            conversation_id: self.current.clone(),
            conversation_count: self.conversations.len(),
            message_count: self
                .current_conversation()
                .map(|conversation| conversation.history.len())
                .unwrap_or(0),
            retry_count: self.config.retry_count,
            web_search: self.config.web_search,
            completed_turns: self.completed_turns,
            interrupted_turns: self.interrupted_turns,
            failed_turns: self.failed_turns,
        }
    }
}

/// Render a reply stream, collecting it into a message.
pub(crate) async fn render_stream(
    mut stream: MessageStream,
    renderer: &mut dyn Renderer,
) -> Result<Message> {
    let mut message = Message::new(stream.conversation_id());
    loop {
        if renderer.should_interrupt() {
            drop(stream);
            renderer.print_interrupted();
            message.interrupted = true;
            return Ok(message);
        }
        let event = match tokio::time::timeout(INTERRUPT_POLL, stream.next()).await {
            Err(_) => continue,
            Ok(None) => break,
            Ok(Some(event)) => event?,
        };
        match &event {
            StreamEvent::Stream(token) => renderer.print_text(&token.token),
            StreamEvent::Reasoning(reasoning) => {
                if let Some(token) = &reasoning.token {
                    renderer.print_reasoning(token);
                }
            }
            StreamEvent::WebSearch(search) => {
                if !search.sources.is_empty() {
                    renderer.print_sources(&search.sources);
                } else if let Some(status) = &search.message {
                    renderer.print_status(status);
                }
            }
            StreamEvent::FinalAnswer(answer) => {
                if message.text.is_empty() && !answer.text.is_empty() {
                    renderer.print_text(&answer.text);
                }
            }
            StreamEvent::Error(error) => renderer.print_error(&error.message),
            StreamEvent::Restarted => renderer.print_status("connection lost; retrying"),
            _ => {}
        }
        message.push(event);
    }
    renderer.finish_response();
    Ok(message)
}
