//! The assistant shell: intents, launching, and chat dispatch.
//!
//! [`Assistant`] takes one line of user input at a time. Slash commands
//! control the [`ChatBot`] session, `open`/`play`/`search` requests go to a
//! [`Launcher`], and everything else is asked of the chat model.

mod config;
mod intent;
mod launcher;

use crate::chat::{ChatBot, ChatCommand, ChatOptions, Renderer, help_text};
use crate::error::Result;
use crate::observability::{COMMANDS_CHAT, COMMANDS_LAUNCHED};

pub use config::{AppEntry, AssistantConfig, FaceAuthArgs, JarvisArgs, SiteEntry};
pub use intent::{Intent, parse_intent};
pub use launcher::{Launcher, SystemLauncher};

/// Said before the camera opens.
pub const GREETING: &str = "Let's begin the face authentication process. Kindly sit in front of the camera, look straight ahead, and remain still while I capture your facial data";

/// Said once the face is verified.
pub const AUTH_SUCCESS: &str = "Face authentication has been successfully completed. Your identity has been verified, and you now have secure access to the system";

/// Said when the shell comes online.
pub const WELCOME: &str = "Welcome, Sir. Your AI assistant is online and ready. How may I assist you today?";

/// Said when face authentication fails.
pub const AUTH_FAILURE: &str = "I'm sorry, the face authentication was not successful. Kindly try again";

/// Whether the shell keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Dispatches user input to the chat session and the launcher.
pub struct Assistant {
    bot: ChatBot,
    launcher: Box<dyn Launcher>,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(bot: ChatBot, launcher: impl Launcher + 'static, config: AssistantConfig) -> Self {
        Self {
            bot,
            launcher: Box::new(launcher),
            config,
        }
    }

    pub fn bot(&self) -> &ChatBot {
        &self.bot
    }

    pub fn bot_mut(&mut self) -> &mut ChatBot {
        &mut self.bot
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// Handle one line of input.
    ///
    /// Failures are reported through `renderer`; only `/quit` ends the shell.
    pub async fn handle(&mut self, input: &str, renderer: &mut dyn Renderer) -> Flow {
        let intent = parse_intent(input, &self.config);
        tracing::debug!(?intent, "dispatching");
        match intent {
            Intent::Empty => Flow::Continue,
            Intent::Command(command) => match self.run_command(command, renderer).await {
                Ok(flow) => flow,
                Err(err) => {
                    renderer.print_error(&err.to_string());
                    Flow::Continue
                }
            },
            Intent::LaunchApp { name, path } => {
                COMMANDS_LAUNCHED.click();
                renderer.print_announcement(&format!("Opening {name}"));
                if let Err(err) = self.launcher.launch_app(&path).await {
                    renderer.print_error(&err.to_string());
                }
                Flow::Continue
            }
            Intent::OpenUrl { name, url } => {
                COMMANDS_LAUNCHED.click();
                renderer.print_announcement(&format!("Opening {name}"));
                if let Err(err) = self.launcher.open_url(&url).await {
                    renderer.print_error(&err.to_string());
                }
                Flow::Continue
            }
            Intent::Chat(text) => {
                COMMANDS_CHAT.click();
                // chat_streaming reports its own failures to the renderer.
                if let Err(err) = self
                    .bot
                    .chat_streaming(&text, &ChatOptions::default(), renderer)
                    .await
                {
                    tracing::debug!(%err, "chat turn failed");
                }
                Flow::Continue
            }
        }
    }

    async fn run_command(
        &mut self,
        command: ChatCommand,
        renderer: &mut dyn Renderer,
    ) -> Result<Flow> {
        match command {
            ChatCommand::Quit => return Ok(Flow::Quit),
            ChatCommand::Help => renderer.print_info(help_text()),
            ChatCommand::New(prompt) => {
                let prompt = prompt.unwrap_or_else(|| self.bot.config().system_prompt.clone());
                let conversation = self.bot.new_conversation(None, &prompt, true, None).await?;
                renderer.print_info(&format!("Started conversation {conversation}"));
            }
            ChatCommand::Models => {
                let active = self.bot.active_llm_index();
                for (index, model) in self.bot.available_llms().iter().enumerate() {
                    let marker = if index == active { "*" } else { " " };
                    renderer.print_info(&format!("{marker} {index}: {}", model.id));
                }
            }
            ChatCommand::Model(selector) => {
                let model = self.bot.select_llm(&selector)?;
                renderer.print_info(&format!(
                    "Model changed to: {model} (applies to new conversations)"
                ));
            }
            ChatCommand::Conversations => {
                let current = self.bot.current_conversation().map(|c| c.id.clone());
                let conversations = self.bot.remote_conversations(true).await?;
                if conversations.is_empty() {
                    renderer.print_info("No conversations.");
                }
                for conversation in conversations {
                    let marker = if Some(&conversation.id) == current.as_ref() {
                        "*"
                    } else {
                        " "
                    };
                    let title = conversation.title.as_deref().unwrap_or("(untitled)");
                    renderer.print_info(&format!("{marker} {conversation}: {title}"));
                }
            }
            ChatCommand::Switch(id) => {
                self.bot.change_conversation(&id).await?;
                renderer.print_info(&format!("Switched to conversation {id}"));
            }
            ChatCommand::Delete => {
                self.bot.delete_conversation(None).await?;
                renderer.print_info("Conversation deleted. Use /new to start another.");
            }
            ChatCommand::DeleteAll => {
                self.bot.delete_all_conversations().await?;
                renderer.print_info("All conversations deleted. Use /new to start another.");
            }
            ChatCommand::Share => {
                let link = self.bot.share_conversation(None).await?;
                renderer.print_info(&link);
            }
            ChatCommand::Info => {
                let conversation = self.bot.conversation_info(None).await?;
                renderer.print_info(&format!("Conversation: {conversation}"));
                renderer.print_info(&format!(
                    "Title: {}",
                    conversation.title.as_deref().unwrap_or("(untitled)")
                ));
                renderer.print_info(&format!(
                    "Model: {}",
                    conversation.model.as_deref().unwrap_or("(unknown)")
                ));
                if let Some(prompt) = conversation.system_prompt.as_deref() {
                    renderer.print_info(&format!("System prompt: {prompt}"));
                }
                renderer.print_info(&format!("Messages: {}", conversation.history.len()));
            }
            ChatCommand::Web(enabled) => {
                self.bot.set_web_search(enabled);
                renderer.print_info(if enabled {
                    "Web search enabled."
                } else {
                    "Web search disabled."
                });
            }
            ChatCommand::Sharing(enabled) => {
                self.bot.set_share_conversations(enabled).await?;
                renderer.print_info(if enabled {
                    "Sharing conversations with model authors."
                } else {
                    "Not sharing conversations with model authors."
                });
            }
            ChatCommand::Retries(count) => {
                self.bot.set_retry_count(count)?;
                renderer.print_info(&format!("Attempts per reply set to {count}"));
            }
            ChatCommand::Assistants(page) => match self.bot.assistants_page(page).await? {
                Some(assistants) => {
                    for assistant in assistants {
                        renderer.print_info(&format!(
                            "{}: {} by {} ({})",
                            assistant.assistant_id,
                            assistant.name,
                            assistant.author,
                            assistant.model_name
                        ));
                    }
                }
                None => renderer.print_info(&format!("No assistants on page {page}.")),
            },
            ChatCommand::Stats => {
                let stats = self.bot.stats();
                renderer.print_info("Session Statistics:");
                renderer.print_info(&format!("  Model: {}", stats.model));
                renderer.print_info(&format!(
                    "  Conversation: {}",
                    stats.conversation_id.as_deref().unwrap_or("(none)")
                ));
                renderer.print_info(&format!("  Conversations: {}", stats.conversation_count));
                renderer.print_info(&format!("  Messages: {}", stats.message_count));
                renderer.print_info(&format!("  Attempts per reply: {}", stats.retry_count));
                renderer.print_info(&format!(
                    "  Web search: {}",
                    if stats.web_search { "on" } else { "off" }
                ));
                renderer.print_info(&format!(
                    "  Turns: {} completed / {} interrupted / {} failed",
                    stats.completed_turns, stats.interrupted_turns, stats.failed_turns
                ));
            }
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
        Ok(Flow::Continue)
    }
}
