//! Slash command parsing for the assistant shell.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the service.

use crate::types::ModelSelector;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation, optionally with a system prompt.
    New(Option<String>),

    /// List the available models.
    Models,

    /// Change the model used for new conversations.
    Model(ModelSelector),

    /// List conversations on the account.
    Conversations,

    /// Switch to another conversation by id.
    Switch(String),

    /// Delete the current conversation.
    Delete,

    /// Delete every conversation on the account.
    DeleteAll,

    /// Print a share link for the current conversation.
    Share,

    /// Show the current conversation's details.
    Info,

    /// Toggle web search.
    Web(bool),

    /// Toggle sharing conversations with model authors.
    Sharing(bool),

    /// Set the number of attempts per chat turn.
    Retries(u32),

    /// List one page of published assistants.
    Assistants(u32),

    /// Display help information.
    Help,

    /// Exit the shell.
    Quit,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use jarvis::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model 1").is_some());
/// assert!(parse_command("Hello, Jarvis!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New(argument.map(|s| s.to_string())),
        "models" | "llms" => ChatCommand::Models,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.parse().unwrap_or_default()),
            None => ChatCommand::Invalid("/model requires a model index or name".to_string()),
        },
        "conversations" | "ls" => ChatCommand::Conversations,
        "switch" => match argument {
            Some(id) => ChatCommand::Switch(id.to_string()),
            None => ChatCommand::Invalid("/switch requires a conversation id".to_string()),
        },
        "delete" => match argument {
            None => ChatCommand::Delete,
            Some(arg) if arg.eq_ignore_ascii_case("all") => ChatCommand::DeleteAll,
            Some(_) => ChatCommand::Invalid("/delete takes no argument or 'all'".to_string()),
        },
        "share" => ChatCommand::Share,
        "info" => ChatCommand::Info,
        "web" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Web(value),
            None => ChatCommand::Invalid("/web expects 'on' or 'off'".to_string()),
        },
        "sharing" => match argument.and_then(parse_on_off) {
            Some(value) => ChatCommand::Sharing(value),
            None => ChatCommand::Invalid("/sharing expects 'on' or 'off'".to_string()),
        },
        "retries" => match argument.map(str::parse::<u32>) {
            Some(Ok(value)) if value > 0 => ChatCommand::Retries(value),
            Some(_) => ChatCommand::Invalid("/retries expects a positive integer".to_string()),
            None => ChatCommand::Invalid("/retries requires a value".to_string()),
        },
        "assistants" => match argument.map(str::parse::<u32>) {
            None => ChatCommand::Assistants(0),
            Some(Ok(page)) => ChatCommand::Assistants(page),
            Some(Err(_)) => ChatCommand::Invalid("/assistants expects a page number".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new [prompt]          Start a new conversation (optional system prompt)
  /models                List available models
  /model <index|name>    Use another model for new conversations
  /conversations         List conversations on the account
  /switch <id>           Switch to another conversation
  /delete                Delete the current conversation
  /delete all            Delete every conversation on the account
  /share                 Print a share link for the current conversation
  /info                  Show the current conversation
  /web on|off            Search the web before answering
  /sharing on|off        Share conversations with model authors
  /retries <n>           Set attempts per reply
  /assistants [page]     List published assistants
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit

Other input:
  open <app or site>     Launch a registered app or open a site
  play <query> on youtube
  search <query>
  anything else          Ask the chat model"#
}
