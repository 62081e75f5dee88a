//! Chat sessions against HuggingChat.
//!
//! This module provides the session layer on top of the
//! [`HuggingChat`](crate::HuggingChat) transport. It supports:
//!
//! - Model selection by index or name
//! - Creating, switching, sharing and deleting conversations
//! - Streaming replies with real-time token display and interrupts
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: session configuration and per-turn options
//! - [`session`]: the [`ChatBot`] session
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatConfig, ChatOptions, ChatSection, DEFAULT_RETRY_COUNT};
pub use session::{ChatBot, SessionStats};
