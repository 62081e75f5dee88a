//! Logging trait for HuggingChat client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! the traffic passing through a [`HuggingChat`](crate::HuggingChat) session.

use crate::{Conversation, Message, StreamEvent};

/// A trait for logging chat session operations.
///
/// # Example
///
/// ```rust,ignore
/// use jarvis::{ClientLogger, Conversation, Message, StreamEvent};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_stream_event(&self, event: &StreamEvent) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "event: {}", serde_json::to_string(event).unwrap()).unwrap();
///     }
///
///     fn log_conversation(&self, conversation: &Conversation) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "conversation: {conversation} ({} messages)", conversation.history.len()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log an individual streaming event, in arrival order.
    fn log_stream_event(&self, event: &StreamEvent);

    /// Log a conversation whose info was just fetched from the service.
    fn log_conversation(&self, conversation: &Conversation);

    /// Log the reply collected from a completed stream.
    ///
    /// The default implementation does nothing.
    fn log_stream_message(&self, message: &Message) {
        let _ = message;
    }
}
