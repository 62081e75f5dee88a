//! Error types for the jarvis assistant.
//!
//! Errors fall into a few coarse categories: session initialization,
//! conversation lifecycle, chat streaming, model selection, and the
//! transport/decoding failures underneath all of them.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for jarvis.
#[derive(Clone, Debug)]
pub enum Error {
    /// The chat session could not be initialized (missing or conflicting cookies).
    Init {
        /// Human-readable error message.
        message: String,
    },

    /// A new conversation could not be created after exhausting retries.
    CreateConversation {
        /// Human-readable error message.
        message: String,
        /// Status code of the last attempt, if a response was received.
        status_code: Option<u16>,
        /// Number of attempts made.
        attempts: u32,
    },

    /// A conversation could not be deleted.
    DeleteConversation {
        /// Human-readable error message.
        message: String,
        /// HTTP status code returned by the service.
        status_code: u16,
    },

    /// The conversation id is not known locally or remotely.
    InvalidConversationId {
        /// Human-readable error message.
        message: String,
    },

    /// A chat request failed.
    Chat {
        /// Human-readable error message.
        message: String,
    },

    /// The remote model is overloaded.
    ModelOverloaded {
        /// Human-readable error message.
        message: String,
    },

    /// A model index was outside the list of available models.
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of models available.
        len: usize,
    },

    /// A model name did not match any available model.
    ModelNotFound {
        /// The requested name.
        name: String,
        /// Ids of the models that are available.
        available: Vec<String>,
    },

    /// A non-success HTTP response that has no more specific category.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// The service answered with a body this client does not understand.
    UnexpectedResponse {
        /// Human-readable error message.
        message: String,
    },

    /// API timeout error.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during validation of request parameters.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// A streaming error occurred.
    Streaming {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Encoding/decoding error.
    Encoding {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Invalid configuration file.
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// The face-recognition helper could not produce frames.
    FaceAuth {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Error::Init {
            message: message.into(),
        }
    }

    /// Creates a new conversation creation error.
    pub fn create_conversation(
        message: impl Into<String>,
        status_code: Option<u16>,
        attempts: u32,
    ) -> Self {
        Error::CreateConversation {
            message: message.into(),
            status_code,
            attempts,
        }
    }

    /// Creates a new conversation deletion error.
    pub fn delete_conversation(message: impl Into<String>, status_code: u16) -> Self {
        Error::DeleteConversation {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a new invalid conversation id error.
    pub fn invalid_conversation_id(message: impl Into<String>) -> Self {
        Error::InvalidConversationId {
            message: message.into(),
        }
    }

    /// Creates a new chat error.
    pub fn chat(message: impl Into<String>) -> Self {
        Error::Chat {
            message: message.into(),
        }
    }

    /// Creates a new model overloaded error.
    pub fn model_overloaded(message: impl Into<String>) -> Self {
        Error::ModelOverloaded {
            message: message.into(),
        }
    }

    /// Creates a new index out of range error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }

    /// Creates a new model not found error.
    pub fn model_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Error::ModelNotFound {
            name: name.into(),
            available,
        }
    }

    /// Creates a new API error.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new unexpected response error.
    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new streaming error.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new encoding error.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new face-authentication error.
    pub fn face_auth(message: impl Into<String>) -> Self {
        Error::FaceAuth {
            message: message.into(),
        }
    }

    /// Returns true if this error happened while initializing a session.
    pub fn is_init(&self) -> bool {
        matches!(self, Error::Init { .. })
    }

    /// Returns true if this error concerns a conversation's lifecycle.
    pub fn is_conversation(&self) -> bool {
        matches!(
            self,
            Error::CreateConversation { .. }
                | Error::DeleteConversation { .. }
                | Error::InvalidConversationId { .. }
        )
    }

    /// Returns true if the conversation id was rejected.
    pub fn is_invalid_conversation_id(&self) -> bool {
        matches!(self, Error::InvalidConversationId { .. })
    }

    /// Returns true if this is a chat error, including an overloaded model.
    pub fn is_chat(&self) -> bool {
        matches!(self, Error::Chat { .. } | Error::ModelOverloaded { .. })
    }

    /// Returns true if the remote model reported that it is overloaded.
    pub fn is_model_overloaded(&self) -> bool {
        matches!(self, Error::ModelOverloaded { .. })
    }

    /// Returns true if a model index or name could not be resolved.
    pub fn is_index(&self) -> bool {
        matches!(
            self,
            Error::IndexOutOfRange { .. } | Error::ModelNotFound { .. }
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Init { message } => {
                write!(f, "Initialization error: {message}")
            }
            Error::CreateConversation {
                message,
                status_code,
                attempts,
            } => {
                if let Some(status_code) = status_code {
                    write!(
                        f,
                        "Failed to create new conversation with status code {status_code}: {message} (attempts: {attempts})"
                    )
                } else {
                    write!(
                        f,
                        "Failed to create new conversation: {message} (attempts: {attempts})"
                    )
                }
            }
            Error::DeleteConversation {
                message,
                status_code,
            } => {
                write!(f, "{message} (status code: {status_code})")
            }
            Error::InvalidConversationId { message } => {
                write!(f, "Invalid conversation id: {message}")
            }
            Error::Chat { message } => {
                write!(f, "Chat error: {message}")
            }
            Error::ModelOverloaded { message } => {
                write!(f, "Model overloaded: {message}")
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Out of range of llm index: {index} (available: {len})")
            }
            Error::ModelNotFound { name, available } => {
                write!(
                    f,
                    "Given model {name} is not in llms list. LLM list: {}",
                    available.join(", ")
                )
            }
            Error::Api {
                status_code,
                message,
            } => {
                write!(f, "API error ({status_code}): {message}")
            }
            Error::UnexpectedResponse { message } => {
                write!(f, "Unknown server response: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "Streaming error: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "Encoding error: {message}")
            }
            Error::Config { message } => {
                write!(f, "Configuration error: {message}")
            }
            Error::FaceAuth { message } => {
                write!(f, "Face authentication error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            Error::Streaming { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config(format!("YAML error: {err}"))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::timeout(format!("Request timed out: {err}"), None)
        } else if err.is_connect() {
            Error::connection(format!("Connection error: {err}"), Some(Box::new(err)))
        } else if err.is_decode() {
            Error::serialization(format!("Failed to decode response: {err}"), Some(Box::new(err)))
        } else {
            Error::http_client(format!("Request failed: {err}"), Some(Box::new(err)))
        }
    }
}

/// A specialized Result type for jarvis operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert!(Error::init("no cookies").is_init());
        assert!(Error::create_conversation("boom", Some(500), 6).is_conversation());
        assert!(Error::delete_conversation("boom", 404).is_conversation());
        assert!(Error::invalid_conversation_id("nope").is_invalid_conversation_id());
        assert!(Error::chat("bad").is_chat());
        assert!(Error::model_overloaded("busy").is_chat());
        assert!(Error::model_overloaded("busy").is_model_overloaded());
        assert!(Error::index_out_of_range(7, 3).is_index());
        assert!(Error::model_not_found("x", vec![]).is_index());
        assert!(!Error::chat("bad").is_model_overloaded());
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::api(502, "bad gateway").status_code(), Some(502));
        assert_eq!(Error::delete_conversation("x", 404).status_code(), Some(404));
        assert_eq!(Error::create_conversation("x", None, 6).status_code(), None);
        assert_eq!(Error::chat("x").status_code(), None);
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::index_out_of_range(4, 2).to_string(),
            "Out of range of llm index: 4 (available: 2)"
        );
        assert_eq!(
            Error::model_not_found("foo", vec!["a".into(), "b".into()]).to_string(),
            "Given model foo is not in llms list. LLM list: a, b"
        );
        assert_eq!(
            Error::create_conversation("eof", Some(500), 6).to_string(),
            "Failed to create new conversation with status code 500: eof (attempts: 6)"
        );
    }
}
