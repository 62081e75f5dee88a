// Public modules
pub mod assistant;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod cookies;
pub mod error;
pub mod face;
pub mod render;
pub mod types;
pub mod utils;

mod observability;
mod stream;

// Re-exports
pub use client::{ClientOptions, HuggingChat};
pub use client_logger::ClientLogger;
pub use cookies::Cookies;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use stream::MessageStream;
pub use types::*;
