//! Conversation protocol types and the backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{Backend, Message, ModelRequest, ModelResponse, ToolCall, ToolSpec, Usage};
