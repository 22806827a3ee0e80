//! skiff conversation core.
//!
//! This crate drives a chat session between an LLM backend and an MCP tool
//! server:
//!
//! - **Session**: the live tool-server connection plus the tool catalog,
//!   fetched once at connect time.
//! - **Orchestrator**: the request/response/tool-call cycle for one query,
//!   bounded to a fixed number of model rounds.
//! - **Backend**: a trait abstracting the chat-completion provider, with an
//!   OpenAI-compatible implementation.
//! - **Bridge**: argument parsing and result normalization between the model
//!   and the tool host.
//!
//! # Example
//!
//! ```ignore
//! use chat::{Orchestrator, OpenAiBackend, Outcome, Session};
//!
//! # async fn example(config: &mcp::ServerConfig) -> chat::Result<()> {
//! let backend = OpenAiBackend::builder("sk-...", "gpt-4o").build();
//! let session = Session::connect(config).await?;
//!
//! let outcome = Orchestrator::new()
//!     .run(&backend, &session, session.catalog(), "search for papers", &mut |_| {})
//!     .await?;
//! if let Outcome::Answer(text) = outcome {
//!     println!("{text}");
//! }
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod bridge;
mod catalog;
mod error;
pub mod model;
mod orchestrator;
mod providers;
mod session;

// Conversation types (provider-agnostic)
pub use model::{Backend, Message, ModelError, ModelRequest, ModelResponse, ToolCall, ToolSpec, Usage};

// Tool catalog and invocation bridge
pub use bridge::{ToolHost, ToolOutput, invoke};
pub use catalog::ToolCatalog;

// Providers
pub use providers::{OpenAiBackend, OpenAiBackendBuilder};

// Orchestration
pub use orchestrator::{DEFAULT_MAX_ROUNDS, Orchestrator, Outcome, TraceEvent};

// Session management
pub use session::Session;

// Error types
pub use error::{Error, Result};
