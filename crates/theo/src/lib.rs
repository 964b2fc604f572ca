//! theo - privacy-filtered research assistant.
//!
//! Sensitive data is masked before a query leaves for external research,
//! and restored in the final answer. The user approves every outbound query.

pub mod attachments;
pub mod config;
pub mod error;
pub mod internal;
pub mod llm;
pub mod masking;
pub mod prompts;
pub mod reasoning;
pub mod render;
pub mod repl;
pub mod research;
pub mod services;
pub mod session;
pub mod workflow;

pub use config::Config;
pub use error::{ConfigError, ServiceError};
pub use llm::{FakeLlmClient, HttpLlmClient, LlmClient, LlmError};
pub use masking::MaskingEngine;
pub use services::Services;
pub use session::Session;
pub use workflow::{Event, Reply, ReplyKind, UserInput, Workflow};
