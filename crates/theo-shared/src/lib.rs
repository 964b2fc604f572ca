//! Shared types for theo components.
//!
//! Placeholder grammar, entity categories, masking results, the
//! placeholder mapping with its restorer, and workflow enums.

pub mod category;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod masking;
pub mod placeholder;
pub mod workflow;

pub use category::Category;
pub use entity::{DetectedEntities, Entity};
pub use error::PlaceholderError;
pub use mapping::{unmask, MaskMapping};
pub use masking::{MaskingResult, Recovery};
pub use placeholder::Placeholder;
pub use workflow::{Action, Mode, WorkflowState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
