//! Workflow enums shared between the state machine and message surfaces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted phase of a session.
///
/// Analysis and research are transient: they run inside one handler call
/// and the session never rests in them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingApproval,
    Editing,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingApproval => write!(f, "awaiting_approval"),
            Self::Editing => write!(f, "editing"),
        }
    }
}

/// Routing mode of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Direct answers, nothing is sent out for research
    #[default]
    Internal,
    /// Masking, approval, then external research
    External,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internal" | "intern" => Ok(Mode::Internal),
            "external" | "extern" => Ok(Mode::External),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// User-triggered actions a surface can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Edit,
    Cancel,
    Retry,
    SwitchToExternal,
    GenerateRequirements,
    NewQuery,
    Stop,
}

impl Action {
    /// Stable identifier for surfaces
    pub fn id(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Edit => "edit",
            Self::Cancel => "cancel",
            Self::Retry => "retry",
            Self::SwitchToExternal => "switch_to_external",
            Self::GenerateRequirements => "generate_requirements",
            Self::NewQuery => "new_query",
            Self::Stop => "stop",
        }
    }

    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "✅ Freigeben & Recherchieren",
            Self::Edit => "✏️ Bearbeiten",
            Self::Cancel => "❌ Abbrechen",
            Self::Retry => "🔁 Erneut versuchen",
            Self::SwitchToExternal => "🌐 Externe Recherche starten",
            Self::GenerateRequirements => "📋 Anforderungen generieren",
            Self::NewQuery => "🔄 Neue Anfrage",
            Self::Stop => "⏹️ Stoppen",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "approve" => Some(Self::Approve),
            "edit" => Some(Self::Edit),
            "cancel" => Some(Self::Cancel),
            "retry" => Some(Self::Retry),
            "switch_to_external" => Some(Self::SwitchToExternal),
            "generate_requirements" => Some(Self::GenerateRequirements),
            "new_query" => Some(Self::NewQuery),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(WorkflowState::AwaitingApproval.to_string(), "awaiting_approval");
        assert_eq!(WorkflowState::default(), WorkflowState::Idle);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("external".parse::<Mode>(), Ok(Mode::External));
        assert_eq!("Intern".parse::<Mode>(), Ok(Mode::Internal));
        assert!("both".parse::<Mode>().is_err());
    }

    #[test]
    fn test_action_ids_roundtrip() {
        for action in [
            Action::Approve,
            Action::Edit,
            Action::Cancel,
            Action::Retry,
            Action::SwitchToExternal,
            Action::GenerateRequirements,
            Action::NewQuery,
            Action::Stop,
        ] {
            assert_eq!(Action::from_id(action.id()), Some(action));
        }
        assert_eq!(Action::from_id("launch"), None);
    }
}
