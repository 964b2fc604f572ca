//! Per-session workflow state.
//!
//! A session is owned by exactly one driver and passed as `&mut Session` to
//! the workflow. Nothing here is shared across sessions.

use theo_shared::{DetectedEntities, MaskMapping, MaskingResult, Mode, WorkflowState};
use uuid::Uuid;

use crate::research::ResearchResult;

/// Masked research answer together with the mapping valid for it
#[derive(Debug, Clone)]
pub struct CompletedResearch {
    pub research: ResearchResult,
    pub mapping: MaskMapping,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    state: WorkflowState,
    mode: Mode,
    research_model: Option<String>,
    original_query: Option<String>,
    pending_query: Option<String>,
    mask_mapping: Option<MaskMapping>,
    detected_entities: Option<DetectedEntities>,
    last_research: Option<CompletedResearch>,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WorkflowState::Idle,
            mode,
            research_model: None,
            original_query: None,
            pending_query: None,
            mask_mapping: None,
            detected_entities: None,
            last_research: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn research_model(&self) -> Option<&str> {
        self.research_model.as_deref()
    }

    pub fn original_query(&self) -> Option<&str> {
        self.original_query.as_deref()
    }

    /// Masked query awaiting approval
    pub fn pending_query(&self) -> Option<&str> {
        self.pending_query.as_deref()
    }

    pub fn mask_mapping(&self) -> Option<&MaskMapping> {
        self.mask_mapping.as_ref()
    }

    pub fn detected_entities(&self) -> Option<&DetectedEntities> {
        self.detected_entities.as_ref()
    }

    pub fn last_research(&self) -> Option<&CompletedResearch> {
        self.last_research.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_query.is_some() && self.mask_mapping.is_some()
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) -> bool {
        let changed = self.mode != mode;
        self.mode = mode;
        changed
    }

    pub(crate) fn set_research_model(&mut self, model: Option<String>) {
        self.research_model = model.filter(|m| !m.trim().is_empty());
    }

    pub(crate) fn set_state(&mut self, state: WorkflowState) {
        self.state = state;
    }

    /// Start a new top-level query, discarding anything pending
    pub(crate) fn begin_query(&mut self, text: &str) {
        self.clear_pending();
        self.original_query = Some(text.to_string());
    }

    /// Hold a masking result for approval
    pub(crate) fn store_masking(&mut self, result: MaskingResult) {
        self.pending_query = Some(result.masked_text);
        self.mask_mapping = Some(result.mask_mapping);
        self.detected_entities = Some(result.detected_entities);
        self.state = WorkflowState::AwaitingApproval;
    }

    /// Remove the pending query and its mapping
    pub(crate) fn take_pending(&mut self) -> Option<(String, MaskMapping)> {
        let query = self.pending_query.take();
        let mapping = self.mask_mapping.take();
        self.detected_entities = None;
        query.zip(mapping)
    }

    pub(crate) fn set_last_research(&mut self, research: CompletedResearch) {
        self.last_research = Some(research);
    }

    /// Back to idle with nothing pending
    pub(crate) fn reset(&mut self) {
        self.clear_pending();
        self.state = WorkflowState::Idle;
    }

    fn clear_pending(&mut self) {
        self.pending_query = None;
        self.mask_mapping = None;
        self.detected_entities = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let s = Session::new(Mode::External);
        assert_eq!(s.state(), WorkflowState::Idle);
        assert_eq!(s.mode(), Mode::External);
        assert!(!s.has_pending());
        assert_ne!(s.id(), Session::default().id());
    }

    #[test]
    fn test_store_and_take_pending() {
        let mut s = Session::default();
        s.begin_query("Frage");
        s.store_masking(MaskingResult::passthrough("Frage"));

        assert_eq!(s.state(), WorkflowState::AwaitingApproval);
        assert_eq!(s.pending_query(), Some("Frage"));

        let (query, mapping) = s.take_pending().unwrap();
        assert_eq!(query, "Frage");
        assert!(mapping.is_empty());
        assert!(!s.has_pending());
        assert_eq!(s.original_query(), Some("Frage"));
    }

    #[test]
    fn test_begin_query_overwrites() {
        let mut s = Session::default();
        s.begin_query("eins");
        s.store_masking(MaskingResult::passthrough("eins"));
        s.begin_query("zwei");

        assert_eq!(s.original_query(), Some("zwei"));
        assert!(s.pending_query().is_none());
        assert!(s.mask_mapping().is_none());
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut s = Session::new(Mode::External);
        s.set_research_model(Some("perplexity/sonar-pro".to_string()));
        s.begin_query("q");
        s.store_masking(MaskingResult::passthrough("q"));
        s.reset();

        assert_eq!(s.state(), WorkflowState::Idle);
        assert!(!s.has_pending());
        assert_eq!(s.mode(), Mode::External);
        assert_eq!(s.research_model(), Some("perplexity/sonar-pro"));
    }

    #[test]
    fn test_blank_research_model_clears_override() {
        let mut s = Session::default();
        s.set_research_model(Some("x".to_string()));
        s.set_research_model(Some("  ".to_string()));
        assert_eq!(s.research_model(), None);
    }
}
