//! Session workflow state machine.
//!
//! States: idle → (masking) → awaiting_approval → editing | (research,
//! synthesis) → idle. Masking, research and synthesis run inside a single
//! `handle` call; the session only ever rests in idle, awaiting_approval or
//! editing. Every delegate failure reports the stage and force-resets the
//! session to idle.
//!
//! The workflow never talks to a UI. Each event yields a list of replies
//! (kind, markdown text, offered actions) for the surface to display.

use std::sync::Arc;
use theo_shared::{unmask, Action, Mode, WorkflowState};
use tracing::{info, warn};

use crate::attachments::{compose_input, Attachment};
use crate::config::WorkflowConfig;
use crate::error::ServiceError;
use crate::render;
use crate::research::ResearchOptions;
use crate::services::Services;
use crate::session::{CompletedResearch, Session};

/// One user message, optionally with files
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl UserInput {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(text: &str, attachments: Vec<Attachment>) -> Self {
        Self {
            text: text.to_string(),
            attachments,
        }
    }
}

/// Everything a surface can send into a session
#[derive(Debug, Clone)]
pub enum Event {
    Message(UserInput),
    Action(Action),
    SetMode(Mode),
    /// Empty string clears the override
    SetResearchModel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Info,
    Analysis,
    Warning,
    Research,
    Answer,
    Requirements,
    Error,
    /// Question to the user, usually with actions
    Prompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
    pub actions: Vec<Action>,
}

impl Reply {
    pub fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Error, text)
    }

    pub fn with_actions(mut self, actions: &[Action]) -> Self {
        self.actions = actions.to_vec();
        self
    }
}

const APPROVAL_ACTIONS: [Action; 3] = [Action::Approve, Action::Edit, Action::Cancel];
const FOLLOW_UP_ACTIONS: [Action; 2] = [Action::GenerateRequirements, Action::NewQuery];
const INTERNAL_ACTIONS: [Action; 2] = [Action::SwitchToExternal, Action::NewQuery];

const NOTHING_PENDING: &str = "❌ Keine ausstehende Anfrage gefunden.";
const NO_QUERY: &str = "❌ Keine Anfrage gefunden.";
const NO_RESEARCH: &str = "❌ Keine Recherche vorhanden. Starte zuerst eine externe Recherche.";

/// Drives sessions through the workflow. Shared across sessions.
pub struct Workflow {
    services: Arc<Services>,
    settings: WorkflowConfig,
}

impl Workflow {
    pub fn new(services: Arc<Services>, settings: WorkflowConfig) -> Self {
        Self { services, settings }
    }

    pub fn settings(&self) -> &WorkflowConfig {
        &self.settings
    }

    /// Fresh session in the configured default mode, plus its welcome
    pub fn start_session(&self) -> (Session, Vec<Reply>) {
        let session = Session::new(self.settings.default_mode);
        info!("Session {} started in {} mode", session.id(), session.mode());
        let welcome = Reply::info(render::welcome_message(session.mode()));
        (session, vec![welcome])
    }

    pub async fn handle(&self, session: &mut Session, event: Event) -> Vec<Reply> {
        match event {
            Event::Message(input) => self.on_message(session, input).await,
            Event::Action(action) => self.on_action(session, action).await,
            Event::SetMode(mode) => self.on_set_mode(session, mode),
            Event::SetResearchModel(model) => self.on_set_research_model(session, model),
        }
    }

    async fn on_message(&self, session: &mut Session, input: UserInput) -> Vec<Reply> {
        let text = compose_input(
            &input.text,
            &input.attachments,
            self.settings.attachment_max_chars,
        );
        if text.trim().is_empty() {
            return vec![Reply::info("Bitte gib eine Frage ein.")];
        }

        // A revised query is always re-masked, whatever the mode
        if session.state() == WorkflowState::Editing {
            return self.start_masking(session, &text).await;
        }

        if session.state() != WorkflowState::Idle {
            warn!(
                "Session {}: new query while {}, discarding pending query",
                session.id(),
                session.state()
            );
            session.reset();
        }

        match session.mode() {
            Mode::Internal => self.answer_internally(session, &text).await,
            Mode::External => self.start_masking(session, &text).await,
        }
    }

    async fn on_action(&self, session: &mut Session, action: Action) -> Vec<Reply> {
        info!("Session {}: action {} in {}", session.id(), action, session.state());

        match action {
            Action::Approve => self.approve(session).await,
            Action::Edit => self.edit(session),
            Action::Cancel => self.cancel(session),
            Action::Retry => match session.original_query().map(str::to_string) {
                Some(query) => self.start_masking(session, &query).await,
                None => vec![Reply::error(NO_QUERY)],
            },
            Action::SwitchToExternal => self.switch_to_external(session).await,
            Action::GenerateRequirements => self.generate_requirements(session).await,
            Action::NewQuery => {
                session.reset();
                vec![Reply::info(
                    "🔄 **Bereit für eine neue Anfrage!** Gib deine Frage ein.",
                )]
            }
            Action::Stop => {
                session.reset();
                vec![Reply::info("⏹️ Workflow gestoppt.")]
            }
        }
    }

    fn on_set_mode(&self, session: &mut Session, mode: Mode) -> Vec<Reply> {
        if !session.set_mode(mode) {
            return Vec::new();
        }
        info!("Session {}: mode {}", session.id(), mode);
        vec![Reply::info(render::mode_banner(mode))]
    }

    fn on_set_research_model(&self, session: &mut Session, model: String) -> Vec<Reply> {
        session.set_research_model(Some(model));
        let active = session
            .research_model()
            .map(str::to_string)
            .unwrap_or_else(|| self.services.research.default_model().to_string());
        info!("Session {}: research model {}", session.id(), active);
        vec![Reply::info(format!("🌐 Recherche-Modell: `{}`", active))]
    }

    /// Mask `text` and hold the result for approval
    async fn start_masking(&self, session: &mut Session, text: &str) -> Vec<Reply> {
        session.begin_query(text);
        session.set_state(WorkflowState::Idle);

        let result = match self.services.masking.analyze_and_mask(text, None).await {
            Ok(result) => result,
            Err(e) => return self.fail(session, e),
        };

        let threshold = self.settings.review_threshold_chars;
        let kind = if result.needs_manual_review(threshold) || result.mask_mapping.is_degraded() {
            ReplyKind::Warning
        } else {
            ReplyKind::Analysis
        };
        let analysis = Reply::new(kind, render::analysis_message(&result, threshold));

        session.store_masking(result);

        vec![
            analysis,
            Reply::new(ReplyKind::Prompt, "**Wie möchtest du fortfahren?**")
                .with_actions(&APPROVAL_ACTIONS),
        ]
    }

    /// Research then synthesis on the stored masked query and mapping
    async fn approve(&self, session: &mut Session) -> Vec<Reply> {
        if session.state() != WorkflowState::AwaitingApproval {
            session.reset();
            return vec![Reply::error(NOTHING_PENDING)];
        }
        let Some((query, mapping)) = session.take_pending() else {
            session.reset();
            return vec![Reply::error(NOTHING_PENDING)];
        };

        let mut replies = vec![Reply::info("## 🔍 Starte externe Recherche...")];

        let mut options = ResearchOptions::new(&self.settings.language);
        if let Some(model) = session.research_model() {
            options = options.with_model(model);
        }

        let research = match self.services.research.research(&query, None, &options).await {
            Ok(r) => r,
            Err(e) => {
                replies.extend(self.fail(session, e));
                return replies;
            }
        };
        replies.push(Reply::new(
            ReplyKind::Research,
            render::research_preview(&research.response, self.settings.raw_research_preview_chars),
        ));

        let answer = match self
            .services
            .reasoning
            .synthesize(&query, &research.response, Some(&mapping), None)
            .await
        {
            Ok(a) => a,
            Err(e) => {
                replies.extend(self.fail(session, e));
                return replies;
            }
        };

        replies.push(Reply::new(
            ReplyKind::Answer,
            render::final_answer(&answer.final_response),
        ));
        replies.push(
            Reply::new(ReplyKind::Prompt, "**Weitere Aktionen:**").with_actions(&FOLLOW_UP_ACTIONS),
        );

        session.set_last_research(CompletedResearch { research, mapping });
        session.reset();
        info!("Session {}: research complete", session.id());
        replies
    }

    fn edit(&self, session: &mut Session) -> Vec<Reply> {
        let pending = match (session.state(), session.pending_query()) {
            (WorkflowState::AwaitingApproval, Some(q)) => q.to_string(),
            _ => {
                session.reset();
                return vec![Reply::error(NOTHING_PENDING)];
            }
        };
        session.set_state(WorkflowState::Editing);
        vec![Reply::new(ReplyKind::Prompt, render::edit_prompt(&pending))]
    }

    fn cancel(&self, session: &mut Session) -> Vec<Reply> {
        let had_pending = session.has_pending()
            && matches!(
                session.state(),
                WorkflowState::AwaitingApproval | WorkflowState::Editing
            );
        session.reset();
        if !had_pending {
            return vec![Reply::error(NOTHING_PENDING)];
        }
        vec![Reply::info(
            "❌ **Anfrage abgebrochen.** Du kannst jederzeit eine neue Frage stellen.",
        )]
    }

    async fn answer_internally(&self, session: &mut Session, text: &str) -> Vec<Reply> {
        session.begin_query(text);

        match self.services.internal.respond(text, None).await {
            Ok(result) => vec![
                Reply::new(ReplyKind::Answer, result.response),
                Reply::new(ReplyKind::Prompt, "**Weitere Aktionen:**")
                    .with_actions(&INTERNAL_ACTIONS),
            ],
            Err(e) => self.fail(session, e),
        }
    }

    async fn switch_to_external(&self, session: &mut Session) -> Vec<Reply> {
        let Some(query) = session.original_query().map(str::to_string) else {
            return vec![Reply::error(NO_QUERY)];
        };
        session.set_mode(Mode::External);
        info!("Session {}: switching to external research", session.id());

        let mut replies = vec![Reply::info("## 🔄 Wechsle zu externer Recherche...")];
        replies.extend(self.start_masking(session, &query).await);
        replies
    }

    async fn generate_requirements(&self, session: &mut Session) -> Vec<Reply> {
        let Some(done) = session.last_research().cloned() else {
            return vec![Reply::error(NO_RESEARCH)];
        };
        let context = session.original_query().unwrap_or_default().to_string();

        let mut replies = vec![Reply::info("## 📋 Generiere Anforderungen...")];
        match self
            .services
            .reasoning
            .generate_requirements(&done.research.response, &context)
            .await
        {
            Ok(text) => replies.push(Reply::new(
                ReplyKind::Requirements,
                render::requirements_message(&unmask(&text, &done.mapping)),
            )),
            Err(e) => replies.extend(self.fail(session, e)),
        }
        replies
    }

    fn fail(&self, session: &mut Session, error: ServiceError) -> Vec<Reply> {
        warn!(
            "Session {}: {} failed, resetting to idle: {}",
            session.id(),
            error.stage(),
            error.llm_error()
        );
        session.reset();
        vec![Reply::error(render::failure_message(&error)).with_actions(&[Action::Retry])]
    }
}
