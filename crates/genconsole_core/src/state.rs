use std::collections::BTreeMap;

use crate::view_model::{AppViewModel, SessionView, StepRowView};
use crate::{progress, GenerationState, TotalStepsPolicy};

pub type SessionKey = String;
pub type AttemptId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Generating,
    Completed,
    Failed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Failed | SessionPhase::Cancelled
        )
    }
}

/// Which generation endpoint a session talks to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationTarget {
    pub resource: String,
    pub project_id: String,
    pub query: Vec<(String, String)>,
}

impl GenerationTarget {
    pub fn new(resource: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            project_id: project_id.into(),
            query: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: SessionKey,
    pub target: GenerationTarget,
    pub attempt: AttemptId,
    pub phase: SessionPhase,
    pub generation: GenerationState,
    pub reconnects: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    sessions: BTreeMap<SessionKey, Session>,
    policy: TotalStepsPolicy,
    last_attempt: AttemptId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: TotalStepsPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> TotalStepsPolicy {
        self.policy
    }

    pub fn session(&self, key: &str) -> Option<&Session> {
        self.sessions.get(key)
    }

    pub fn has_active_sessions(&self) -> bool {
        self.sessions
            .values()
            .any(|session| session.phase == SessionPhase::Generating)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            sessions: self.sessions.values().map(session_view).collect(),
            dirty: self.dirty,
        }
    }

    /// Returns and clears the render-needed flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Replaces any previous session under `key` with a fresh generating one.
    pub(crate) fn start_session(&mut self, key: SessionKey, target: GenerationTarget) -> AttemptId {
        self.last_attempt += 1;
        let attempt = self.last_attempt;
        self.sessions.insert(
            key.clone(),
            Session {
                key,
                target,
                attempt,
                phase: SessionPhase::Generating,
                generation: GenerationState::generating(self.policy),
                reconnects: 0,
            },
        );
        self.mark_dirty();
        attempt
    }

    /// The live session for `key` if `attempt` is its current, still generating attempt.
    pub(crate) fn live_session_mut(&mut self, key: &str, attempt: AttemptId) -> Option<&mut Session> {
        self.sessions
            .get_mut(key)
            .filter(|session| session.attempt == attempt && session.phase == SessionPhase::Generating)
    }

    pub(crate) fn generating_session_mut(&mut self, key: &str) -> Option<&mut Session> {
        self.sessions
            .get_mut(key)
            .filter(|session| session.phase == SessionPhase::Generating)
    }

    pub(crate) fn remove_session(&mut self, key: &str) -> Option<Session> {
        let removed = self.sessions.remove(key);
        if removed.is_some() {
            self.mark_dirty();
        }
        removed
    }

    pub(crate) fn session_keys(&self) -> Vec<SessionKey> {
        self.sessions.keys().cloned().collect()
    }
}

fn session_view(session: &Session) -> SessionView {
    let generation = &session.generation;
    SessionView {
        session_key: session.key.clone(),
        resource: session.target.resource.clone(),
        phase: session.phase,
        rows: generation
            .steps
            .iter()
            .map(|step| StepRowView {
                step_name: step.step_name.clone(),
                status: step.status,
                summary: step.summary.clone(),
                has_content: step.content.is_some(),
            })
            .collect(),
        steps_in_progress: generation.steps_in_progress.clone(),
        completed_count: generation.completed_steps.len(),
        total_steps: generation.total_steps,
        progress_percentage: progress::progress_percentage(generation),
        has_completed_steps: progress::has_completed_steps(generation),
        is_generating: generation.is_generating,
        error: generation.error.clone(),
        reconnects: session.reconnects,
    }
}
