use crate::{SessionKey, SessionPhase, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub sessions: Vec<SessionView>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn session(&self, key: &str) -> Option<&SessionView> {
        self.sessions.iter().find(|session| session.session_key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_key: SessionKey,
    pub resource: String,
    pub phase: SessionPhase,
    pub rows: Vec<StepRowView>,
    pub steps_in_progress: Vec<String>,
    pub completed_count: usize,
    pub total_steps: u32,
    pub progress_percentage: u8,
    pub has_completed_steps: bool,
    pub is_generating: bool,
    pub error: Option<String>,
    pub reconnects: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRowView {
    pub step_name: String,
    pub status: StepStatus,
    pub summary: String,
    pub has_content: bool,
}
