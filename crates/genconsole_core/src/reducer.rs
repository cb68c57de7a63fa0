//! Folding step events into the aggregate generation state.
//!
//! Every function here takes the state by value and returns the next one, so
//! callers can hold on to earlier snapshots.

use crate::event::{StepEvent, StepKind};

pub const CANCELLED_MESSAGE: &str = "Generation cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Progress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    pub step_name: String,
    pub status: StepStatus,
    pub content: Option<String>,
    pub timestamp: String,
    pub summary: String,
}

/// How `total_steps` is derived while the stream is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalStepsPolicy {
    /// Count distinct step names seen so far.
    #[default]
    Incremental,
    /// Expected count known upfront; grows if the server reports more steps.
    Fixed(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationState {
    pub steps: Vec<Step>,
    pub steps_in_progress: Vec<String>,
    pub completed_steps: Vec<String>,
    pub total_steps: u32,
    pub completed: bool,
    pub error: Option<String>,
    pub is_generating: bool,
}

impl GenerationState {
    /// Fresh state for a session that is about to open its stream.
    pub fn generating(policy: TotalStepsPolicy) -> Self {
        let mut state = Self {
            is_generating: true,
            ..Self::default()
        };
        state.total_steps = total_for(policy, 0);
        state
    }

    pub fn step(&self, step_name: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.step_name == step_name)
    }

    fn step_mut(&mut self, step_name: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|step| step.step_name == step_name)
    }

    fn is_completed(&self, step_name: &str) -> bool {
        self.completed_steps.iter().any(|name| name == step_name)
    }

    fn mark_started(&mut self, step_name: &str) {
        if self.is_completed(step_name) {
            return;
        }
        if !self.steps_in_progress.iter().any(|name| name == step_name) {
            self.steps_in_progress.push(step_name.to_string());
        }
        if self.step(step_name).is_none() {
            self.steps.push(Step {
                step_name: step_name.to_string(),
                ..Step::default()
            });
        }
    }

    fn mark_completed(&mut self, step_name: &str) {
        self.steps_in_progress.retain(|name| name != step_name);
        if !self.is_completed(step_name) {
            self.completed_steps.push(step_name.to_string());
        }
        match self.step_mut(step_name) {
            Some(step) => step.status = StepStatus::Completed,
            None => self.steps.push(Step {
                step_name: step_name.to_string(),
                status: StepStatus::Completed,
                ..Step::default()
            }),
        }
    }
}

/// Applies one step event. Events arriving after the session stopped generating are ignored.
pub fn reduce(
    mut state: GenerationState,
    event: &StepEvent,
    policy: TotalStepsPolicy,
) -> GenerationState {
    if !state.is_generating {
        return state;
    }

    let step_name = event_step_name(event);

    if let Some(completed) = &event.parsed_data.completed_steps {
        for name in completed.iter().filter(|name| !name.is_empty()) {
            state.mark_completed(name);
        }
    }
    if let Some(in_progress) = &event.parsed_data.steps_in_progress {
        for name in in_progress.iter().filter(|name| !name.is_empty()) {
            state.mark_started(name);
        }
    }

    if let Some(step_name) = step_name {
        match event.kind {
            StepKind::Started => {
                state.mark_started(step_name);
                if let Some(step) = state.step_mut(step_name) {
                    if step.status == StepStatus::Progress {
                        step.summary = event.summary.clone();
                        step.timestamp = event.timestamp.clone();
                    }
                }
            }
            StepKind::Completed => {
                state.mark_completed(step_name);
                if let Some(step) = state.step_mut(step_name) {
                    if !event.data.is_empty() {
                        step.content = Some(event.data.clone());
                    }
                    if !event.summary.is_empty() {
                        step.summary = event.summary.clone();
                    }
                    if !event.timestamp.is_empty() {
                        step.timestamp = event.timestamp.clone();
                    }
                }
            }
        }
    }

    state.total_steps = total_for(policy, state.steps.len());
    state
}

/// The stream signalled overall completion.
pub fn finish(mut state: GenerationState) -> GenerationState {
    state.completed = true;
    state.is_generating = false;
    state.error = None;
    state
}

/// Terminal failure; already collected steps stay visible.
pub fn fail(mut state: GenerationState, message: impl Into<String>) -> GenerationState {
    let message = message.into();
    state.error = Some(if message.trim().is_empty() {
        "Generation failed".to_string()
    } else {
        message
    });
    state.is_generating = false;
    state.completed = false;
    state
}

pub fn cancel(state: GenerationState) -> GenerationState {
    fail(state, CANCELLED_MESSAGE)
}

fn event_step_name(event: &StepEvent) -> Option<&str> {
    let name = event.step_name.trim();
    if !name.is_empty() {
        return Some(name);
    }
    event
        .parsed_data
        .step_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn total_for(policy: TotalStepsPolicy, seen: usize) -> u32 {
    let seen = u32::try_from(seen).unwrap_or(u32::MAX);
    match policy {
        TotalStepsPolicy::Incremental => seen,
        TotalStepsPolicy::Fixed(expected) => expected.max(seen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ParsedData;

    fn generating() -> GenerationState {
        GenerationState::generating(TotalStepsPolicy::Incremental)
    }

    #[test]
    fn started_twice_keeps_single_step() {
        let event = StepEvent::started("logo");
        let state = reduce(generating(), &event, TotalStepsPolicy::Incremental);
        let state = reduce(state, &event, TotalStepsPolicy::Incremental);

        assert_eq!(state.steps.len(), 1);
        assert_eq!(state.steps_in_progress, vec!["logo".to_string()]);
        assert_eq!(state.total_steps, 1);
    }

    #[test]
    fn started_after_completed_is_ignored() {
        let state = reduce(
            generating(),
            &StepEvent::completed("logo", "<svg/>"),
            TotalStepsPolicy::Incremental,
        );
        let state = reduce(state, &StepEvent::started("logo"), TotalStepsPolicy::Incremental);

        assert!(state.steps_in_progress.is_empty());
        assert_eq!(state.step("logo").unwrap().status, StepStatus::Completed);
    }

    #[test]
    fn step_name_falls_back_to_parsed_data() {
        let event = StepEvent::completed("", "body").with_parsed_data(ParsedData {
            step_name: Some("colors".to_string()),
            ..ParsedData::default()
        });
        let state = reduce(generating(), &event, TotalStepsPolicy::Incremental);

        assert_eq!(state.completed_steps, vec!["colors".to_string()]);
    }

    #[test]
    fn server_snapshot_is_merged_without_overlap() {
        let event = StepEvent::started("typography").with_parsed_data(ParsedData {
            steps_in_progress: Some(vec!["logo".to_string(), "typography".to_string()]),
            completed_steps: Some(vec!["logo".to_string(), "colors".to_string()]),
            ..ParsedData::default()
        });
        let state = reduce(generating(), &event, TotalStepsPolicy::Incremental);

        assert_eq!(state.steps_in_progress, vec!["typography".to_string()]);
        assert_eq!(
            state.completed_steps,
            vec!["logo".to_string(), "colors".to_string()]
        );
        assert_eq!(state.total_steps, 3);
    }

    #[test]
    fn fixed_policy_grows_when_exceeded() {
        let policy = TotalStepsPolicy::Fixed(1);
        let state = reduce(GenerationState::generating(policy), &StepEvent::started("a"), policy);
        assert_eq!(state.total_steps, 1);
        let state = reduce(state, &StepEvent::started("b"), policy);
        assert_eq!(state.total_steps, 2);
    }

    #[test]
    fn blank_failure_message_gets_default() {
        let state = fail(generating(), "  ");
        assert_eq!(state.error.as_deref(), Some("Generation failed"));
    }

    #[test]
    fn events_after_terminal_state_are_dropped() {
        let state = cancel(generating());
        let state = reduce(state, &StepEvent::started("late"), TotalStepsPolicy::Incremental);
        assert!(state.steps.is_empty());
    }
}
