use std::collections::HashMap;

use genconsole_core::{AppViewModel, SessionPhase, SessionView, StepStatus};

/// What has already been printed, so each render only emits what changed.
#[derive(Debug, Default)]
pub struct RenderMemory {
    steps: HashMap<(String, String), StepStatus>,
    status: HashMap<String, String>,
}

/// Renders the view into the lines that should be printed now.
pub fn render(view: &AppViewModel, memory: &mut RenderMemory) -> Vec<String> {
    let mut lines = Vec::new();

    for session in &view.sessions {
        for row in &session.rows {
            let key = (session.session_key.clone(), row.step_name.clone());
            if memory.steps.get(&key) == Some(&row.status) {
                continue;
            }
            memory.steps.insert(key, row.status);

            let marker = match row.status {
                StepStatus::Progress => "..",
                StepStatus::Completed => "ok",
            };
            let mut line = format!("[{}] {} {}", session.session_key, marker, row.step_name);
            if !row.summary.is_empty() {
                line.push_str(" - ");
                line.push_str(&row.summary);
            }
            lines.push(line);
        }

        let status = status_line(session);
        if memory.status.get(&session.session_key) != Some(&status) {
            memory
                .status
                .insert(session.session_key.clone(), status.clone());
            lines.push(status);
        }
    }

    lines
}

pub fn status_line(session: &SessionView) -> String {
    let phase = match session.phase {
        SessionPhase::Idle => "Idle",
        SessionPhase::Generating => "Generating",
        SessionPhase::Completed => "Completed",
        SessionPhase::Failed => "Failed",
        SessionPhase::Cancelled => "Cancelled",
    };

    let mut line = format!(
        "[{}] {} {}% ({}/{} steps)",
        session.session_key,
        phase,
        session.progress_percentage,
        session.completed_count,
        session.total_steps
    );
    if !session.steps_in_progress.is_empty() {
        line.push_str(&format!(" | running: {}", session.steps_in_progress.join(", ")));
    }
    if session.is_generating && session.reconnects > 0 {
        line.push_str(&format!(" | reconnect #{}", session.reconnects));
    }
    if let Some(error) = &session.error {
        line.push_str(&format!(" | error: {error}"));
        if session.has_completed_steps {
            line.push_str(" (partial results kept)");
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use genconsole_core::{update, AppState, GenerationTarget, Msg, StepEvent};
    use pretty_assertions::assert_eq;

    fn generating_state() -> AppState {
        update(
            AppState::new(),
            Msg::GenerateClicked {
                session_key: "branding".to_string(),
                target: GenerationTarget::new("branding", "p-1"),
            },
        )
        .0
    }

    fn step(state: AppState, event: StepEvent) -> AppState {
        update(
            state,
            Msg::StepReceived {
                session_key: "branding".to_string(),
                attempt: 1,
                event,
            },
        )
        .0
    }

    #[test]
    fn prints_only_changes() {
        let mut memory = RenderMemory::default();
        let state = step(generating_state(), StepEvent::started("logo"));

        assert_eq!(
            render(&state.view(), &mut memory),
            vec![
                "[branding] .. logo".to_string(),
                "[branding] Generating 0% (0/1 steps) | running: logo".to_string(),
            ]
        );
        assert!(render(&state.view(), &mut memory).is_empty());

        let state = step(state, StepEvent::completed("logo", "<svg/>").with_summary("Logo ready"));
        assert_eq!(
            render(&state.view(), &mut memory),
            vec![
                "[branding] ok logo - Logo ready".to_string(),
                "[branding] Generating 100% (1/1 steps)".to_string(),
            ]
        );
    }

    #[test]
    fn cancelled_status_mentions_partial_results() {
        let state = step(generating_state(), StepEvent::completed("logo", "x"));
        let (state, _) = update(
            state,
            Msg::CancelClicked {
                session_key: "branding".to_string(),
            },
        );
        let view = state.view();
        assert_eq!(
            status_line(&view.sessions[0]),
            "[branding] Cancelled 100% (1/1 steps) | error: Generation cancelled (partial results kept)"
        );
    }
}
