use console_logging::{console_debug, console_info};

use crate::{reducer, AppState, Effect, Msg, SessionPhase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::GenerateClicked {
            session_key,
            target,
        } => {
            // A previous run under the same key becomes stale; the engine closes
            // its connection before opening the new one.
            let attempt = state.start_session(session_key.clone(), target.clone());
            console_info!(
                "Generation started session={} attempt={} resource={} project={}",
                session_key,
                attempt,
                target.resource,
                target.project_id
            );
            vec![Effect::OpenStream {
                session_key,
                attempt,
                target,
            }]
        }
        Msg::StepReceived {
            session_key,
            attempt,
            event,
        } => {
            let policy = state.policy();
            match state.live_session_mut(&session_key, attempt) {
                Some(session) => {
                    let current = std::mem::take(&mut session.generation);
                    session.generation = reducer::reduce(current, &event, policy);
                    state.mark_dirty();
                }
                None => {
                    console_debug!(
                        "Dropping late step '{}' for session={} attempt={}",
                        event.step_name,
                        session_key,
                        attempt
                    );
                }
            }
            Vec::new()
        }
        Msg::StreamFinished {
            session_key,
            attempt,
        } => match state.live_session_mut(&session_key, attempt) {
            Some(session) => {
                session.generation = reducer::finish(std::mem::take(&mut session.generation));
                session.phase = SessionPhase::Completed;
                state.mark_dirty();
                console_info!("Generation completed session={}", session_key);
                terminal_effects(session_key)
            }
            None => Vec::new(),
        },
        Msg::StreamFailed {
            session_key,
            attempt,
            message,
        } => match state.live_session_mut(&session_key, attempt) {
            Some(session) => {
                session.generation =
                    reducer::fail(std::mem::take(&mut session.generation), message);
                session.phase = SessionPhase::Failed;
                state.mark_dirty();
                console_info!("Generation failed session={}", session_key);
                terminal_effects(session_key)
            }
            None => Vec::new(),
        },
        Msg::Reconnecting {
            session_key,
            attempt,
            retry,
        } => {
            if let Some(session) = state.live_session_mut(&session_key, attempt) {
                session.reconnects = retry;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::EngineStopped { message } => {
            let mut effects = Vec::new();
            for session_key in state.session_keys() {
                let Some(session) = state.generating_session_mut(&session_key) else {
                    continue;
                };
                session.generation =
                    reducer::fail(std::mem::take(&mut session.generation), message.clone());
                session.phase = SessionPhase::Failed;
                console_info!("Generation failed session={}: {}", session_key, message);
                effects.extend(terminal_effects(session_key));
            }
            if !effects.is_empty() {
                state.mark_dirty();
            }
            effects
        }
        Msg::CancelClicked { session_key } => match state.generating_session_mut(&session_key) {
            Some(session) => {
                session.generation = reducer::cancel(std::mem::take(&mut session.generation));
                session.phase = SessionPhase::Cancelled;
                state.mark_dirty();
                console_info!("Generation cancelled session={}", session_key);
                terminal_effects(session_key)
            }
            None => Vec::new(),
        },
        Msg::Teardown { session_key } => {
            state.remove_session(&session_key);
            vec![Effect::CloseStream { session_key }]
        }
        Msg::TeardownAll => state
            .session_keys()
            .into_iter()
            .map(|session_key| {
                state.remove_session(&session_key);
                Effect::CloseStream { session_key }
            })
            .collect(),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn terminal_effects(session_key: String) -> Vec<Effect> {
    vec![
        Effect::CloseStream {
            session_key: session_key.clone(),
        },
        Effect::SessionEnded { session_key },
    ]
}
