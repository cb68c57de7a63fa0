use std::time::Duration;

use console_logging::{console_error, console_info, console_warn};
use genconsole_core::{AppState, Effect, Msg, ParsedData, StepEvent, StepKind};
use genconsole_engine::{
    AdditionalInfo, EngineEvent, EngineHandle, EngineStopped, GenerationRequest, ParsedDataFrame, StepFrame,
    StepFrameKind,
};

use crate::export::SessionExporter;

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    additional_info: Option<AdditionalInfo>,
    exporter: Option<SessionExporter>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        additional_info: Option<AdditionalInfo>,
        exporter: Option<SessionExporter>,
    ) -> Self {
        Self {
            engine,
            additional_info,
            exporter,
        }
    }

    /// Runs `effects` and returns follow-up messages for effects the engine could not take.
    pub fn run(&self, effects: Vec<Effect>, state: &AppState) -> Vec<Msg> {
        let mut follow_ups = Vec::new();
        for effect in effects {
            match effect {
                Effect::OpenStream {
                    session_key,
                    attempt,
                    target,
                } => {
                    console_info!(
                        "OpenStream session={} attempt={} resource={} project={}",
                        session_key,
                        attempt,
                        target.resource,
                        target.project_id
                    );
                    let request = GenerationRequest {
                        resource: target.resource,
                        project_id: target.project_id,
                        query: target.query,
                        additional_info: self.additional_info.clone(),
                    };
                    if let Err(err) = self.engine.open(session_key, attempt, request) {
                        console_error!("Cannot open stream: {}", err);
                        follow_ups.push(engine_stopped(err));
                    }
                }
                Effect::CloseStream { session_key } => {
                    // A stopped engine holds no connections, so there is nothing to close.
                    if self.engine.close(session_key).is_err() {
                        console_warn!("Engine already stopped while closing a stream");
                    }
                }
                Effect::SessionEnded { session_key } => {
                    let (Some(exporter), Some(session)) =
                        (&self.exporter, state.session(&session_key))
                    else {
                        continue;
                    };
                    match exporter.export(session) {
                        Ok(paths) => console_info!(
                            "Exported session={} to {} file(s)",
                            session_key,
                            paths.len()
                        ),
                        Err(err) => {
                            console_error!("Failed to export session={}: {}", session_key, err)
                        }
                    }
                }
            }
        }
        follow_ups
    }

    /// Waits up to `timeout` for the next engine event, already mapped to a message.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, EngineStopped> {
        Ok(self.engine.recv_timeout(timeout)?.map(map_event))
    }
}

pub fn engine_stopped(err: EngineStopped) -> Msg {
    Msg::EngineStopped {
        message: err.to_string(),
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Step {
            session_key,
            attempt,
            frame,
        } => Msg::StepReceived {
            session_key,
            attempt,
            event: map_frame(frame),
        },
        EngineEvent::Finished {
            session_key,
            attempt,
        } => Msg::StreamFinished {
            session_key,
            attempt,
        },
        EngineEvent::Failed {
            session_key,
            attempt,
            error,
        } => {
            console_warn!("Session {} failed: {}", session_key, error);
            Msg::StreamFailed {
                session_key,
                attempt,
                message: error.user_message(),
            }
        }
        EngineEvent::Reconnecting {
            session_key,
            attempt,
            retry,
            delay,
        } => {
            console_warn!(
                "Session {} reconnecting (retry {}) in {:?}",
                session_key,
                retry,
                delay
            );
            Msg::Reconnecting {
                session_key,
                attempt,
                retry,
            }
        }
    }
}

fn map_frame(frame: StepFrame) -> StepEvent {
    StepEvent {
        kind: match frame.kind {
            StepFrameKind::Started => StepKind::Started,
            StepFrameKind::Completed => StepKind::Completed,
        },
        step_name: frame.step_name,
        data: frame.data,
        summary: frame.summary,
        timestamp: frame.timestamp,
        parsed_data: map_parsed_data(frame.parsed_data),
    }
}

fn map_parsed_data(parsed: ParsedDataFrame) -> ParsedData {
    ParsedData {
        status: parsed.status,
        step_name: parsed.step_name,
        steps_in_progress: parsed.steps_in_progress,
        completed_steps: parsed.completed_steps,
    }
}
