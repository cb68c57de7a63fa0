use std::panic::AssertUnwindSafe;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use console_logging::{console_debug, console_error, console_info};
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::client::{GenerationRequest, GenerationStream, ReqwestGenerationClient, StreamSink};
use crate::registry::{ConnectionRegistry, StreamConnection};
use crate::{
    AttemptId, ClientSettings, EngineEvent, EngineStopped, FailureKind, SessionKey, StreamError,
    StreamOutcome, StreamSignal,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

enum EngineCommand {
    Open {
        session_key: SessionKey,
        attempt: AttemptId,
        request: GenerationRequest,
    },
    Close {
        session_key: SessionKey,
    },
    Shutdown,
}

/// Front-end handle to the worker thread that owns every live stream.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, StreamError> {
        let client = ReqwestGenerationClient::new(settings)?;
        Ok(Self::with_stream(Arc::new(client)))
    }

    /// Runs the engine over any stream implementation.
    pub fn with_stream(stream: Arc<dyn GenerationStream>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    console_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            let mut registry: ConnectionRegistry<StreamConnection> = ConnectionRegistry::new();

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Open {
                        session_key,
                        attempt,
                        request,
                    } => {
                        let stream = stream.clone();
                        let event_tx = event_tx.clone();
                        registry.open(&session_key, || {
                            let token = CancellationToken::new();
                            let task_token = token.clone();
                            runtime.spawn(run_session(
                                stream,
                                session_key.clone(),
                                attempt,
                                request,
                                event_tx,
                                task_token,
                            ));
                            StreamConnection::new(token)
                        });
                    }
                    EngineCommand::Close { session_key } => {
                        if registry.close(&session_key) {
                            console_debug!("Closed connection for session={}", session_key);
                        }
                    }
                    EngineCommand::Shutdown => break,
                }
            }

            registry.close_all();
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            console_debug!("Engine worker stopped");
        });

        Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        }
    }

    /// Opens the stream for `session_key`, closing any connection it already has.
    pub fn open(
        &self,
        session_key: impl Into<SessionKey>,
        attempt: AttemptId,
        request: GenerationRequest,
    ) -> Result<(), EngineStopped> {
        self.cmd_tx
            .send(EngineCommand::Open {
                session_key: session_key.into(),
                attempt,
                request,
            })
            .map_err(|_| EngineStopped)
    }

    pub fn close(&self, session_key: impl Into<SessionKey>) -> Result<(), EngineStopped> {
        self.cmd_tx
            .send(EngineCommand::Close {
                session_key: session_key.into(),
            })
            .map_err(|_| EngineStopped)
    }

    /// `Ok(None)` on timeout; `Err` once the worker has exited.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Forwards stream signals as engine events until the connection is closed.
struct ChannelStreamSink {
    session_key: SessionKey,
    attempt: AttemptId,
    tx: mpsc::Sender<EngineEvent>,
    token: CancellationToken,
}

impl StreamSink for ChannelStreamSink {
    fn emit(&self, signal: StreamSignal) {
        if self.token.is_cancelled() {
            return;
        }
        let event = match signal {
            StreamSignal::Step(frame) => EngineEvent::Step {
                session_key: self.session_key.clone(),
                attempt: self.attempt,
                frame,
            },
            StreamSignal::Reconnecting { retry, delay } => EngineEvent::Reconnecting {
                session_key: self.session_key.clone(),
                attempt: self.attempt,
                retry,
                delay,
            },
        };
        let _ = self.tx.send(event);
    }
}

async fn run_session(
    stream: Arc<dyn GenerationStream>,
    session_key: SessionKey,
    attempt: AttemptId,
    request: GenerationRequest,
    event_tx: mpsc::Sender<EngineEvent>,
    token: CancellationToken,
) {
    let sink = ChannelStreamSink {
        session_key: session_key.clone(),
        attempt,
        tx: event_tx.clone(),
        token: token.clone(),
    };

    let result = AssertUnwindSafe(stream.run(&request, &sink, &token))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(StreamError::new(FailureKind::Engine, "stream task panicked")));
    if token.is_cancelled() {
        console_debug!("Stream for session={} attempt={} closed", session_key, attempt);
        return;
    }

    let event = match result {
        Ok(StreamOutcome::Finished) => {
            console_info!("Stream for session={} finished", session_key);
            EngineEvent::Finished {
                session_key,
                attempt,
            }
        }
        Ok(StreamOutcome::Cancelled) => return,
        Err(error) => {
            console_error!("Stream for session={} failed: {}", session_key, error);
            EngineEvent::Failed {
                session_key,
                attempt,
                error,
            }
        }
    };
    let _ = event_tx.send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped_handle() -> EngineHandle {
        let (cmd_tx, _) = mpsc::channel();
        let (_, event_rx) = mpsc::channel();
        EngineHandle {
            cmd_tx,
            event_rx,
            worker: None,
        }
    }

    #[test]
    fn stopped_worker_is_reported_to_callers() {
        let engine = stopped_handle();
        assert_eq!(
            engine.open("branding", 1, GenerationRequest::new("branding", "p-1")),
            Err(EngineStopped)
        );
        assert_eq!(engine.close("branding"), Err(EngineStopped));
        assert_eq!(
            engine.recv_timeout(Duration::from_millis(10)),
            Err(EngineStopped)
        );
    }
}
