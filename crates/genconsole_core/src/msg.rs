use crate::{AttemptId, GenerationTarget, SessionKey, StepEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for a new generation run.
    GenerateClicked {
        session_key: SessionKey,
        target: GenerationTarget,
    },
    /// Engine decoded a step event from the stream.
    StepReceived {
        session_key: SessionKey,
        attempt: AttemptId,
        event: StepEvent,
    },
    /// Stream delivered the finish sentinel.
    StreamFinished {
        session_key: SessionKey,
        attempt: AttemptId,
    },
    /// Stream ended with a server-signalled or transport error.
    StreamFailed {
        session_key: SessionKey,
        attempt: AttemptId,
        message: String,
    },
    /// Transport is waiting to reconnect after a dropped connection.
    Reconnecting {
        session_key: SessionKey,
        attempt: AttemptId,
        retry: u32,
    },
    /// The engine can no longer run streams; every generating session fails.
    EngineStopped { message: String },
    /// User clicked Cancel.
    CancelClicked { session_key: SessionKey },
    /// Owning view is going away; close the connection and forget the session.
    Teardown { session_key: SessionKey },
    /// Every view is going away.
    TeardownAll,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
