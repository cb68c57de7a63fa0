use crate::{AttemptId, GenerationTarget, SessionKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the generation stream, replacing any live connection for the key.
    OpenStream {
        session_key: SessionKey,
        attempt: AttemptId,
        target: GenerationTarget,
    },
    CloseStream { session_key: SessionKey },
    /// The session reached a terminal phase; its final state can be exported.
    SessionEnded { session_key: SessionKey },
}
