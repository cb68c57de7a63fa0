use std::fmt;
use std::time::Duration;

use crate::StepFrame;

pub type SessionKey = String;
pub type AttemptId = u64;

/// Events the engine reports back to the front end, tagged with the attempt that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Step {
        session_key: SessionKey,
        attempt: AttemptId,
        frame: StepFrame,
    },
    Finished {
        session_key: SessionKey,
        attempt: AttemptId,
    },
    Failed {
        session_key: SessionKey,
        attempt: AttemptId,
        error: StreamError,
    },
    Reconnecting {
        session_key: SessionKey,
        attempt: AttemptId,
        retry: u32,
        delay: Duration,
    },
}

/// What a single stream run reports to its sink while it is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    Step(StepFrame),
    Reconnecting { retry: u32, delay: Duration },
}

/// How a stream run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Transport-level failures are retried; everything else ends the session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::Network | FailureKind::Timeout | FailureKind::StreamEnded
        ) || matches!(self.kind, FailureKind::HttpStatus(code) if code >= 500)
    }

    /// Text suitable for the session's error banner.
    pub fn user_message(&self) -> String {
        match &self.kind {
            FailureKind::Server => self.message.clone(),
            kind => format!("{kind}: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Submit(u16),
    Timeout,
    Network,
    StreamEnded,
    Server,
    /// The stream task itself crashed.
    Engine,
}

/// The engine worker is gone; no command reaches it and no event will arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("generation engine stopped")]
pub struct EngineStopped;

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Submit(code) => write!(f, "additional info rejected with status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::StreamEnded => write!(f, "stream ended unexpectedly"),
            FailureKind::Server => write!(f, "server error"),
            FailureKind::Engine => write!(f, "engine failure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_retry() {
        assert!(StreamError::new(FailureKind::Network, "reset").is_retryable());
        assert!(StreamError::new(FailureKind::StreamEnded, "eof").is_retryable());
        assert!(StreamError::new(FailureKind::HttpStatus(503), "busy").is_retryable());
        assert!(!StreamError::new(FailureKind::HttpStatus(404), "missing").is_retryable());
        assert!(!StreamError::new(FailureKind::Server, "bad prompt").is_retryable());
        assert!(!StreamError::new(FailureKind::Submit(400), "bad form").is_retryable());
        assert!(!StreamError::new(FailureKind::Engine, "panicked").is_retryable());
    }

    #[test]
    fn server_errors_are_shown_verbatim() {
        let err = StreamError::new(FailureKind::Server, "quota exceeded");
        assert_eq!(err.user_message(), "quota exceeded");
        let err = StreamError::new(FailureKind::HttpStatus(404), "Not Found");
        assert_eq!(err.user_message(), "http status 404: Not Found");
    }
}
