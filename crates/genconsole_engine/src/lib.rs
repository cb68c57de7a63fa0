//! Genconsole engine: generation stream IO and effect execution.
mod client;
mod engine;
mod filename;
mod parse;
mod persist;
mod registry;
mod sse;
mod types;

pub use client::{
    AdditionalInfo, ClientSettings, FilePart, GenerationRequest, GenerationStream,
    ReqwestGenerationClient, StreamSink,
};
pub use engine::EngineHandle;
pub use filename::{deterministic_filename, extension_for_content};
pub use parse::{parse_or_skip, parse_payload, ParsedDataFrame, ParsedMessage, StepFrame, StepFrameKind};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use registry::{Connection, ConnectionRegistry, StreamConnection};
pub use sse::{SseDecoder, SseFrame, MAX_LINE_BYTES};
pub use types::{
    AttemptId, EngineEvent, EngineStopped, FailureKind, SessionKey, StreamError, StreamOutcome, StreamSignal,
};
