//! Genconsole core: pure generation state machine and view-model helpers.
mod effect;
mod event;
mod msg;
mod progress;
mod reducer;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use event::{ParsedData, StepEvent, StepKind};
pub use msg::Msg;
pub use progress::{has_completed_steps, progress_percentage};
pub use reducer::{
    cancel, fail, finish, reduce, GenerationState, Step, StepStatus, TotalStepsPolicy,
    CANCELLED_MESSAGE,
};
pub use state::{AppState, AttemptId, GenerationTarget, Session, SessionKey, SessionPhase};
pub use update::update;
pub use view_model::{AppViewModel, SessionView, StepRowView};
