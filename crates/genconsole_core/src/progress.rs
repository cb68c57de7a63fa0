use crate::GenerationState;

/// Share of completed steps, rounded and clamped to `0..=100`.
pub fn progress_percentage(state: &GenerationState) -> u8 {
    let total = u64::from(state.total_steps.max(1));
    let completed = state.completed_steps.len() as u64;
    let percent = (completed * 100 + total / 2) / total;
    percent.min(100) as u8
}

pub fn has_completed_steps(state: &GenerationState) -> bool {
    !state.completed_steps.is_empty()
}
