#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Started,
    Completed,
}

/// Server-side snapshot attached to a step event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedData {
    pub status: Option<String>,
    pub step_name: Option<String>,
    pub steps_in_progress: Option<Vec<String>>,
    pub completed_steps: Option<Vec<String>>,
}

/// One milestone reported by the generation stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    pub kind: StepKind,
    pub step_name: String,
    pub data: String,
    pub summary: String,
    pub timestamp: String,
    pub parsed_data: ParsedData,
}

impl StepEvent {
    pub fn started(step_name: impl Into<String>) -> Self {
        Self::new(StepKind::Started, step_name, "")
    }

    pub fn completed(step_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(StepKind::Completed, step_name, data)
    }

    fn new(kind: StepKind, step_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind,
            step_name: step_name.into(),
            data: data.into(),
            summary: String::new(),
            timestamp: String::new(),
            parsed_data: ParsedData::default(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_parsed_data(mut self, parsed_data: ParsedData) -> Self {
        self.parsed_data = parsed_data;
        self
    }
}
