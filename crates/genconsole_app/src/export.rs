use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use console_logging::console_debug;
use genconsole_core::{Session, SessionPhase, StepStatus};
use genconsole_engine::{deterministic_filename, extension_for_content, AtomicFileWriter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ExportedStep {
    pub step_name: String,
    pub completed: bool,
    pub summary: String,
    pub timestamp: String,
    pub content_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ExportedSession {
    pub session_key: String,
    pub resource: String,
    pub project_id: String,
    pub outcome: String,
    pub error: Option<String>,
    pub exported_utc: String,
    pub total_steps: u32,
    pub steps: Vec<ExportedStep>,
}

/// Writes a finished session as a RON snapshot plus one file per completed step.
pub struct SessionExporter {
    writer: AtomicFileWriter,
}

impl SessionExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir),
        }
    }

    pub fn export(&self, session: &Session) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        let mut steps = Vec::with_capacity(session.generation.steps.len());

        for step in &session.generation.steps {
            let content_file = match (&step.content, step.status) {
                (Some(content), StepStatus::Completed) => {
                    let filename = deterministic_filename(
                        &step.step_name,
                        &format!("{}/{}/{}", session.key, session.target.project_id, step.step_name),
                        extension_for_content(content),
                    );
                    let path = self
                        .writer
                        .write(&filename, content)
                        .with_context(|| format!("writing step {}", step.step_name))?;
                    console_debug!("Wrote step {} to {:?}", step.step_name, path);
                    written.push(path);
                    Some(filename)
                }
                _ => None,
            };
            steps.push(ExportedStep {
                step_name: step.step_name.clone(),
                completed: step.status == StepStatus::Completed,
                summary: step.summary.clone(),
                timestamp: step.timestamp.clone(),
                content_file,
            });
        }

        let snapshot = ExportedSession {
            session_key: session.key.clone(),
            resource: session.target.resource.clone(),
            project_id: session.target.project_id.clone(),
            outcome: outcome_label(session.phase).to_string(),
            error: session.generation.error.clone(),
            exported_utc: Utc::now().to_rfc3339(),
            total_steps: session.generation.total_steps,
            steps,
        };
        let content = ron::ser::to_string_pretty(&snapshot, ron::ser::PrettyConfig::new())
            .context("serializing session snapshot")?;
        let filename = deterministic_filename(
            &session.key,
            &format!("{}/{}", session.key, session.target.project_id),
            "ron",
        );
        written.push(
            self.writer
                .write(&filename, content)
                .context("writing session snapshot")?,
        );

        Ok(written)
    }
}

fn outcome_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "idle",
        SessionPhase::Generating => "generating",
        SessionPhase::Completed => "completed",
        SessionPhase::Failed => "failed",
        SessionPhase::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use genconsole_core::{
        cancel, reduce, GenerationState, GenerationTarget, StepEvent, TotalStepsPolicy,
    };
    use tempfile::TempDir;

    fn cancelled_session() -> Session {
        let policy = TotalStepsPolicy::Incremental;
        let mut generation = GenerationState::generating(policy);
        generation = reduce(generation, &StepEvent::completed("logo", "<svg/>"), policy);
        generation = reduce(generation, &StepEvent::started("colors"), policy);
        Session {
            key: "branding".to_string(),
            target: GenerationTarget::new("branding", "p-1"),
            attempt: 1,
            phase: SessionPhase::Cancelled,
            generation: cancel(generation),
            reconnects: 0,
        }
    }

    #[test]
    fn writes_snapshot_and_completed_step_content() {
        let temp = TempDir::new().unwrap();
        let exporter = SessionExporter::new(temp.path().to_path_buf());

        let written = exporter.export(&cancelled_session()).unwrap();
        assert_eq!(written.len(), 2);

        let svg = written
            .iter()
            .find(|path| path.extension().is_some_and(|ext| ext == "svg"))
            .expect("step file");
        assert_eq!(fs::read_to_string(svg).unwrap(), "<svg/>");

        let ron_path = written.last().unwrap();
        let snapshot: ExportedSession =
            ron::from_str(&fs::read_to_string(ron_path).unwrap()).unwrap();
        assert_eq!(snapshot.outcome, "cancelled");
        assert_eq!(snapshot.error.as_deref(), Some("Generation cancelled"));
        assert_eq!(snapshot.steps.len(), 2);
        assert!(snapshot.steps[0].content_file.is_some());
        assert!(!snapshot.steps[1].completed);
        assert_eq!(snapshot.steps[1].content_file, None);
    }

    #[test]
    fn export_is_deterministic_per_session() {
        let temp = TempDir::new().unwrap();
        let exporter = SessionExporter::new(temp.path().to_path_buf());
        let first = exporter.export(&cancelled_session()).unwrap();
        let second = exporter.export(&cancelled_session()).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 2);
    }
}
