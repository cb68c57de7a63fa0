use std::collections::VecDeque;
use std::io::Write;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use console_logging::{console_error, console_info};
use genconsole_core::{update, AppState, Msg, SessionPhase};
use genconsole_engine::EngineHandle;

use crate::config::Settings;
use crate::effects::{engine_stopped, EffectRunner};
use crate::export::SessionExporter;
use crate::job::GenerationJob;
use crate::ui;

/// How long the loop waits on the engine before checking user input again.
const POLL_INTERVAL: Duration = Duration::from_millis(75);

/// Runs one generation session to a terminal phase and returns that phase.
pub fn run_generation(settings: &Settings, job: GenerationJob) -> Result<SessionPhase> {
    let engine = EngineHandle::new(settings.client_settings())
        .context("starting generation engine")?;
    let exporter = settings.output_dir.clone().map(SessionExporter::new);
    let runner = EffectRunner::new(engine, job.additional_info.clone(), exporter);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    ui::input::spawn_stdin_listener(job.session_key.clone(), msg_tx);
    println!(
        "Generating {} for project {} (type 'cancel' + Enter to stop)",
        job.target.resource, job.target.project_id
    );

    let mut app = App::new(runner, AppState::with_policy(settings.total_steps_policy()));
    app.dispatch(Msg::GenerateClicked {
        session_key: job.session_key.clone(),
        target: job.target,
    });

    let phase = loop {
        while let Ok(msg) = msg_rx.try_recv() {
            app.dispatch(msg);
        }
        match app.runner.next_msg(POLL_INTERVAL) {
            Ok(Some(msg)) => app.dispatch(msg),
            Ok(None) => {}
            Err(err) => {
                console_error!("{}", err);
                app.dispatch(engine_stopped(err));
                let phase = app.phase(&job.session_key);
                break if phase.is_terminal() {
                    phase
                } else {
                    SessionPhase::Failed
                };
            }
        }

        let phase = app.phase(&job.session_key);
        if phase.is_terminal() {
            break phase;
        }
    };

    console_info!("Session {} ended as {:?}", job.session_key, phase);
    app.dispatch(Msg::TeardownAll);
    Ok(phase)
}

struct App {
    runner: EffectRunner,
    state: AppState,
    memory: ui::render::RenderMemory,
}

impl App {
    fn new(runner: EffectRunner, state: AppState) -> Self {
        Self {
            runner,
            state,
            memory: ui::render::RenderMemory::default(),
        }
    }

    fn phase(&self, session_key: &str) -> SessionPhase {
        self.state
            .session(session_key)
            .map(|session| session.phase)
            .unwrap_or_default()
    }

    fn dispatch(&mut self, msg: Msg) {
        let mut pending = VecDeque::from([msg]);
        while let Some(msg) = pending.pop_front() {
            let (mut state, effects) = update(std::mem::take(&mut self.state), msg);
            pending.extend(self.runner.run(effects, &state));
            if state.consume_dirty() {
                let lines = ui::render::render(&state.view(), &mut self.memory);
                let mut stdout = std::io::stdout().lock();
                for line in lines {
                    let _ = writeln!(stdout, "{line}");
                }
                let _ = stdout.flush();
            }
            self.state = state;
        }
    }
}
