use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use genconsole_core::{Msg, SessionKey};

/// Maps one line typed by the user to a message for `session_key`.
pub fn command_for_line(line: &str, session_key: &str) -> Option<Msg> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "cancel" => Some(Msg::CancelClicked {
            session_key: session_key.to_string(),
        }),
        _ => None,
    }
}

/// Reads stdin on a background thread until EOF or the receiver goes away.
pub fn spawn_stdin_listener(session_key: SessionKey, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(msg) = command_for_line(&line, &session_key) {
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
        }
    });
}
