//! Wiring of Ctrl-C and stdin commands to the batch control surface

use std::io::BufRead;
use std::thread;

use coachbench_core::control::BatchControl;
use tracing::{debug, warn};

/// Ctrl-C aborts the batch; optionally `pause`, `resume` and `abort` lines on
/// stdin drive it too.
pub fn install(control: &BatchControl, read_stdin: bool) {
    let on_signal = control.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.abort()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    if !read_stdin {
        return;
    }
    let control = control.clone();
    let spawned = thread::Builder::new()
        .name("stdin-control".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if !apply_command(&control, &line) && !line.trim().is_empty() {
                    eprintln!("unknown command '{}' (expected pause, resume or abort)", line.trim());
                }
                if control.is_aborted() {
                    break;
                }
            }
            debug!("stdin control closed");
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start stdin control thread");
    }
}

/// Apply one stdin command; false when it is not recognised
pub fn apply_command(control: &BatchControl, line: &str) -> bool {
    match line.trim().to_ascii_lowercase().as_str() {
        "pause" | "p" => control.pause(),
        "resume" | "r" => control.resume(),
        "abort" | "quit" | "q" => control.abort(),
        _ => return false,
    }
    true
}
