//! `breathe`: the breathing exercise in the terminal.

use std::io::Write;

use tracing::debug;

use crate::breathing::{BreathingRoutine, BreathingSession};
use crate::error::ClientResult;

fn describe(routine: &BreathingRoutine) -> String {
    if routine.is_running() {
        format!("[{}] {}", routine.current_cycle(), routine.instruction())
    } else {
        routine.instruction().to_string()
    }
}

/// Runs `cycles` breathing cycles, or until Ctrl+C.
pub async fn run(cycles: u32, out: &mut impl Write) -> ClientResult<()> {
    let mut session = BreathingSession::new();
    let mut updates = session.subscribe();
    session.start();

    let cycles = cycles.max(1);
    loop {
        let routine = *updates.borrow_and_update();
        if routine.cycles() >= cycles {
            break;
        }
        writeln!(out, "{}", describe(&routine))?;
        out.flush()?;

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("breathing interrupted");
                break;
            }
        }
    }

    let completed = session.snapshot().cycles();
    session.stop();
    writeln!(out, "{}", describe(&session.snapshot()))?;
    writeln!(out, "Completed {} of {} cycles.", completed.min(cycles), cycles)?;
    Ok(())
}
