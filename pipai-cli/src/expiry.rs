use crate::cli::OnExpired;
use pipai_core::agent::{ExpiryDecision, ExpiryHandler};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;
use tracing::warn;

const TERMINAL: &str = "/dev/tty";

/// Asks on the controlling terminal whether a stale conversation should be
/// reused. Stdin may be a pipe, so the terminal is opened directly. Without
/// a terminal the turn is aborted.
pub struct TerminalPrompt;

impl ExpiryHandler for TerminalPrompt {
    fn decide(&self, idle_for: Duration) -> ExpiryDecision {
        match ask(idle_for) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(%err, "No terminal to confirm the stale conversation; aborting");
                ExpiryDecision::Abort
            }
        }
    }
}

fn ask(idle_for: Duration) -> io::Result<ExpiryDecision> {
    let terminal = OpenOptions::new().read(true).write(true).open(TERMINAL)?;
    let mut writer = terminal.try_clone()?;
    write!(
        writer,
        "The conversation has been idle for {} minutes. [c]ontinue, [s]top or [a]bort? ",
        idle_for.as_secs() / 60
    )?;
    writer.flush()?;

    let mut answer = String::new();
    BufReader::<File>::new(terminal).read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> ExpiryDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "c" | "continue" | "y" | "yes" => ExpiryDecision::Continue,
        "s" | "stop" | "n" | "new" => ExpiryDecision::Stop,
        _ => ExpiryDecision::Abort,
    }
}

/// The handler for `--on-expired`.
pub fn handler_for(choice: OnExpired) -> Box<dyn ExpiryHandler> {
    match choice {
        OnExpired::Ask => Box::new(TerminalPrompt),
        OnExpired::Continue => Box::new(ExpiryDecision::Continue),
        OnExpired::Stop => Box::new(ExpiryDecision::Stop),
        OnExpired::Abort => Box::new(ExpiryDecision::Abort),
    }
}
