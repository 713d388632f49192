//! Yes/no prompts answered on standard input.

use std::io::{BufRead, Write};

use vos_core::prompt::{Confirm, is_affirmative};

/// Prompter that asks on stdout and reads one line from stdin. An
/// unreadable answer counts as "no".
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        let mut stdout = std::io::stdout();
        if write!(stdout, "{question}").and_then(|()| stdout.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                log::warn!("could not read confirmation: {e}");
                false
            },
        }
    }
}
