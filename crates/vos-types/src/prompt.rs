//! Blocking yes/no confirmation prompts.
//!
//! Commands such as `rm` (without `-y`) and `wget` (on overwrite) ask the
//! user before touching the sandbox. The shell owns one prompter; tests
//! substitute a scripted one.

/// Asks the user a yes/no question and blocks until answered.
pub trait Confirm {
    /// Returns `true` when the user agreed.
    fn confirm(&self, question: &str) -> bool;
}

/// Interpret a raw answer line. Only an explicit yes counts.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "Y" | "y" | "yes" | "Yes" | "YES")
}

/// A prompter that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, question: &str) -> bool {
        log::debug!("auto-answering {:?} with {}", question, self.0);
        self.0
    }
}
