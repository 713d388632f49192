//! Prioritized diagnostics.
//!
//! Subsystems that must keep going after a problem (the lexer on an
//! unterminated quote, the module loader on a broken manifest) record a
//! [`Diagnostic`] instead of failing. Each diagnostic is written to the `log`
//! facade when emitted and also handed back to the caller.

use std::fmt;

/// How loudly a diagnostic should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Plain informational output.
    None,
    /// Progress chatter.
    Low,
    /// Something was skipped but the operation succeeded.
    Medium,
    /// An input or plugin was rejected.
    High,
    /// The subsystem itself is in trouble.
    Critical,
}

impl Priority {
    /// The `log` level this priority is written at.
    pub fn level(self) -> log::Level {
        match self {
            Priority::None => log::Level::Info,
            Priority::Low => log::Level::Debug,
            Priority::Medium => log::Level::Warn,
            Priority::High | Priority::Critical => log::Level::Error,
        }
    }
}

/// A message with a priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub priority: Priority,
    pub message: String,
}

impl Diagnostic {
    pub fn new(priority: Priority, message: impl Into<String>) -> Self {
        Self {
            priority,
            message: message.into(),
        }
    }

    pub fn high(message: impl Into<String>) -> Self {
        Self::new(Priority::High, message)
    }

    pub fn medium(message: impl Into<String>) -> Self {
        Self::new(Priority::Medium, message)
    }

    /// Write the diagnostic to the log and return it for collection.
    pub fn emit(self) -> Self {
        log::log!(self.priority.level(), "{}", self.message);
        self
    }

    pub fn is_high(&self) -> bool {
        self.priority >= Priority::High
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
