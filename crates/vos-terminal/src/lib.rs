//! Command interpreter and terminal subsystem.
//!
//! Input lines are lexed into tokens, a leading `sudo` marks the line as
//! elevated, and the registry resolves the first token to a command and
//! dispatches `execute()`. Commands never mutate the registry while it is
//! dispatching; they queue [`RegistryEdit`]s instead.

mod commands;
mod interpreter;
pub mod lexer;

/// Register all built-in commands into a registry.
pub use commands::register_builtins;
/// A single executable command trait.
pub use interpreter::Command;
/// Output produced by a command (text or signals).
pub use interpreter::CommandOutput;
/// Registry of available commands with dispatch.
pub use interpreter::CommandRegistry;
/// Result of one dispatch: output plus deferred registry edits.
pub use interpreter::Dispatch;
/// What a command sees while it runs.
pub use interpreter::Environment;
/// Module lifecycle operations exposed to commands.
pub use interpreter::{ModuleService, ModuleSummary, PackageOutcome};
/// Where a registered command came from.
pub use interpreter::Origin;
/// A deferred change to the registry.
pub use interpreter::RegistryEdit;
/// Shell resources lent to a dispatch.
pub use interpreter::Resources;
pub use interpreter::{command_info, split_sudo};
/// Lexer entry point and its result.
pub use lexer::{Lexed, lex};
