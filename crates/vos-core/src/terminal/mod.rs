//! Command interpreter and terminal subsystem.
//!
//! Core command types, registry, and built-in commands are provided by
//! the `vos-terminal` crate. The `module` and `pkg` commands live here
//! because they drive the module loader.

pub mod module_commands;

// Re-export everything from the vos-terminal crate.
pub use vos_terminal::*;

pub use module_commands::register_module_commands;
