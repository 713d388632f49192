//! VOS core: the pieces that tie the interpreter to modules and packages.
//!
//! Foundation types come from `vos-types`, the sandbox from `vos-vfs`, and
//! the command interpreter from `vos-terminal`. This crate adds the module
//! loader, the package index client, the plugin command bodies, and the
//! [`Shell`](shell::Shell) session that owns all of them.

// Re-exports from vos-types (foundation types and traits).
pub use vos_types::config;
pub use vos_types::diag;
pub use vos_types::error;
pub use vos_types::prompt;

pub mod modules;
pub mod shell;
pub mod terminal;
pub use vos_vfs as vfs;
