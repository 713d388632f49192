//! Foundation types for VOS.
//!
//! This crate contains the types shared by every VOS crate: the error enum,
//! prioritized diagnostics, runtime configuration, and the confirmation
//! prompt abstraction used by interactive commands.

pub mod config;
pub mod diag;
pub mod error;
pub mod prompt;
