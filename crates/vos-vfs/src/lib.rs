//! Sandboxed virtual file system.
//!
//! The shell shows the user a file tree rooted at `/`. Every virtual path is
//! backed by a real path under the sandbox root directory. [`VirtualPath`]
//! and [`LocalPath`] keep the two views apart, and [`SandboxFs`] translates
//! between them while tracking the current working directory.

mod path;
mod sandbox;

pub use path::{LocalPath, VirtualPath, to_local, to_virtual};
pub use sandbox::SandboxFs;
