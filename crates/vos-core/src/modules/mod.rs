//! Modules: data-only manifests bound to compiled-in command handlers,
//! loaded from a directory and installable from a remote package index.

pub mod catalog;
mod handlers;
pub mod index;
pub mod loader;
pub mod manifest;

pub use catalog::{Handler, HandlerCatalog, ModuleCommand};
pub use index::{HttpPackageIndex, PackageIndex, PackageRecord};
pub use loader::{ModuleLoader, ScanReport};
pub use manifest::{CommandManifest, ModuleManifest};
