//! Compiled-in command bodies that manifests bind to by id.

use std::collections::BTreeMap;

use vos_terminal::{Command, CommandOutput, Environment};
use vos_types::error::Result;

use super::handlers;
use super::manifest::CommandManifest;

/// Signature of a plugin command body.
pub type Handler = fn(&[&str], &mut Environment<'_>) -> Result<CommandOutput>;

/// Table of handlers keyed by the `function` id used in manifests.
#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    handlers: BTreeMap<String, Handler>,
}

impl HandlerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The handlers shipped with VOS.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.add("date", handlers::date);
        catalog.add("portscan", handlers::portscan);
        catalog.add("wprint", handlers::wprint);
        catalog.add("wget", handlers::wget);
        catalog
    }

    pub fn add(&mut self, id: &str, handler: Handler) {
        self.handlers.insert(id.to_string(), handler);
    }

    pub fn get(&self, id: &str) -> Option<Handler> {
        self.handlers.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// A manifest command adapted to the interpreter's [`Command`] trait.
pub struct ModuleCommand {
    manifest: CommandManifest,
}

impl ModuleCommand {
    pub fn new(manifest: CommandManifest) -> Self {
        Self { manifest }
    }
}

impl Command for ModuleCommand {
    fn keyword(&self) -> &str {
        &self.manifest.keyword
    }
    fn name(&self) -> &str {
        &self.manifest.name
    }
    fn description(&self) -> &str {
        &self.manifest.description
    }
    fn usage(&self) -> &str {
        &self.manifest.usage
    }
    fn requires_elevation(&self) -> bool {
        self.manifest.needs_root
    }
    fn requires_filesystem(&self) -> bool {
        self.manifest.needs_fs
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        (self.manifest.handler)(args, env)
    }
}
