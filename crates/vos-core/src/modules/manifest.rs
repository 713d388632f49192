//! Module manifests (`modules/*.toml`).
//!
//! A manifest is data only: metadata plus a table of commands, each naming
//! the catalog handler that implements it. Everything is validated when the
//! file is parsed, so a loaded module never has a missing field.

use std::collections::BTreeMap;

use serde::Deserialize;

use vos_types::error::{Result, VosError};

use super::catalog::{Handler, HandlerCatalog};

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    commands: BTreeMap<String, RawCommand>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    #[serde(default)]
    name: String,
    #[serde(default)]
    keyword: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    usage: String,
    #[serde(default)]
    needs_root: bool,
    #[serde(default)]
    needs_fs: bool,
    #[serde(default)]
    function: String,
}

/// A validated module.
#[derive(Debug, Clone)]
pub struct ModuleManifest {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    /// Commands in command-id order.
    pub commands: Vec<CommandManifest>,
}

/// A validated command bound to its handler.
#[derive(Debug, Clone)]
pub struct CommandManifest {
    /// Table key under `[commands]`.
    pub id: String,
    pub name: String,
    pub keyword: String,
    pub description: String,
    pub usage: String,
    pub needs_root: bool,
    pub needs_fs: bool,
    /// Catalog id the handler was resolved from.
    pub function: String,
    pub handler: Handler,
}

impl ModuleManifest {
    /// Parse and validate manifest text, resolving handlers in `catalog`.
    pub fn from_toml(text: &str, catalog: &HandlerCatalog) -> Result<Self> {
        let raw: RawManifest = toml::from_str(text)?;

        let name = required("name", raw.name)?;
        let version = required("version", raw.version)?;
        let author = required("author", raw.author)?;
        if raw.commands.is_empty() {
            return Err(VosError::Manifest(format!(
                "module \"{name}\" declares no commands"
            )));
        }

        let commands = raw
            .commands
            .into_iter()
            .map(|(id, cmd)| CommandManifest::validate(id, cmd, catalog))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            description: raw.description.trim().to_string(),
            version,
            author,
            commands,
        })
    }

    /// Keywords of every command the module declares.
    pub fn keywords(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.keyword.clone()).collect()
    }
}

impl CommandManifest {
    fn validate(id: String, raw: RawCommand, catalog: &HandlerCatalog) -> Result<Self> {
        let keyword = required(&format!("commands.{id}.keyword"), raw.keyword)?;
        if keyword.chars().any(char::is_whitespace) {
            return Err(VosError::Manifest(format!(
                "commands.{id}.keyword \"{keyword}\" contains whitespace"
            )));
        }
        let function = required(&format!("commands.{id}.function"), raw.function)?;
        let handler = catalog.get(&function).ok_or_else(|| {
            VosError::Manifest(format!("commands.{id}.function \"{function}\" is not a known handler"))
        })?;
        let name = if raw.name.trim().is_empty() {
            keyword.clone()
        } else {
            raw.name.trim().to_string()
        };

        Ok(Self {
            id,
            name,
            keyword,
            description: raw.description,
            usage: raw.usage,
            needs_root: raw.needs_root,
            needs_fs: raw.needs_fs,
            function,
            handler,
        })
    }
}

fn required(field: &str, value: String) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(VosError::Manifest(format!("missing required field \"{field}\"")))
    } else {
        Ok(value.to_string())
    }
}
