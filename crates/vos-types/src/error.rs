//! Error types for VOS.
//!
//! Most variants render the exact text shown to the user at the prompt, so
//! the dispatcher can fail soft by printing an error's `Display` output.

use std::io;

/// Errors produced by the VOS shell.
#[derive(Debug, thiserror::Error)]
pub enum VosError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("You need to be root to run this command.")]
    PermissionDenied,

    #[error("{0}")]
    Command(String),

    #[error("No such directory: {0}")]
    NoSuchDirectory(String),

    #[error("No such file: {0}")]
    NoSuchFile(String),

    #[error("No such file or directory: {0}")]
    NoSuchItem(String),

    #[error("keyword already registered: {0}")]
    Collision(String),

    #[error("invalid module manifest: {0}")]
    Manifest(String),

    #[error("Module not found, use \"module -a\" to list all modules.")]
    ModuleNotFound(String),

    #[error("module error: {0}")]
    Module(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_not_found_display() {
        let e = VosError::CommandNotFound("frob".into());
        assert_eq!(format!("{e}"), "Command not found: frob");
    }

    #[test]
    fn permission_denied_display() {
        assert_eq!(
            VosError::PermissionDenied.to_string(),
            "You need to be root to run this command."
        );
    }

    #[test]
    fn command_error_is_verbatim() {
        let e = VosError::Command("Please specify a directory.".into());
        assert_eq!(e.to_string(), "Please specify a directory.");
    }

    #[test]
    fn no_such_directory_display() {
        let e = VosError::NoSuchDirectory("/missing (/tmp/vos_fs/missing)".into());
        assert_eq!(
            e.to_string(),
            "No such directory: /missing (/tmp/vos_fs/missing)"
        );
    }

    #[test]
    fn no_such_item_display() {
        let e = VosError::NoSuchItem("/a.txt".into());
        assert_eq!(e.to_string(), "No such file or directory: /a.txt");
    }

    #[test]
    fn module_not_found_hints_at_listing() {
        let e = VosError::ModuleNotFound("ghost".into());
        assert!(e.to_string().contains("module -a"));
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: VosError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: VosError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let e: VosError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }
}
