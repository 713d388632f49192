//! Runtime configuration loaded from `vos.toml`.
//!
//! Every field has a default, so a missing or partial file still yields a
//! usable configuration. Relative paths are anchored at the install
//! directory (the folder holding the executable).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, VosError};

/// File name looked up next to the executable when no path is given.
pub const CONFIG_FILE: &str = "vos.toml";

/// Identity of the simulated operating system.
#[derive(Debug, Clone, Deserialize)]
pub struct OsInfo {
    #[serde(default = "default_os_name")]
    pub name: String,
    #[serde(default = "default_os_version")]
    pub version: String,
    #[serde(default = "default_one")]
    pub release: String,
    #[serde(default = "default_one")]
    pub build: String,
    #[serde(default = "default_arch")]
    pub architecture: String,
}

fn default_os_name() -> String {
    "Virtual OS".to_string()
}
fn default_os_version() -> String {
    "1.0".to_string()
}
fn default_one() -> String {
    "1".to_string()
}
fn default_arch() -> String {
    std::env::consts::ARCH.to_string()
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            name: default_os_name(),
            version: default_os_version(),
            release: default_one(),
            build: default_one(),
            architecture: default_arch(),
        }
    }
}

impl OsInfo {
    /// One-line summary printed by `osinfo`.
    pub fn info_str(&self) -> String {
        format!("{} v{} ({})", self.name, self.version, self.architecture)
    }

    /// The OS name framed for the boot screen.
    pub fn banner(&self) -> String {
        let rule = "=".repeat(self.name.chars().count() + 8);
        format!("{rule}\n    {}\n{rule}", self.name)
    }

    /// Boot banner detail line.
    pub fn details(&self) -> String {
        format!(
            "Version: v{}\tBuild: {}\tRelease: {}\tArch: {}",
            self.version, self.build, self.release, self.architecture
        )
    }
}

/// Where the remote package index lives.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageIndexConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_timeout() -> u64 {
    10
}

impl Default for PackageIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VosConfig {
    #[serde(default)]
    pub os: OsInfo,
    /// Real directory backing the virtual `/`.
    #[serde(default = "default_sandbox_root")]
    pub sandbox_root: PathBuf,
    /// Directory scanned for module manifests.
    #[serde(default = "default_module_dir")]
    pub module_dir: PathBuf,
    #[serde(default)]
    pub package_index: PackageIndexConfig,
}

fn default_sandbox_root() -> PathBuf {
    PathBuf::from("vos_fs")
}
fn default_module_dir() -> PathBuf {
    PathBuf::from("modules")
}

impl Default for VosConfig {
    fn default() -> Self {
        Self {
            os: OsInfo::default(),
            sandbox_root: default_sandbox_root(),
            module_dir: default_module_dir(),
            package_index: PackageIndexConfig::default(),
        }
    }
}

impl VosConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| VosError::Config(format!("{CONFIG_FILE}: {e}")))
    }

    /// Load a configuration file, falling back to defaults when it does not
    /// exist. Relative paths are resolved against `base`.
    pub fn load(path: &Path, base: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)?;
            log::info!("Loaded configuration from {}", path.display());
            Self::from_toml(&text)?
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Self::default()
        };
        config.anchor_paths(base);
        Ok(config)
    }

    /// Make `sandbox_root` and `module_dir` absolute relative to `base`.
    pub fn anchor_paths(&mut self, base: &Path) {
        if self.sandbox_root.is_relative() {
            self.sandbox_root = base.join(&self.sandbox_root);
        }
        if self.module_dir.is_relative() {
            self.module_dir = base.join(&self.module_dir);
        }
    }
}

/// Directory containing the running executable, or the current directory
/// when that cannot be determined.
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
