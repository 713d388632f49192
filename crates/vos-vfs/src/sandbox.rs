//! The sandbox file system: a real directory presented as `/`.

use std::path::PathBuf;
use std::process::Command;

use vos_types::error::{Result, VosError};
use vos_types::prompt::Confirm;

use crate::path::{LocalPath, VirtualPath, to_local, to_virtual};

/// Interpreter used by [`SandboxFs::run_script`].
const PYTHON: &str = "python3";

/// Path translator and file operations rooted at a sandbox directory.
///
/// Holds the fixed root and the current working directory. Every target
/// string given to an operation is resolved the same way: a leading `/`
/// makes it virtual-absolute, anything else is relative to the current
/// directory.
#[derive(Debug)]
pub struct SandboxFs {
    root: LocalPath,
    cwd: LocalPath,
}

impl SandboxFs {
    /// Open the sandbox at `root`, creating the directory if it is missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let mut root = root.into();
        if root.is_relative() {
            root = std::env::current_dir()?.join(root);
        }
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
            log::info!("Created sandbox root at {}", root.display());
        }
        let root = LocalPath::new(root);
        Ok(Self {
            cwd: root.clone(),
            root,
        })
    }

    pub fn root(&self) -> &LocalPath {
        &self.root
    }

    /// Current directory as a host path.
    pub fn cwd_local(&self) -> &LocalPath {
        &self.cwd
    }

    /// Current directory as seen by the user.
    pub fn cwd(&self) -> VirtualPath {
        self.to_virtual(&self.cwd)
    }

    /// Directory label for the prompt: `~` at the sandbox root.
    pub fn prompt_path(&self) -> String {
        let cwd = self.cwd();
        if cwd.is_root() {
            "~".to_string()
        } else {
            cwd.to_string()
        }
    }

    pub fn at_root(&self) -> bool {
        self.cwd == self.root
    }

    pub fn to_virtual(&self, path: &LocalPath) -> VirtualPath {
        to_virtual(&self.root, path)
    }

    pub fn to_local(&self, path: &VirtualPath) -> LocalPath {
        to_local(&self.root, path)
    }

    /// Resolve a user-supplied target to a host path.
    pub fn resolve(&self, target: &str) -> LocalPath {
        if target.starts_with('/') {
            self.to_local(&VirtualPath::new(target))
        } else {
            self.cwd.join_relative(target)
        }
    }

    /// Entries of the current directory, `/` appended to subdirectories,
    /// in directory enumeration order.
    pub fn list_current(&self) -> Result<Vec<String>> {
        let cwd = self.cwd.clone();
        self.list_local(&cwd)
    }

    /// Entries of `target`, formatted like [`list_current`](Self::list_current).
    pub fn list(&self, target: &str) -> Result<Vec<String>> {
        let dir = self.resolve(target);
        if !dir.is_dir() {
            return Err(self.no_such_directory(&dir));
        }
        self.list_local(&dir)
    }

    fn list_local(&self, dir: &LocalPath) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir.as_path())? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        Ok(names)
    }

    /// Change the current directory.
    ///
    /// Empty input, `/` and `~` return to the root; `..` at the root is a
    /// no-op. On failure the current directory is left untouched.
    pub fn change_dir(&mut self, target: &str) -> Result<()> {
        let target = target.trim();
        if target.is_empty() || target == "/" || target == "~" {
            self.cwd = self.root.clone();
            return Ok(());
        }

        if target == ".." {
            if self.at_root() {
                return Ok(());
            }
            return match self.cwd.parent() {
                Some(parent) if parent.is_dir() => {
                    self.cwd = parent;
                    Ok(())
                },
                Some(parent) => Err(self.no_such_directory(&parent)),
                None => Err(self.no_such_directory(&self.cwd)),
            };
        }

        let attempted = self.resolve(target);
        if attempted.is_dir() {
            log::debug!("cd {} -> {}", target, attempted);
            self.cwd = attempted;
            Ok(())
        } else {
            Err(self.no_such_directory(&attempted))
        }
    }

    fn no_such_directory(&self, path: &LocalPath) -> VosError {
        VosError::NoSuchDirectory(format!("{} ({})", self.to_virtual(path), path))
    }

    /// Whether `target` names anything on disk.
    pub fn exists(&self, target: &str) -> bool {
        self.resolve(target).exists()
    }

    /// Read a text file.
    pub fn read_file(&self, target: &str) -> Result<String> {
        let path = self.resolve(target);
        if !path.is_file() {
            return Err(VosError::NoSuchFile(self.to_virtual(&path).to_string()));
        }
        let data = std::fs::read(path.as_path())?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Lines of a text file, without line terminators.
    pub fn read_lines(&self, target: &str) -> Result<Vec<String>> {
        Ok(self.read_file(target)?.lines().map(str::to_string).collect())
    }

    /// Create or overwrite a file, returning its virtual path.
    pub fn write_file(&self, target: &str, data: &[u8]) -> Result<VirtualPath> {
        let path = self.resolve(target);
        std::fs::write(path.as_path(), data)?;
        Ok(self.to_virtual(&path))
    }

    /// Delete a file or an empty directory.
    ///
    /// Unless `skip_confirmation` is set the prompter is asked first; a
    /// declined prompt yields an empty result and deletes nothing.
    pub fn remove_item(
        &self,
        target: &str,
        skip_confirmation: bool,
        prompter: &dyn Confirm,
    ) -> Result<String> {
        let path = self.resolve(target);
        let shown = self.to_virtual(&path);
        if !path.exists() {
            return Err(VosError::NoSuchItem(shown.to_string()));
        }
        if !skip_confirmation && !prompter.confirm("Would you like to delete this item? [Y/n] ") {
            return Ok(String::new());
        }
        if path.is_dir() {
            std::fs::remove_dir(path.as_path())?;
        } else {
            std::fs::remove_file(path.as_path())?;
        }
        log::info!("Deleted {}", path);
        Ok(format!("Deleted {shown}"))
    }

    /// Run a Python script with the current directory as working directory
    /// and return what it printed.
    pub fn run_script(&self, target: &str) -> Result<String> {
        let path = self.resolve(target);
        if !path.is_file() {
            return Err(VosError::NoSuchFile(self.to_virtual(&path).to_string()));
        }
        let output = Command::new(PYTHON)
            .arg(path.as_path())
            .current_dir(self.cwd.as_path())
            .output()
            .map_err(|e| VosError::Command(format!("Failed to run {PYTHON}: {e}")))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        Ok(text.trim_end().to_string())
    }
}
