//! Virtual and local path value types.
//!
//! Conversions are pure string/component manipulations. They never touch
//! the disk and never check that a path stays inside the sandbox: `..`
//! segments are carried through (and folded lexically on the local side),
//! so a crafted path can name a location outside the root.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A path in the simulated tree, always rooted at `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The virtual root `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Build a virtual path from user text.
    ///
    /// Both `/` and `\` separate segments. Empty and `.` segments are
    /// dropped, `..` is kept verbatim, and the result always starts with `/`.
    pub fn new(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split(|c| c == '/' || c == '\\')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}", segments.join("/")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Non-empty segments after the leading `/`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A real path on the host, normally below the sandbox root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalPath(PathBuf);

impl LocalPath {
    /// Wrap a host path, folding `.` and `..` components lexically.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(fold_components(path.as_ref()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Append a relative path written with `/` or `\` separators.
    pub fn join_relative(&self, relative: &str) -> Self {
        let mut joined = self.0.clone();
        for segment in relative
            .split(|c| c == '/' || c == '\\')
            .filter(|s| !s.is_empty())
        {
            joined.push(segment);
        }
        Self::new(joined)
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| Self(p.to_path_buf()))
    }

    pub fn exists(&self) -> bool {
        self.0.exists()
    }

    pub fn is_dir(&self) -> bool {
        self.0.is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.0.is_file()
    }
}

impl fmt::Display for LocalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Fold `.` and `..` without consulting the filesystem. `..` at the host
/// root is dropped; on a relative path it is kept.
fn fold_components(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                let ends_in_parent = matches!(out.components().next_back(), Some(Component::ParentDir));
                if ends_in_parent || (!out.pop() && !out.has_root()) {
                    out.push("..");
                }
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Translate a local path to its virtual form relative to `root`.
///
/// Paths outside `root` are not rejected; they keep their host spelling
/// with `/` separators.
pub fn to_virtual(root: &LocalPath, path: &LocalPath) -> VirtualPath {
    match path.0.strip_prefix(&root.0) {
        Ok(rest) => VirtualPath::new(&rest.to_string_lossy()),
        Err(_) => VirtualPath::new(&path.0.to_string_lossy()),
    }
}

/// Translate a virtual path to the host path under `root`.
pub fn to_local(root: &LocalPath, path: &VirtualPath) -> LocalPath {
    let mut local = root.0.clone();
    for segment in path.segments() {
        local.push(segment);
    }
    LocalPath::new(local)
}
