//! Module lifecycle: scan, list, describe, unload, and the remote package
//! protocol (install, update, remove, info).
//!
//! The loader never touches the command registry. Loading a module yields
//! `Register` edits and unloading one yields `Unregister` edits; the shell
//! applies them once the current dispatch has finished.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use vos_terminal::{ModuleService, ModuleSummary, Origin, PackageOutcome, RegistryEdit};
use vos_types::diag::Diagnostic;
use vos_types::error::{Result, VosError};

use super::catalog::{HandlerCatalog, ModuleCommand};
use super::index::{PackageIndex, PackageRecord, validate_filename};
use super::manifest::ModuleManifest;

/// Extension of manifest files in the module directory.
const MANIFEST_EXT: &str = "toml";

/// A module currently loaded, with the file it came from.
#[derive(Debug)]
struct LoadedModule {
    manifest: ModuleManifest,
    source: PathBuf,
}

impl LoadedModule {
    fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            name: self.manifest.name.clone(),
            description: self.manifest.description.clone(),
            version: self.manifest.version.clone(),
            author: self.manifest.author.clone(),
        }
    }
}

/// What a scan changed.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Names of newly loaded modules, in load order.
    pub loaded: Vec<String>,
    /// Registrations for the new modules' commands.
    pub edits: Vec<RegistryEdit>,
    /// Files that failed to load or were rejected.
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads module manifests from a directory and manages their lifecycle.
pub struct ModuleLoader {
    dir: PathBuf,
    catalog: HandlerCatalog,
    index: Box<dyn PackageIndex>,
    modules: Vec<LoadedModule>,
    /// Files of modules unloaded with `module <name> -rm`. Rescans leave
    /// them alone until a package operation writes the file again.
    unloaded: BTreeSet<PathBuf>,
}

impl ModuleLoader {
    pub fn new(dir: impl Into<PathBuf>, catalog: HandlerCatalog, index: Box<dyn PackageIndex>) -> Self {
        Self {
            dir: dir.into(),
            catalog,
            index,
            modules: Vec::new(),
            unloaded: BTreeSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.manifest.name == name)
    }

    fn find(&self, name: &str) -> Result<&LoadedModule> {
        self.modules
            .iter()
            .find(|m| m.manifest.name == name)
            .ok_or_else(|| VosError::ModuleNotFound(name.to_string()))
    }

    /// Load every manifest in the module directory that is not already
    /// backing a loaded module and was not explicitly unloaded. Files are
    /// visited in file-name order; a bad file is reported and skipped.
    pub fn scan(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        log::info!("Loading modules from {}", self.dir.display());

        let files = match self.manifest_files() {
            Ok(files) => files,
            Err(e) => {
                report.diagnostics.push(
                    Diagnostic::high(format!(
                        "Failed to read module directory \"{}\": {e}.",
                        self.dir.display()
                    ))
                    .emit(),
                );
                return report;
            },
        };

        for path in files {
            if self.unloaded.contains(&path) || self.modules.iter().any(|m| m.source == path) {
                continue;
            }
            let file = file_label(&path);
            let manifest = match std::fs::read_to_string(&path)
                .map_err(VosError::from)
                .and_then(|text| ModuleManifest::from_toml(&text, &self.catalog))
            {
                Ok(manifest) => manifest,
                Err(e) => {
                    report.diagnostics.push(
                        Diagnostic::high(format!("Failed to load module: \"{file}\". Error: {e}."))
                            .emit(),
                    );
                    continue;
                },
            };

            if self.is_loaded(&manifest.name) {
                report.diagnostics.push(
                    Diagnostic::high(format!(
                        "Module \"{}\" from \"{file}\" rejected: a module with that name is already loaded.",
                        manifest.name
                    ))
                    .emit(),
                );
                continue;
            }

            log::info!("Loaded module: \"{}\".", manifest.name);
            let origin = Origin::Module(manifest.name.clone());
            report
                .edits
                .extend(manifest.commands.iter().map(|cmd| RegistryEdit::Register {
                    command: Box::new(ModuleCommand::new(cmd.clone())),
                    origin: origin.clone(),
                }));
            report.loaded.push(manifest.name.clone());
            self.modules.push(LoadedModule {
                manifest,
                source: path,
            });
        }
        report
    }

    /// `*.toml` files in the module directory, sorted by file name. The
    /// directory is created when missing.
    fn manifest_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            log::info!("Created module directory {}", self.dir.display());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == MANIFEST_EXT) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Drop a module from the loaded set and queue removal of its commands.
    fn detach(&mut self, index: usize) -> (LoadedModule, Vec<RegistryEdit>) {
        let module = self.modules.remove(index);
        let edits = unregister_edits(&module.manifest.name, module.manifest.keywords());
        log::info!("Unloaded module: \"{}\".", module.manifest.name);
        (module, edits)
    }

    /// Rescan and fold the outcome into `edits`, reporting whether `name`
    /// ended up loaded.
    fn rescan_for(&mut self, name: &str, edits: &mut Vec<RegistryEdit>) -> bool {
        let report = self.scan();
        edits.extend(report.edits);
        self.is_loaded(name)
    }

    fn write_artifact(&mut self, record: &PackageRecord, bytes: &[u8]) -> Result<PathBuf> {
        validate_filename(&record.filename)?;
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let path = self.dir.join(&record.filename);
        std::fs::write(&path, bytes)?;
        self.unloaded.remove(&path);
        log::info!("Wrote package {} v{} to {}", record.name, record.version, path.display());
        Ok(path)
    }
}

fn unregister_edits(module: &str, keywords: Vec<String>) -> Vec<RegistryEdit> {
    keywords
        .into_iter()
        .map(|keyword| RegistryEdit::Unregister {
            keyword,
            module: module.to_string(),
        })
        .collect()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ModuleService for ModuleLoader {
    fn list(&self) -> Vec<ModuleSummary> {
        self.modules.iter().map(LoadedModule::summary).collect()
    }

    fn describe(&self, name: &str) -> Result<ModuleSummary> {
        self.find(name).map(LoadedModule::summary)
    }

    fn unload(&mut self, name: &str, elevated: bool) -> Result<Vec<String>> {
        let index = self
            .position(name)
            .ok_or_else(|| VosError::ModuleNotFound(name.to_string()))?;
        if !elevated {
            return Err(VosError::Command(
                "You must have root privileges to remove a module.".to_string(),
            ));
        }
        let module = self.modules.remove(index);
        log::info!("Unloaded module: \"{}\".", module.manifest.name);
        self.unloaded.insert(module.source);
        Ok(module.manifest.keywords())
    }

    fn install(&mut self, name: &str) -> Result<PackageOutcome> {
        if self.is_loaded(name) {
            return Err(VosError::Module(format!("\"{name}\" is already installed")));
        }
        let record = self.index.lookup(name)?;
        let bytes = self.index.fetch(&record)?;
        self.write_artifact(&record, &bytes)?;

        let mut edits = Vec::new();
        let message = if self.rescan_for(&record.name, &mut edits) {
            format!("Installed {} v{}.", record.name, record.version)
        } else {
            format!(
                "Downloaded {} but the module did not load; see the log for details.",
                record.filename
            )
        };
        Ok(PackageOutcome { message, edits })
    }

    fn update(&mut self, name: &str) -> Result<PackageOutcome> {
        let index = self
            .position(name)
            .ok_or_else(|| VosError::Module(format!("\"{name}\" is not installed")))?;
        let record = self.index.lookup(name)?;
        let local_version = self.modules[index].manifest.version.clone();
        if record.version == local_version {
            return Ok(PackageOutcome {
                message: format!("{name} is already up to date (v{local_version})."),
                edits: Vec::new(),
            });
        }

        let bytes = self.index.fetch(&record)?;
        let written = self.write_artifact(&record, &bytes)?;
        let (old, mut edits) = self.detach(index);
        if old.source != written && old.source.exists() {
            std::fs::remove_file(&old.source)?;
        }

        let message = if self.rescan_for(&record.name, &mut edits) {
            format!("Updated {name} from v{local_version} to v{}.", record.version)
        } else {
            format!(
                "Replaced {name} v{local_version} with {} but the new version did not load; see the log for details.",
                record.filename
            )
        };
        Ok(PackageOutcome { message, edits })
    }

    fn remove(&mut self, name: &str) -> Result<PackageOutcome> {
        let index = self
            .position(name)
            .ok_or_else(|| VosError::ModuleNotFound(name.to_string()))?;
        let source = self.modules[index].source.clone();
        if source.exists() {
            std::fs::remove_file(&source)?;
        }
        let (_, edits) = self.detach(index);
        Ok(PackageOutcome {
            message: format!("Removed package {name}."),
            edits,
        })
    }

    fn info(&mut self, name: &str) -> Result<String> {
        let record = self.index.lookup(name)?;
        let status = match self.find(&record.name) {
            Ok(module) => format!("installed (v{})", module.manifest.version),
            Err(_) => "not installed".to_string(),
        };
        Ok(format!(
            "{}\nVersion: {}\nFile: {}\nStatus: {status}",
            record.name, record.version, record.filename
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use vos_types::diag::Priority;

    pub(crate) const DATE_V1: &str = r#"
name = "date_module"
description = "Module for date-related commands."
version = "1.0"
author = "tests"

[commands.date_command]
keyword = "date"
usage = "\tdate"
function = "date"
"#;

    pub(crate) const WEB: &str = r#"
name = "web_module"
version = "1.0"
author = "tests"

[commands.wprint_command]
keyword = "wprint"
function = "wprint"

[commands.wget_command]
keyword = "wget"
needs_fs = true
function = "wget"
"#;

    /// In-memory index: package name to (record, artifact).
    #[derive(Clone, Default)]
    pub(crate) struct FakeIndex {
        pub packages: Rc<RefCell<HashMap<String, (PackageRecord, String)>>>,
        pub offline: Rc<RefCell<bool>>,
    }

    impl FakeIndex {
        pub(crate) fn publish(&self, name: &str, version: &str, filename: &str, body: &str) {
            let record = PackageRecord {
                name: name.to_string(),
                version: version.to_string(),
                download_url: format!("http://index.test/files/{filename}"),
                filename: filename.to_string(),
            };
            self.packages
                .borrow_mut()
                .insert(name.to_string(), (record, body.to_string()));
        }
    }

    impl PackageIndex for FakeIndex {
        fn lookup(&self, name: &str) -> Result<PackageRecord> {
            if *self.offline.borrow() {
                return Err(VosError::Network("connection refused".to_string()));
            }
            self.packages
                .borrow()
                .get(name)
                .map(|(record, _)| record.clone())
                .ok_or_else(|| VosError::Module(format!("package \"{name}\" does not exist")))
        }

        fn fetch(&self, record: &PackageRecord) -> Result<Vec<u8>> {
            self.packages
                .borrow()
                .get(&record.name)
                .map(|(_, body)| body.clone().into_bytes())
                .ok_or_else(|| VosError::Network("404".to_string()))
        }
    }

    fn loader_in(dir: &Path) -> (ModuleLoader, FakeIndex) {
        let index = FakeIndex::default();
        let loader = ModuleLoader::new(
            dir.join("modules"),
            HandlerCatalog::builtin(),
            Box::new(index.clone()),
        );
        (loader, index)
    }

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::create_dir_all(dir.join("modules")).unwrap();
        std::fs::write(dir.join("modules").join(name), body).unwrap();
    }

    fn registered_keywords(edits: &[RegistryEdit]) -> Vec<String> {
        edits
            .iter()
            .filter_map(|e| match e {
                RegistryEdit::Register { command, .. } => Some(command.keyword().to_string()),
                RegistryEdit::Unregister { .. } => None,
            })
            .collect()
    }

    fn unregistered_keywords(edits: &[RegistryEdit]) -> Vec<String> {
        edits
            .iter()
            .filter_map(|e| match e {
                RegistryEdit::Unregister { keyword, .. } => Some(keyword.clone()),
                RegistryEdit::Register { .. } => None,
            })
            .collect()
    }

    #[test]
    fn scan_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, _) = loader_in(tmp.path());
        let report = loader.scan();
        assert!(report.loaded.is_empty());
        assert!(report.diagnostics.is_empty());
        assert!(tmp.path().join("modules").is_dir());
        assert!(loader.list().is_empty());
    }

    #[test]
    fn scan_loads_in_file_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "b_web.toml", WEB);
        write(tmp.path(), "a_date.toml", DATE_V1);
        write(tmp.path(), "notes.txt", "not a manifest");
        let (mut loader, _) = loader_in(tmp.path());
        let report = loader.scan();
        assert_eq!(report.loaded, vec!["date_module", "web_module"]);
        assert_eq!(registered_keywords(&report.edits), vec!["date", "wget", "wprint"]);
        let names: Vec<String> = loader.list().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["date_module", "web_module"]);
    }

    #[test]
    fn bad_manifest_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a_broken.toml", "name = \"broken\"\nversion = ");
        write(tmp.path(), "b_date.toml", DATE_V1);
        let (mut loader, _) = loader_in(tmp.path());
        let report = loader.scan();
        assert_eq!(report.loaded, vec!["date_module"]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].priority, Priority::High);
        assert!(report.diagnostics[0].message.contains("a_broken.toml"));
    }

    #[test]
    fn duplicate_module_name_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.toml", DATE_V1);
        write(tmp.path(), "b.toml", DATE_V1);
        let (mut loader, _) = loader_in(tmp.path());
        let report = loader.scan();
        assert_eq!(loader.list().len(), 1);
        assert_eq!(report.edits.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].is_high());
        assert!(report.diagnostics[0].message.contains("rejected"));
    }

    #[test]
    fn rescan_skips_loaded_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "date.toml", DATE_V1);
        let (mut loader, _) = loader_in(tmp.path());
        loader.scan();
        let again = loader.scan();
        assert!(again.loaded.is_empty());
        assert!(again.edits.is_empty());
        assert!(again.diagnostics.is_empty());
    }

    #[test]
    fn describe_and_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "date.toml", DATE_V1);
        let (mut loader, _) = loader_in(tmp.path());
        loader.scan();
        let summary = loader.describe("date_module").unwrap();
        assert_eq!(summary.description, "Module for date-related commands.");
        assert_eq!(summary.author, "tests");
        assert!(matches!(
            loader.describe("nope"),
            Err(VosError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn unload_requires_elevation() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "web.toml", WEB);
        let (mut loader, _) = loader_in(tmp.path());
        loader.scan();
        let err = loader.unload("web_module", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must have root privileges to remove a module."
        );
        assert!(loader.is_loaded("web_module"));

        let keywords = loader.unload("web_module", true).unwrap();
        assert_eq!(keywords, vec!["wget", "wprint"]);
        assert!(!loader.is_loaded("web_module"));
        assert!(tmp.path().join("modules/web.toml").exists());
    }

    #[test]
    fn unloaded_module_stays_out_of_rescans() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "web.toml", WEB);
        let (mut loader, index) = loader_in(tmp.path());
        loader.scan();
        loader.unload("web_module", true).unwrap();

        assert!(loader.scan().loaded.is_empty());
        index.publish("date_module", "1.0", "date_module.toml", DATE_V1);
        let outcome = loader.install("date_module").unwrap();
        assert_eq!(registered_keywords(&outcome.edits), vec!["date"]);
        assert!(!loader.is_loaded("web_module"));

        // Reinstalling rewrites the file and brings the module back.
        index.publish("web_module", "1.0", "web.toml", WEB);
        assert_eq!(loader.install("web_module").unwrap().message, "Installed web_module v1.0.");
        assert!(loader.is_loaded("web_module"));
    }

    #[test]
    fn unload_unknown_module() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, _) = loader_in(tmp.path());
        assert!(matches!(
            loader.unload("ghost", true),
            Err(VosError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn install_writes_and_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, index) = loader_in(tmp.path());
        loader.scan();
        index.publish("date_module", "1.0", "date_module.toml", DATE_V1);

        let outcome = loader.install("date_module").unwrap();
        assert_eq!(outcome.message, "Installed date_module v1.0.");
        assert_eq!(registered_keywords(&outcome.edits), vec!["date"]);
        assert!(tmp.path().join("modules/date_module.toml").is_file());
        assert!(loader.is_loaded("date_module"));

        let again = loader.install("date_module").unwrap_err();
        assert!(again.to_string().contains("already installed"));
    }

    #[test]
    fn install_unknown_package() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, _) = loader_in(tmp.path());
        let err = loader.install("ghost").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn install_network_failure_changes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, index) = loader_in(tmp.path());
        index.publish("date_module", "1.0", "date_module.toml", DATE_V1);
        *index.offline.borrow_mut() = true;
        let err = loader.install("date_module").unwrap_err();
        assert!(matches!(err, VosError::Network(_)));
        assert!(!loader.is_loaded("date_module"));
    }

    #[test]
    fn install_refuses_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, index) = loader_in(tmp.path());
        index.publish("evil", "1", "../evil.toml", DATE_V1);
        assert!(loader.install("evil").is_err());
        assert!(!tmp.path().join("evil.toml").exists());
    }

    #[test]
    fn install_of_invalid_artifact_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, index) = loader_in(tmp.path());
        index.publish("junk", "1", "junk.toml", "this is = = not toml");
        let outcome = loader.install("junk").unwrap();
        assert!(outcome.message.contains("did not load"));
        assert!(outcome.edits.is_empty());
    }

    #[test]
    fn update_same_version_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "date_module.toml", DATE_V1);
        let (mut loader, index) = loader_in(tmp.path());
        loader.scan();
        index.publish("date_module", "1.0", "date_module.toml", DATE_V1);
        let outcome = loader.update("date_module").unwrap();
        assert_eq!(outcome.message, "date_module is already up to date (v1.0).");
        assert!(outcome.edits.is_empty());
    }

    #[test]
    fn update_replaces_module_and_commands() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "old_date.toml", DATE_V1);
        let (mut loader, index) = loader_in(tmp.path());
        loader.scan();

        let v2 = DATE_V1
            .replace("version = \"1.0\"", "version = \"2.0\"")
            .replace("keyword = \"date\"", "keyword = \"today\"");
        index.publish("date_module", "2.0", "date_module.toml", &v2);

        let outcome = loader.update("date_module").unwrap();
        assert_eq!(outcome.message, "Updated date_module from v1.0 to v2.0.");
        assert_eq!(unregistered_keywords(&outcome.edits), vec!["date"]);
        assert_eq!(registered_keywords(&outcome.edits), vec!["today"]);
        assert!(matches!(outcome.edits[0], RegistryEdit::Unregister { .. }));
        assert!(!tmp.path().join("modules/old_date.toml").exists());
        assert_eq!(loader.describe("date_module").unwrap().version, "2.0");
        assert_eq!(loader.list().len(), 1);
    }

    #[test]
    fn update_requires_installed_module() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut loader, index) = loader_in(tmp.path());
        index.publish("date_module", "1.0", "date_module.toml", DATE_V1);
        let err = loader.update("date_module").unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn remove_deletes_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "web.toml", WEB);
        let (mut loader, _) = loader_in(tmp.path());
        loader.scan();
        let outcome = loader.remove("web_module").unwrap();
        assert_eq!(outcome.message, "Removed package web_module.");
        assert_eq!(unregistered_keywords(&outcome.edits), vec!["wget", "wprint"]);
        assert!(!tmp.path().join("modules/web.toml").exists());
        assert!(!loader.is_loaded("web_module"));
        assert!(loader.scan().loaded.is_empty());
    }

    #[test]
    fn info_reports_local_status() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "date.toml", DATE_V1);
        let (mut loader, index) = loader_in(tmp.path());
        loader.scan();
        index.publish("date_module", "1.2", "date_module.toml", DATE_V1);
        index.publish("web_module", "1.0", "web_module.toml", WEB);

        assert_eq!(
            loader.info("date_module").unwrap(),
            "date_module\nVersion: 1.2\nFile: date_module.toml\nStatus: installed (v1.0)"
        );
        assert!(loader.info("web_module").unwrap().ends_with("Status: not installed"));
    }
}
