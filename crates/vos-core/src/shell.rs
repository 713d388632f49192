//! A shell session: the registry, the sandbox, and the module loader, with
//! one method to run a line of input.

use vos_terminal::{
    CommandOutput, CommandRegistry, Resources, lex, register_builtins, split_sudo,
};
use vos_types::config::{OsInfo, VosConfig};
use vos_types::diag::Diagnostic;
use vos_types::error::Result;
use vos_types::prompt::Confirm;
use vos_vfs::SandboxFs;

use crate::modules::{HandlerCatalog, HttpPackageIndex, ModuleLoader};
use crate::terminal::register_module_commands;

/// Everything one interactive session owns.
pub struct Shell {
    registry: CommandRegistry,
    fs: SandboxFs,
    loader: ModuleLoader,
    prompter: Box<dyn Confirm>,
    os: OsInfo,
}

impl Shell {
    /// Build a session from configuration: open the sandbox, register the
    /// built-ins, and load the module directory. Diagnostics of the initial
    /// scan are returned alongside the session.
    pub fn from_config(
        config: &VosConfig,
        prompter: Box<dyn Confirm>,
    ) -> Result<(Self, Vec<Diagnostic>)> {
        let fs = SandboxFs::open(config.sandbox_root.clone())?;
        let index = HttpPackageIndex::new(&config.package_index)?;
        let loader = ModuleLoader::new(
            config.module_dir.clone(),
            HandlerCatalog::builtin(),
            Box::new(index),
        );
        Self::new(fs, loader, prompter, config.os.clone())
    }

    /// Assemble a session from parts. Returns the diagnostics of the
    /// initial module scan alongside it.
    pub fn new(
        fs: SandboxFs,
        mut loader: ModuleLoader,
        prompter: Box<dyn Confirm>,
        os: OsInfo,
    ) -> Result<(Self, Vec<Diagnostic>)> {
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry)?;
        register_module_commands(&mut registry)?;

        let report = loader.scan();
        let mut diagnostics = report.diagnostics;
        diagnostics.extend(registry.apply(report.edits));
        log::info!(
            "{} commands registered, {} modules loaded",
            registry.len(),
            report.loaded.len()
        );

        Ok((
            Self {
                registry,
                fs,
                loader,
                prompter,
                os,
            },
            diagnostics,
        ))
    }

    /// `<virtual-cwd>$ `, with `~` at the sandbox root.
    pub fn prompt(&self) -> String {
        format!("{}$ ", self.fs.prompt_path())
    }

    pub fn os(&self) -> &OsInfo {
        &self.os
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn fs(&self) -> &SandboxFs {
        &self.fs
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Lex, dispatch, and apply any registry edits the command queued.
    pub fn execute_line(&mut self, line: &str) -> CommandOutput {
        let lexed = lex(line);
        let (tokens, elevated) = split_sudo(lexed.tokens);
        if tokens.is_empty() {
            return CommandOutput::None;
        }

        let mut res = Resources {
            fs: &mut self.fs,
            prompter: self.prompter.as_ref(),
            os: &self.os,
            modules: Some(&mut self.loader),
        };
        let dispatch = self.registry.dispatch(&tokens, elevated, &mut res);
        if !dispatch.edits.is_empty() {
            self.registry.apply(dispatch.edits);
        }
        dispatch.output
    }
}
