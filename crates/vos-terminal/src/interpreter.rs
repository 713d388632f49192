//! Command trait, registry, and dispatch logic.
//!
//! The registry maps keywords to commands in registration order. Dispatch
//! borrows the registry immutably: a command that wants commands added or
//! removed (a module unload, a package install) records [`RegistryEdit`]s,
//! and the caller applies them with [`CommandRegistry::apply`] once the
//! dispatch has returned.

use std::fmt;

use vos_types::config::OsInfo;
use vos_types::diag::Diagnostic;
use vos_types::error::{Result, VosError};
use vos_types::prompt::Confirm;
use vos_vfs::SandboxFs;

use crate::lexer::lex;

/// Maximum nesting of `bash` scripts running other scripts.
const MAX_SCRIPT_DEPTH: usize = 16;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text.
    Text(String),
    /// Command produced no visible output.
    None,
    /// Signal to clear the terminal.
    Clear,
    /// Signal to shut the shell down.
    PowerOff,
}

impl CommandOutput {
    /// Visible text of the output (empty for signals).
    pub fn text(&self) -> &str {
        match self {
            CommandOutput::Text(text) => text,
            _ => "",
        }
    }
}

/// Where a registered command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Builtin,
    Module(String),
}

/// Metadata and state of one loaded module, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
}

/// Result of a package operation: a message plus the registry edits that
/// bring the command table in line with the module set.
#[derive(Debug, Default)]
pub struct PackageOutcome {
    pub message: String,
    pub edits: Vec<RegistryEdit>,
}

/// Module lifecycle operations available to commands.
pub trait ModuleService {
    /// Loaded modules in load order.
    fn list(&self) -> Vec<ModuleSummary>;

    fn describe(&self, name: &str) -> Result<ModuleSummary>;

    /// Unload a module and return the keywords of the commands it owned.
    fn unload(&mut self, name: &str, elevated: bool) -> Result<Vec<String>>;

    /// Fetch a module from the package index and load it.
    fn install(&mut self, name: &str) -> Result<PackageOutcome>;

    /// Replace an installed module with the index's version if it differs.
    fn update(&mut self, name: &str) -> Result<PackageOutcome>;

    /// Delete an installed module's manifest and unload it.
    fn remove(&mut self, name: &str) -> Result<PackageOutcome>;

    /// Describe a package as the index reports it.
    fn info(&mut self, name: &str) -> Result<String>;
}

/// A deferred change to the registry.
pub enum RegistryEdit {
    Register {
        command: Box<dyn Command>,
        origin: Origin,
    },
    /// Remove `keyword` if, and only if, `module` owns it.
    Unregister { keyword: String, module: String },
}

impl fmt::Debug for RegistryEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryEdit::Register { command, origin } => f
                .debug_struct("Register")
                .field("keyword", &command.keyword())
                .field("origin", origin)
                .finish(),
            RegistryEdit::Unregister { keyword, module } => f
                .debug_struct("Unregister")
                .field("keyword", keyword)
                .field("module", module)
                .finish(),
        }
    }
}

/// The shell resources lent to one dispatch.
pub struct Resources<'a> {
    pub fs: &'a mut SandboxFs,
    pub prompter: &'a dyn Confirm,
    pub os: &'a OsInfo,
    pub modules: Option<&'a mut dyn ModuleService>,
}

/// What a single command sees while it runs.
pub struct Environment<'a> {
    /// Whether this invocation was prefixed with `sudo`.
    pub elevated: bool,
    /// The sandbox, present only for commands that require it.
    pub fs: Option<&'a mut SandboxFs>,
    /// Yes/no prompts.
    pub prompter: &'a dyn Confirm,
    /// Identity of the simulated system.
    pub os: &'a OsInfo,
    /// Module lifecycle service.
    pub modules: Option<&'a mut dyn ModuleService>,
    edits: &'a mut Vec<RegistryEdit>,
}

impl<'a> Environment<'a> {
    /// The sandbox, or an error for commands dispatched without it.
    pub fn fs(&mut self) -> Result<&mut SandboxFs> {
        self.fs
            .as_deref_mut()
            .ok_or_else(|| VosError::Command("filesystem access is not available".to_string()))
    }

    pub fn modules(&mut self) -> Result<&mut (dyn ModuleService + 'a)> {
        self.modules
            .as_deref_mut()
            .ok_or_else(|| VosError::Command("module support is not available".to_string()))
    }

    /// Queue a registry change to apply after this dispatch.
    pub fn defer(&mut self, edit: RegistryEdit) {
        self.edits.push(edit);
    }
}

/// A single executable command.
pub trait Command {
    /// What the user types.
    fn keyword(&self) -> &str;

    /// Display name used in help text.
    fn name(&self) -> &str {
        self.keyword()
    }

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage text (one `\t`-indented line per form).
    fn usage(&self) -> &str;

    fn requires_elevation(&self) -> bool {
        false
    }

    fn requires_filesystem(&self) -> bool {
        false
    }

    /// Execute the command with the given arguments and environment.
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Help text for a command.
pub fn command_info(cmd: &dyn Command) -> String {
    format!(
        "{} - {}\nUsage:\n{}",
        cmd.name(),
        cmd.description(),
        cmd.usage()
    )
}

/// Strip a leading `sudo`, reporting whether it was present.
pub fn split_sudo(mut tokens: Vec<String>) -> (Vec<String>, bool) {
    if tokens.first().is_some_and(|t| t == "sudo") {
        tokens.remove(0);
        (tokens, true)
    } else {
        (tokens, false)
    }
}

/// Output of [`CommandRegistry::dispatch`] plus the edits to apply.
#[derive(Debug)]
pub struct Dispatch {
    pub output: CommandOutput,
    pub edits: Vec<RegistryEdit>,
}

struct Entry {
    command: Box<dyn Command>,
    origin: Origin,
}

/// Registry of available commands with dispatch.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<Entry>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. A keyword that is already present is never
    /// replaced.
    pub fn register(&mut self, command: Box<dyn Command>, origin: Origin) -> Result<()> {
        let keyword = command.keyword().to_string();
        if self.contains(&keyword) {
            return Err(VosError::Collision(keyword));
        }
        log::debug!("registered command '{keyword}' ({origin:?})");
        self.entries.push(Entry { command, origin });
        Ok(())
    }

    /// Remove a command by keyword regardless of origin.
    pub fn unregister(&mut self, keyword: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.command.keyword() != keyword);
        self.entries.len() != before
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.entry(keyword).is_some()
    }

    pub fn get(&self, keyword: &str) -> Option<&dyn Command> {
        self.entry(keyword).map(|e| e.command.as_ref())
    }

    pub fn origin_of(&self, keyword: &str) -> Option<&Origin> {
        self.entry(keyword).map(|e| &e.origin)
    }

    /// Commands with their origins, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&dyn Command, &Origin)> {
        self.entries.iter().map(|e| (e.command.as_ref(), &e.origin))
    }

    /// Keywords in registration order.
    pub fn keywords(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.command.keyword()).collect()
    }

    /// Keywords registered on behalf of `module`.
    pub fn keywords_of(&self, module: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| matches!(&e.origin, Origin::Module(m) if m == module))
            .map(|e| e.command.keyword().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, keyword: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.command.keyword() == keyword)
    }

    /// Apply deferred edits in order. Rejected registrations are reported
    /// as warnings; the rest of the batch still applies.
    pub fn apply(&mut self, edits: Vec<RegistryEdit>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for edit in edits {
            match edit {
                RegistryEdit::Register { command, origin } => {
                    let keyword = command.keyword().to_string();
                    if let Err(e) = self.register(command, origin.clone()) {
                        let source = match &origin {
                            Origin::Module(name) => format!("module \"{name}\""),
                            Origin::Builtin => "built-in".to_string(),
                        };
                        diagnostics.push(
                            Diagnostic::medium(format!(
                                "Command \"{keyword}\" from {source} was not registered: {e}."
                            ))
                            .emit(),
                        );
                    }
                },
                RegistryEdit::Unregister { keyword, module } => {
                    let owned = matches!(
                        self.origin_of(&keyword),
                        Some(Origin::Module(m)) if *m == module
                    );
                    if owned {
                        self.unregister(&keyword);
                        log::debug!("unregistered command '{keyword}' of module '{module}'");
                    }
                },
            }
        }
        diagnostics
    }

    /// Run one tokenized line.
    ///
    /// The first token selects the command (exact, case-sensitive). Errors
    /// are rendered to their message text. Edits requested by the command
    /// are returned, not applied.
    pub fn dispatch(
        &self,
        tokens: &[String],
        elevated: bool,
        res: &mut Resources<'_>,
    ) -> Dispatch {
        let mut edits = Vec::new();
        let output = self.dispatch_into(tokens, elevated, res, &mut edits, 0);
        Dispatch { output, edits }
    }

    fn dispatch_into(
        &self,
        tokens: &[String],
        elevated: bool,
        res: &mut Resources<'_>,
        edits: &mut Vec<RegistryEdit>,
        depth: usize,
    ) -> CommandOutput {
        match self.run(tokens, elevated, res, edits, depth) {
            Ok(output) => output,
            Err(e) => CommandOutput::Text(e.to_string()),
        }
    }

    fn run(
        &self,
        tokens: &[String],
        elevated: bool,
        res: &mut Resources<'_>,
        edits: &mut Vec<RegistryEdit>,
        depth: usize,
    ) -> Result<CommandOutput> {
        let Some((keyword, rest)) = tokens.split_first() else {
            return Ok(CommandOutput::None);
        };
        let entry = self
            .entry(keyword)
            .ok_or_else(|| VosError::CommandNotFound(keyword.clone()))?;
        if entry.command.requires_elevation() && !elevated {
            return Err(VosError::PermissionDenied);
        }

        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        // Built-ins that need the registry itself.
        if entry.origin == Origin::Builtin {
            match keyword.as_str() {
                "help" => return self.execute_help(&args),
                "source" => return self.execute_source(&args),
                "bash" => return self.execute_script(&args, elevated, res, edits, depth),
                _ => {},
            }
        }

        let mut env = Environment {
            elevated,
            fs: if entry.command.requires_filesystem() {
                Some(&mut *res.fs)
            } else {
                None
            },
            prompter: res.prompter,
            os: res.os,
            modules: module_service(&mut res.modules),
            edits,
        };
        entry.command.execute(&args, &mut env)
    }

    /// Built-in `help [cmd|-a]`.
    fn execute_help(&self, args: &[&str]) -> Result<CommandOutput> {
        match args.first() {
            None => {
                let help = self
                    .get("help")
                    .ok_or_else(|| VosError::CommandNotFound("help".to_string()))?;
                Ok(CommandOutput::Text(command_info(help)))
            },
            Some(&"-a") => {
                let all: Vec<String> = self.iter().map(|(cmd, _)| command_info(cmd)).collect();
                Ok(CommandOutput::Text(all.join("\n\n")))
            },
            Some(&name) => match self.get(name) {
                Some(cmd) => Ok(CommandOutput::Text(command_info(cmd))),
                None => Err(VosError::CommandNotFound(name.to_string())),
            },
        }
    }

    /// Built-in `source <command>`: where a command comes from.
    fn execute_source(&self, args: &[&str]) -> Result<CommandOutput> {
        let name = args
            .first()
            .ok_or_else(|| VosError::Command("Please specify a command.".to_string()))?;
        match self.origin_of(name) {
            Some(Origin::Builtin) => Ok(CommandOutput::Text(format!("{name}: shell built-in"))),
            Some(Origin::Module(module)) => Ok(CommandOutput::Text(format!(
                "{name}: provided by module \"{module}\""
            ))),
            None => Err(VosError::CommandNotFound(name.to_string())),
        }
    }

    /// Built-in `bash <script>`: run each line of a file through this
    /// registry with the same sandbox and working directory.
    fn execute_script(
        &self,
        args: &[&str],
        elevated: bool,
        res: &mut Resources<'_>,
        edits: &mut Vec<RegistryEdit>,
        depth: usize,
    ) -> Result<CommandOutput> {
        let path = args
            .first()
            .ok_or_else(|| VosError::Command("Please specify a script.".to_string()))?;
        if depth >= MAX_SCRIPT_DEPTH {
            return Err(VosError::Command(format!(
                "bash: scripts nested deeper than {MAX_SCRIPT_DEPTH} levels"
            )));
        }
        let lines = res.fs.read_lines(path)?;

        let mut output = Vec::new();
        for line in lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
        {
            let (tokens, sudo) = split_sudo(lex(line).tokens);
            if tokens.is_empty() {
                continue;
            }
            match self.dispatch_into(&tokens, elevated || sudo, res, edits, depth + 1) {
                CommandOutput::Text(text) if !text.is_empty() => output.push(text),
                CommandOutput::PowerOff => return Ok(CommandOutput::PowerOff),
                _ => {},
            }
        }

        if output.is_empty() {
            Ok(CommandOutput::None)
        } else {
            Ok(CommandOutput::Text(output.join("\n")))
        }
    }
}

fn module_service<'b>(
    slot: &'b mut Option<&mut dyn ModuleService>,
) -> Option<&'b mut dyn ModuleService> {
    let service = slot.as_mut()?;
    Some(&mut **service)
}
