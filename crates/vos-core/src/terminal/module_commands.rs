//! Module management commands: `module` and `pkg`.

use vos_terminal::{
    Command, CommandOutput, CommandRegistry, Environment, Origin, RegistryEdit,
};
use vos_types::error::{Result, VosError};

/// Register the module management commands into a registry.
pub fn register_module_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(ModuleCmd), Origin::Builtin)?;
    reg.register(Box::new(PkgCmd), Origin::Builtin)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// module
// ---------------------------------------------------------------------------

struct ModuleCmd;
impl Command for ModuleCmd {
    fn keyword(&self) -> &str {
        "module"
    }
    fn description(&self) -> &str {
        "Lists, describes and removes loaded modules."
    }
    fn usage(&self) -> &str {
        "\tmodule -a - Lists all loaded modules.\n\tmodule [name] - Describes a module.\n\tmodule [name] -rm - Removes a module."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(&target) = args.first() else {
            return Err(VosError::Command(
                "Please specify a module, or use \"module -a\" to list all modules.".to_string(),
            ));
        };
        let elevated = env.elevated;
        let modules = env.modules()?;

        if target == "-a" {
            let loaded = modules.list();
            if loaded.is_empty() {
                return Ok(CommandOutput::Text("No modules currently loaded.".to_string()));
            }
            let names: Vec<String> = loaded.into_iter().map(|m| m.name).collect();
            return Ok(CommandOutput::Text(format!("Modules:\n{}", names.join("\n"))));
        }

        if args[1..].contains(&"-rm") {
            let keywords = modules.unload(target, elevated)?;
            for keyword in keywords {
                env.defer(RegistryEdit::Unregister {
                    keyword,
                    module: target.to_string(),
                });
            }
            return Ok(CommandOutput::Text(format!("Removed module: {target}")));
        }

        let m = modules.describe(target)?;
        Ok(CommandOutput::Text(format!(
            "{}\n{}\nAuthor: {}\t Version: {}",
            m.name, m.description, m.author, m.version
        )))
    }
}

// ---------------------------------------------------------------------------
// pkg
// ---------------------------------------------------------------------------

struct PkgCmd;
impl Command for PkgCmd {
    fn keyword(&self) -> &str {
        "pkg"
    }
    fn description(&self) -> &str {
        "Installs and manages modules from the package index."
    }
    fn usage(&self) -> &str {
        "\tpkg install [name] - Installs a module.\n\tpkg update [name] - Updates a module.\n\tpkg remove [name] - Uninstalls a module.\n\tpkg info [name] - Shows what the index knows about a module."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (Some(&action), Some(&name)) = (args.first(), args.get(1)) else {
            return Err(VosError::Command(
                "Please specify an action and a package.".to_string(),
            ));
        };
        let needs_root = matches!(action, "install" | "update" | "remove");
        if needs_root && !env.elevated {
            return Err(VosError::PermissionDenied);
        }

        let modules = env.modules()?;
        let outcome = match action {
            "install" => modules.install(name)?,
            "update" => modules.update(name)?,
            "remove" => modules.remove(name)?,
            "info" => return Ok(CommandOutput::Text(modules.info(name)?)),
            other => {
                return Err(VosError::Command(format!(
                    "Unknown pkg action \"{other}\"; use install, update, remove or info."
                )));
            },
        };
        for edit in outcome.edits {
            env.defer(edit);
        }
        Ok(CommandOutput::Text(outcome.message))
    }
}
