//! Built-in shell commands.

use vos_types::error::{Result, VosError};

use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment, Origin};

/// Register all built-in commands into a registry.
///
/// Order matters: it is the order `help -a` lists them in.
pub fn register_builtins(reg: &mut CommandRegistry) -> Result<()> {
    let builtins: Vec<Box<dyn Command>> = vec![
        Box::new(HelpCmd),
        Box::new(ClearCmd),
        Box::new(LsCmd),
        Box::new(CdCmd),
        Box::new(OsInfoCmd),
        Box::new(PythonCmd),
        Box::new(PoweroffCmd),
        Box::new(CatCmd),
        Box::new(RmCmd),
        Box::new(SourceCmd),
        Box::new(BashCmd),
        Box::new(EchoCmd),
    ];
    for cmd in builtins {
        reg.register(cmd, Origin::Builtin)?;
    }
    Ok(())
}

fn missing(message: &str) -> VosError {
    VosError::Command(message.to_string())
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn keyword(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "Displays help for a command."
    }
    fn usage(&self) -> &str {
        "\thelp [command] - Displays help for a specific command.\n\thelp -a - Displays help for all commands."
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        // Intercepted by the registry, which owns the command table.
        Ok(CommandOutput::Text(
            "Use 'help -a' at the terminal for a list of commands.".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn keyword(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clears the screen."
    }
    fn usage(&self) -> &str {
        "\tclear - Clears the screen."
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn keyword(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "Lists the contents of a directory."
    }
    fn usage(&self) -> &str {
        "\tls [directory] - Lists the contents of a directory."
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let fs = env.fs()?;
        let entries = match args.first() {
            Some(dir) => fs.list(dir)?,
            None => fs.list_current()?,
        };
        if entries.is_empty() {
            Ok(CommandOutput::None)
        } else {
            Ok(CommandOutput::Text(entries.join("\n")))
        }
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn keyword(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Changes the current directory."
    }
    fn usage(&self) -> &str {
        "\tcd [directory] - Changes the current directory."
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let target = args
            .first()
            .ok_or_else(|| missing("Please specify a directory."))?;
        env.fs()?.change_dir(target)?;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// osinfo
// ---------------------------------------------------------------------------

struct OsInfoCmd;
impl Command for OsInfoCmd {
    fn keyword(&self) -> &str {
        "osinfo"
    }
    fn description(&self) -> &str {
        "Displays the OS info."
    }
    fn usage(&self) -> &str {
        "\tosinfo - Displays the operating system info."
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(env.os.info_str()))
    }
}

// ---------------------------------------------------------------------------
// python
// ---------------------------------------------------------------------------

struct PythonCmd;
impl Command for PythonCmd {
    fn keyword(&self) -> &str {
        "python"
    }
    fn description(&self) -> &str {
        "Runs a Python script."
    }
    fn usage(&self) -> &str {
        "\tpython [script] - Runs a Python script."
    }
    fn requires_elevation(&self) -> bool {
        true
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let script = args
            .first()
            .ok_or_else(|| missing("Please specify a script."))?;
        let output = env.fs()?.run_script(script)?;
        Ok(CommandOutput::Text(output))
    }
}

// ---------------------------------------------------------------------------
// poweroff
// ---------------------------------------------------------------------------

struct PoweroffCmd;
impl Command for PoweroffCmd {
    fn keyword(&self) -> &str {
        "poweroff"
    }
    fn description(&self) -> &str {
        "Shuts down the operating system."
    }
    fn usage(&self) -> &str {
        "\tpoweroff - Shuts down the operating system."
    }
    fn requires_elevation(&self) -> bool {
        true
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        log::info!("poweroff requested");
        Ok(CommandOutput::PowerOff)
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn keyword(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Prints the contents of a file."
    }
    fn usage(&self) -> &str {
        "\tcat [file] - Prints the contents of a file."
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = args.first().ok_or_else(|| missing("Please specify a file."))?;
        let text = env.fs()?.read_file(path)?;
        Ok(CommandOutput::Text(text.trim_end_matches('\n').to_string()))
    }
}

// ---------------------------------------------------------------------------
// rm
// ---------------------------------------------------------------------------

struct RmCmd;
impl Command for RmCmd {
    fn keyword(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Deletes a file or an empty directory."
    }
    fn usage(&self) -> &str {
        "\trm [item] - Deletes an item after confirmation.\n\trm [item] -y - Deletes an item without asking."
    }
    fn requires_elevation(&self) -> bool {
        true
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let skip_confirmation = args.contains(&"-y");
        let target = args
            .iter()
            .find(|a| **a != "-y")
            .ok_or_else(|| missing("Please specify an item to delete."))?;
        let prompter = env.prompter;
        let message = env.fs()?.remove_item(target, skip_confirmation, prompter)?;
        if message.is_empty() {
            Ok(CommandOutput::None)
        } else {
            Ok(CommandOutput::Text(message))
        }
    }
}

// ---------------------------------------------------------------------------
// source
// ---------------------------------------------------------------------------

struct SourceCmd;
impl Command for SourceCmd {
    fn keyword(&self) -> &str {
        "source"
    }
    fn description(&self) -> &str {
        "Shows where a command comes from."
    }
    fn usage(&self) -> &str {
        "\tsource [command] - Shows whether a command is built in or which module provides it."
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        // Intercepted by the registry when registered as a built-in.
        Err(VosError::Command(
            "source must be registered as a shell built-in.".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// bash
// ---------------------------------------------------------------------------

struct BashCmd;
impl Command for BashCmd {
    fn keyword(&self) -> &str {
        "bash"
    }
    fn description(&self) -> &str {
        "Runs a shell script."
    }
    fn usage(&self) -> &str {
        "\tbash [script] - Runs each line of a script as a shell command."
    }
    fn requires_filesystem(&self) -> bool {
        true
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        // Intercepted by the registry, which runs each line through itself.
        Err(VosError::Command(
            "bash must be registered as a shell built-in.".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn keyword(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Prints its arguments."
    }
    fn usage(&self) -> &str {
        "\techo [text...] - Prints the text."
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(args.join(" ")))
    }
}
