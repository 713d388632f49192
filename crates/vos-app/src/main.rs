//! VOS entry point.
//!
//! Loads `vos.toml` (first CLI argument, `VOS_CONFIG`, or the file next to
//! the executable), opens the sandbox, loads modules, and runs the
//! read-eval-print loop until `sudo poweroff`, Ctrl-C, or Ctrl-D.

mod confirm;

use std::path::PathBuf;

use anyhow::Result;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use vos_core::config::{CONFIG_FILE, VosConfig, install_dir};
use vos_core::shell::Shell;
use vos_core::terminal::CommandOutput;

use confirm::StdinConfirm;

/// ANSI sequence that clears the screen and homes the cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let base = install_dir();
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VOS_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| base.join(CONFIG_FILE));
    let config = VosConfig::load(&config_path, &base)?;
    log::info!(
        "Starting {} (sandbox {}, modules {})",
        config.os.info_str(),
        config.sandbox_root.display(),
        config.module_dir.display()
    );

    let (mut shell, diagnostics) = Shell::from_config(&config, Box::new(StdinConfirm))?;
    let failed = diagnostics.iter().filter(|d| d.is_high()).count();
    if failed > 0 {
        log::warn!("{failed} module file(s) failed to load");
    }

    let editor_config = Config::builder()
        .history_ignore_dups(true)?
        .auto_add_history(true)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;

    println!("{}", shell.os().banner());
    println!("{}", shell.os().details());
    println!();
    log::debug!("Kernel booted successfully.");

    loop {
        let line = match editor.readline(&shell.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match shell.execute_line(&line) {
            CommandOutput::Text(text) => {
                if !text.is_empty() {
                    println!("{text}");
                }
            },
            CommandOutput::None => {},
            CommandOutput::Clear => print!("{CLEAR_SCREEN}"),
            CommandOutput::PowerOff => break,
        }
    }

    log::info!("Shutting down");
    Ok(())
}
