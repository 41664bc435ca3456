//! Operator interaction: source folder prompt, yes/no confirmation, `~` expansion.
use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::{Path, PathBuf};

/// Expand a leading `~` or `~/` to `$HOME`. Other paths pass through.
pub fn expand_home(raw: &str) -> PathBuf {
    let home = || std::env::var("HOME").ok().filter(|h| !h.is_empty());
    if raw == "~" {
        if let Some(home) = home() {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home() {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Ask for the legacy JSON folder. An empty answer means the current directory.
pub fn ask_source_dir() -> Result<PathBuf> {
    println!("Tip: the JSON folder can be passed as the first argument.");
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("JSON folder (Enter for the current directory)")
        .allow_empty(true)
        .interact_text()?;
    source_dir_from_answer(&answer)
}

/// Turn a typed folder answer into a path: blank → cwd, `~` expanded.
pub fn source_dir_from_answer(answer: &str) -> Result<PathBuf> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(std::env::current_dir()?);
    }
    Ok(expand_home(answer))
}

/// Yes/no gate that defaults to "no".
pub fn confirm(question: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(question)
        .default(false)
        .interact()?)
}
