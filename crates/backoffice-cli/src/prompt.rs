//! Terminal prompts: alerts, yes/no confirmation and credential entry.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use backoffice_core::Prompter;
use tracing::warn;

pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for TerminalPrompter {
    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{} [y/N]: ", message);
        if let Err(e) = io::stdout().flush() {
            warn!(error = %e, "Failed to flush stdout");
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(_) => is_yes(&input),
            Err(e) => {
                warn!(error = %e, "Failed to read confirmation, treating as no");
                false
            }
        }
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Ask for a username, offering `default` when one is remembered.
pub fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Backoffice ID [{}]: ", last),
        None => print!("Backoffice ID: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(pick_username(&input, default))
}

fn pick_username(input: &str, default: Option<&str>) -> String {
    let input = input.trim();
    match default {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    }
}

pub fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
