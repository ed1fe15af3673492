//! Credential subcommands.

use anyhow::{bail, Result};
use dialoguer::Password;

use super::CredentialCommand;
use crate::config::{self, Config};

pub fn handle_credential_command(command: CredentialCommand) -> Result<()> {
    match command {
        CredentialCommand::Show => show(),
        CredentialCommand::Set { value } => set(value),
        CredentialCommand::Clear => clear(),
    }
}

fn show() -> Result<()> {
    let cfg = Config::load()?;
    if cfg.has_credential() {
        println!("API key: {}", config::mask_secret(&cfg.openai.api_key));
    } else {
        println!("No API credential configured.");
        println!("Set one with: recap credential set");
    }
    Ok(())
}

fn set(value: Option<String>) -> Result<()> {
    let key = match value {
        Some(v) => v,
        None => Password::new()
            .with_prompt("Enter API key")
            .interact()?,
    };

    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config::set_api_key(&key)?;
    println!("API credential saved.");
    Ok(())
}

fn clear() -> Result<()> {
    config::clear_api_key()?;
    println!("API credential cleared.");
    Ok(())
}
