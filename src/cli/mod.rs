use clap::{Args as ClapArgs, Parser, Subcommand};

pub mod credential;
pub mod recordings;

pub use credential::handle_credential_command;
pub use recordings::handle_recordings_command;

#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(about = "Record, transcribe and summarize meetings", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Inspect or manage the API credential
    Credential(CredentialCliArgs),
    /// Browse and edit saved recordings
    Recordings(RecordingsCliArgs),
    /// List available audio input devices
    Devices,
}

pub fn handle_devices_command() -> anyhow::Result<()> {
    let devices = crate::capture::list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    println!("Available input devices:");
    for name in devices {
        println!("  {name}");
    }
    println!("\nSelect one via `recording.input_device` in the config file.");
    Ok(())
}

#[derive(ClapArgs, Debug)]
pub struct CredentialCliArgs {
    #[command(subcommand)]
    pub command: CredentialCommand,
}

#[derive(Subcommand, Debug)]
pub enum CredentialCommand {
    /// Show whether a credential is configured (masked)
    Show,
    /// Set the API credential (prompts when no value is given)
    Set {
        /// Credential value; prompted for interactively when omitted
        value: Option<String>,
    },
    /// Remove the stored credential
    Clear,
}

#[derive(ClapArgs, Debug)]
pub struct RecordingsCliArgs {
    #[command(subcommand)]
    pub command: RecordingsCommand,
}

#[derive(Subcommand, Debug)]
pub enum RecordingsCommand {
    /// List recordings, most recent first
    List {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Rename a recording and/or replace its tags
    Edit {
        /// Path of the recording's metadata sidecar
        sidecar: std::path::PathBuf,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// Replacement tags (repeat for multiple)
        #[arg(long)]
        tag: Vec<String>,
    },
}
