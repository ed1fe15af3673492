//! Recordings subcommands.

use anyhow::{Context, Result};

use super::RecordingsCommand;
use crate::config::Config;
use crate::library::RecordingsLibrary;
use crate::store::MetadataStore;

pub fn handle_recordings_command(command: RecordingsCommand) -> Result<()> {
    match command {
        RecordingsCommand::List { limit } => list(limit),
        RecordingsCommand::Edit { sidecar, name, tag } => edit(sidecar, name, tag),
    }
}

fn list(limit: usize) -> Result<()> {
    let config = Config::load()?;
    let library = RecordingsLibrary::new(config.recordings_dir()?);
    let entries = library.list();

    if entries.is_empty() {
        println!("No recordings found in {:?}.", library.dir());
        return Ok(());
    }

    println!("Found {} recording(s):\n", entries.len());

    for entry in entries.iter().take(limit) {
        let summary = truncate_chars(&entry.summary, 100);

        println!("Name: {}", entry.display_name);
        println!("Date: {}", entry.recorded_at);
        if !entry.tags.is_empty() {
            println!("Tags: {}", entry.tags.join(", "));
        }
        println!("Audio: {}", entry.audio_file_path);
        println!("Summary: {}", summary);
        println!("Sidecar: {}", entry.sidecar_path.display());
        println!("---");
    }

    if entries.len() > limit {
        println!("\n({} more not shown)", entries.len() - limit);
    }

    Ok(())
}

/// Truncate long text for display. Counts characters, not bytes, so
/// multibyte summaries never split on a non-boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let truncated: String = text.chars().take(max).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

fn edit(
    sidecar: std::path::PathBuf,
    name: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    let current = MetadataStore::read(&sidecar)
        .with_context(|| format!("Failed to read {:?}", sidecar))?;

    let display_name = name.unwrap_or(current.display_name);
    let tags = if tags.is_empty() { current.tags } else { tags };

    let updated = MetadataStore::update(&sidecar, display_name, tags)
        .with_context(|| format!("Failed to update {:?}", sidecar))?;

    println!("Updated {}", sidecar.display());
    println!("Name: {}", updated.display_name);
    if !updated.tags.is_empty() {
        println!("Tags: {}", updated.tags.join(", "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte_near_limit() {
        // A multibyte char straddling the old byte cutoff must not panic.
        let summary = format!("{}—and more", "a".repeat(99));
        let shown = truncate_chars(&summary, 100);
        assert_eq!(shown, format!("{}—...", "a".repeat(99)));

        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars(&"語".repeat(100), 100), "語".repeat(100));
    }
}
