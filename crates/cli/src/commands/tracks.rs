//! Inspect and edit the tracks of one story.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use story_store::StoryStore;

use super::{OutputFormat, changed, ensure_changed, open_story};
use crate::config::CliConfig;

/// List and edit the tracks of a story
#[derive(Parser)]
pub struct Tracks {
    /// Story to operate on
    #[arg(value_name = "STORY")]
    story: String,

    #[command(subcommand)]
    action: TracksAction,
}

#[derive(Subcommand)]
enum TracksAction {
    /// List tracks in play order
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,
    },

    /// Move an audio file into the story as its last track
    Add {
        #[arg(value_name = "NAME")]
        name: String,
        /// Audio file to import (it is moved, not copied)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Move a track to a new position (0 is the first track)
    Move {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "POSITION")]
        position: usize,
    },

    /// Delete a track and its recording
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Pick up recordings added or removed outside storytap
    Refresh,

    /// Save the in-progress recording as a track
    SaveWip {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete the in-progress recording
    DiscardWip,
}

impl Tracks {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let (_library, story) = open_story(config, &self.story).await?;
        let before = story.latest();

        let message = match self.action {
            TracksAction::List { format } => return print_list(&story, format),
            TracksAction::Add { name, file } => {
                story.add_track(name.as_str(), file);
                format!("Added {}", name)
            }
            TracksAction::Move { name, position } => {
                story.move_track(name.as_str(), position);
                format!("Moved {} to position {}", name, position)
            }
            TracksAction::Delete { name } => {
                story.delete_track(name.as_str());
                format!("Deleted {}", name)
            }
            TracksAction::Refresh => {
                story.refresh();
                story.flush().await;
                if !changed(&before, &story.latest()) {
                    println!("{}", style("Already up to date").dim());
                    return Ok(());
                }
                "Refreshed".to_string()
            }
            TracksAction::SaveWip { name } => {
                story.save_wip_recording(name.as_str());
                format!("Saved recording as {}", name)
            }
            TracksAction::DiscardWip => {
                let wip = story.wip_recording_path();
                if !wip.is_file() {
                    println!("{}", style("No recording in progress").dim());
                    return Ok(());
                }
                story.discard_wip_recording();
                story.flush().await;
                if wip.exists() {
                    anyhow::bail!("Failed to discard {} (see errors above)", wip.display());
                }
                println!("{} Discarded recording", style("✓").green().bold());
                return Ok(());
            }
        };

        story.flush().await;
        ensure_changed(&before, &story.latest(), "Command")?;
        println!("{} {}", style("✓").green().bold(), message);
        print_list(&story, OutputFormat::Summary)
    }
}

fn print_list(story: &StoryStore, format: OutputFormat) -> Result<()> {
    let Some(manifest) = story.latest() else {
        anyhow::bail!("Story {} has no manifest", story.name());
    };

    match format {
        OutputFormat::Summary => {
            println!("{} {}", style("Story:").bold().cyan(), story.name());
            println!(
                "{} {}  {} {}",
                style("Created:").bold().cyan(),
                manifest.created.format("%Y-%m-%d %H:%M:%S UTC"),
                style("Updated:").bold().cyan(),
                manifest.updated.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if manifest.is_empty() {
                println!("  {}", style("(no tracks)").dim());
            }
            for (position, name) in manifest.tracks.iter().enumerate() {
                println!("  {}  {}", style(format!("{:>3}", position)).dim(), name);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*manifest)?),
    }
    Ok(())
}
