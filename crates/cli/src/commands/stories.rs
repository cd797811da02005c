//! Manage the stories of a library.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use story_store::LibraryStore;

use super::{OutputFormat, ensure_changed, open_library};
use crate::config::CliConfig;

/// List, create, rename and delete stories
#[derive(Parser)]
pub struct Stories {
    #[command(subcommand)]
    action: StoriesAction,
}

#[derive(Subcommand)]
enum StoriesAction {
    /// List the stories in the library
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,
    },

    /// Create an empty story
    Create {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Rename a story
    Rename {
        #[arg(value_name = "OLD")]
        old: String,
        #[arg(value_name = "NEW")]
        new: String,
    },

    /// Delete a story and all of its recordings
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

impl Stories {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let library = open_library(config).await?;
        let before = library.latest();

        let message = match self.action {
            StoriesAction::List { format } => return print_list(&library, format),
            StoriesAction::Create { name } => {
                library.create(name.as_str());
                format!("Created {}", name)
            }
            StoriesAction::Rename { old, new } => {
                library.rename(old.as_str(), new.as_str());
                format!("Renamed {} to {}", old, new)
            }
            StoriesAction::Delete { name } => {
                library.delete(name.as_str());
                format!("Deleted {}", name)
            }
        };

        library.flush().await;
        ensure_changed(&before, &library.latest(), "Command")?;
        println!("{} {}", style("✓").green().bold(), message);
        Ok(())
    }
}

fn print_list(library: &LibraryStore, format: OutputFormat) -> Result<()> {
    let data = library.latest().unwrap_or_default();
    match format {
        OutputFormat::Summary => {
            println!(
                "{} {}",
                style("Library:").bold().cyan(),
                library.directory().display()
            );
            if data.is_empty() {
                println!("  {}", style("(no stories)").dim());
            }
            for name in data.iter() {
                println!("  {}", name);
            }
        }
        OutputFormat::Json => {
            let names: Vec<&str> = data.iter().collect();
            println!("{}", serde_json::to_string_pretty(&names)?);
        }
    }
    Ok(())
}
