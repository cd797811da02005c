//! Follow a story's track list as it changes.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;
use tokio::time::{Interval, MissedTickBehavior};

use super::open_story;
use crate::config::CliConfig;

/// Print the track list of a story every time it changes
#[derive(Parser)]
pub struct Watch {
    /// Story to watch
    #[arg(value_name = "STORY")]
    story: String,

    /// Seconds between directory rescans (0 disables rescanning)
    #[arg(short, long, value_name = "SECS", default_value_t = 2)]
    interval: u64,
}

impl Watch {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let (_library, story) = open_story(config, &self.story).await?;
        let mut updates = story.updates();
        let mut rescan = (self.interval > 0).then(|| {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        println!(
            "{} {} {}",
            style("Watching").bold().cyan(),
            story.directory().display(),
            style("(Ctrl+C to stop)").dim()
        );

        loop {
            tokio::select! {
                manifest = updates.recv() => {
                    let Some(manifest) = manifest else {
                        break;
                    };
                    println!(
                        "{} {}",
                        style(manifest.updated.format("%H:%M:%S")).dim(),
                        if manifest.is_empty() {
                            style("(no tracks)".to_string()).dim()
                        } else {
                            style(manifest.tracks.join(" → "))
                        }
                    );
                }
                _ = tick(&mut rescan) => story.refresh(),
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        Ok(())
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
