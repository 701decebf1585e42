mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Weekday;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use export_insights::loader::{archive_entries, FileKind};
use export_insights::prelude::*;
use export_insights::stats;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::resolve(cli.config.as_deref())?;
    let session = Session::new();

    match cli.command {
        Commands::Show { file, tab, json } => {
            let doc = open(&session, &file).await?;
            let views = match tab {
                Some(tab) => vec![render_tab(&doc, tab, &config).map_err(LoadError::from)?],
                None => render_all(&doc, &config).map_err(LoadError::from)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                for view in &views {
                    print_view(view);
                }
            }
        }
        Commands::Entries { file } => {
            let upload = UploadedFile::from_path(&file).await?;
            if upload.kind() != Some(FileKind::Archive) {
                bail!("{} is not a zip archive", file.display());
            }
            for entry in archive_entries(&upload.bytes)? {
                let mark = if entry.matches { "*" } else { " " };
                println!("{} {:>10}  {}", mark, entry.size, entry.path);
            }
        }
        Commands::Activity { file, json } => {
            let doc = open(&session, &file).await?;
            print_activity(&doc, json)?;
        }
    }
    Ok(())
}

async fn open(session: &Session, path: &Path) -> Result<Arc<ExportDocument>> {
    let file = UploadedFile::from_path(path).await?;
    match session.upload(file).await {
        LoadOutcome::Applied => session.current().ok_or_else(|| anyhow!("no document loaded")),
        LoadOutcome::Stale => bail!("load of {} was superseded", path.display()),
        LoadOutcome::Failed(e) => {
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

fn print_view(view: &TabView) {
    println!("== {} ({}) ==", view.title, view.header);
    for panel in &view.panels {
        println!("{}", panel.title());
        match panel {
            Panel::Card { stats, .. } => {
                for s in stats {
                    println!("  {}: {}", s.label, s.value);
                }
            }
            Panel::List { items, .. } => {
                for item in items {
                    println!("  - {}", item);
                }
            }
            Panel::Ranking { entries, .. } => {
                for (i, c) in entries.iter().enumerate() {
                    println!("  {}. {} ({} messages)", i + 1, c.sender, c.messages);
                }
            }
        }
    }
    println!();
}

fn print_activity(doc: &ExportDocument, json: bool) -> Result<()> {
    let daily = stats::daily_media_counts(doc);
    let followers = stats::daily_connection_counts(doc, Relation::Followers);
    let following = stats::daily_connection_counts(doc, Relation::Following);
    let hours = stats::hourly_activity(doc);
    let weekdays = stats::weekday_activity(doc);

    if json {
        let out = serde_json::json!({
            "daily_media": daily,
            "daily_followers": followers,
            "daily_following": following,
            "hours": hours,
            "weekdays": weekdays,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Media per day");
    for (date, count) in &daily {
        println!("  {}  {}", date, count);
    }
    for (title, days) in [("New followers per day", &followers), ("New following per day", &following)] {
        println!("{}", title);
        for (date, count) in days {
            println!("  {}  {}", date, count);
        }
    }
    println!("By hour");
    for (hour, count) in hours.iter().enumerate().filter(|(_, c)| **c > 0) {
        println!("  {:02}:00  {}", hour, count);
    }
    println!("By weekday");
    let mut day = Weekday::Mon;
    for count in weekdays {
        println!("  {:?}  {}", day, count);
        day = day.succ();
    }
    Ok(())
}
