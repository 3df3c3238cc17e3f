//! CLI entry point for `emldigest`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use emldigest::classify::{self, Assignments};
use emldigest::config::Config;
use emldigest::model::metadata::Metadata;
use emldigest::store::Store;

#[derive(Parser)]
#[command(name = "emldigest", version, about = "Group a .eml archive into a digest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Force re-extraction even if a metadata cache exists
    #[arg(short, long, global = true)]
    force: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata for every message and persist the cache
    Index { path: PathBuf },
    /// Run the full pipeline and print the digest
    Digest {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show corpus statistics
    Stats {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = emldigest::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Index { path } => cmd_index(&path, &config, cli.force),
        Commands::Digest { path, json } => cmd_digest(&path, &config, json, cli.force),
        Commands::Stats { path, json } => cmd_stats(&path, &config, json, cli.force),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = emldigest::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "emldigest.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Extract metadata for the whole archive with a progress bar.
fn extract_with_progress(store: &mut Store) -> anyhow::Result<Vec<Metadata>> {
    let total = store.message_ids()?.len() as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:40}] {pos}/{len} messages")?
            .progress_chars("=> "),
    );

    let messages = store.extract_all(Some(&|done, _| pb.set_position(done)))?;
    pb.finish_and_clear();

    if let Err(e) = store.save() {
        tracing::warn!(error = %e, "Could not persist metadata cache; continuing");
    }
    Ok(messages)
}

fn cmd_index(path: &Path, config: &Config, force: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut store = Store::open(path, config, force)?;
    let messages = extract_with_progress(&mut store)?;

    println!(
        "Indexed {} messages in {:.2}s",
        messages.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_digest(path: &Path, config: &Config, json: bool, force: bool) -> anyhow::Result<()> {
    let mut store = Store::open(path, config, force)?;
    let mut messages = extract_with_progress(&mut store)?;
    let assignments = classify::classify(&messages, &config.classify)?;

    // Newest first
    messages.sort_by(|a, b| b.date.cmp(&a.date));

    let now = Utc::now();
    if json {
        print_digest_json(&messages, &assignments, now)?;
    } else {
        print_digest_text(&messages, &assignments, now);
    }
    Ok(())
}

/// One digest section: an age bucket with topics in first-seen order.
fn digest_sections<'a>(
    messages: &'a [Metadata],
    assignments: &'a Assignments,
    now: DateTime<Utc>,
) -> Vec<(String, Vec<(String, String, Vec<&'a Metadata>)>)> {
    let mut sections: Vec<(String, Vec<(String, String, Vec<&Metadata>)>)> = Vec::new();

    for meta in messages {
        let Some(label) = assignments.display_label(&meta.id) else {
            continue;
        };
        let title = assignments
            .display_title(&meta.id)
            .unwrap_or_default();
        let kind = label.kind().to_string();
        let age = humanize_age(now.signed_duration_since(meta.date));

        if sections.last().map(|(a, _)| a.as_str()) != Some(age.as_str()) {
            sections.push((age.clone(), Vec::new()));
        }
        let topics = &mut sections.last_mut().expect("just pushed").1;
        match topics.iter_mut().find(|(k, t, _)| *k == kind && *t == title) {
            Some((_, _, list)) => list.push(meta),
            None => topics.push((kind, title, vec![meta])),
        }
    }

    sections
}

fn print_digest_text(messages: &[Metadata], assignments: &Assignments, now: DateTime<Utc>) {
    for (age, topics) in digest_sections(messages, assignments, now) {
        println!("── {age} {}", "─".repeat(40usize.saturating_sub(age.len())));
        for (kind, title, entries) in topics {
            println!("[{kind}] {title} ({} messages)", entries.len());
            for meta in entries {
                let preview: String = meta.preview.chars().take(60).collect();
                println!("    {} — {} — {}", meta.sender.identity(), meta.subject, preview);
            }
        }
        println!();
    }
}

fn print_digest_json(
    messages: &[Metadata],
    assignments: &Assignments,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let sections: Vec<serde_json::Value> = digest_sections(messages, assignments, now)
        .into_iter()
        .map(|(age, topics)| {
            serde_json::json!({
                "date": age,
                "topics": topics
                    .into_iter()
                    .map(|(kind, title, entries)| {
                        serde_json::json!({
                            "view": kind,
                            "title": title,
                            "messages": entries
                                .iter()
                                .map(|meta| {
                                    serde_json::json!({
                                        "sender": meta.sender.display(),
                                        "subject": meta.subject,
                                        "preview": meta.preview,
                                    })
                                })
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "messages": sections }))?
    );
    Ok(())
}

fn cmd_stats(path: &Path, config: &Config, json: bool, force: bool) -> anyhow::Result<()> {
    let mut store = Store::open(path, config, force)?;
    let messages = extract_with_progress(&mut store)?;
    let assignments = classify::classify(&messages, &config.classify)?;

    let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
    for meta in &messages {
        if let Some(label) = assignments.display_label(&meta.id) {
            *kinds.entry(label.kind()).or_insert(0) += 1;
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "messages": messages.len(),
                "conversations": assignments.conversations().len(),
                "clusters": assignments.clusters().len(),
                "labels": kinds,
            }))?
        );
    } else {
        println!("Messages:      {}", messages.len());
        println!("Conversations: {}", assignments.conversations().len());
        println!("Clusters:      {}", assignments.clusters().len());
        for (kind, count) in kinds {
            println!("  {kind:<14} {count}");
        }
    }
    Ok(())
}

/// Humanize a message age into the digest's day/week/month buckets.
fn humanize_age(delta: chrono::Duration) -> String {
    let days = delta.num_days().max(0);
    if days == 0 {
        "today".to_string()
    } else if days == 1 {
        "1 day ago".to_string()
    } else if days < 7 {
        format!("{days} days ago")
    } else if days < 30 {
        let weeks = days / 7;
        if weeks == 1 {
            "1 week ago".to_string()
        } else {
            format!("{weeks} weeks ago")
        }
    } else {
        let months = days / 30;
        if months == 1 {
            "1 month ago".to_string()
        } else {
            format!("{months} months ago")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_age_buckets() {
        assert_eq!(humanize_age(chrono::Duration::hours(5)), "today");
        assert_eq!(humanize_age(chrono::Duration::days(1)), "1 day ago");
        assert_eq!(humanize_age(chrono::Duration::days(3)), "3 days ago");
        assert_eq!(humanize_age(chrono::Duration::days(7)), "1 week ago");
        assert_eq!(humanize_age(chrono::Duration::days(20)), "2 weeks ago");
        assert_eq!(humanize_age(chrono::Duration::days(30)), "1 month ago");
        assert_eq!(humanize_age(chrono::Duration::days(90)), "3 months ago");
    }

    #[test]
    fn test_humanize_age_future_dates_clamp_to_today() {
        assert_eq!(humanize_age(chrono::Duration::days(-2)), "today");
    }
}
