// ABOUTME: Entry point for the linkdrop binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and runs one command against the configured store.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use linkdrop_core::{ClickSource, LogLevel, format_iso};
use linkdrop_service::{
    BackendKind, Linkdrop, LinkdropConfig, RedirectOutcome, RowErrors, ShortenError, ShortenRow,
};
use linkdrop_store::TagContext;

#[derive(Parser)]
#[command(name = "linkdrop")]
#[command(about = "Local URL shortener with click stats")]
struct Cli {
    /// Data directory (overrides LINKDROP_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    /// Storage backend: file, sqlite, or memory (overrides LINKDROP_BACKEND)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create up to five short URLs in one batch
    Shorten {
        #[arg(required = true, num_args = 1..=5)]
        urls: Vec<String>,
        /// Validity in minutes, matched to URLs by position (missing means the configured default)
        #[arg(short, long)]
        minutes: Vec<String>,
        /// Preferred code, matched to URLs by position
        #[arg(short, long)]
        code: Vec<String>,
    },
    /// Resolve a code as the redirect route would, recording a click
    Open { code: String },
    /// Record a non-redirect click for an existing code
    Click {
        code: String,
        #[arg(long, default_value = "manual")]
        source: ClickSource,
        #[arg(long)]
        geo: Option<String>,
    },
    /// List short URLs, newest first
    List,
    /// Show per-URL click counts
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Show the application log, newest first
    Logs {
        /// Only show entries at or above this level
        #[arg(long)]
        min_level: Option<LogLevel>,
    },
    /// Delete every application log entry
    ClearLogs,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Shorten { .. } => "shorten",
            Command::Open { .. } => "open",
            Command::Click { .. } => "click",
            Command::List => "list",
            Command::Stats { .. } => "stats",
            Command::Logs { .. } => "logs",
            Command::ClearLogs => "clear-logs",
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = LinkdropConfig::from_env().context("invalid configuration")?;
    if let Some(home) = cli.home {
        config.home = home;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut app = Linkdrop::from_config(&config)
        .with_context(|| format!("failed to open store under {}", config.home.display()))?;
    app.logger_mut()
        .use_middleware(TagContext::new("command", cli.command.name()));

    let code = run(&mut app, cli.command)?;
    app.close().context("failed to flush application log")?;
    Ok(code)
}

fn run(app: &mut Linkdrop, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Shorten {
            urls,
            minutes,
            code,
        } => {
            let rows = shorten_rows(urls, &minutes, &code)?;

            match app.shorten(&rows) {
                Ok(created) => {
                    for url in created {
                        println!(
                            "{}  ->  {}  (expires {})",
                            url.short_link(&app.settings().base_url),
                            url.long_url,
                            format_iso(&url.expires_at)
                        );
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(ShortenError::Invalid(errors)) => {
                    for (i, row) in errors.iter().enumerate() {
                        print_row_errors(i + 1, &rows[i].long_url, row);
                    }
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Open { code } => match app.resolve_redirect(&code)? {
            RedirectOutcome::Redirect { url, .. } => {
                println!("{}", url.long_url);
                Ok(ExitCode::SUCCESS)
            }
            RedirectOutcome::Expired(url) => {
                eprintln!("{} expired at {}", url.code, format_iso(&url.expires_at));
                Ok(ExitCode::FAILURE)
            }
            RedirectOutcome::NotFound { code } => {
                eprintln!("no short URL for {}", code);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Click { code, source, geo } => {
            let event = app.record_click(&code, source, geo)?;
            println!("{} {} {}", event.id, event.source, format_iso(&event.timestamp));
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let now = app.clock().now();
            for url in app.repo().list_short_urls() {
                let state = if url.is_expired_at(&now) { "expired" } else { "live" };
                println!("{:<20} {:<8} {}", url.code, state, url.long_url);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Stats { json } => {
            let report = app.stats_report();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for row in &report.urls {
                    let last = row
                        .last_click
                        .as_ref()
                        .map(format_iso)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<40} {:>6} clicks  last {}{}",
                        row.short_link,
                        row.clicks,
                        last,
                        if row.expired { "  (expired)" } else { "" }
                    );
                }
                println!("{} clicks total", report.total_clicks());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Logs { min_level } => {
            let min = min_level.unwrap_or(LogLevel::Debug);
            for entry in app.logger().entries().iter().filter(|e| e.level >= min) {
                let context = entry
                    .context
                    .as_ref()
                    .map(|c| serde_json::Value::Object(c.clone()).to_string())
                    .unwrap_or_default();
                println!(
                    "{} {:<5} {} {}",
                    format_iso(&entry.timestamp),
                    entry.level.as_str(),
                    entry.message,
                    context
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearLogs => {
            let count = app.logger().entries().len();
            app.logger_mut().clear()?;
            println!("cleared {} log entries", count);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Pair `--minutes` and `--code` values with URLs by position. Rows without
/// a value keep the field blank.
fn shorten_rows(
    urls: Vec<String>,
    minutes: &[String],
    codes: &[String],
) -> anyhow::Result<Vec<ShortenRow>> {
    if minutes.len() > urls.len() {
        anyhow::bail!("{} minutes given for {} URLs", minutes.len(), urls.len());
    }
    if codes.len() > urls.len() {
        anyhow::bail!("{} codes given for {} URLs", codes.len(), urls.len());
    }
    Ok(urls
        .into_iter()
        .enumerate()
        .map(|(i, url)| {
            ShortenRow::new(url)
                .minutes(minutes.get(i).cloned().unwrap_or_default())
                .code(codes.get(i).cloned().unwrap_or_default())
        })
        .collect())
}

fn print_row_errors(index: usize, url: &str, errors: &RowErrors) {
    if errors.is_empty() {
        return;
    }
    eprintln!("row {} ({}):", index, url);
    for (field, err) in [
        ("url", &errors.url),
        ("minutes", &errors.minutes),
        ("code", &errors.code),
    ] {
        if let Some(err) = err {
            eprintln!("  {}: {}", field, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn minutes_and_codes_pair_with_urls_by_position() {
        let rows = shorten_rows(
            strings(&["https://a.example", "https://b.example", "https://c.example"]),
            &strings(&["10", "90"]),
            &strings(&["first"]),
        )
        .unwrap();

        assert_eq!(rows[0], ShortenRow::new("https://a.example").minutes("10").code("first"));
        assert_eq!(rows[1], ShortenRow::new("https://b.example").minutes("90"));
        assert_eq!(rows[2], ShortenRow::new("https://c.example"));
    }

    #[test]
    fn extra_minutes_or_codes_are_rejected() {
        let urls = strings(&["https://a.example"]);
        assert!(shorten_rows(urls.clone(), &strings(&["5", "6"]), &[]).is_err());
        assert!(shorten_rows(urls, &[], &strings(&["one", "two"])).is_err());
    }

    #[test]
    fn cli_parses_repeated_minutes_and_level_filter() {
        let cli = Cli::parse_from([
            "linkdrop",
            "shorten",
            "https://a.example",
            "https://b.example",
            "-m",
            "10",
            "-m",
            "20",
        ]);
        match cli.command {
            Command::Shorten { minutes, .. } => assert_eq!(minutes, strings(&["10", "20"])),
            _ => panic!("expected shorten"),
        }

        let cli = Cli::parse_from(["linkdrop", "logs", "--min-level", "WARN"]);
        assert!(matches!(
            cli.command,
            Command::Logs {
                min_level: Some(LogLevel::Warn)
            }
        ));
        assert!(Cli::try_parse_from(["linkdrop", "logs", "--min-level", "loud"]).is_err());
    }
}
