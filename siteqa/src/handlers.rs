use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use siteqa_core::credential::API_KEY_SETTING;
use siteqa_core::data::{DATABASE_FILE, Database};
use siteqa_core::report::{self, ReportFormat};
use siteqa_core::scan::{ScanConfig, ScanOrchestrator, ScanState, ScanStatus};
use siteqa_core::{CredentialStore, FailureKind, ScanFailure};
use siteqa_scanner::config::DEFAULT_PAGE_LIMIT;
use siteqa_scanner::{CrawlerConfig, FirecrawlClient};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config_dir: PathBuf,
    pub api_url: Option<Url>,
    pub quiet: bool,
    pub verbose: bool,
}

impl GlobalOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let config_dir = matches
            .get_one::<String>("config-dir")
            .map(|dir| resolve_config_dir(dir))
            .unwrap_or_else(|| resolve_config_dir(crate::commands::DEFAULT_CONFIG_DIR));

        Self {
            config_dir,
            api_url: matches.get_one::<Url>("api-url").cloned(),
            quiet: matches.get_flag("quiet"),
            verbose: matches.get_flag("verbose"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        database_path(&self.config_dir)
    }

    pub fn crawler_config(&self) -> CrawlerConfig {
        let config = CrawlerConfig::default();
        match self.api_url {
            Some(ref url) => config.with_api_url(url.as_str()),
            None => config,
        }
    }
}

/// `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn resolve_config_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn database_path(config_dir: &Path) -> PathBuf {
    config_dir.join(DATABASE_FILE)
}

/// Open the settings database, creating the config directory on first use.
pub fn open_database(config_dir: &Path) -> Result<Database> {
    fs::create_dir_all(config_dir).with_context(|| {
        format!(
            "Failed to create config directory {}",
            config_dir.display()
        )
    })?;
    let db_path = database_path(config_dir);
    Database::new(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

/// Create the database at `db_path`. An existing database is kept unless
/// `overwrite` is set. Returns whether a fresh database was written.
pub fn initialize_database(db_path: &Path, overwrite: bool) -> Result<bool> {
    if Database::exists(db_path) {
        if !overwrite {
            return Ok(false);
        }
        Database::drop(db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Database::new(db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;
    Ok(true)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    print_divider();
    println!("{}", "  SITEQA INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(|path| resolve_config_dir(path))
        .unwrap_or_else(|| global.config_dir.clone());
    let db_path = database_path(&config_dir);
    let force = args.get_flag("force");

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    let mut overwrite = force;
    if Database::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("Database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!(
            "{}",
            "Overwriting it removes the stored API key.".yellow()
        );
        println!();

        let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
        println!();
        overwrite = response == "y" || response == "yes";
    }

    if initialize_database(&db_path, overwrite)? {
        println!(
            "{} Database initialized: {}",
            "✓".green().bold(),
            db_path.display().to_string().bright_white()
        );
    } else {
        println!("{} Keeping existing database", "→".blue());
    }

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Next: {}",
        "ℹ".blue(),
        "siteqa key set <FIRECRAWL_API_KEY>".bright_white()
    );
    Ok(())
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(message.to_string());
    spinner
}

pub async fn handle_key_set(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    let key = args
        .get_one::<String>("KEY")
        .ok_or_else(|| anyhow!("An API key is required"))?;

    let db = open_database(&global.config_dir)?;
    let client = FirecrawlClient::new(global.crawler_config())?;
    let orchestrator = ScanOrchestrator::new(client, db, ScanConfig::default());

    let spinner = spinner("Validating API key with Firecrawl...", global.quiet);
    let outcome = orchestrator.save_credential(key).await;
    spinner.finish_and_clear();

    outcome.map_err(|failure| match failure_hint(&failure) {
        Some(hint) => anyhow!("{} {}", failure, hint),
        None => failure.into(),
    })?;
    println!("{} API key saved successfully!", "✓".green().bold());
    Ok(())
}

/// Masked description of the stored key, if any.
pub fn stored_key_summary(store: &impl CredentialStore) -> Result<Option<String>> {
    Ok(store.get()?.map(|credential| credential.masked()))
}

/// When the stored key was last written.
pub fn key_updated_at(db: &Database) -> Result<Option<DateTime<Utc>>> {
    Ok(db
        .setting_updated_at(API_KEY_SETTING)?
        .and_then(|secs| DateTime::from_timestamp(secs, 0)))
}

/// Follow-up advice for a failure, chosen by its kind.
pub fn failure_hint(failure: &ScanFailure) -> Option<&'static str> {
    match failure.kind() {
        FailureKind::Configuration => Some("Run `siteqa key set <KEY>` to store a validated API key"),
        FailureKind::Validation => Some("Copy the key from your Firecrawl dashboard and try again"),
        FailureKind::Storage => Some("Run `siteqa init --force` to recreate the database"),
        FailureKind::Input
        | FailureKind::Transport
        | FailureKind::Busy
        | FailureKind::Cancelled => None,
    }
}

pub fn handle_key_show(global: &GlobalOptions) -> Result<()> {
    let db = open_database(&global.config_dir)?;
    match stored_key_summary(&db)? {
        Some(masked) => {
            println!("{} API key: {}", "✓".green().bold(), masked.bright_white());
            if let Some(updated_at) = key_updated_at(&db)? {
                println!(
                    "{} Saved: {}",
                    "ℹ".blue(),
                    updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        None => println!(
            "{} No API key set. Run {}",
            "✗".red().bold(),
            "siteqa key set <KEY>".bright_white()
        ),
    }
    Ok(())
}

pub fn handle_key_clear(global: &GlobalOptions) -> Result<()> {
    let db = open_database(&global.config_dir)?;
    db.clear()?;
    println!("{} API key removed", "✓".green().bold());
    Ok(())
}

pub fn state_message(state: ScanState) -> &'static str {
    match state {
        ScanState::Idle => "Ready to scan",
        ScanState::Normalizing => "Preparing URL...",
        ScanState::Crawling => "Crawling website...",
        ScanState::Analyzing => "Analyzing pages...",
        ScanState::Done => "Scan complete",
        ScanState::Failed => "Scan failed",
    }
}

fn scan_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub async fn handle_scan(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    let url = args
        .get_one::<String>("URL")
        .ok_or_else(|| anyhow!("A URL is required"))?;
    let limit = args.get_one::<usize>("limit").copied().unwrap_or(DEFAULT_PAGE_LIMIT);
    let format = args
        .get_one::<ReportFormat>("format")
        .copied()
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");
    let scan_config = ScanConfig {
        require_validated_credential: !args.get_flag("allow-unvalidated"),
    };

    let db = open_database(&global.config_dir)?;
    let client = FirecrawlClient::new(global.crawler_config().with_page_limit(limit))?;
    debug!("Scanning with page limit {}", limit);

    let bar = scan_progress_bar(global.quiet);
    let bar_clone = bar.clone();
    let orchestrator = ScanOrchestrator::new(client, db, scan_config).with_status_callback(
        Arc::new(move |status: &ScanStatus| {
            bar_clone.set_position(u64::from(status.progress));
            bar_clone.set_message(state_message(status.state));
        }),
    );

    let outcome = orchestrator.scan(url).await;
    bar.finish_and_clear();

    let scan_report = outcome.map_err(|failure| match failure_hint(&failure) {
        Some(hint) => anyhow!("{}. {}", failure, hint),
        None => failure.into(),
    })?;

    if !global.quiet {
        println!(
            "{} Scan Complete. {}",
            "✓".green().bold(),
            scan_report.summary()
        );
        println!();
    }

    let rendered = report::render(&scan_report, format)?;
    match output {
        Some(path) => {
            report::save_report(&rendered, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
