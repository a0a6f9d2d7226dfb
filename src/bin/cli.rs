//! trendwatch CLI
//!
//! Local execution entry point, meant to be invoked from cron.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use trendwatch::{
    error::{AppError, Result},
    models::{Config, KeywordRules, ReportMode},
    pipeline::{self, BatchPlanner, MessageFormat},
    services::{dispatch, notifiers_from_config},
    storage::LocalStorage,
    utils::{http, time},
};

/// trendwatch - trending feed watcher
#[derive(Parser, Debug)]
#[command(
    name = "trendwatch",
    version,
    about = "Samples trending feeds, ranks keyword matches and sends chat digests"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every platform and write one snapshot
    Crawl,

    /// Analyze today's snapshots
    Report {
        /// Report mode (daily, incremental, current); defaults to the configured one
        #[arg(long)]
        mode: Option<ReportMode>,

        /// Message format to print (wework, telegram, feishu, dingtalk)
        #[arg(long, default_value = "wework")]
        format: MessageFormat,

        /// Print the report data as JSON instead of message batches
        #[arg(long)]
        json: bool,

        /// Deliver to the configured webhooks
        #[arg(long)]
        send: bool,
    },

    /// Run full pipeline: Crawl → Report → Notify
    Run,

    /// Validate configuration and keyword rules
    Validate,

    /// Show today's snapshot records
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("trendwatch starting...");

    let config = Config::load_or_default(&cli.config);
    log::info!("Loaded configuration from {}", cli.config.display());

    let now = time::now(config.report.utc_offset_hours)?;
    let storage = LocalStorage::new(config.output_dir(), time::date_folder(&now));

    match cli.command {
        Command::Crawl => {
            let client = http::create_async_client(&config.crawler)?;
            let label = time::capture_label(&now)?;
            if pipeline::run_crawler(&config, &storage, &client, label)
                .await?
                .is_some()
            {
                log::info!("Crawl complete!");
            }
        }

        Command::Report {
            mode,
            format,
            json,
            send,
        } => {
            let mode = mode.unwrap_or(config.report.mode);
            let rules = KeywordRules::load(&config.paths.keywords_file)?;
            let analysis = pipeline::run_report(&config, &rules, &storage, mode)?;
            let timestamp = time::display_timestamp(&now);

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis.report)?);
            } else {
                let batches =
                    BatchPlanner::from_config(format, &config, mode, timestamp.as_str())
                        .plan(&analysis.report);
                let total = batches.len();
                for (i, batch) in batches.iter().enumerate() {
                    println!(
                        "----- {} batch {}/{} ({} bytes) -----",
                        format,
                        i + 1,
                        total,
                        batch.len()
                    );
                    println!("{batch}");
                }
            }

            if send {
                let client = http::create_async_client(&config.crawler)?;
                let notifiers = notifiers_from_config(&config, &client);
                if notifiers.is_empty() {
                    return Err(AppError::config("No webhook configured"));
                }
                let outcomes =
                    dispatch(&notifiers, &analysis.report, &config, mode, &timestamp).await;
                for outcome in &outcomes {
                    log::info!(
                        "{}: {}/{} batch(es) sent{}",
                        outcome.channel,
                        outcome.sent,
                        outcome.batches,
                        outcome
                            .error
                            .as_deref()
                            .map(|e| format!(" ({e})"))
                            .unwrap_or_default()
                    );
                }
            }
        }

        Command::Run => {
            let client = http::create_async_client(&config.crawler)?;
            let summary = pipeline::run_pipeline(&config, &storage, &client, now).await?;

            let failed: Vec<_> = summary
                .deliveries
                .iter()
                .filter(|d| !d.is_success())
                .map(|d| d.channel.as_str())
                .collect();
            if !failed.is_empty() {
                log::warn!("Delivery failed on: {}", failed.join(", "));
            }
            log::info!("Pipeline complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} platforms)", config.platforms.len());

            let rules = KeywordRules::load(&config.paths.keywords_file)?;
            if rules.is_pass_through() {
                log::warn!("No keyword groups defined; every title will be reported");
            }
            log::info!("✓ Keyword rules OK");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Snapshot directory: {}", storage.snapshot_dir().display());

            let records = storage.list()?;
            if records.is_empty() {
                log::info!("No snapshot found for {} yet.", storage.date());
            }
            for (label, path) in &records {
                log::info!("  {} -> {}", label, path.display());
            }
            log::info!(
                "{} snapshot(s); first capture of the day: {}",
                records.len(),
                storage.is_first_capture()?
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
