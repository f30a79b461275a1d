//! Prospector CLI - people-search capture and outreach
//!
//! Usage:
//!   prospector init                      Write the default config
//!   prospector run --query <q>...        Capture contacts and send invites
//!   prospector invites list              Page through the invite ledger
//!   prospector invites export <path>     Copy the ledger to a CSV file
//!   prospector quota                     Show this week's invite usage
//!
//! Credentials are read from `PROSPECTOR_EMAIL` and `PROSPECTOR_PASSWORD`,
//! optionally seeded from a `.env` file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use prospector_browser::{BrowserConfig, BrowserSession};
use prospector_core::{Credentials, ProspectorConfig, RunConfiguration};
use prospector_crawler::{export_contacts, ChannelSink, Engine, RunEvent, SecondFactorWait};
use prospector_ledger::{InviteLedger, QuotaDecision, QuotaGate, WeeklyQuota};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EMAIL_VAR: &str = "PROSPECTOR_EMAIL";
const PASSWORD_VAR: &str = "PROSPECTOR_PASSWORD";

#[derive(Parser)]
#[command(name = "prospector")]
#[command(author, version, about = "People-search capture and connection outreach")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding `.prospector/config.toml`
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init,

    /// Sign in, capture every result card and send invitations
    Run(RunArgs),

    /// Invite ledger
    Invites {
        #[command(subcommand)]
        action: InviteCommands,
    },

    /// Show weekly invite usage
    Quota {
        /// Account to report on (defaults to PROSPECTOR_EMAIL)
        #[arg(long)]
        email: Option<String>,

        /// Print the stats as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Search query (repeatable)
    #[arg(short, long = "query", value_name = "QUERY")]
    queries: Vec<String>,

    /// File with one query per line
    #[arg(long, value_name = "FILE")]
    queries_file: Option<PathBuf>,

    /// Maximum cards read per results page
    #[arg(long)]
    max_cards: Option<usize>,

    /// Maximum invitations per results page (0 disables outreach)
    #[arg(long)]
    max_connects: Option<usize>,

    /// Run the browser without a window
    #[arg(long, value_name = "BOOL")]
    headless: Option<bool>,

    /// Contacts CSV destination
    #[arg(long, value_name = "FILE")]
    csv_out: Option<PathBuf>,

    /// Wait for Enter after the second factor instead of a fixed delay
    #[arg(long)]
    confirm_second_factor: bool,

    /// Longest wait for the Enter acknowledgment, in seconds
    #[arg(long, default_value = "300")]
    second_factor_timeout: u64,

    /// Attach to a browser started with --remote-debugging-port
    #[arg(long, value_name = "PORT")]
    debug_port: Option<u16>,
}

#[derive(Subcommand)]
enum InviteCommands {
    /// List recorded invitations, oldest first
    List {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(long, default_value = "20")]
        page_size: usize,
    },

    /// Copy every valid ledger record to a CSV file
    Export {
        /// Destination file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init => cmd_init(&cli.root),
        Commands::Run(args) => cmd_run(&cli.root, args).await,
        Commands::Invites { action } => cmd_invites(&cli.root, action).await,
        Commands::Quota { email, json } => cmd_quota(&cli.root, email, json).await,
    }
}

fn load_config(root: &Path) -> Result<ProspectorConfig> {
    ProspectorConfig::load_or_default(root).context("Failed to load configuration")
}

fn ledger_for(root: &Path, config: &ProspectorConfig) -> Arc<InviteLedger> {
    let path = if config.ledger.path.is_absolute() {
        config.ledger.path.clone()
    } else {
        root.join(&config.ledger.path)
    };
    Arc::new(InviteLedger::new(path))
}

fn email_from_env() -> Result<String> {
    std::env::var(EMAIL_VAR).with_context(|| format!("{} is not set", EMAIL_VAR))
}

fn cmd_init(root: &Path) -> Result<()> {
    let path = ProspectorConfig::path_in(root);
    if path.exists() {
        println!("Config already exists at {:?}", path);
        return Ok(());
    }

    let path = ProspectorConfig::write_default(root).context("Failed to write config")?;
    println!("Initialized Prospector in {:?}", root);
    println!("Created:");
    println!("  {}", path.display());
    println!("\nNext steps:");
    println!("  1. Put {} and {} in your environment or .env", EMAIL_VAR, PASSWORD_VAR);
    println!("  2. Run 'prospector run --query \"<search>\"'");
    Ok(())
}

/// Read queries from `--query` flags and the optional queries file
async fn collect_queries(flags: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut queries = flags;
    if let Some(file) = file {
        let content = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read queries file {:?}", file))?;
        queries.extend(parse_query_lines(&content));
    }
    Ok(queries)
}

fn parse_query_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_csv_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("prospector_contacts_{}.csv", stamp))
}

/// What the event consumer saw during a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    captured: usize,
    invites_recorded: usize,
}

/// Drain run events: record invites, count captures, mirror logs
async fn consume_events(
    mut rx: mpsc::UnboundedReceiver<RunEvent>,
    gate: Arc<QuotaGate>,
    user_email: String,
) -> Tally {
    let mut tally = Tally::default();
    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Captured(contact) => {
                tally.captured += 1;
                info!("Captured {} ({})", contact.name, contact.company);
            }
            RunEvent::InviteSent {
                contact,
                source_query,
            } => match gate
                .record_invite(&user_email, &contact, &source_query)
                .await
            {
                Ok(QuotaDecision::Recorded { week_count }) => {
                    tally.invites_recorded += 1;
                    info!(
                        "Invite to {} recorded ({}/{} this week)",
                        contact.name,
                        week_count,
                        gate.quota().limit()
                    );
                }
                Ok(QuotaDecision::LimitReached { week_count }) => {
                    warn!(
                        "Weekly limit reached ({}), invite to {} not recorded",
                        week_count, contact.name
                    );
                }
                Err(e) => warn!("Failed to record invite to {}: {}", contact.name, e),
            },
            RunEvent::Log(line) => info!("{}", line),
        }
    }
    tally
}

/// Read one line from stdin on a detached thread
///
/// The thread is not joined, so an operator who never presses Enter does not
/// keep the process alive after the run.
fn acknowledge_on_enter() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || acknowledge_from(std::io::stdin().lock(), tx));
    rx
}

/// Acknowledge once a line is read
///
/// At EOF or on a read error the sender is dropped unsent, and the run waits
/// out the full second-factor window.
fn acknowledge_from(mut input: impl BufRead, tx: oneshot::Sender<()>) {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(n) if n > 0 => {
            let _ = tx.send(());
        }
        Ok(_) => warn!("stdin closed, second-factor acknowledgment unavailable"),
        Err(e) => warn!("Failed to read acknowledgment: {}", e),
    }
}

async fn cmd_run(root: &Path, args: RunArgs) -> Result<()> {
    let config = load_config(root)?;

    let queries = collect_queries(args.queries, args.queries_file.as_deref()).await?;
    if queries.is_empty() {
        bail!("No queries given; use --query or --queries-file");
    }
    let run_config = RunConfiguration::new(queries)
        .with_max_cards(args.max_cards.unwrap_or(config.run.max_cards_per_page))
        .with_max_connects(args.max_connects.unwrap_or(config.run.max_connects_per_page))
        .with_headless(args.headless.unwrap_or(config.run.headless));
    run_config.validate()?;

    let email = email_from_env()?;
    let password =
        std::env::var(PASSWORD_VAR).with_context(|| format!("{} is not set", PASSWORD_VAR))?;
    let credentials = Credentials::new(email.clone(), password);
    credentials.validate()?;

    let gate = Arc::new(QuotaGate::new(WeeklyQuota::new(
        ledger_for(root, &config),
        config.ledger.weekly_limit,
    )));
    let (can_send, count) = gate.quota().can_send(&email).await?;
    if run_config.max_connects_per_page > 0 && !can_send {
        bail!(
            "Weekly invite limit reached ({}/{}); retry next week or run with --max-connects 0",
            count,
            gate.quota().limit()
        );
    }

    let csv_out = args.csv_out.unwrap_or_else(default_csv_path);

    let session = match args.debug_port {
        Some(port) => BrowserSession::connect(port).await?,
        None => {
            BrowserSession::launch_with_config(BrowserConfig {
                headless: run_config.headless,
                ..BrowserConfig::default()
            })
            .await?
        }
    };

    let (sink, rx) = ChannelSink::pair();
    let consumer = tokio::spawn(consume_events(rx, Arc::clone(&gate), email));

    let mut engine = Engine::new(session, &config, Arc::new(sink))?;
    if args.confirm_second_factor {
        println!("Complete the second factor in the browser, then press Enter.");
        engine = engine.with_second_factor(SecondFactorWait::Acknowledged {
            signal: acknowledge_on_enter(),
            max_wait: Duration::from_secs(args.second_factor_timeout),
        });
    }

    info!("Starting run with {} queries", run_config.queries.len());
    let outcome = engine.run(&credentials, &run_config).await;
    // The engine and its sink are gone, so the consumer drains and stops
    let tally = consumer.await.context("Event consumer failed")?;
    info!(
        captured = tally.captured,
        recorded = tally.invites_recorded,
        "Event stream closed"
    );
    let report = outcome.context("Run aborted")?;

    export_contacts(&csv_out, &report.contacts)
        .with_context(|| format!("Failed to export contacts to {:?}", csv_out))?;

    println!("Run Summary");
    println!("===========");
    println!("Queries:          {}", report.queries);
    println!("Captured:         {}", report.captured);
    println!("Unique contacts:  {}", report.contacts.len());
    println!("Invites sent:     {}", report.invites_sent);
    println!("Invites recorded: {}", tally.invites_recorded);
    if !report.failed_queries.is_empty() {
        println!("Failed queries:   {}", report.failed_queries.join(", "));
    }
    println!("CSV:              {}", csv_out.display());

    Ok(())
}

async fn cmd_invites(root: &Path, action: InviteCommands) -> Result<()> {
    let config = load_config(root)?;
    let ledger = ledger_for(root, &config);

    match action {
        InviteCommands::List { page, page_size } => {
            if page == 0 || page_size == 0 {
                bail!("--page and --page-size start at 1");
            }
            let listing = ledger.list(page - 1, page_size).await?;

            println!(
                "Invites (page {}/{}, {} total)",
                page,
                listing.total_pages().max(1),
                listing.total
            );
            println!("==========");
            if listing.records.is_empty() {
                println!("  (none)");
            }
            for record in &listing.records {
                println!(
                    "  {}  {}  {} @ {}  [{}]",
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.profile_name,
                    record.profile_title,
                    record.company,
                    record.source_query
                );
            }
        }
        InviteCommands::Export { path } => {
            let written = ledger.export_to(&path).await?;
            println!("Exported {} invites to {}", written, path.display());
        }
    }

    Ok(())
}

async fn cmd_quota(root: &Path, email: Option<String>, json: bool) -> Result<()> {
    let config = load_config(root)?;
    let email = match email {
        Some(email) => email,
        None => email_from_env()?,
    };
    let quota = WeeklyQuota::new(ledger_for(root, &config), config.ledger.weekly_limit);
    let stats = quota.stats(&email).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Weekly Quota for {}", email);
    println!("==========");
    println!("Sent:      {}/{}", stats.count, stats.limit);
    println!("Remaining: {}", stats.remaining);
    println!("Used:      {:.1}%", stats.percentage);
    println!("Can send:  {}", if stats.can_send { "yes" } else { "no" });
    Ok(())
}
