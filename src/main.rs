//! Assessment Proctor CLI
//!
//! Replays recorded occurrence logs through the proctoring engine.

use anyhow::Context;
use assessment_proctor::{
    config::Config,
    core::Engine,
    notify::TracingNotifier,
    policy::Policy,
    sink::{LogSink, RemoteSink},
    signals::Stamped,
    storage::{FileSlot, PendingStore},
    Dispatcher, SubmissionHook, VERSION,
};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "proctor-replay")]
#[command(version = VERSION)]
#[command(about = "Replay assessment occurrence logs through the proctoring engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON-lines occurrence log through the engine
    Replay {
        /// Occurrence log, one stamped occurrence per line
        file: PathBuf,

        /// Policy file (defaults to the built-in restrictive policy)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Assessment identifier sent with every event
        #[arg(long)]
        assessment: Option<String>,

        /// Post events to the configured endpoint (requires http feature)
        #[arg(long)]
        endpoint: bool,
    },

    /// Print the default policy
    Policy,

    /// Show the locally stored pending events
    Pending {
        /// Remove the stored snapshot
        #[arg(long)]
        clear: bool,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    match cli.command {
        Commands::Replay {
            file,
            policy,
            assessment,
            endpoint,
        } => cmd_replay(&config, &file, policy.as_deref(), assessment, endpoint).await,
        Commands::Policy => cmd_policy(),
        Commands::Pending { clear } => cmd_pending(&config, clear),
        Commands::Config => cmd_config(&config),
    }
}

async fn cmd_replay(
    config: &Config,
    file: &Path,
    policy_path: Option<&Path>,
    assessment: Option<String>,
    endpoint: bool,
) -> anyhow::Result<()> {
    let policy = match policy_path {
        Some(path) => Policy::load(path).with_context(|| format!("loading policy {path:?}"))?,
        None => Policy::default(),
    };

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let sink = build_sink(config, endpoint)?;
    let store: Arc<dyn PendingStore> = Arc::new(FileSlot::in_dir(&config.pending_dir));

    let mut dispatcher =
        Dispatcher::new(Uuid::new_v4(), sink, store).with_timeout(config.sink_timeout);
    if let Some(id) = assessment {
        dispatcher = dispatcher.with_assessment(id);
    }

    let hook = SubmissionHook::new(|| println!(">>> Assessment auto-submitted"));
    let mut engine = Engine::new(
        Arc::new(policy),
        dispatcher,
        Arc::new(TracingNotifier),
        hook,
        0,
    );

    println!("Assessment Proctor v{VERSION}");
    println!("Replaying {}", file.display());
    println!();

    let reader = std::io::BufReader::new(
        std::fs::File::open(file).with_context(|| format!("opening {file:?}"))?,
    );

    let mut skipped = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let stamped: Stamped = match serde_json::from_str(&line) {
            Ok(stamped) => stamped,
            Err(e) => {
                eprintln!("Warning: skipping line {}: {e}", index + 1);
                skipped += 1;
                continue;
            }
        };

        if let Some(outcome) = engine.process(stamped) {
            println!(
                "[{:>8}ms] {:<20} {:<6} {}{}",
                outcome.event.timestamp(),
                outcome.event.suspicion().unwrap_or(outcome.event.kind().as_str()),
                outcome.event.severity(),
                if outcome.violation { "VIOLATION" } else { "" },
                match &outcome.escalation {
                    Some(e) => format!(" ({e:?})"),
                    None => String::new(),
                }
            );
        }
    }

    engine.settle().await;
    engine.disable();

    println!();
    println!("{}", engine.summary().render());
    if skipped > 0 {
        println!();
        println!("Skipped {skipped} unreadable line(s)");
    }
    Ok(())
}

#[cfg(feature = "http")]
fn build_sink(config: &Config, endpoint: bool) -> anyhow::Result<Arc<dyn RemoteSink>> {
    if endpoint {
        let sink = assessment_proctor::HttpSink::new(config.sink.clone(), config.sink_timeout)?;
        println!("Posting events to {}", config.sink.event_url());
        return Ok(Arc::new(sink));
    }
    Ok(Arc::new(LogSink))
}

#[cfg(not(feature = "http"))]
fn build_sink(_config: &Config, endpoint: bool) -> anyhow::Result<Arc<dyn RemoteSink>> {
    if endpoint {
        eprintln!("Warning: --endpoint flag ignored (http feature not enabled at compile time)");
    }
    Ok(Arc::new(LogSink))
}

fn cmd_policy() -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&Policy::default())?;
    println!("{json}");
    Ok(())
}

fn cmd_pending(config: &Config, clear: bool) -> anyhow::Result<()> {
    let slot = FileSlot::in_dir(&config.pending_dir);

    if clear {
        slot.clear().context("clearing pending events")?;
        println!("Cleared {}", slot.path().display());
        return Ok(());
    }

    match slot.load().context("reading pending events")? {
        Some(snapshot) => {
            println!("Pending events in {}", slot.path().display());
            println!("  Session:  {}", snapshot.session_id);
            println!("  Sequence: {}", snapshot.sequence);
            println!("  Saved at: {}", snapshot.saved_at);
            println!();
            println!("{}", serde_json::to_string_pretty(&snapshot.events)?);
        }
        None => println!("No pending events."),
    }
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Assessment Proctor Configuration");
    println!("================================");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("Event endpoint:     {}", config.sink.event_url());
    println!("Auto-save endpoint: {}", config.sink.autosave_url());
    println!("Sink timeout:       {}ms", config.sink_timeout.as_millis());
    println!("Viewport poll:      {}ms", config.viewport_poll_interval.as_millis());
    println!("Inactivity check:   {}ms", config.inactivity_check_interval.as_millis());
    println!("Notice duration:    {}ms", config.notice_duration.as_millis());
    println!("Auto-save quiet:    {}ms", config.autosave_quiet_period.as_millis());
    println!("Pending slot dir:   {:?}", config.pending_dir);
    println!();
    println!("Features:");
    println!(
        "  HTTP sink: {}",
        if cfg!(feature = "http") { "enabled" } else { "disabled" }
    );
    Ok(())
}
