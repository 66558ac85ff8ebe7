//! wsc-copilot - run one workflow-backed wizard step from the command line
//!
//! Triggers the webhook configured for `--kind`, polls the mailbox for the
//! result and prints the delivered envelope as JSON on stdout.
//!
//! Exit codes: 0 result delivered, 2 fallback (workflow not started),
//! 3 timed out, 4 polling errored, 130 cancelled.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wsc_common::config::{load_toml_or_default, resolve_config_path};
use wsc_common::{CallbackKind, SessionId};
use wsc_copilot::config::{Config, ConfigOverrides, TomlConfig, MODULE_NAME};
use wsc_copilot::{build_copilot, CopilotOutcome, PollPolicy, PollState};

/// Command-line arguments for wsc-copilot
#[derive(Parser, Debug)]
#[command(name = "wsc-copilot")]
#[command(about = "Trigger a writer workflow and wait for its callback")]
#[command(version)]
struct Args {
    /// Workflow kind: content, example, generation or assistant
    #[arg(short, long)]
    kind: CallbackKind,

    /// JSON object of kind-specific fields sent with the job
    #[arg(long, default_value = "{}")]
    context: String,

    /// Skip the trigger and poll an existing session instead
    #[arg(long)]
    resume: Option<String>,

    /// TOML config file (defaults to <config_dir>/writer-suite/copilot.toml)
    #[arg(short, long, env = "WSC_CONFIG")]
    config: Option<PathBuf>,

    /// Webhook URL for this kind, overriding the config file
    #[arg(long, env = "WSC_WEBHOOK_URL")]
    webhook: Option<String>,

    /// Mailbox service base URL
    #[arg(long, env = "WSC_MAILBOX_URL")]
    mailbox_url: Option<String>,

    /// Base URL the workflow calls back to
    #[arg(long, env = "WSC_CALLBACK_BASE_URL")]
    callback_base_url: Option<String>,

    /// Milliseconds between poll attempts
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Poll attempts before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "WSC_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), MODULE_NAME);
    let (toml_config, config_source) =
        load_toml_or_default::<TomlConfig>(config_path.as_deref())?;

    let config = Config::resolve(
        toml_config,
        ConfigOverrides {
            mailbox_url: args.mailbox_url,
            callback_base_url: args.callback_base_url,
            webhook: args.webhook.map(|url| (args.kind, url)),
            interval_ms: args.interval_ms,
            max_attempts: args.max_attempts,
            log_level: args.log_level,
        },
    )?;

    // Logs go to stderr; stdout carries only the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("wsc_copilot={0},wsc_common={0}", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting Writer Suite copilot (wsc-copilot) v{}",
        env!("CARGO_PKG_VERSION")
    );
    config_source.log();
    info!(
        interval_ms = config.poll.interval.as_millis() as u64,
        max_attempts = config.poll.max_attempts,
        max_wait_secs = config.poll.ceiling().as_secs(),
        "Poll policy"
    );

    let context = parse_context(&args.context)?;
    let copilot = build_copilot(&config).context("Failed to build HTTP client")?;

    let mut states = copilot.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            if let PollState::Polling { attempt } = state {
                info!(attempt, "Waiting for workflow result");
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling");
            ctrl_c_cancel.cancel();
        }
    });

    let outcome = match args.resume {
        Some(raw) => {
            let session_id = SessionId::parse(&raw)?;
            copilot.retry_poll(args.kind, &session_id, &cancel).await?
        }
        None => copilot.request(args.kind, &context, &cancel).await?,
    };

    report(outcome, config.poll)
}

fn parse_context(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--context is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("--context must be a JSON object"),
    }
}

fn report(outcome: CopilotOutcome, policy: PollPolicy) -> Result<ExitCode> {
    let code = match outcome {
        CopilotOutcome::Ai { envelope, .. } => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            0
        }
        CopilotOutcome::Fallback { reason } => {
            warn!("Workflow unavailable, continue without AI: {}", reason);
            2
        }
        CopilotOutcome::TimedOut {
            session_id,
            attempts,
        } => {
            warn!(
                attempts,
                "No result after {}s; retry with --resume {}",
                policy.ceiling().as_secs(),
                session_id
            );
            3
        }
        CopilotOutcome::Errored { session_id, reason } => {
            warn!("Polling failed: {}; retry with --resume {}", reason, session_id);
            4
        }
        CopilotOutcome::Cancelled { .. } => 130,
    };
    Ok(ExitCode::from(code))
}
