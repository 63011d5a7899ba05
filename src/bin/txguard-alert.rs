//! txguard-alert - send a manual alert through the configured channels
//!
//! Channel credentials come from the environment: `SMTP_*` for email,
//! `SLACK_WEBHOOK_URL` for chat, `TWILIO_*` and `ALERT_PHONE_NUMBER` for SMS,
//! and `WEBHOOK_URL` for the generic webhook. `TXGUARD_CHANNEL_TIMEOUT_SECS`
//! bounds each delivery. Outcomes are printed as JSON, one object per routed
//! channel.

use anyhow::{Context, Result};
use clap::Parser;
use txguard::{init_tracing, Alert, AlertDispatcher, GuardConfig, Severity};

#[derive(Parser)]
#[command(name = "txguard-alert")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Send an alert through the configured notification channels")]
struct Cli {
    /// Alert severity (INFO, WARNING, CRITICAL)
    #[arg(short, long, default_value = "CRITICAL")]
    severity: Severity,

    /// Alert subject line
    #[arg(long)]
    subject: String,

    /// Alert body
    #[arg(short, long)]
    message: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = GuardConfig::from_env().context("Failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    let dispatcher =
        AlertDispatcher::from_config(&config).context("Failed to build alert dispatcher")?;

    let alert = Alert::new(cli.subject, cli.message, cli.severity);
    let outcomes = dispatcher.dispatch_alert(&alert).await;

    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    if !outcomes.iter().any(|o| o.succeeded) {
        anyhow::bail!("no channel accepted the alert");
    }
    Ok(())
}
