//! Command-line interface definitions for Radar Portos.
//!
//! Every knob is also reachable through an environment variable (the names
//! match what the monitor's cron job historically exported), so the binary
//! runs unmodified under CI schedulers that only pass env.

use clap::Parser;

/// Command-line arguments for the Radar Portos monitor.
///
/// Credentials and recipients are optional at parse time so that
/// `--dry-run` works without a mail account; `main` enforces their
/// presence before a real send.
///
/// # Examples
///
/// ```sh
/// # Normal scheduled run (secrets from the environment)
/// GMAIL_USER=bot@example.com GMAIL_APP_PASS=... EMAIL_TO_PORTOS=team@example.com radar_portos
///
/// # Print the digest instead of emailing it
/// radar_portos --dry-run --window-days 7
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML file listing monitored sources
    #[arg(short, long, env = "SOURCES_PORTOS", default_value = "sources_portos.yml")]
    pub sources: String,

    /// Recency window in days; items older than this are dropped
    #[arg(
        short = 'd',
        long,
        env = "DAYS_PORTO",
        default_value_t = 2,
        value_parser = clap::value_parser!(i64).range(0..)
    )]
    pub window_days: i64,

    /// Per-request fetch timeout, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Sender account (also the SMTP login)
    #[arg(long, env = "GMAIL_USER")]
    pub smtp_user: Option<String>,

    /// Application credential for the sender account
    #[arg(long, env = "GMAIL_APP_PASS", hide_env_values = true)]
    pub smtp_pass: Option<String>,

    /// Recipient addresses, comma-separated
    #[arg(long, env = "EMAIL_TO_PORTOS")]
    pub email_to: Option<String>,

    /// Email subject; defaults to one naming the window size
    #[arg(long, env = "EMAIL_SUBJECT_PORTOS")]
    pub subject: Option<String>,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// Render the digest to stdout instead of sending email
    #[arg(long)]
    pub dry_run: bool,
}
