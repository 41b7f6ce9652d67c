//! # Radar Portos
//!
//! A news monitor for Brazilian port authorities and regulators. Each run
//! scrapes the configured listing pages, keeps the items published inside
//! the recency window, groups them by source and emails a plain-text +
//! HTML digest.
//!
//! ## Usage
//!
//! ```sh
//! GMAIL_USER=bot@example.com GMAIL_APP_PASS=... EMAIL_TO_PORTOS=team@example.com radar_portos
//! ```
//!
//! ## Architecture
//!
//! One sequential pipeline, no state between runs:
//! 1. **Load**: read and validate the YAML source definitions
//! 2. **Collect**: per source, fetch the listing page and extract items
//!    (a failed fetch becomes a visible error item, the run continues)
//! 3. **Filter**: keep items dated inside the window, or undated
//! 4. **Render**: group by source and build both digest bodies
//! 5. **Notify**: send the digest over SMTP (failure here fails the run)

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dates;
mod digest;
mod extract;
mod fetch;
mod mailer;
mod models;

use cli::Cli;
use mailer::MailSettings;
use models::NewsItem;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("radar_portos starting up");

    let args = Cli::parse();
    debug!(?args.sources, args.window_days, args.dry_run, "Parsed CLI arguments");

    // Configuration problems abort before any network activity.
    let sources = config::load_sources(&args.sources).map_err(|e| {
        error!(error = %e, "Cannot load sources; aborting");
        e
    })?;

    // Same for missing mail credentials, unless this is a dry run.
    let mail = if args.dry_run {
        None
    } else {
        Some(mail_settings(&args)?)
    };

    let client = fetch::build_client(args.timeout_secs)?;
    let today = Local::now().date_naive();

    // ---- Collect, sequentially, one source at a time ----
    let mut all_items: Vec<NewsItem> = Vec::new();
    for source in &sources {
        match fetch::fetch_page(&client, &source.url).await {
            Ok(body) => {
                let raw = extract::extract_items(&body, source);
                let extracted = raw.len();
                let recent = extract::filter_recent(raw, source, args.window_days, today);
                info!(
                    source = %source.id,
                    extracted,
                    kept = recent.len(),
                    "Source processed"
                );
                all_items.extend(recent);
            }
            Err(e) => {
                warn!(source = %source.id, url = %source.url, error = %e, "Fetch failed; keeping an error item in the digest");
                all_items.push(NewsItem::fetch_error(source, &e));
            }
        }
    }
    info!(count = all_items.len(), "Total items in the digest");

    // ---- Render ----
    let groups = digest::group_by_source(all_items);
    let text_body = digest::render_text(&groups, args.window_days);
    let html_body = digest::render_html(&groups, args.window_days);
    let subject = args
        .subject
        .clone()
        .unwrap_or_else(|| format!("🚢 Radar Portos — últimas {} dias", args.window_days));

    // ---- Notify ----
    match mail {
        None => {
            info!("Dry run; printing the digest instead of sending");
            println!("{text_body}");
        }
        Some(settings) => {
            mailer::send_digest(&settings, &subject, &text_body, &html_body)
                .await
                .map_err(|e| {
                    error!(error = %e, "Digest send failed");
                    e
                })?;
            println!("✅ Radar Portos enviado com sucesso.");
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}

/// Assemble mail settings from CLI/env, failing with a clear diagnostic
/// when a required secret is absent.
fn mail_settings(args: &Cli) -> Result<MailSettings, Box<dyn Error>> {
    let user = args
        .smtp_user
        .clone()
        .ok_or("sender account not set (GMAIL_USER or --smtp-user)")?;
    let password = args
        .smtp_pass
        .clone()
        .ok_or("sender credential not set (GMAIL_APP_PASS or --smtp-pass)")?;
    let to = args
        .email_to
        .clone()
        .ok_or("recipients not set (EMAIL_TO_PORTOS or --email-to)")?;
    Ok(MailSettings {
        host: args.smtp_host.clone(),
        user,
        password,
        to,
    })
}
