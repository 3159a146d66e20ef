//! Example: Using tracing for observability.
//!
//! This example demonstrates how to enable structured logging using
//! the `tracing` ecosystem. All major operations in mail-watch emit
//! tracing spans and events.
//!
//! # Usage
//!
//! ```bash
//! export MAIL_WATCH_ACCOUNT="your@email.com"
//! export MAIL_WATCH_PASSWORD="your-app-password"
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=mail_watch=debug
//!
//! cargo run --example with_tracing
//! ```

use std::env;

use mail_watch::{MailboxRole, WatchConfig, WatcherGroup};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> mail_watch::Result<()> {
    // Initialize tracing subscriber with environment filter
    // Use RUST_LOG environment variable to control log levels
    // Example: RUST_LOG=mail_watch=debug,info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mail_watch=info")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .init();

    let account = env::var("MAIL_WATCH_ACCOUNT").expect("MAIL_WATCH_ACCOUNT must be set");
    let password = env::var("MAIL_WATCH_PASSWORD").expect("MAIL_WATCH_PASSWORD must be set");

    let config = WatchConfig::builder()
        .account(account)
        .password(password)
        .watch(MailboxRole::Inbox)
        .build()?;

    tracing::info!(account = %config.account(), "starting watcher group");

    let mut group = WatcherGroup::spawn(&config);

    while let Some(event) = group.next_message().await {
        tracing::info!(
            role = %event.role,
            identifier = event.identifier,
            subject = %event.message.subject,
            "new message"
        );
    }

    Ok(())
}
