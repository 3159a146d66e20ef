//! Example: Watch the inbox and the sent folder, print every new message.
//!
//! Required environment variables:
//! - `MAIL_WATCH_ACCOUNT` - Account address
//! - `MAIL_WATCH_PASSWORD` - Password (use an app-specific password for Gmail)
//!
//! Run with:
//! ```bash
//! cargo run --example watch_inbox
//! ```

use std::env;

use mail_watch::{MailboxRole, WatchConfig, WatcherGroup};

#[tokio::main]
async fn main() -> mail_watch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mail_watch=info")),
        )
        .init();

    let account = env::var("MAIL_WATCH_ACCOUNT").expect("MAIL_WATCH_ACCOUNT must be set");
    let password = env::var("MAIL_WATCH_PASSWORD").expect("MAIL_WATCH_PASSWORD must be set");

    let config = WatchConfig::builder()
        .account(account)
        .password(password)
        .watch(MailboxRole::Inbox)
        .watch(MailboxRole::Sent)
        .build()?;

    println!("Watching {} - press Ctrl+C to stop.\n", config.account());

    let mut group = WatcherGroup::spawn(&config);

    while let Some(event) = group.next_message().await {
        println!("────────────────────────────────────────");
        println!("[{}] message #{}", event.role, event.identifier);
        if let Some(from) = &event.message.from {
            println!("From:    {from}");
        }
        if let Some(date) = &event.message.date {
            println!("Date:    {date}");
        }
        println!("Subject: {}", event.message.subject);

        let body = event.message.body.trim();
        let preview: String = body.chars().take(200).collect();
        println!("\n{preview}");
        if body.chars().count() > 200 {
            println!("...");
        }
        println!();
    }

    Ok(())
}
