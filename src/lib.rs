//! # mail-watch
//!
//! Async IMAP mailbox watcher: detects newly arrived (or newly sent) messages
//! as they appear and emits each one exactly once per live session, with
//! automatic reconnection.
//!
//! This crate provides:
//! - One [`MailboxWatcher`] per watched mailbox, each running its own
//!   watch-and-reconnect lifecycle on its own task
//! - Server-pushed notifications via IMAP IDLE, translated into fetches of
//!   exactly the new messages, emitted in ascending order
//! - An idempotent reconnect state machine with linear, capped backoff that
//!   retries forever rather than crashing
//! - A [`WatcherGroup`] to run several mailboxes concurrently and
//!   independently
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed
//!   tracing. Without this feature, tracing spans are still emitted but
//!   require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mail_watch::{MailboxRole, WatchConfig, WatcherGroup};
//!
//! # async fn example() -> mail_watch::Result<()> {
//! // Configure the account and the mailboxes to watch
//! let config = WatchConfig::builder()
//!     .account("user@gmail.com")
//!     .password("app-password")  // Use app-specific password for Gmail
//!     .watch(MailboxRole::Inbox)
//!     .watch_as(MailboxRole::Sent, "[Gmail]/Sent Mail")
//!     .build()?;
//!
//! // One watcher per mailbox, each on its own task
//! let mut group = WatcherGroup::spawn(&config);
//!
//! // New messages from all watchers arrive on one channel
//! while let Some(event) = group.next_message().await {
//!     println!("[{}] {}", event.role, event.message.subject);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom session backends
//!
//! The watcher core is generic over the [`MailSession`] trait. The shipped
//! backend is [`ImapMailSession`]; tests (and exotic deployments) can drive a
//! [`MailboxWatcher`] with any other implementation, which is how the
//! reconnect state machine is exercised deterministically in this crate's own
//! test suite.
//!
//! ## Delivery semantics
//!
//! Within one watcher, messages are emitted in ascending sequence-number
//! order; fetching is sequential by design. Across watchers there is no
//! ordering guarantee. Identifiers are transient sequence positions: they are
//! not stable across reconnects, and a server re-reporting overlapping counts
//! after a reconnect can cause a message to be emitted again. Exactly-once
//! delivery across process restarts would need a durable cursor, which is out
//! of scope here.
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. Use
//! [`Error::is_retryable`] to determine if an operation can be retried:
//!
//! ```
//! use mail_watch::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("Transient error, can retry: {error}");
//!     } else {
//!         println!("Permanent error: {error}");
//!     }
//! }
//! ```
//!
//! The watchers themselves never give up: every connection or mailbox-open
//! failure feeds their reconnect loop, and a single message that fails to
//! fetch or parse is logged and skipped without aborting the rest of its
//! batch.
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All major operations emit
//! spans with structured fields suitable for distributed tracing.
//!
//! ### Span Naming Convention
//!
//! - `MailboxWatcher::run` - One watcher's whole lifecycle
//! - `ImapMailSession::connect` - Connection and login
//! - `ImapMailSession::open_mailbox` - Mailbox open
//! - `ImapMailSession::fetch` - Single message fetch
//! - `connection::establish` - TLS connection
//!
//! ### Standard Fields
//!
//! - `account` - Account address (masked in production)
//! - `imap_host` - IMAP server hostname
//! - `role` / `mailbox` - Which watcher a span belongs to
//! - `identifier` - Message sequence number
//!
//! Enable the `observability` feature for OpenTelemetry integration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod group;
pub mod imap;
pub mod known_servers;
pub mod parser;
pub mod proxy;
pub mod resolver;
pub mod session;
pub mod watcher;

// Internal modules
mod connection;

// Re-exports for ergonomic API
pub use config::{RetryPolicy, TimeoutConfig, WatchConfig, WatchConfigBuilder, WatchedMailbox};
pub use email_address::EmailAddress;
pub use error::{Error, ErrorCategory, Result};
pub use group::WatcherGroup;
pub use imap::ImapMailSession;
pub use known_servers::ServerRegistry;
pub use parser::ParsedMessage;
pub use proxy::{ProxyAuth, Socks5Proxy};
pub use resolver::CountSnapshot;
pub use session::{MailSession, SessionEvent};
pub use watcher::{ConnectionState, MailboxRole, MailboxWatcher, NewMessage, RetryBudget};
