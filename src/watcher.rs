//! Mailbox watching and reconnection.
//!
//! A [`MailboxWatcher`] owns one [`MailSession`] and runs the full
//! watch-and-reconnect lifecycle for one mailbox: it opens the mailbox
//! read-only, turns count-changed notifications into fetches of exactly the
//! new messages, and emits one [`NewMessage`] per fetched message on its
//! event channel. A closed or failed session feeds an idempotent reconnect
//! loop with a linearly escalating, capped delay.
//!
//! Each watcher runs on its own task and owns all of its mutable state
//! ([`RetryBudget`], the reconnect guard, the last known count), so no
//! locking is involved anywhere in this module: notification handling for
//! one watcher is serialized by construction.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::RetryPolicy;
use crate::error::Result;
use crate::parser::{self, ParsedMessage};
use crate::resolver::{self, CountSnapshot};
use crate::session::{MailSession, SessionEvent};

/// The logical mailbox a watcher serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailboxRole {
    /// Incoming mail.
    Inbox,
    /// Outgoing mail, to also observe messages the account sends.
    Sent,
}

impl MailboxRole {
    /// The IMAP mailbox name conventionally serving this role.
    #[must_use]
    pub fn default_mailbox(self) -> &'static str {
        match self {
            MailboxRole::Inbox => "INBOX",
            MailboxRole::Sent => "Sent",
        }
    }

    /// Lowercase tag used in logs and events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MailboxRole::Inbox => "inbox",
            MailboxRole::Sent => "sent",
        }
    }
}

impl std::fmt::Display for MailboxRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection lifecycle state of one watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection yet.
    Disconnected,
    /// A connect plus mailbox-open attempt is in flight.
    Connecting,
    /// Session is live and the watcher is dispatching notifications.
    Connected,
    /// The session was lost; the reconnect loop is waiting or retrying.
    Reconnecting,
}

/// Escalating reconnect delay, owned by exactly one watcher.
///
/// The delay grows linearly by the policy's increment after every failed
/// attempt and never exceeds the ceiling. A fully successful reconnect
/// forgives all prior backoff.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    delay: Duration,
}

impl RetryBudget {
    /// Creates a budget at the policy's initial delay.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            delay: policy.initial,
            policy,
        }
    }

    /// Returns the delay to wait now and escalates the one for the next
    /// attempt.
    pub fn advance(&mut self) -> Duration {
        let current = self.delay;
        self.delay = current
            .saturating_add(self.policy.increment)
            .min(self.policy.ceiling);
        current
    }

    /// Peeks the delay the next attempt would wait.
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.delay
    }

    /// Resets the delay to the policy's initial value.
    pub fn reset(&mut self) {
        self.delay = self.policy.initial;
    }
}

/// A newly observed message, emitted once per identifier in a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Role of the mailbox the message appeared in.
    pub role: MailboxRole,
    /// Sequence number of the message at the time of the fetch.
    ///
    /// Sequence numbers are transient: they are not stable across
    /// reconnects and must not be used as a durable key.
    pub identifier: u32,
    /// The decoded message.
    pub message: ParsedMessage,
}

/// Watches one mailbox over one session for the process lifetime.
///
/// Construct one per (account, mailbox) pair and hand it to
/// [`run`](Self::run) on its own task. The watcher never terminates on its
/// own: every failure is absorbed by the reconnect loop. It only stops when
/// the receiving side of its event channel is dropped.
pub struct MailboxWatcher<S> {
    role: MailboxRole,
    mailbox: String,
    session: S,
    state: ConnectionState,
    retry: RetryBudget,
    reconnecting: bool,
    last_count: u32,
    events: mpsc::Sender<NewMessage>,
}

impl<S: MailSession> MailboxWatcher<S> {
    /// Creates a watcher for one mailbox.
    #[must_use]
    pub fn new(
        role: MailboxRole,
        mailbox: impl Into<String>,
        session: S,
        retry: RetryPolicy,
        events: mpsc::Sender<NewMessage>,
    ) -> Self {
        Self {
            role,
            mailbox: mailbox.into(),
            session,
            state: ConnectionState::Disconnected,
            retry: RetryBudget::new(retry),
            reconnecting: false,
            last_count: 0,
            events,
        }
    }

    /// Returns the watcher's role.
    #[must_use]
    pub fn role(&self) -> MailboxRole {
        self.role
    }

    /// Returns the watcher's current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Runs the watch loop for the process lifetime.
    ///
    /// Returns only when the event receiver is dropped, which signals that
    /// the downstream consumer is gone.
    #[instrument(
        name = "MailboxWatcher::run",
        skip(self),
        fields(role = %self.role, mailbox = %self.mailbox)
    )]
    pub async fn run(mut self) {
        if let Err(error) = self.start().await {
            warn!(%error, "initial connection failed");
            self.reconnect().await;
        }

        loop {
            match self.session.next_event().await {
                SessionEvent::CountChanged { count } => {
                    if self.handle_count_changed(count).await.is_break() {
                        break;
                    }
                }
                SessionEvent::Closed => {
                    info!("session closed");
                    self.reconnect().await;
                }
                SessionEvent::Error { detail } => {
                    warn!(detail = %detail, "session error");
                    self.reconnect().await;
                }
            }
        }

        debug!("event consumer dropped, watcher stopping");
    }

    /// Connects, opens the mailbox read-only and records the baseline count.
    async fn start(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;
        self.session.connect().await?;
        let count = self.session.open_mailbox(&self.mailbox, true).await?;
        self.last_count = count;
        self.state = ConnectionState::Connected;
        info!(role = %self.role, mailbox = %self.mailbox, count, "watching mailbox");
        Ok(())
    }

    /// Fetches and emits every message the count change makes new.
    ///
    /// Breaks only when the event receiver is gone. A fetch or parse failure
    /// for one identifier skips that message and continues the batch.
    async fn handle_count_changed(&mut self, current: u32) -> ControlFlow<()> {
        let snapshot = CountSnapshot::new(self.last_count, current);
        if current < self.last_count {
            debug!(
                role = %self.role,
                previous = self.last_count,
                current,
                "count regressed, treating as no new messages"
            );
        }

        for identifier in resolver::new_identifiers(snapshot) {
            let raw = match self.session.fetch(identifier).await {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(role = %self.role, identifier, %error, "fetch failed, skipping message");
                    continue;
                }
            };

            let message = match parser::parse_message(&raw) {
                Ok(message) => message,
                Err(error) => {
                    warn!(role = %self.role, identifier, %error, "parse failed, skipping message");
                    continue;
                }
            };

            debug!(
                role = %self.role,
                identifier,
                subject = %message.subject,
                "new message"
            );

            let event = NewMessage {
                role: self.role,
                identifier,
                message,
            };
            if self.events.send(event).await.is_err() {
                return ControlFlow::Break(());
            }
        }

        self.last_count = current;
        ControlFlow::Continue(())
    }

    /// Drives the reconnect state machine until the session is healthy again.
    ///
    /// Idempotent: a call while a reconnect sequence is already in flight is
    /// a no-op. A session that still looks usable is closed instead, so that
    /// the resulting `Closed` notification triggers the single real
    /// reconnect.
    async fn reconnect(&mut self) {
        if self.reconnecting {
            return;
        }

        if self.session.is_usable() {
            debug!(role = %self.role, "session still usable, closing it first");
            self.session.close().await;
            return;
        }

        self.reconnecting = true;
        self.state = ConnectionState::Reconnecting;

        loop {
            let delay = self.retry.advance();
            if !delay.is_zero() {
                debug!(
                    role = %self.role,
                    delay_secs = delay.as_secs(),
                    "waiting before reconnect attempt"
                );
                tokio::time::sleep(delay).await;
            }

            match self.start().await {
                Ok(()) => {
                    self.reconnecting = false;
                    self.retry.reset();
                    return;
                }
                Err(error) => {
                    self.state = ConnectionState::Reconnecting;
                    warn!(
                        role = %self.role,
                        %error,
                        next_delay_secs = self.retry.peek().as_secs(),
                        "reconnect attempt failed"
                    );
                }
            }
        }
    }
}
