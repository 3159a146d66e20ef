//! Running one watcher per mailbox, concurrently and independently.
//!
//! The group is plain orchestration: it builds an IMAP-backed
//! [`MailboxWatcher`] for every configured mailbox, spawns each on its own
//! tokio task and fans their [`NewMessage`] events into a single channel.
//! Watchers share nothing — each runs its own session and its own reconnect
//! lifecycle, so one mailbox stuck at the backoff ceiling never delays
//! another.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::WatchConfig;
use crate::imap::ImapMailSession;
use crate::watcher::{MailboxWatcher, NewMessage};

/// Capacity of the fan-in event channel shared by all watchers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A set of independently running mailbox watchers for one account.
///
/// # Example
///
/// ```no_run
/// use mail_watch::{MailboxRole, WatchConfig, WatcherGroup};
///
/// # async fn example() -> mail_watch::Result<()> {
/// let config = WatchConfig::builder()
///     .account("user@example.com")
///     .password("app-password")
///     .watch(MailboxRole::Inbox)
///     .watch(MailboxRole::Sent)
///     .build()?;
///
/// let mut group = WatcherGroup::spawn(&config);
/// while let Some(event) = group.next_message().await {
///     println!("[{}] #{}: {}", event.role, event.identifier, event.message.subject);
/// }
/// # Ok(())
/// # }
/// ```
pub struct WatcherGroup {
    events: mpsc::Receiver<NewMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl WatcherGroup {
    /// Spawns one watcher per configured mailbox.
    ///
    /// Each watcher connects, reconnects and dispatches on its own task; the
    /// call itself does not wait for any connection to come up.
    #[must_use]
    pub fn spawn(config: &WatchConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut tasks = Vec::with_capacity(config.mailboxes.len());
        for watched in &config.mailboxes {
            let session = ImapMailSession::new(config.clone());
            let watcher = MailboxWatcher::new(
                watched.role,
                watched.name.clone(),
                session,
                config.retry.clone(),
                event_tx.clone(),
            );
            tasks.push(tokio::spawn(watcher.run()));
        }

        info!(
            account = %config.account(),
            watchers = tasks.len(),
            "watcher group started"
        );

        Self {
            events: event_rx,
            tasks,
        }
    }

    /// Receives the next new message from any watcher.
    ///
    /// Watchers run for the process lifetime, so in practice this only
    /// returns `None` once the group has been shut down.
    pub async fn next_message(&mut self) -> Option<NewMessage> {
        self.events.recv().await
    }

    /// Number of watcher tasks in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the group has no watchers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for WatcherGroup {
    fn drop(&mut self) {
        // Sessions are dropped abruptly; there is no graceful drain.
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for WatcherGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherGroup")
            .field("watchers", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
