//! Session capability surface consumed by the watcher core.
//!
//! A [`MailSession`] is one authenticated link to a remote mail server for one
//! mailbox: it can (re)connect, open a mailbox, fetch messages by sequence
//! number, and deliver server-pushed notifications as [`SessionEvent`]s.
//!
//! The crate ships a real implementation over async-imap
//! ([`ImapMailSession`](crate::imap::ImapMailSession)); the watcher itself only
//! ever sees this trait, which is what makes its state machine testable with
//! scripted in-memory sessions.

use std::future::Future;

use crate::error::Result;

/// Asynchronous notification delivered by the server for a watched mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The mailbox message count changed.
    CountChanged {
        /// Total number of messages now in the mailbox.
        count: u32,
    },

    /// The session ended: the server closed it, or the transport dropped.
    Closed,

    /// The session hit an error it cannot recover from on its own.
    Error {
        /// Human-readable detail for diagnostics.
        detail: String,
    },
}

/// A live, stateful connection to one mailbox on a remote mail server.
///
/// # Contract
///
/// - Exactly one watcher drives one session value; no method is ever called
///   concurrently with another.
/// - [`connect`](Self::connect) may be called again after a failure. The
///   implementation must discard any previous transport and establish a fresh
///   one; a session is never resumed.
/// - [`next_event`](Self::next_event) resolves with the next server
///   notification. After the session is closed or lost it must keep resolving
///   with [`SessionEvent::Closed`] rather than hanging.
/// - [`is_usable`](Self::is_usable) reports transport-level liveness only. It
///   is consulted before a reconnect: a usable session gets an explicit
///   [`close`](Self::close) first, so that the close surfaces as a single
///   `Closed` event instead of a second, parallel reconnect.
pub trait MailSession: Send {
    /// Establishes (or re-establishes) the connection and authenticates.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Opens a mailbox and returns its current message count.
    fn open_mailbox(
        &mut self,
        mailbox: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Fetches the raw content of one message by sequence number.
    fn fetch(&mut self, identifier: u32) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Returns `true` while the transport still looks alive.
    fn is_usable(&self) -> bool;

    /// Closes the session. Best effort: failures are logged, not returned.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Waits for the next server notification.
    fn next_event(&mut self) -> impl Future<Output = SessionEvent> + Send;
}
