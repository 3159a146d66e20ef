//! IMAP-backed [`MailSession`] implementation.
//!
//! Wraps an async-imap session behind the watcher's session capability
//! surface: connect is TLS + LOGIN, mailbox open is EXAMINE (read-only),
//! notifications come from IMAP IDLE, and fetches address messages by
//! sequence number.
//!
//! IDLE is re-issued whenever its window elapses without server data, so a
//! session parked on a quiet mailbox is not dropped by the server. Servers
//! that do not advertise the IDLE capability are rejected when the mailbox
//! is opened.

use async_imap::extensions::idle::IdleResponse;
use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::config::WatchConfig;
use crate::connection::{self, TlsStream};
use crate::error::{Error, Result};
use crate::session::{MailSession, SessionEvent};

/// Type alias for the IMAP session over TLS.
pub(crate) type ImapSession = async_imap::Session<TlsStream>;

/// A [`MailSession`] over async-imap with TLS and IDLE.
///
/// One value serves one watcher. Reconnecting replaces the whole transport:
/// [`connect`](MailSession::connect) discards any previous session and
/// builds a fresh one.
pub struct ImapMailSession {
    config: WatchConfig,
    session: Option<ImapSession>,
    mailbox: Option<String>,
}

impl ImapMailSession {
    /// Creates a disconnected session for the given account configuration.
    #[must_use]
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            session: None,
            mailbox: None,
        }
    }

    /// Re-EXAMINEs the opened mailbox and returns the fresh message count.
    async fn refresh_count(&mut self) -> Result<u32> {
        let mailbox = self.mailbox.clone().ok_or(Error::NotConnected)?;
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;

        let status = session
            .examine(&mailbox)
            .await
            .map_err(|source| Error::OpenMailbox { mailbox, source })?;

        Ok(status.exists)
    }
}

impl MailSession for ImapMailSession {
    #[instrument(
        name = "ImapMailSession::connect",
        skip_all,
        fields(
            account = %self.config.account(),
            imap_host = %self.config.effective_imap_host(),
            proxy_enabled = self.config.proxy.is_some()
        )
    )]
    async fn connect(&mut self) -> Result<()> {
        // Always a fresh transport; a half-dead session is never resumed.
        self.session = None;

        let imap_host = self.config.effective_imap_host();
        let target_addr = self.config.server_address();
        let timeouts = &self.config.timeouts;

        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::establish(&imap_host, &target_addr, self.config.proxy.as_ref()),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        let client = async_imap::Client::new(tls_stream);
        let account = self.config.account();

        let session = tokio::time::timeout(
            timeouts.login,
            client.login(account, self.config.password()),
        )
        .await
        .map_err(|_| Error::LoginTimeout {
            account: account.to_string(),
            timeout: timeouts.login,
        })?
        .map_err(|e| Error::Login {
            account: account.to_string(),
            source: e.0,
        })?;

        debug!("Authenticated");

        self.session = Some(session);
        Ok(())
    }

    #[instrument(
        name = "ImapMailSession::open_mailbox",
        skip(self),
        fields(mailbox = %mailbox, read_only)
    )]
    async fn open_mailbox(&mut self, mailbox: &str, read_only: bool) -> Result<u32> {
        let timeout = self.config.timeouts.open;
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;

        let capabilities = session
            .capabilities()
            .await
            .map_err(|source| Error::Capabilities { source })?;
        if !capabilities.has_str("IDLE") {
            return Err(Error::IdleUnsupported);
        }

        let status = tokio::time::timeout(timeout, async {
            if read_only {
                session.examine(mailbox).await
            } else {
                session.select(mailbox).await
            }
        })
        .await
        .map_err(|_| Error::OpenTimeout {
            mailbox: mailbox.to_string(),
            timeout,
        })?
        .map_err(|source| Error::OpenMailbox {
            mailbox: mailbox.to_string(),
            source,
        })?;

        self.mailbox = Some(mailbox.to_string());

        debug!(count = status.exists, "Mailbox opened");

        Ok(status.exists)
    }

    #[instrument(name = "ImapMailSession::fetch", skip(self), fields(identifier))]
    async fn fetch(&mut self, identifier: u32) -> Result<Vec<u8>> {
        let timeout = self.config.timeouts.fetch;
        let session = self.session.as_mut().ok_or(Error::NotConnected)?;
        let sequence = identifier.to_string();

        tokio::time::timeout(timeout, async {
            let mut stream = session
                .fetch(&sequence, "BODY[]")
                .await
                .map_err(|source| Error::Fetch { identifier, source })?;

            let mut body = None;
            while let Some(item) = stream.next().await {
                let fetched = item.map_err(|source| Error::Fetch { identifier, source })?;
                if let Some(bytes) = fetched.body() {
                    body = Some(bytes.to_vec());
                }
            }

            body.ok_or(Error::MissingBody { identifier })
        })
        .await
        .map_err(|_| Error::FetchTimeout {
            identifier,
            timeout,
        })?
    }

    fn is_usable(&self) -> bool {
        self.session.is_some()
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            let timeout = self.config.timeouts.logout;
            match tokio::time::timeout(timeout, session.logout()).await {
                Ok(Ok(())) => debug!("Logged out"),
                Ok(Err(error)) => debug!(%error, "Logout failed, dropping connection"),
                Err(_) => debug!("Logout timed out, dropping connection"),
            }
        }
    }

    async fn next_event(&mut self) -> SessionEvent {
        // A session we no longer hold can only report closure.
        let Some(mut session) = self.session.take() else {
            return SessionEvent::Closed;
        };

        loop {
            let mut idle = session.idle();
            if let Err(error) = idle.init().await {
                warn!(%error, "failed to enter IDLE");
                // The transport may still be fine; try to take the session back.
                return match idle.done().await {
                    Ok(recovered) => {
                        self.session = Some(recovered);
                        SessionEvent::Error {
                            detail: error.to_string(),
                        }
                    }
                    Err(done_error) => {
                        debug!(%done_error, "session not recoverable after IDLE failure");
                        SessionEvent::Error {
                            detail: error.to_string(),
                        }
                    }
                };
            }

            let (wait, _stop) = idle.wait_with_timeout(self.config.idle_timeout);
            let response = match wait.await {
                Ok(response) => response,
                Err(error) => {
                    warn!(%error, "IDLE wait failed");
                    return SessionEvent::Error {
                        detail: error.to_string(),
                    };
                }
            };

            session = match idle.done().await {
                Ok(session) => session,
                Err(error) => {
                    warn!(%error, "failed to leave IDLE");
                    return SessionEvent::Error {
                        detail: error.to_string(),
                    };
                }
            };

            match response {
                IdleResponse::Timeout | IdleResponse::ManualInterrupt => {
                    debug!("idle window elapsed, re-issuing IDLE");
                }
                IdleResponse::NewData(_) => {
                    debug!("server reported new data");
                    self.session = Some(session);
                    return match self.refresh_count().await {
                        Ok(count) => SessionEvent::CountChanged { count },
                        Err(error) => {
                            self.session = None;
                            SessionEvent::Error {
                                detail: error.to_string(),
                            }
                        }
                    };
                }
            }
        }
    }
}

impl std::fmt::Debug for ImapMailSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapMailSession")
            .field("account", &self.config.account())
            .field("imap_host", &self.config.effective_imap_host())
            .field("mailbox", &self.mailbox)
            .field("connected", &self.session.is_some())
            .finish()
    }
}
