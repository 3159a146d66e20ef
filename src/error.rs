//! Error types for the mail-watch crate.
//!
//! All errors implement [`std::error::Error`] and provide context about what went wrong.
//! Errors are categorized by their retryability - see [`Error::is_retryable`].
//!
//! Note that a watcher never gives up: every failure while connecting or opening a
//! mailbox feeds its reconnect loop regardless of classification. The classification
//! exists for logging and for callers driving sessions directly.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while watching a mailbox.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid account address format.
    #[error("invalid account address: {account}")]
    InvalidAccount {
        /// The invalid account address.
        account: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid DNS name for TLS.
    #[error("invalid DNS name for host '{host}'")]
    InvalidDnsName {
        /// The invalid hostname.
        host: String,
        /// The underlying DNS name error.
        #[source]
        source: rustls::client::InvalidDnsNameError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Network / connection errors (RETRYABLE - drive the reconnect loop)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to establish TCP connection.
    #[error("failed to connect to {target}")]
    TcpConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to establish TLS connection.
    #[error("failed to establish TLS connection to {target}")]
    TlsConnect {
        /// The target address that failed.
        target: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to connect via SOCKS5 proxy.
    #[error("failed to connect via SOCKS5 proxy {proxy_host} to {target}")]
    Socks5Connect {
        /// The SOCKS5 proxy hostname.
        proxy_host: String,
        /// The target address.
        target: String,
        /// The underlying SOCKS5 error.
        #[source]
        source: tokio_socks::Error,
    },

    /// An operation was attempted on a session with no live transport.
    #[error("session is not connected")]
    NotConnected,

    // ─────────────────────────────────────────────────────────────────────────
    // Timeout errors (RETRYABLE)
    // ─────────────────────────────────────────────────────────────────────────
    /// Connection timeout.
    #[error("connection timeout to {target} after {timeout:?}")]
    ConnectTimeout {
        /// The target address.
        target: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Login timeout.
    #[error("login timeout for {account} after {timeout:?}")]
    LoginTimeout {
        /// The account used for authentication.
        account: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Mailbox open timeout.
    #[error("mailbox open timeout for '{mailbox}' after {timeout:?}")]
    OpenTimeout {
        /// The mailbox name.
        mailbox: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Message fetch timeout.
    #[error("fetch timeout for message {identifier} after {timeout:?}")]
    FetchTimeout {
        /// The sequence number being fetched.
        identifier: u32,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // IMAP protocol errors (RETRYABLE - could be transient server issues)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP login failed.
    #[error("IMAP login failed for {account}")]
    Login {
        /// The account used for login.
        account: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to open a mailbox.
    #[error("failed to open mailbox '{mailbox}'")]
    OpenMailbox {
        /// The mailbox name.
        mailbox: String,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Failed to query server capabilities.
    #[error("failed to query IMAP capabilities")]
    Capabilities {
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// The server does not advertise the IDLE capability.
    #[error("IMAP server does not advertise IDLE capability")]
    IdleUnsupported,

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch errors (single-message scope: the watcher skips the message)
    // ─────────────────────────────────────────────────────────────────────────
    /// IMAP fetch failed.
    #[error("IMAP fetch failed for message {identifier}")]
    Fetch {
        /// The sequence number that failed.
        identifier: u32,
        /// The underlying IMAP error.
        #[source]
        source: async_imap::error::Error,
    },

    /// Fetch succeeded but the response carried no message body.
    #[error("no body returned for message {identifier}")]
    MissingBody {
        /// The sequence number that came back empty.
        identifier: u32,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Parsing errors (NOT retryable - malformed content won't change)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse a message.
    #[error("failed to parse message")]
    ParseMessage {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    /// Failed to extract the message body text.
    #[error("failed to extract message body")]
    ExtractBody {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            // RETRYABLE errors: network, timeouts, IMAP operations
            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::Socks5Connect { .. }
            | Error::NotConnected
            | Error::ConnectTimeout { .. }
            | Error::LoginTimeout { .. }
            | Error::OpenTimeout { .. }
            | Error::FetchTimeout { .. }
            | Error::Login { .. }
            | Error::OpenMailbox { .. }
            | Error::Capabilities { .. }
            | Error::Fetch { .. } => true,

            // NOT retryable: config errors, missing capability, parsing,
            // a message body that never existed
            Error::InvalidAccount { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. }
            | Error::IdleUnsupported
            | Error::MissingBody { .. }
            | Error::ParseMessage { .. }
            | Error::ExtractBody { .. } => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidAccount { .. }
            | Error::InvalidConfig { .. }
            | Error::InvalidDnsName { .. } => ErrorCategory::Configuration,

            Error::TcpConnect { .. }
            | Error::TlsConnect { .. }
            | Error::Socks5Connect { .. }
            | Error::NotConnected => ErrorCategory::Network,

            Error::ConnectTimeout { .. }
            | Error::LoginTimeout { .. }
            | Error::OpenTimeout { .. }
            | Error::FetchTimeout { .. } => ErrorCategory::Timeout,

            Error::Login { .. }
            | Error::OpenMailbox { .. }
            | Error::Capabilities { .. }
            | Error::IdleUnsupported => ErrorCategory::Protocol,

            Error::Fetch { .. } | Error::MissingBody { .. } => ErrorCategory::Fetch,

            Error::ParseMessage { .. } | Error::ExtractBody { .. } => ErrorCategory::Parse,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Network connectivity errors.
    Network,
    /// Timeout errors.
    Timeout,
    /// IMAP protocol errors.
    Protocol,
    /// Single-message fetch errors.
    Fetch,
    /// Message parsing errors.
    Parse,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Fetch => write!(f, "fetch"),
            ErrorCategory::Parse => write!(f, "parse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        // Configuration errors are not retryable
        let err = Error::InvalidAccount {
            account: "bad".into(),
        };
        assert!(!err.is_retryable());

        // Network errors are retryable
        let err = Error::TcpConnect {
            target: "imap.example.com:993".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.is_retryable());

        // A missing IDLE capability won't appear on retry
        assert!(!Error::IdleUnsupported.is_retryable());

        // A body the server never returned won't appear on retry either
        let err = Error::MissingBody { identifier: 7 };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidAccount {
            account: "bad".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = Error::ConnectTimeout {
            target: "imap.example.com:993".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.category(), ErrorCategory::Timeout);

        assert_eq!(Error::NotConnected.category(), ErrorCategory::Network);
        assert_eq!(
            Error::MissingBody { identifier: 3 }.category(),
            ErrorCategory::Fetch
        );
    }
}
