//! Configuration for watched accounts.
//!
//! Use [`WatchConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use mail_watch::{MailboxRole, WatchConfig};
//!
//! let config = WatchConfig::builder()
//!     .account("user@example.com")
//!     .password("app-password")
//!     .watch(MailboxRole::Inbox)
//!     .watch(MailboxRole::Sent)
//!     .build()
//!     .expect("valid config");
//! ```

use std::time::Duration;

use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Error, Result};
use crate::known_servers::ServerRegistry;
use crate::proxy::Socks5Proxy;
use crate::watcher::MailboxRole;

/// Configuration for connecting to an IMAP server and watching its mailboxes.
///
/// Create using [`WatchConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials. The `account` field is stored
/// as a validated [`EmailAddress`] type.
#[derive(Clone)]
pub struct WatchConfig {
    /// Account address (used for login and IMAP server discovery).
    account: EmailAddress,
    /// Account password or app-specific password (protected from accidental logging).
    password: SecretString,
    /// IMAP server hostname (auto-discovered from the account domain if not set).
    pub imap_host: Option<String>,
    /// IMAP server port (default: 993 for IMAPS).
    pub imap_port: u16,
    /// Optional SOCKS5 proxy for the connection.
    pub proxy: Option<Socks5Proxy>,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Reconnect backoff policy, applied per watcher.
    pub retry: RetryPolicy,
    /// How long one IDLE command is allowed to sit before being re-issued.
    ///
    /// Servers are allowed to drop idling clients after ~30 minutes; the
    /// default stays comfortably below that.
    pub idle_timeout: Duration,
    /// The mailboxes to watch, one watcher per entry.
    pub mailboxes: Vec<WatchedMailbox>,
}

impl std::fmt::Debug for WatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchConfig")
            .field("account", &self.account.as_str())
            .field("password", &"[REDACTED]")
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("proxy", &self.proxy)
            .field("timeouts", &self.timeouts)
            .field("retry", &self.retry)
            .field("idle_timeout", &self.idle_timeout)
            .field("mailboxes", &self.mailboxes)
            .finish()
    }
}

impl WatchConfig {
    /// Returns the account address as a string slice.
    #[must_use]
    pub fn account(&self) -> &str {
        self.account.as_str()
    }

    /// Returns a reference to the validated account address.
    #[must_use]
    pub fn account_address(&self) -> &EmailAddress {
        &self.account
    }

    /// Returns the password as a string slice.
    ///
    /// The password is intentionally not a public field to prevent accidental
    /// logging; use this when handing it to authentication.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> WatchConfigBuilder {
        WatchConfigBuilder::default()
    }

    /// Returns the effective IMAP host, either explicitly configured or derived
    /// from the account domain.
    #[must_use]
    pub fn effective_imap_host(&self) -> String {
        if let Some(host) = &self.imap_host {
            host.clone()
        } else {
            crate::known_servers::discover_imap_host(self.account.as_str())
        }
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.effective_imap_host(), self.imap_port)
    }
}

/// One mailbox to watch: a logical role plus the IMAP mailbox name serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedMailbox {
    /// The logical role the watcher is tagged with.
    pub role: MailboxRole,
    /// The IMAP mailbox name to open.
    pub name: String,
}

/// Timeout configuration for various session operations.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing the TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP login.
    pub login: Duration,
    /// Timeout for opening a mailbox.
    pub open: Duration,
    /// Timeout for fetching one message.
    pub fetch: Duration,
    /// Timeout for the logout on close.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            login: Duration::from_secs(30),
            open: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
            logout: Duration::from_secs(5),
        }
    }
}

/// Reconnect backoff policy: linear escalation from `initial` by `increment`
/// per failed attempt, clamped to `ceiling`.
///
/// Linear rather than exponential keeps the retry latency predictable under a
/// sustained outage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first reconnect attempt. Zero means immediate.
    pub initial: Duration,
    /// How much the delay grows after each failed attempt.
    pub increment: Duration,
    /// The delay never exceeds this value.
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::ZERO,
            increment: Duration::from_secs(10),
            ceiling: Duration::from_secs(300),
        }
    }
}

/// Validates an account address format.
fn validate_account(account: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(account, email_address::Options::default()).map_err(|_| {
        Error::InvalidAccount {
            account: account.to_string(),
        }
    })
}

/// Builder for [`WatchConfig`].
#[derive(Debug, Default)]
pub struct WatchConfigBuilder {
    account: Option<String>,
    password: Option<String>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    proxy: Option<Socks5Proxy>,
    timeouts: Option<TimeoutConfig>,
    retry: Option<RetryPolicy>,
    idle_timeout: Option<Duration>,
    mailboxes: Vec<WatchedMailbox>,
    server_registry: Option<ServerRegistry>,
}

impl WatchConfigBuilder {
    /// Sets the account address (required).
    ///
    /// The account domain is used to auto-discover the IMAP server if no host
    /// is set explicitly.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the password (required).
    ///
    /// For Gmail/Outlook, use an app-specific password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the IMAP server hostname explicitly.
    ///
    /// If not set, the server is auto-discovered from the account domain.
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    ///
    /// Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets a custom server registry for IMAP host discovery.
    ///
    /// The registry is consulted during [`build()`](Self::build) when no
    /// explicit [`imap_host`](Self::imap_host) is set.
    #[must_use]
    pub fn server_registry(mut self, registry: ServerRegistry) -> Self {
        self.server_registry = Some(registry);
        self
    }

    /// Sets a SOCKS5 proxy for the connection.
    #[must_use]
    pub fn proxy(mut self, proxy: Socks5Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets the per-message fetch timeout.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .fetch = timeout;
        self
    }

    /// Sets the reconnect backoff policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets how long one IDLE command may sit before being re-issued.
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Adds a mailbox to watch under its role's default IMAP name.
    #[must_use]
    pub fn watch(self, role: MailboxRole) -> Self {
        let name = role.default_mailbox().to_string();
        self.watch_as(role, name)
    }

    /// Adds a mailbox to watch under an explicit IMAP mailbox name.
    ///
    /// Useful for servers that localize folder names or nest them
    /// (e.g. `[Gmail]/Sent Mail`).
    #[must_use]
    pub fn watch_as(mut self, role: MailboxRole, name: impl Into<String>) -> Self {
        self.mailboxes.push(WatchedMailbox {
            role,
            name: name.into(),
        });
        self
    }

    /// Builds the configuration.
    ///
    /// If no mailbox was added via [`watch`](Self::watch), the inbox is
    /// watched by default.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<WatchConfig> {
        let account_raw = self.account.ok_or_else(|| Error::InvalidConfig {
            message: "account is required".into(),
        })?;

        let account = validate_account(&account_raw)?;

        let password_raw = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "password is required".into(),
        })?;

        // Resolve IMAP host: explicit > registry > default discovery
        let imap_host = self.imap_host.or_else(|| {
            self.server_registry
                .map(|registry| registry.discover(account.as_str()).into_owned())
        });

        let mut mailboxes = self.mailboxes;
        if mailboxes.is_empty() {
            mailboxes.push(WatchedMailbox {
                role: MailboxRole::Inbox,
                name: MailboxRole::Inbox.default_mailbox().to_string(),
            });
        }

        Ok(WatchConfig {
            account,
            password: SecretString::from(password_raw),
            imap_host,
            imap_port: self.imap_port.unwrap_or(993),
            proxy: self.proxy,
            timeouts: self.timeouts.unwrap_or_default(),
            retry: self.retry.unwrap_or_default(),
            idle_timeout: self.idle_timeout.unwrap_or(Duration::from_secs(600)),
            mailboxes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_minimal() {
        let config = WatchConfig::builder()
            .account("user@example.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.account(), "user@example.com");
        assert_eq!(config.password(), "secret");
        assert_eq!(config.imap_port, 993);
        assert!(config.proxy.is_none());

        // An empty watch list defaults to the inbox
        assert_eq!(config.mailboxes.len(), 1);
        assert_eq!(config.mailboxes[0].role, MailboxRole::Inbox);
        assert_eq!(config.mailboxes[0].name, "INBOX");
    }

    #[test]
    fn test_builder_full() {
        let config = WatchConfig::builder()
            .account("user@example.com")
            .password("secret")
            .imap_host("mail.example.com")
            .imap_port(994)
            .proxy(Socks5Proxy::new("proxy.local", 1080))
            .connect_timeout(Duration::from_secs(60))
            .retry(RetryPolicy {
                initial: Duration::from_secs(1),
                increment: Duration::from_secs(5),
                ceiling: Duration::from_secs(60),
            })
            .idle_timeout(Duration::from_secs(120))
            .watch(MailboxRole::Inbox)
            .watch_as(MailboxRole::Sent, "[Gmail]/Sent Mail")
            .build()
            .unwrap();

        assert_eq!(config.imap_host, Some("mail.example.com".into()));
        assert_eq!(config.imap_port, 994);
        assert!(config.proxy.is_some());
        assert_eq!(config.timeouts.connect, Duration::from_secs(60));
        assert_eq!(config.retry.increment, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.mailboxes.len(), 2);
        assert_eq!(config.mailboxes[1].name, "[Gmail]/Sent Mail");
    }

    #[test]
    fn test_builder_missing_account() {
        let result = WatchConfig::builder().password("secret").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_missing_password() {
        let result = WatchConfig::builder().account("user@example.com").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_invalid_account() {
        let result = WatchConfig::builder()
            .account("not-an-address")
            .password("secret")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_server_address() {
        let config = WatchConfig::builder()
            .account("user@example.com")
            .password("secret")
            .imap_host("mail.example.com")
            .build()
            .unwrap();

        assert_eq!(config.server_address(), "mail.example.com:993");
    }

    #[test]
    fn test_password_not_in_debug() {
        let config = WatchConfig::builder()
            .account("user@example.com")
            .password("super-secret-password")
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_default_retry_policy() {
        let config = WatchConfig::builder()
            .account("user@example.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.retry.initial, Duration::ZERO);
        assert_eq!(config.retry.increment, Duration::from_secs(10));
        assert_eq!(config.retry.ceiling, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_with_server_registry() {
        let mut registry = ServerRegistry::new();
        registry.register("mycompany.com", "mail.internal.mycompany.com");

        let config = WatchConfig::builder()
            .account("user@mycompany.com")
            .password("secret")
            .server_registry(registry)
            .build()
            .unwrap();

        assert_eq!(config.effective_imap_host(), "mail.internal.mycompany.com");
    }

    #[test]
    fn test_builder_explicit_host_overrides_registry() {
        let mut registry = ServerRegistry::new();
        registry.register("mycompany.com", "mail.internal.mycompany.com");

        let config = WatchConfig::builder()
            .account("user@mycompany.com")
            .password("secret")
            .imap_host("custom.host.com")
            .server_registry(registry)
            .build()
            .unwrap();

        assert_eq!(config.effective_imap_host(), "custom.host.com");
    }

    #[test]
    fn test_builder_no_registry_uses_default_discovery() {
        let config = WatchConfig::builder()
            .account("user@gmail.com")
            .password("secret")
            .build()
            .unwrap();

        assert_eq!(config.effective_imap_host(), "imap.gmail.com");
    }
}
