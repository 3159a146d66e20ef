//! IMAP server discovery from account domains.
//!
//! Watched accounts usually don't spell out their IMAP server; this module
//! resolves the hostname from the account's domain, with built-in mappings for
//! common providers and a [`ServerRegistry`] for runtime customization.
//!
//! # Example
//!
//! ```
//! use mail_watch::known_servers::{discover_imap_host, ServerRegistry};
//!
//! // Built-in discovery
//! assert_eq!(discover_imap_host("user@gmail.com"), "imap.gmail.com");
//!
//! // Custom registry for an application
//! let mut registry = ServerRegistry::with_defaults();
//! registry.register("mycompany.com", "mail.mycompany.internal");
//! assert_eq!(registry.discover("user@mycompany.com"), "mail.mycompany.internal");
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Map of account domains to their IMAP server hostnames.
static KNOWN_SERVERS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Google
    m.insert("gmail.com", "imap.gmail.com");

    // Yahoo
    m.insert("yahoo.com", "imap.mail.yahoo.com");

    // Microsoft
    m.insert("hotmail.com", "imap-mail.outlook.com");
    m.insert("outlook.com", "imap-mail.outlook.com");
    m.insert("live.com", "imap-mail.outlook.com");

    // AOL
    m.insert("aol.com", "imap.aol.com");

    // Apple
    m.insert("icloud.com", "imap.mail.me.com");
    m.insert("me.com", "imap.mail.me.com");
    m.insert("mac.com", "imap.mail.me.com");

    // Yandex
    m.insert("yandex.ru", "imap.yandex.ru");
    m.insert("yandex.com", "imap.yandex.ru");

    // Mail.ru network
    m.insert("mail.ru", "imap.mail.ru");
    m.insert("bk.ru", "imap.mail.ru");
    m.insert("inbox.ru", "imap.mail.ru");
    m.insert("list.ru", "imap.mail.ru");

    // German providers
    m.insert("web.de", "imap.web.de");
    m.insert("gmx.de", "imap.gmx.net");
    m.insert("gmx.net", "imap.gmx.net");
    m.insert("gmx.com", "imap.gmx.net");
    m.insert("t-online.de", "secureimap.t-online.de");

    m
});

/// A customizable registry for IMAP server discovery.
///
/// Lets an application add its own domain-to-host mappings at runtime, in
/// addition to (or overriding) the built-in defaults.
///
/// # Example
///
/// ```
/// use mail_watch::known_servers::ServerRegistry;
///
/// let mut registry = ServerRegistry::with_defaults();
/// registry.register("partner.org", "mail.partner.org");
///
/// assert_eq!(registry.discover("user@partner.org"), "mail.partner.org");
/// assert_eq!(registry.discover("user@gmail.com"), "imap.gmail.com"); // built-in
/// ```
#[derive(Debug, Clone)]
pub struct ServerRegistry {
    custom: HashMap<String, String>,
    use_defaults: bool,
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerRegistry {
    /// Creates an empty registry without the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: false,
        }
    }

    /// Creates a registry that includes the built-in default mappings.
    ///
    /// Custom mappings added via [`Self::register`] override defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            custom: HashMap::new(),
            use_defaults: true,
        }
    }

    /// Registers a custom domain-to-IMAP-host mapping.
    ///
    /// Overrides any existing mapping, built-in defaults included.
    pub fn register(&mut self, domain: impl Into<String>, imap_host: impl Into<String>) {
        self.custom
            .insert(domain.into().to_lowercase(), imap_host.into());
    }

    /// Registers multiple domain mappings at once.
    pub fn register_many<I, D, H>(&mut self, mappings: I)
    where
        I: IntoIterator<Item = (D, H)>,
        D: Into<String>,
        H: Into<String>,
    {
        for (domain, host) in mappings {
            self.register(domain, host);
        }
    }

    /// Discovers the IMAP hostname for an account address.
    ///
    /// Resolution order: custom mappings, then built-in defaults (if enabled),
    /// then a fallback of `imap.{domain}`.
    #[must_use]
    pub fn discover(&self, account: &str) -> Cow<'_, str> {
        let domain = account.split('@').nth(1).unwrap_or(account).to_lowercase();

        if let Some(host) = self.custom.get(&domain) {
            return Cow::Borrowed(host);
        }

        if self.use_defaults {
            if let Some(&host) = KNOWN_SERVERS.get(domain.as_str()) {
                return Cow::Borrowed(host);
            }
        }

        Cow::Owned(format!("imap.{domain}"))
    }

    /// Returns `true` if the domain has a known IMAP server mapping.
    #[must_use]
    pub fn is_known(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.custom.contains_key(&domain)
            || (self.use_defaults && KNOWN_SERVERS.contains_key(domain.as_str()))
    }

    /// Returns the number of registered mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        let default_count = if self.use_defaults {
            KNOWN_SERVERS
                .keys()
                .filter(|k| !self.custom.contains_key(**k))
                .count()
        } else {
            0
        };
        self.custom.len() + default_count
    }

    /// Returns `true` if the registry has no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty() && !self.use_defaults
    }
}

/// Discovers the IMAP hostname for an account address using only the built-in
/// mappings.
///
/// If the domain is known, returns the corresponding IMAP server; otherwise
/// falls back to `imap.{domain}`.
///
/// # Example
///
/// ```
/// use mail_watch::known_servers::discover_imap_host;
///
/// assert_eq!(discover_imap_host("user@gmail.com"), "imap.gmail.com");
/// assert_eq!(discover_imap_host("user@custom.org"), "imap.custom.org");
/// ```
#[must_use]
pub fn discover_imap_host(account: &str) -> String {
    let domain = account.split('@').nth(1).unwrap_or(account).to_lowercase();

    KNOWN_SERVERS
        .get(domain.as_str())
        .map_or_else(|| format!("imap.{domain}"), |&s| s.to_string())
}

/// Returns `true` if the domain has a built-in IMAP server mapping.
#[must_use]
pub fn is_known_domain(domain: &str) -> bool {
    KNOWN_SERVERS.contains_key(domain.to_lowercase().as_str())
}
