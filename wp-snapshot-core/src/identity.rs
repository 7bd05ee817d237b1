//! Simulated browser sessions.
//!
//! A [`ClientIdentity`] is the full set of headers one browser would send. The
//! coordinator owns an [`IdentityPool`] and swaps the whole identity after a
//! blocked response; identities are never edited in place.

use tracing::{debug, warn};

/// One simulated browser session, as a complete header bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: &'static str,
    headers: Vec<(&'static str, &'static str)>,
}

impl ClientIdentity {
    pub fn new(name: &'static str, headers: Vec<(&'static str, &'static str)>) -> Self {
        Self { name, headers }
    }

    pub fn headers(&self) -> &[(&'static str, &'static str)] {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&'static str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
            .map(|(_, v)| *v)
    }
}

const ACCEPT_JSON: &str = "application/json, text/plain, */*";

fn chrome_windows() -> ClientIdentity {
    ClientIdentity::new(
        "chrome-windows",
        vec![
            ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"),
            ("Accept", ACCEPT_JSON),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Sec-CH-UA", "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
            ("Sec-CH-UA-Mobile", "?0"),
            ("Sec-CH-UA-Platform", "\"Windows\""),
        ],
    )
}

fn chrome_macos() -> ClientIdentity {
    ClientIdentity::new(
        "chrome-macos",
        vec![
            ("User-Agent", "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"),
            ("Accept", ACCEPT_JSON),
            ("Accept-Language", "en-GB,en;q=0.9"),
            ("Sec-CH-UA", "\"Google Chrome\";v=\"123\", \"Not:A-Brand\";v=\"8\", \"Chromium\";v=\"123\""),
            ("Sec-CH-UA-Mobile", "?0"),
            ("Sec-CH-UA-Platform", "\"macOS\""),
        ],
    )
}

fn firefox_linux() -> ClientIdentity {
    ClientIdentity::new(
        "firefox-linux",
        vec![
            ("User-Agent", "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0"),
            ("Accept", ACCEPT_JSON),
            ("Accept-Language", "en-US,en;q=0.5"),
        ],
    )
}

fn safari_macos() -> ClientIdentity {
    ClientIdentity::new(
        "safari-macos",
        vec![
            ("User-Agent", "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15"),
            ("Accept", ACCEPT_JSON),
            ("Accept-Language", "en-US,en;q=0.9"),
        ],
    )
}

fn edge_windows() -> ClientIdentity {
    ClientIdentity::new(
        "edge-windows",
        vec![
            ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0"),
            ("Accept", ACCEPT_JSON),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Sec-CH-UA", "\"Chromium\";v=\"124\", \"Microsoft Edge\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
            ("Sec-CH-UA-Mobile", "?0"),
            ("Sec-CH-UA-Platform", "\"Windows\""),
        ],
    )
}

/// The catalogue of browser identities a run can rotate through.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Vec<ClientIdentity>,
    current: usize,
}

impl IdentityPool {
    /// Pool over the built-in browser catalogue, starting at a random entry.
    pub fn browsers() -> Self {
        let identities = vec![
            chrome_windows(),
            chrome_macos(),
            firefox_linux(),
            safari_macos(),
            edge_windows(),
        ];
        let start = (uuid::Uuid::new_v4().as_u128() % identities.len() as u128) as usize;
        Self {
            identities,
            current: start,
        }
    }

    /// Pool over caller-supplied identities, starting at the first one.
    /// Rotation needs at least two entries; with fewer this falls back to the
    /// browser catalogue.
    pub fn from_identities(identities: Vec<ClientIdentity>) -> Self {
        if identities.len() < 2 {
            warn!(
                supplied = identities.len(),
                "Too few identities to rotate, using the browser catalogue"
            );
            return Self::browsers();
        }
        Self {
            identities,
            current: 0,
        }
    }

    pub fn current(&self) -> &ClientIdentity {
        &self.identities[self.current]
    }

    /// Replace the current identity with the next distinct one and return it.
    pub fn rotate(&mut self) -> &ClientIdentity {
        let previous = self.current;
        self.current = (self.current + 1) % self.identities.len();
        debug!(
            from = self.identities[previous].name,
            to = self.identities[self.current].name,
            "Rotated client identity"
        );
        &self.identities[self.current]
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
