//! Operator policy tables.

use serde::{Deserialize, Serialize};

const BLOCKED_CONTENT_SCRIPT_HOSTS: &str = include_str!("../data/blocked_content_script_hosts.txt");

const RESTRICTED_HOMEPAGE_URLS: &[&str] = &["//addons.mozilla.org", "//addons.allizom.org"];

/// Literal blocklists applied by the structural rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Substrings a content script match pattern must not contain.
    pub blocked_content_script_hosts: Vec<String>,
    /// Substrings `homepage_url` must not contain.
    pub restricted_homepage_urls: Vec<String>,
}

impl Policy {
    /// The built-in tables.
    pub fn builtin() -> Self {
        Self {
            blocked_content_script_hosts: parse_blocklist(BLOCKED_CONTENT_SCRIPT_HOSTS),
            restricted_homepage_urls: RESTRICTED_HOMEPAGE_URLS
                .iter()
                .map(|url| url.to_string())
                .collect(),
        }
    }

    /// Appends entries not already present.
    pub fn extend(
        mut self,
        blocked_content_script_hosts: impl IntoIterator<Item = String>,
        restricted_homepage_urls: impl IntoIterator<Item = String>,
    ) -> Self {
        for host in blocked_content_script_hosts {
            if !self.blocked_content_script_hosts.contains(&host) {
                self.blocked_content_script_hosts.push(host);
            }
        }
        for url in restricted_homepage_urls {
            if !self.restricted_homepage_urls.contains(&url) {
                self.restricted_homepage_urls.push(url);
            }
        }
        self
    }

    /// The first blocked host contained in a match pattern.
    pub fn blocked_host<'a>(&'a self, pattern: &str) -> Option<&'a str> {
        self.blocked_content_script_hosts
            .iter()
            .find(|host| pattern.contains(host.as_str()))
            .map(String::as_str)
    }

    /// The first restricted URL contained in a homepage URL.
    pub fn restricted_homepage<'a>(&'a self, url: &str) -> Option<&'a str> {
        self.restricted_homepage_urls
            .iter()
            .find(|restricted| url.contains(restricted.as_str()))
            .map(String::as_str)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Parses a blocklist file: one literal per line, `#` comments.
pub fn parse_blocklist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
