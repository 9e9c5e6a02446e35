//! Content security policy posture checks.
//!
//! Only the directives that govern script execution are inspected. A policy
//! is insecure when scripts may load from anything other than the package
//! itself, and `'unsafe-eval'` is reported on its own.

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostic::Diagnostic;
use crate::messages::{Catalog, MessageCode};

/// Directives inspected, in the order they are evaluated.
const SCRIPT_DIRECTIVES: &[&str] = &[
    "default-src",
    "script-src",
    "script-src-elem",
    "script-src-attr",
    "worker-src",
];

const SAFE_KEYWORDS: &[&str] = &["'self'", "'none'", "'strict-dynamic'", "'wasm-unsafe-eval'"];
const SAFE_PREFIXES: &[&str] = &["'nonce-", "'sha256-", "'sha384-", "'sha512-"];
const UNSAFE_EVAL: &str = "'unsafe-eval'";

/// Directive name to its source tokens, for one policy string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspDirectives {
    directives: HashMap<String, Vec<String>>,
}

impl CspDirectives {
    /// Splits a policy into directives. Names are case-insensitive and the
    /// first occurrence of a repeated directive wins.
    pub fn parse(policy: &str) -> Self {
        let mut directives = HashMap::new();
        for directive in policy.split(';') {
            let mut tokens = directive.split_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            directives
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| tokens.map(str::to_string).collect());
        }
        Self { directives }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.directives.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }
}

/// Security posture of one policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CspAnalysis {
    pub insecure: bool,
    pub unsafe_eval: bool,
}

fn is_safe_token(token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    SAFE_KEYWORDS.contains(&token.as_str())
        || SAFE_PREFIXES
            .iter()
            .any(|prefix| token.starts_with(prefix) && token.ends_with('\''))
}

/// Evaluates the script directives of a policy.
pub fn analyze(policy: &str) -> CspAnalysis {
    let directives = CspDirectives::parse(policy);
    let mut analysis = CspAnalysis {
        insecure: !directives.contains("default-src"),
        unsafe_eval: false,
    };

    for name in SCRIPT_DIRECTIVES {
        let Some(tokens) = directives.get(name) else {
            continue;
        };

        // A fully safe script-src overrides a missing or broad default-src.
        if analysis.insecure && *name == "script-src" && tokens.iter().all(|t| is_safe_token(t)) {
            analysis.insecure = false;
            continue;
        }

        for token in tokens {
            if token.eq_ignore_ascii_case(UNSAFE_EVAL) {
                analysis.unsafe_eval = true;
            } else if !is_safe_token(token) {
                analysis.insecure = true;
            }
        }
    }
    analysis
}

/// Emits CSP diagnostics for manifest properties.
pub struct CspAnalyzer {
    catalog: Arc<Catalog>,
}

impl CspAnalyzer {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Checks one policy declared at `property` (`content_security_policy`
    /// or `content_security_policy.extension_pages`).
    pub fn check(&self, policy: &str, property: &str) -> Vec<Diagnostic> {
        let analysis = analyze(policy);
        let args = [("property", property)];
        let mut diagnostics = Vec::new();
        if analysis.unsafe_eval {
            diagnostics.push(self.catalog.render(MessageCode::ManifestCspUnsafeEval, &args));
        }
        if analysis.insecure {
            diagnostics.push(self.catalog.render(MessageCode::ManifestCsp, &args));
        }
        diagnostics
    }
}
