//! Scan target normalisation.
//!
//! Users type bare host names and IP addresses; the crawl provider needs a
//! URL with an explicit scheme.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$")
        .expect("DOTTED_QUAD: hardcoded regex is valid")
});

/// A scan target that is guaranteed to carry an `http://` or `https://` scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim the input and add a scheme when it has none.
///
/// Dotted-quad addresses get `http://`, everything else `https://`. Octet
/// values are not range-checked, so `999.999.999.999` is treated as an IP.
pub fn normalize_url(raw: &str) -> NormalizedUrl {
    let trimmed = raw.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return NormalizedUrl(trimmed.to_string());
    }

    if DOTTED_QUAD.is_match(trimmed) {
        NormalizedUrl(format!("http://{}", trimmed))
    } else {
        NormalizedUrl(format!("https://{}", trimmed))
    }
}
