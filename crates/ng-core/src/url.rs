//! URL helpers for the gate
//!
//! Prefix and substring checks work on the raw string without allocating.
//! Host/path extraction goes through a full WHATWG parse so that anything
//! a browser would reject is reported as an error.

// =============================================================================
// Scheme Extraction
// =============================================================================

/// Web schemes the gate inspects host and path for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebScheme {
    Http,
    Https,
}

impl WebScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Fast scheme check without URL parsing.
/// Matches `http:` / `https:` case-insensitively, with or without `//`.
#[inline]
pub fn extract_web_scheme(url: &str) -> Option<WebScheme> {
    if starts_with_ignore_case(url, "https:") {
        Some(WebScheme::Https)
    } else if starts_with_ignore_case(url, "http:") {
        Some(WebScheme::Http)
    } else {
        None
    }
}

// =============================================================================
// Case-insensitive matching
// =============================================================================

/// ASCII case-insensitive prefix test.
#[inline]
pub fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let h = haystack.as_bytes();
    let p = prefix.as_bytes();
    h.len() >= p.len() && h[..p.len()].eq_ignore_ascii_case(p)
}

/// ASCII case-insensitive substring test.
#[inline]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() {
        return true;
    }
    if h.len() < n.len() {
        return false;
    }
    h.windows(n.len()).any(|w| w.eq_ignore_ascii_case(n))
}

// =============================================================================
// Host / Path Extraction
// =============================================================================

/// Error type for web target parsing.
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(#[from] ::url::ParseError),
    #[error("URL has no host")]
    MissingHost,
    #[error("Not an http(s) URL")]
    NotWeb,
}

/// Lower-cased host and path of an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebTarget {
    pub scheme: WebScheme,
    pub host: String,
    pub path: String,
}

/// Parse the host and path out of an http(s) URL.
pub fn parse_web_target(raw: &str) -> Result<WebTarget, UrlError> {
    let scheme = extract_web_scheme(raw).ok_or(UrlError::NotWeb)?;
    let parsed = ::url::Url::parse(raw)?;

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
        _ => return Err(UrlError::MissingHost),
    };

    Ok(WebTarget {
        scheme,
        host,
        path: parsed.path().to_ascii_lowercase(),
    })
}

/// Canonical form of a host entry: trimmed, lower-cased, without the
/// trailing root dot.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Check whether `label` appears as a whole dot-separated label of `host`.
#[inline]
pub fn host_has_label(host: &str, label: &str) -> bool {
    host.split('.').any(|l| l.eq_ignore_ascii_case(label))
}
