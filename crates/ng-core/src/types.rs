//! Core type definitions for the navigation gate
//!
//! These types are shared by the gate, the session state machine and the
//! host bindings.

// =============================================================================
// Verdicts
// =============================================================================

/// Outcome of evaluating a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verdict {
    /// Load inside the embedded view
    Allow = 0,
    /// Cancel the in-view load and hand the URL to an external handler
    Divert = 1,
    /// Tear down the embedded view and switch to local screens
    Fallback = 2,
}

impl Verdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Divert => "divert",
            Self::Fallback => "fallback",
        }
    }
}

/// Which rule produced a before-load verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictReason {
    /// URL starts with an app scheme (tel:, tg:, market:, ...)
    Scheme,
    /// Host/path matched a carve-out rule
    CarveOut,
    /// Host is in the external domain set
    Domain,
    /// Web URL that matched no external rule
    Web,
    /// Host is external but belongs to an internal web service
    InternalService,
    /// Not an http(s) URL and no scheme rule matched
    NonWeb,
    /// http(s) URL that failed to parse; allowed
    Unparseable,
}

impl VerdictReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheme => "scheme",
            Self::CarveOut => "carve-out",
            Self::Domain => "domain",
            Self::Web => "web",
            Self::InternalService => "internal-service",
            Self::NonWeb => "non-web",
            Self::Unparseable => "unparseable",
        }
    }
}

// =============================================================================
// Before-load result
// =============================================================================

/// Result of classifying a URL before it loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationVerdict<'a> {
    pub verdict: Verdict,
    pub reason: VerdictReason,
    /// The URL exactly as the view reported it. For `Divert` this is what
    /// gets handed to the external opener.
    pub url: &'a str,
}

impl<'a> NavigationVerdict<'a> {
    pub(crate) const fn allow(url: &'a str, reason: VerdictReason) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason,
            url,
        }
    }

    pub(crate) const fn divert(url: &'a str, reason: VerdictReason) -> Self {
        Self {
            verdict: Verdict::Divert,
            reason,
            url,
        }
    }

    #[inline]
    pub fn is_divert(&self) -> bool {
        self.verdict == Verdict::Divert
    }
}

// =============================================================================
// Load events
// =============================================================================

/// State reported by the embedded view after a navigation attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadEvent<'a> {
    /// URL the view ended up on
    pub url: &'a str,
    /// Document title, empty if unknown
    pub title: &'a str,
    /// HTTP status, `None` when the view reported no status
    pub status: Option<u16>,
    /// DNS, TLS or connection failure reported without a status code
    pub transport_error: bool,
    /// The view's history-back availability
    pub can_go_back: bool,
}

impl<'a> LoadEvent<'a> {
    /// A committed navigation with a document title.
    pub fn committed(url: &'a str, title: &'a str, can_go_back: bool) -> Self {
        Self {
            url,
            title,
            can_go_back,
            ..Self::default()
        }
    }

    /// An HTTP error response.
    pub fn http_error(url: &'a str, status: u16) -> Self {
        Self {
            url,
            status: Some(status),
            ..Self::default()
        }
    }

    /// A load that failed below HTTP.
    pub fn transport_failure(url: &'a str) -> Self {
        Self {
            url,
            transport_error: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// Fallback causes
// =============================================================================

bitflags::bitflags! {
    /// Why a completed load was flagged as broken.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FallbackCause: u8 {
        /// HTTP status >= 400
        const HTTP_STATUS = 1 << 0;
        /// URL contains a failure signal substring
        const URL_SIGNAL = 1 << 1;
        /// Title contains a failure signal substring
        const TITLE_SIGNAL = 1 << 2;
        /// Load failed below HTTP
        const TRANSPORT_ERROR = 1 << 3;
    }
}

impl FallbackCause {
    /// Names of the set flags, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Result of classifying a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AfterLoadResult {
    pub can_go_back: bool,
    pub fallback: bool,
    pub causes: FallbackCause,
}

impl AfterLoadResult {
    pub fn verdict(&self) -> Verdict {
        if self.fallback {
            Verdict::Fallback
        } else {
            Verdict::Allow
        }
    }
}
