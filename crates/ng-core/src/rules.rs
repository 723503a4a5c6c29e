//! Classification tables
//!
//! A [`GateRules`] value holds every table the gate consults. Tables are
//! built once (either the built-in set or one compiled from a rule list)
//! and never mutated afterwards; the gate only ever borrows them.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::url::{contains_ignore_case, host_has_label, normalize_host, starts_with_ignore_case};

// =============================================================================
// Built-in tables
// =============================================================================

/// App schemes that never load in-view.
pub const BUILTIN_SCHEME_PREFIXES: &[&str] = &[
    "mailto:",
    "tel:",
    "tg:",
    "sms:",
    "whatsapp:",
    "viber:",
    "skype:",
    "geo:",
    "comgooglemaps://",
    "yandexmaps://",
    "2gis://",
    "market:",
    "intent:",
    "itms-apps:",
];

/// Hosts whose content belongs to a native app.
pub const BUILTIN_EXTERNAL_DOMAINS: &[&str] = &[
    "t.me",
    "telegram.me",
    "telegram.org",
    "wa.me",
    "api.whatsapp.com",
    "instagram.com",
    "www.instagram.com",
    "facebook.com",
    "m.facebook.com",
    "fb.me",
    "vk.com",
    "m.vk.com",
    "twitter.com",
    "mobile.twitter.com",
    "x.com",
    "youtube.com",
    "www.youtube.com",
    "youtu.be",
    "music.youtube.com",
    "viber.com",
    "invite.viber.com",
    "skype.com",
    "join.skype.com",
    "open.spotify.com",
    "waze.com",
    "www.waze.com",
    "uber.com",
    "play.google.com",
    "apps.apple.com",
];

/// Whole host labels that mark an internal web service.
pub const BUILTIN_INTERNAL_LABELS: &[&str] = &["google"];

/// Host substrings that mark an internal web service.
pub const BUILTIN_INTERNAL_SUBSTRINGS: &[&str] = &["gstatic", "googleusercontent"];

/// URL substrings that mean the remote page is broken.
pub const BUILTIN_FAILURE_URL_SIGNALS: &[&str] = &["gmetrck"];

/// Title substrings that mean the remote page is broken.
pub const BUILTIN_FAILURE_TITLE_SIGNALS: &[&str] = &[
    "redirect",
    "err_too_many_redirects",
    "webpage not available",
];

// =============================================================================
// Carve-outs
// =============================================================================

/// How a carve-out selects hosts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HostMatch {
    /// Host equals one of the listed names
    Exact { hosts: Vec<String> },
    /// Host contains the substring anywhere
    Contains { pattern: String },
}

impl HostMatch {
    #[inline]
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact { hosts } => hosts.iter().any(|h| h.eq_ignore_ascii_case(host)),
            Self::Contains { pattern } => contains_ignore_case(host, pattern),
        }
    }
}

/// Host/path rule that diverts before the domain set is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarveOut {
    pub host: HostMatch,
    /// Path prefix; `None` matches every path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl CarveOut {
    pub fn contains(pattern: &str, path_prefix: Option<&str>) -> Self {
        Self {
            host: HostMatch::Contains {
                pattern: pattern.to_ascii_lowercase(),
            },
            path_prefix: path_prefix.map(str::to_ascii_lowercase),
        }
    }

    pub fn exact(hosts: &[&str], path_prefix: Option<&str>) -> Self {
        Self {
            host: HostMatch::Exact {
                hosts: hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            },
            path_prefix: path_prefix.map(str::to_ascii_lowercase),
        }
    }

    /// Check a lower-cased host and path.
    #[inline]
    pub fn matches(&self, host: &str, path: &str) -> bool {
        if !self.host.matches(host) {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => starts_with_ignore_case(path, prefix),
            None => true,
        }
    }
}

fn builtin_carve_outs() -> Vec<CarveOut> {
    vec![
        CarveOut::contains("yandex", Some("/maps")),
        CarveOut::exact(&["google.com", "www.google.com"], Some("/maps")),
        CarveOut::contains("2gis.ru", None),
    ]
}

// =============================================================================
// Internal services
// =============================================================================

/// Hosts that stay in-view even when listed as external.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InternalService {
    /// Whole dot-separated labels, e.g. `google` matches `mail.google.com`
    #[serde(default)]
    pub labels: Vec<String>,
    /// Plain substrings of the host
    #[serde(default)]
    pub substrings: Vec<String>,
}

impl InternalService {
    #[inline]
    pub fn matches_host(&self, host: &str) -> bool {
        self.labels.iter().any(|l| host_has_label(host, l))
            || self.substrings.iter().any(|s| contains_ignore_case(host, s))
    }
}

// =============================================================================
// Gate Rules
// =============================================================================

/// Error type for loading a serialized rule table.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Invalid rule table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Empty entry in {0}")]
    EmptyEntry(&'static str),
}

/// Every classification table the gate consults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GateRules {
    /// Ordered; the first match wins but any match diverts
    #[serde(default)]
    pub scheme_prefixes: Vec<String>,
    #[serde(default)]
    pub external_domains: BTreeSet<String>,
    /// Evaluated in order before `external_domains`
    #[serde(default)]
    pub carve_outs: Vec<CarveOut>,
    #[serde(default)]
    pub internal_service: InternalService,
    #[serde(default)]
    pub failure_url_signals: Vec<String>,
    #[serde(default)]
    pub failure_title_signals: Vec<String>,
}

static BUILTIN_RULES: OnceLock<GateRules> = OnceLock::new();

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl GateRules {
    /// The built-in tables, constructed on first use and shared afterwards.
    pub fn builtin() -> &'static GateRules {
        BUILTIN_RULES.get_or_init(|| GateRules {
            scheme_prefixes: owned(BUILTIN_SCHEME_PREFIXES),
            external_domains: BUILTIN_EXTERNAL_DOMAINS.iter().map(|s| s.to_string()).collect(),
            carve_outs: builtin_carve_outs(),
            internal_service: InternalService {
                labels: owned(BUILTIN_INTERNAL_LABELS),
                substrings: owned(BUILTIN_INTERNAL_SUBSTRINGS),
            },
            failure_url_signals: owned(BUILTIN_FAILURE_URL_SIGNALS),
            failure_title_signals: owned(BUILTIN_FAILURE_TITLE_SIGNALS),
        })
    }

    /// Load a table serialized with [`GateRules::to_json`].
    ///
    /// Entries are lower-cased on load; empty entries are rejected since an
    /// empty prefix or substring would match every URL.
    pub fn from_json(text: &str) -> Result<Self, RulesError> {
        let mut rules: GateRules = serde_json::from_str(text)?;
        rules.normalize();
        rules.validate()?;
        Ok(rules)
    }

    pub fn to_json(&self) -> Result<String, RulesError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Lower-case every entry in place. Host entries also lose a trailing
    /// root dot.
    pub fn normalize(&mut self) {
        fn lower(list: &mut [String]) {
            for entry in list.iter_mut() {
                *entry = entry.trim().to_ascii_lowercase();
            }
        }

        lower(&mut self.scheme_prefixes);
        lower(&mut self.failure_url_signals);
        lower(&mut self.failure_title_signals);
        lower(&mut self.internal_service.labels);
        lower(&mut self.internal_service.substrings);

        self.external_domains = self
            .external_domains
            .iter()
            .map(|d| normalize_host(d))
            .collect();

        for carve in &mut self.carve_outs {
            match &mut carve.host {
                HostMatch::Exact { hosts } => {
                    for host in hosts.iter_mut() {
                        *host = normalize_host(host);
                    }
                }
                HostMatch::Contains { pattern } => *pattern = pattern.trim().to_ascii_lowercase(),
            }
            if let Some(prefix) = carve.path_prefix.as_mut() {
                *prefix = prefix.trim().to_ascii_lowercase();
            }
        }
    }

    /// Reject tables containing empty match entries.
    pub fn validate(&self) -> Result<(), RulesError> {
        fn check(list: &[String], what: &'static str) -> Result<(), RulesError> {
            if list.iter().any(|s| s.is_empty()) {
                return Err(RulesError::EmptyEntry(what));
            }
            Ok(())
        }

        check(&self.scheme_prefixes, "scheme_prefixes")?;
        check(&self.failure_url_signals, "failure_url_signals")?;
        check(&self.failure_title_signals, "failure_title_signals")?;
        check(&self.internal_service.labels, "internal_service.labels")?;
        check(&self.internal_service.substrings, "internal_service.substrings")?;
        if self.external_domains.iter().any(|d| d.is_empty()) {
            return Err(RulesError::EmptyEntry("external_domains"));
        }
        for carve in &self.carve_outs {
            match &carve.host {
                HostMatch::Exact { hosts } => {
                    if hosts.is_empty() {
                        return Err(RulesError::EmptyEntry("carve_outs"));
                    }
                    check(hosts, "carve_outs")?;
                }
                HostMatch::Contains { pattern } => {
                    if pattern.is_empty() {
                        return Err(RulesError::EmptyEntry("carve_outs"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Total number of entries across all tables.
    pub fn entry_count(&self) -> usize {
        self.scheme_prefixes.len()
            + self.external_domains.len()
            + self.carve_outs.len()
            + self.internal_service.labels.len()
            + self.internal_service.substrings.len()
            + self.failure_url_signals.len()
            + self.failure_title_signals.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_shared() {
        let a = GateRules::builtin() as *const GateRules;
        let b = GateRules::builtin() as *const GateRules;
        assert_eq!(a, b);
    }

    #[test]
    fn builtin_tables_are_lowercase() {
        let rules = GateRules::builtin();
        let mut copy = rules.clone();
        copy.normalize();
        assert_eq!(&copy, rules);
        assert!(rules.validate().is_ok());
        assert_eq!(rules.scheme_prefixes.len(), 14);
        assert_eq!(rules.external_domains.len(), 29);
    }

    #[test]
    fn carve_out_matching() {
        let maps = CarveOut::exact(&["google.com", "www.google.com"], Some("/maps"));
        assert!(maps.matches("www.google.com", "/maps/place/x"));
        assert!(!maps.matches("www.google.com", "/search"));
        assert!(!maps.matches("maps.google.com", "/maps"));

        let gis = CarveOut::contains("2gis.ru", None);
        assert!(gis.matches("m.2gis.ru", "/"));
        assert!(!gis.matches("2gis.com", "/"));
    }

    #[test]
    fn json_round_trip_normalizes() {
        let text = r#"{
            "scheme_prefixes": ["TEL:"],
            "external_domains": ["T.ME"],
            "carve_outs": [{"host": {"kind": "contains", "pattern": "Yandex"}, "path_prefix": "/Maps"}]
        }"#;
        let rules = GateRules::from_json(text).unwrap();
        assert_eq!(rules.scheme_prefixes, vec!["tel:".to_string()]);
        assert!(rules.external_domains.contains("t.me"));
        assert_eq!(rules.carve_outs[0], CarveOut::contains("yandex", Some("/maps")));
        assert!(rules.failure_title_signals.is_empty());

        let again = GateRules::from_json(&rules.to_json().unwrap()).unwrap();
        assert_eq!(again, rules);
    }

    #[test]
    fn json_hosts_lose_trailing_dot() {
        let text = r#"{
            "external_domains": ["T.me."],
            "carve_outs": [{"host": {"kind": "exact", "hosts": ["www.google.com."]}, "path_prefix": "/maps"}]
        }"#;
        let rules = GateRules::from_json(text).unwrap();
        assert!(rules.external_domains.contains("t.me"));
        assert_eq!(rules.carve_outs[0], CarveOut::exact(&["www.google.com"], Some("/maps")));

        let gate = crate::Gate::new(&rules);
        assert!(gate.classify_before_load("https://t.me/channel").is_divert());
        assert!(gate.classify_before_load("https://www.google.com/maps/x").is_divert());
    }

    #[test]
    fn json_rejects_root_dot_domain() {
        let err = GateRules::from_json(r#"{"external_domains": ["."]}"#).unwrap_err();
        assert!(matches!(err, RulesError::EmptyEntry("external_domains")));
    }

    #[test]
    fn json_rejects_empty_entries() {
        let err = GateRules::from_json(r#"{"failure_url_signals": ["  "]}"#).unwrap_err();
        assert!(matches!(err, RulesError::EmptyEntry("failure_url_signals")));

        let err = GateRules::from_json("{not json").unwrap_err();
        assert!(matches!(err, RulesError::Json(_)));
    }
}
