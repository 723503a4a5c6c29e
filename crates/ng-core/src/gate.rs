//! Navigation Gate
//!
//! Runs on every navigation the embedded view attempts, so the checks are
//! plain scans over small tables. Each rule is its own predicate and
//! [`Gate::classify_before_load`] calls them in priority order:
//!
//! 1. scheme prefix
//! 2. http(s) parse (fail open)
//! 3. carve-outs
//! 4. external domain set, minus internal services

use log::{debug, trace};

use crate::rules::GateRules;
use crate::types::{AfterLoadResult, FallbackCause, LoadEvent, NavigationVerdict, VerdictReason};
use crate::url::{contains_ignore_case, extract_web_scheme, parse_web_target, starts_with_ignore_case};

// =============================================================================
// Predicates
// =============================================================================

/// URL starts with one of the app scheme prefixes.
#[inline]
pub fn matches_scheme_prefix(rules: &GateRules, url: &str) -> bool {
    rules
        .scheme_prefixes
        .iter()
        .any(|prefix| starts_with_ignore_case(url, prefix))
}

/// Host/path hit a carve-out rule.
#[inline]
pub fn matches_carve_out(rules: &GateRules, host: &str, path: &str) -> bool {
    rules.carve_outs.iter().any(|c| c.matches(host, path))
}

/// Host is exactly one of the external domains.
#[inline]
pub fn is_external_domain(rules: &GateRules, host: &str) -> bool {
    rules.external_domains.contains(host)
}

/// Host belongs to an internal web service that stays in-view.
///
/// Anything a carve-out claims is never internal, even when the host
/// carries an internal label.
#[inline]
pub fn is_internal_service(rules: &GateRules, host: &str, path: &str) -> bool {
    if matches_carve_out(rules, host, path) {
        return false;
    }
    rules.internal_service.matches_host(host)
}

/// Status code means the page failed.
#[inline]
pub fn is_error_status(status: u16) -> bool {
    status == 404 || status >= 400
}

/// URL contains a failure signal.
#[inline]
pub fn has_failure_url_signal(rules: &GateRules, url: &str) -> bool {
    rules
        .failure_url_signals
        .iter()
        .any(|signal| contains_ignore_case(url, signal))
}

/// Title contains a failure signal.
#[inline]
pub fn has_failure_title_signal(rules: &GateRules, title: &str) -> bool {
    rules
        .failure_title_signals
        .iter()
        .any(|signal| contains_ignore_case(title, signal))
}

// =============================================================================
// Gate
// =============================================================================

/// The navigation gate.
#[derive(Debug, Clone, Copy)]
pub struct Gate<'r> {
    rules: &'r GateRules,
}

impl Default for Gate<'static> {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Gate<'static> {
    /// Gate over the built-in tables.
    pub fn builtin() -> Self {
        Self::new(GateRules::builtin())
    }
}

impl<'r> Gate<'r> {
    pub fn new(rules: &'r GateRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'r GateRules {
        self.rules
    }

    /// Decide whether a navigation loads in-view or goes to an external app.
    pub fn classify_before_load<'u>(&self, url: &'u str) -> NavigationVerdict<'u> {
        if matches_scheme_prefix(self.rules, url) {
            debug!("divert (scheme): {url}");
            return NavigationVerdict::divert(url, VerdictReason::Scheme);
        }

        if extract_web_scheme(url).is_none() {
            trace!("allow (non-web): {url}");
            return NavigationVerdict::allow(url, VerdictReason::NonWeb);
        }

        let target = match parse_web_target(url) {
            Ok(target) => target,
            Err(e) => {
                debug!("allow (unparseable, {e}): {url}");
                return NavigationVerdict::allow(url, VerdictReason::Unparseable);
            }
        };

        if matches_carve_out(self.rules, &target.host, &target.path) {
            debug!("divert (carve-out): {url}");
            return NavigationVerdict::divert(url, VerdictReason::CarveOut);
        }

        if is_external_domain(self.rules, &target.host) {
            if is_internal_service(self.rules, &target.host, &target.path) {
                trace!("allow (internal service {}): {url}", target.host);
                return NavigationVerdict::allow(url, VerdictReason::InternalService);
            }
            debug!("divert (domain {}): {url}", target.host);
            return NavigationVerdict::divert(url, VerdictReason::Domain);
        }

        trace!("allow ({} {}): {url}", target.scheme.as_str(), target.host);
        NavigationVerdict::allow(url, VerdictReason::Web)
    }

    /// Inspect a completed (or failed) navigation for signs that the remote
    /// content is unreachable.
    pub fn classify_after_load(&self, event: &LoadEvent<'_>) -> AfterLoadResult {
        let mut causes = FallbackCause::empty();

        if event.status.is_some_and(is_error_status) {
            causes |= FallbackCause::HTTP_STATUS;
        }
        if event.transport_error {
            causes |= FallbackCause::TRANSPORT_ERROR;
        }
        if has_failure_url_signal(self.rules, event.url) {
            causes |= FallbackCause::URL_SIGNAL;
        }
        if has_failure_title_signal(self.rules, event.title) {
            causes |= FallbackCause::TITLE_SIGNAL;
        }

        let fallback = !causes.is_empty();
        if fallback {
            debug!(
                "fallback ({:?}, status {:?}): {} [{}]",
                causes, event.status, event.url, event.title
            );
        }

        AfterLoadResult {
            can_go_back: event.can_go_back,
            fallback,
            causes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CarveOut;
    use crate::types::Verdict;
    use proptest::prelude::*;
    use rstest::rstest;

    fn before(url: &str) -> NavigationVerdict<'_> {
        Gate::builtin().classify_before_load(url)
    }

    #[rstest]
    #[case("tel:+15550100", VerdictReason::Scheme)]
    #[case("TG://resolve?domain=x", VerdictReason::Scheme)]
    #[case("intent://scan/#Intent;scheme=zxing;end", VerdictReason::Scheme)]
    #[case("itms-apps://apps.apple.com/app/id1", VerdictReason::Scheme)]
    #[case("mailto:someone@example.com", VerdictReason::Scheme)]
    #[case("https://www.google.com/maps/place/x", VerdictReason::CarveOut)]
    #[case("https://google.com/maps", VerdictReason::CarveOut)]
    #[case("https://yandex.ru/maps/213/moscow", VerdictReason::CarveOut)]
    #[case("https://2gis.ru/moscow", VerdictReason::CarveOut)]
    #[case("https://t.me/somechannel", VerdictReason::Domain)]
    #[case("https://WWW.Instagram.com/p/abc", VerdictReason::Domain)]
    #[case("http://youtu.be/xyz", VerdictReason::Domain)]
    fn diverts(#[case] url: &str, #[case] reason: VerdictReason) {
        let verdict = before(url);
        assert_eq!(verdict.verdict, Verdict::Divert, "{url}");
        assert_eq!(verdict.reason, reason, "{url}");
        assert_eq!(verdict.url, url);
    }

    #[rstest]
    #[case("https://example.com/", VerdictReason::Web)]
    #[case("https://www.google.com/search?q=x", VerdictReason::Web)]
    #[case("https://maps.google.com/maps", VerdictReason::Web)]
    #[case("https://yandex.ru/search/?text=x", VerdictReason::Web)]
    #[case("https://play.google.com/store/apps/details?id=x", VerdictReason::InternalService)]
    #[case("about:blank", VerdictReason::NonWeb)]
    #[case("file:///android_asset/index.html", VerdictReason::NonWeb)]
    #[case("https://", VerdictReason::Unparseable)]
    #[case("http://exa mple.com/", VerdictReason::Unparseable)]
    fn allows(#[case] url: &str, #[case] reason: VerdictReason) {
        let verdict = before(url);
        assert_eq!(verdict.verdict, Verdict::Allow, "{url}");
        assert_eq!(verdict.reason, reason, "{url}");
    }

    #[test]
    fn carve_out_wins_over_internal_service() {
        let rules = GateRules::builtin();
        assert!(is_internal_service(rules, "www.google.com", "/search"));
        assert!(!is_internal_service(rules, "www.google.com", "/maps/place/x"));
        assert!(is_internal_service(rules, "lh3.googleusercontent.com", "/a"));
        assert!(is_internal_service(rules, "fonts.gstatic.com", "/s"));
    }

    #[test]
    fn carve_out_checked_before_domain_set() {
        let mut rules = GateRules::builtin().clone();
        rules.external_domains.insert("www.google.com".to_string());
        let gate = Gate::new(&rules);

        // Domain set alone would keep this in-view as an internal service
        assert_eq!(
            gate.classify_before_load("https://www.google.com/search").reason,
            VerdictReason::InternalService
        );
        assert_eq!(
            gate.classify_before_load("https://www.google.com/maps").reason,
            VerdictReason::CarveOut
        );
    }

    #[test]
    fn scheme_check_precedes_web_parsing() {
        let mut rules = GateRules::default();
        rules.scheme_prefixes.push("https://secure.bank".to_string());
        rules.carve_outs.push(CarveOut::contains("bank", None));
        let gate = Gate::new(&rules);
        assert_eq!(
            gate.classify_before_load("https://secure.bank.example/").reason,
            VerdictReason::Scheme
        );
    }

    #[test]
    fn after_load_http_status() {
        let gate = Gate::builtin();
        let result = gate.classify_after_load(&LoadEvent {
            url: "https://site.com/",
            title: "Home",
            status: Some(404),
            ..LoadEvent::default()
        });
        assert!(result.fallback);
        assert_eq!(result.causes, FallbackCause::HTTP_STATUS);

        let server = gate.classify_after_load(&LoadEvent::http_error("https://site.com/", 503));
        assert!(server.fallback);

        let redirect = gate.classify_after_load(&LoadEvent {
            url: "https://site.com/",
            status: Some(302),
            ..LoadEvent::default()
        });
        assert!(!redirect.fallback);
    }

    #[test]
    fn after_load_url_signal() {
        let result = Gate::builtin().classify_after_load(&LoadEvent {
            url: "https://site.com/ok?x=gmetrck",
            title: "Home",
            status: Some(200),
            ..LoadEvent::default()
        });
        assert!(result.fallback);
        assert_eq!(result.causes, FallbackCause::URL_SIGNAL);
        assert_eq!(result.verdict(), Verdict::Fallback);
    }

    #[test]
    fn after_load_title_signal_ignores_case() {
        let result = Gate::builtin().classify_after_load(&LoadEvent {
            url: "https://site.com/",
            title: "Webpage not available",
            status: Some(200),
            ..LoadEvent::default()
        });
        assert!(result.fallback);
        assert_eq!(result.causes, FallbackCause::TITLE_SIGNAL);

        let upper = Gate::builtin()
            .classify_after_load(&LoadEvent::committed("https://site.com/", "ERR_TOO_MANY_REDIRECTS", false));
        assert!(upper.fallback);
    }

    #[test]
    fn after_load_transport_error() {
        let result = Gate::builtin().classify_after_load(&LoadEvent::transport_failure("https://site.com/"));
        assert!(result.fallback);
        assert_eq!(result.causes, FallbackCause::TRANSPORT_ERROR);
    }

    #[test]
    fn after_load_healthy_page_reports_history() {
        let result = Gate::builtin()
            .classify_after_load(&LoadEvent::committed("https://site.com/news", "News", true));
        assert!(!result.fallback);
        assert!(result.can_go_back);
        assert!(result.causes.is_empty());
        assert_eq!(result.verdict(), Verdict::Allow);
    }

    proptest! {
        #[test]
        fn scheme_prefixed_urls_always_divert(
            idx in 0..crate::rules::BUILTIN_SCHEME_PREFIXES.len(),
            upper in any::<bool>(),
            rest in "[a-zA-Z0-9/?=&.:+%-]{0,40}",
        ) {
            let prefix = crate::rules::BUILTIN_SCHEME_PREFIXES[idx];
            let prefix = if upper { prefix.to_ascii_uppercase() } else { prefix.to_string() };
            let url = format!("{prefix}{rest}");
            let verdict = Gate::builtin().classify_before_load(&url);
            prop_assert_eq!(verdict.verdict, Verdict::Divert);
            prop_assert_eq!(verdict.reason, VerdictReason::Scheme);
        }

        #[test]
        fn malformed_web_urls_fail_open(
            scheme in prop_oneof![Just("http://"), Just("https://"), Just("HTTPS://")],
            host in "[a-z]{1,8} [a-z]{1,8}",
            path in "(/[a-z]{0,6}){0,3}",
        ) {
            let url = format!("{scheme}{host}{path}");
            let verdict = Gate::builtin().classify_before_load(&url);
            prop_assert_eq!(verdict.verdict, Verdict::Allow);
            prop_assert_eq!(verdict.reason, VerdictReason::Unparseable);
        }

        #[test]
        fn error_statuses_always_fall_back(
            status in 400u16..600,
            title in "[a-zA-Z ]{0,20}",
        ) {
            let result = Gate::builtin().classify_after_load(&LoadEvent {
                url: "https://site.com/",
                title: &title,
                status: Some(status),
                ..LoadEvent::default()
            });
            prop_assert!(result.fallback);
            prop_assert!(result.causes.contains(FallbackCause::HTTP_STATUS));
        }
    }
}
