//! Per-screen gate session
//!
//! A [`GateSession`] lives as long as one gate screen. It owns the only
//! mutable state around the gate: which surface is mounted and whether the
//! embedded view can navigate back. Everything runs on the host's event
//! queue, so methods take `&mut self` and nothing is locked.
//!
//! The screen starts on the remote page only if the connectivity probe
//! succeeds. Once a load is flagged the session drops to local screens and
//! stays there; later view events are ignored.

use log::debug;

use crate::gate::Gate;
use crate::rules::GateRules;
use crate::types::{FallbackCause, LoadEvent, Verdict};

// =============================================================================
// Collaborators
// =============================================================================

/// Error type for a failed connectivity probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Connectivity probe failed: {0}")]
    Failed(String),
    #[error("Connectivity probe timed out")]
    Timeout,
}

/// Error type for handing a URL to the platform.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("No application can open {0}")]
    NoHandler(String),
    #[error("Platform refused to open URL: {0}")]
    Platform(String),
}

/// One-shot reachability check run at screen entry.
pub trait ConnectivityProbe {
    fn is_reachable(&mut self) -> Result<bool, ProbeError>;
}

impl<F> ConnectivityProbe for F
where
    F: FnMut() -> Result<bool, ProbeError>,
{
    fn is_reachable(&mut self) -> Result<bool, ProbeError> {
        self()
    }
}

/// A reachability answer the host already has.
impl ConnectivityProbe for bool {
    fn is_reachable(&mut self) -> Result<bool, ProbeError> {
        Ok(*self)
    }
}

/// Host-side effects the session drives.
pub trait ShellHost {
    /// Hand a URL to the OS. Best effort.
    fn open_external(&mut self, url: &str) -> Result<(), OpenError>;

    /// Unmount the web view and mount the local screen stack.
    fn show_local(&mut self, cause: FallbackCause);
}

// =============================================================================
// Session
// =============================================================================

/// Which surface the screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    ShowingRemote,
    /// Terminal for the lifetime of the session
    ShowingLocal,
}

/// What the back button should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    /// Navigate the embedded view one step back
    GoBack,
    /// Leave the application
    ExitApp,
}

/// Gate state for one screen instance.
#[derive(Debug)]
pub struct GateSession<'r> {
    gate: Gate<'r>,
    entry_url: String,
    mode: ScreenMode,
    can_go_back: bool,
    fallback_cause: Option<FallbackCause>,
}

impl<'r> GateSession<'r> {
    /// Enter the screen. Runs the probe once; a probe error counts as
    /// offline.
    pub fn enter<P>(rules: &'r GateRules, entry_url: impl Into<String>, probe: &mut P) -> Self
    where
        P: ConnectivityProbe + ?Sized,
    {
        let online = match probe.is_reachable() {
            Ok(online) => online,
            Err(e) => {
                debug!("treating probe failure as offline: {e}");
                false
            }
        };

        let mode = if online {
            ScreenMode::ShowingRemote
        } else {
            ScreenMode::ShowingLocal
        };
        debug!("gate screen entered: {mode:?}");

        Self {
            gate: Gate::new(rules),
            entry_url: entry_url.into(),
            mode,
            can_go_back: false,
            fallback_cause: None,
        }
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn is_remote(&self) -> bool {
        self.mode == ScreenMode::ShowingRemote
    }

    pub fn can_go_back(&self) -> bool {
        self.can_go_back
    }

    /// URL the web view should load first, `None` once showing local.
    pub fn entry_url(&self) -> Option<&str> {
        self.is_remote().then_some(self.entry_url.as_str())
    }

    /// Cause of the fallback, if one happened during this session.
    pub fn fallback_cause(&self) -> Option<FallbackCause> {
        self.fallback_cause
    }

    /// Navigation request from the web view. Returns whether the view may
    /// start loading `url`.
    pub fn before_load<H>(&mut self, host: &mut H, url: &str) -> bool
    where
        H: ShellHost + ?Sized,
    {
        if !self.is_remote() {
            return false;
        }

        let verdict = self.gate.classify_before_load(url);
        if verdict.verdict != Verdict::Divert {
            return true;
        }

        if let Err(e) = host.open_external(verdict.url) {
            debug!("external open failed, ignoring: {e}");
        }
        false
    }

    /// Load-state report from the web view. Returns the cause when this
    /// report switched the screen to local content.
    pub fn after_load<H>(&mut self, host: &mut H, event: &LoadEvent<'_>) -> Option<FallbackCause>
    where
        H: ShellHost + ?Sized,
    {
        if !self.is_remote() {
            return None;
        }

        let result = self.gate.classify_after_load(event);
        self.can_go_back = result.can_go_back;
        if !result.fallback {
            return None;
        }

        self.mode = ScreenMode::ShowingLocal;
        self.can_go_back = false;
        self.fallback_cause = Some(result.causes);
        host.show_local(result.causes);
        Some(result.causes)
    }

    /// Hardware/software back press.
    pub fn back_action(&self) -> BackAction {
        if self.is_remote() && self.can_go_back {
            BackAction::GoBack
        } else {
            BackAction::ExitApp
        }
    }
}
