//! navgate Core Library
//!
//! This crate decides, for an app shell that hosts remote web content in an
//! embedded view, what happens to each navigation:
//!
//! - **Allow**: load it in the view
//! - **Divert**: cancel it and hand the URL to a native app
//! - **Fallback**: the remote content is broken, switch to local screens
//!
//! # Architecture
//!
//! The gate is a pure function over URL strings and a set of immutable
//! classification tables. It does no I/O. The per-screen session wraps the
//! gate with the one-way remote-to-local transition and the back-button
//! state, and drives host effects through the [`session::ShellHost`] trait.
//!
//! # Modules
//!
//! - `types`: Verdicts, load events and fallback causes
//! - `url`: Case-insensitive matching and http(s) host/path parsing
//! - `rules`: Classification tables and the built-in set
//! - `gate`: Before-load and after-load classification
//! - `session`: Screen state machine and collaborator traits

pub mod types;
pub mod url;
pub mod rules;
pub mod gate;
pub mod session;

// Re-export commonly used types
pub use gate::Gate;
pub use rules::{CarveOut, GateRules, HostMatch, InternalService, RulesError};
pub use session::{
    BackAction, ConnectivityProbe, GateSession, OpenError, ProbeError, ScreenMode, ShellHost,
};
pub use types::{AfterLoadResult, FallbackCause, LoadEvent, NavigationVerdict, Verdict, VerdictReason};
