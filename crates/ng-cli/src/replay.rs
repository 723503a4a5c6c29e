use std::fs;

use serde::{Deserialize, Serialize};

use ng_core::{BackAction, FallbackCause, GateRules, GateSession, LoadEvent, OpenError, ShellHost};

use crate::rules_file;

/// A recorded gate screen session.
#[derive(Debug, Deserialize)]
pub struct Trace {
    pub entry_url: String,
    /// Result of the entry connectivity probe
    #[serde(default = "default_online")]
    pub online: bool,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

fn default_online() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    Navigate {
        url: String,
    },
    Loaded {
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        can_go_back: bool,
    },
    HttpError {
        url: String,
        status: u16,
    },
    LoadError {
        url: String,
    },
    Back,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Loaded,
    OpenedExternal { url: String },
    ShowedLocal { causes: Vec<&'static str> },
    GoBack,
    ExitApp,
    Ignored,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub started_remote: bool,
    pub effects: Vec<Effect>,
    pub ended_remote: bool,
}

#[derive(Default)]
struct TraceHost {
    effects: Vec<Effect>,
}

impl ShellHost for TraceHost {
    fn open_external(&mut self, url: &str) -> Result<(), OpenError> {
        self.effects.push(Effect::OpenedExternal { url: url.to_string() });
        Ok(())
    }

    fn show_local(&mut self, cause: FallbackCause) {
        self.effects.push(Effect::ShowedLocal { causes: cause.names() });
    }
}

/// Drive a session through the trace and collect the host effects in order.
pub fn replay_trace(rules: &GateRules, trace: &Trace) -> ReplayReport {
    let mut probe = trace.online;
    let mut session = GateSession::enter(rules, trace.entry_url.as_str(), &mut probe);
    let started_remote = session.is_remote();
    let mut host = TraceHost::default();

    for event in &trace.events {
        let before = host.effects.len();
        match event {
            TraceEvent::Navigate { url } => {
                if session.before_load(&mut host, url) {
                    host.effects.push(Effect::Loaded);
                }
            }
            TraceEvent::Loaded {
                url,
                title,
                can_go_back,
            } => {
                session.after_load(&mut host, &LoadEvent::committed(url, title, *can_go_back));
            }
            TraceEvent::HttpError { url, status } => {
                session.after_load(&mut host, &LoadEvent::http_error(url, *status));
            }
            TraceEvent::LoadError { url } => {
                session.after_load(&mut host, &LoadEvent::transport_failure(url));
            }
            TraceEvent::Back => host.effects.push(match session.back_action() {
                BackAction::GoBack => Effect::GoBack,
                BackAction::ExitApp => Effect::ExitApp,
            }),
        }
        if host.effects.len() == before {
            host.effects.push(Effect::Ignored);
        }
    }

    ReplayReport {
        started_remote,
        effects: host.effects,
        ended_remote: session.is_remote(),
    }
}

pub fn run_replay(rules_path: Option<&str>, input: &str, json: bool) -> Result<(), String> {
    let rules = rules_file::load_rules(rules_path)?;
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;
    let trace: Trace = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid trace '{}': {}", input, e))?;

    let report = replay_trace(&rules, &trace);

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Replay: {}", input);
    println!("  Start:  {}", if report.started_remote { "remote" } else { "local" });
    for (event, effect) in trace.events.iter().zip(&report.effects) {
        println!("  {:<40} {:?}", describe(event), effect);
    }
    println!("  End:    {}", if report.ended_remote { "remote" } else { "local" });
    Ok(())
}

fn describe(event: &TraceEvent) -> String {
    match event {
        TraceEvent::Navigate { url } => format!("navigate {}", url),
        TraceEvent::Loaded { url, .. } => format!("loaded {}", url),
        TraceEvent::HttpError { url, status } => format!("http {} {}", status, url),
        TraceEvent::LoadError { url } => format!("load error {}", url),
        TraceEvent::Back => "back".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Trace {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn diverts_then_falls_back_once() {
        let trace = parse(
            r#"{
                "entry_url": "https://portal.example/",
                "events": [
                    {"type": "navigate", "url": "https://t.me/channel"},
                    {"type": "navigate", "url": "https://portal.example/page"},
                    {"type": "loaded", "url": "https://portal.example/page", "title": "Page", "can_go_back": true},
                    {"type": "back"},
                    {"type": "http_error", "url": "https://portal.example/gone", "status": 404},
                    {"type": "load_error", "url": "https://portal.example/other"},
                    {"type": "back"}
                ]
            }"#,
        );

        let report = replay_trace(GateRules::builtin(), &trace);
        assert!(report.started_remote);
        assert!(!report.ended_remote);
        assert_eq!(
            report.effects,
            vec![
                Effect::OpenedExternal {
                    url: "https://t.me/channel".to_string()
                },
                Effect::Loaded,
                Effect::Ignored,
                Effect::GoBack,
                Effect::ShowedLocal {
                    causes: vec!["HTTP_STATUS"]
                },
                Effect::Ignored,
                Effect::ExitApp,
            ]
        );
    }

    #[test]
    fn offline_entry_never_loads() {
        let trace = parse(
            r#"{
                "entry_url": "https://portal.example/",
                "online": false,
                "events": [
                    {"type": "navigate", "url": "https://portal.example/"},
                    {"type": "back"}
                ]
            }"#,
        );

        let report = replay_trace(GateRules::builtin(), &trace);
        assert!(!report.started_remote);
        assert_eq!(report.effects, vec![Effect::Ignored, Effect::ExitApp]);
    }

    #[test]
    fn title_signal_reports_cause() {
        let trace = parse(
            r#"{
                "entry_url": "https://portal.example/",
                "events": [
                    {"type": "loaded", "url": "https://portal.example/", "title": "Webpage not available"}
                ]
            }"#,
        );

        let report = replay_trace(GateRules::builtin(), &trace);
        assert_eq!(
            report.effects,
            vec![Effect::ShowedLocal {
                causes: vec!["TITLE_SIGNAL"]
            }]
        );
    }
}
