//! WebAssembly bindings for navgate

use std::sync::OnceLock;
use wasm_bindgen::prelude::*;
use ng_compiler::{compile_rule_lists, Base};
use ng_core::{
    BackAction,
    FallbackCause,
    Gate,
    GateRules,
    GateSession,
    LoadEvent,
    OpenError,
    ShellHost,
};

static GATE_RULES: OnceLock<GateRules> = OnceLock::new();

/// Installed tables, or the built-in ones when `init` was never called.
fn rules() -> &'static GateRules {
    GATE_RULES.get().unwrap_or_else(GateRules::builtin)
}

fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &JsValue::from_str(key), value);
}

fn cause_names(causes: FallbackCause) -> js_sys::Array {
    let names = js_sys::Array::new();
    for name in causes.names() {
        names.push(&JsValue::from_str(name));
    }
    names
}

#[wasm_bindgen]
pub fn init(rule_lists: JsValue, extend_builtin: bool) -> Result<JsValue, JsValue> {
    if GATE_RULES.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the page to reinitialize."));
    }

    let list_array = js_sys::Array::from(&rule_lists);
    let mut texts = Vec::with_capacity(list_array.length() as usize);
    for value in list_array.iter() {
        let text = value
            .as_string()
            .ok_or_else(|| JsValue::from_str("Rule list must be a string"))?;
        texts.push(text);
    }
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let base = if extend_builtin { Base::Builtin } else { Base::Empty };
    let (compiled, stats) = compile_rule_lists(&text_refs, base).map_err(|e| {
        let message = format!("Failed to compile rule lists: {}", e);
        web_sys::console::warn_1(&JsValue::from_str(&message));
        JsValue::from_str(&message)
    })?;
    let entry_count = compiled.entry_count();

    GATE_RULES
        .set(compiled)
        .map_err(|_| JsValue::from_str("Failed to set gate rules"))?;

    let result = js_sys::Object::new();
    set(&result, "entries", &JsValue::from(entry_count as u32));
    set(&result, "rulesBefore", &JsValue::from(stats.totals.before as u32));
    set(&result, "rulesAfter", &JsValue::from(stats.totals.after as u32));
    set(&result, "rulesDeduped", &JsValue::from(stats.totals.deduped as u32));
    set(&result, "rulesRemoved", &JsValue::from(stats.totals.removed_entries as u32));

    let list_stats = js_sys::Array::new();
    for list in &stats.lists {
        let stat = js_sys::Object::new();
        set(&stat, "lines", &JsValue::from(list.lines as u32));
        set(&stat, "rulesBefore", &JsValue::from(list.entries_before as u32));
        set(&stat, "rulesAfter", &JsValue::from(list.entries_after as u32));
        list_stats.push(&stat);
    }
    set(&result, "listStats", &list_stats);

    Ok(result.into())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    GATE_RULES.get().is_some()
}

#[wasm_bindgen]
pub fn classify_before_load(url: &str) -> JsValue {
    let verdict = Gate::new(rules()).classify_before_load(url);

    let result = js_sys::Object::new();
    set(&result, "verdict", &JsValue::from(verdict.verdict as u8));
    set(&result, "verdictName", &JsValue::from_str(verdict.verdict.as_str()));
    set(&result, "reason", &JsValue::from_str(verdict.reason.as_str()));
    set(&result, "url", &JsValue::from_str(verdict.url));
    result.into()
}

#[wasm_bindgen]
pub fn should_divert(url: &str) -> bool {
    Gate::new(rules()).classify_before_load(url).is_divert()
}

#[wasm_bindgen]
pub fn classify_after_load(
    url: &str,
    title: &str,
    status: Option<u16>,
    transport_error: bool,
    can_go_back: bool,
) -> JsValue {
    let event = LoadEvent {
        url,
        title,
        status,
        transport_error,
        can_go_back,
    };
    let outcome = Gate::new(rules()).classify_after_load(&event);

    let result = js_sys::Object::new();
    set(&result, "canGoBack", &JsValue::from(outcome.can_go_back));
    set(&result, "fallback", &JsValue::from(outcome.fallback));
    set(&result, "causes", &cause_names(outcome.causes));
    result.into()
}

// =============================================================================
// Screen session
// =============================================================================

struct JsHost {
    open_external: js_sys::Function,
    show_local: js_sys::Function,
}

impl ShellHost for JsHost {
    fn open_external(&mut self, url: &str) -> Result<(), OpenError> {
        self.open_external
            .call1(&JsValue::NULL, &JsValue::from_str(url))
            .map(|_| ())
            .map_err(|e| OpenError::Platform(e.as_string().unwrap_or_else(|| format!("{:?}", e))))
    }

    fn show_local(&mut self, cause: FallbackCause) {
        if let Err(e) = self.show_local.call1(&JsValue::NULL, &cause_names(cause)) {
            web_sys::console::warn_2(&JsValue::from_str("show_local callback threw"), &e);
        }
    }
}

/// Gate state for one screen, driven by the web view's event handlers.
#[wasm_bindgen]
pub struct GateScreen {
    session: GateSession<'static>,
    host: JsHost,
}

#[wasm_bindgen]
impl GateScreen {
    /// `online` is the host's one-shot reachability result.
    #[wasm_bindgen(constructor)]
    pub fn new(
        entry_url: String,
        online: bool,
        open_external: js_sys::Function,
        show_local: js_sys::Function,
    ) -> GateScreen {
        let mut probe = online;
        GateScreen {
            session: GateSession::enter(rules(), entry_url, &mut probe),
            host: JsHost {
                open_external,
                show_local,
            },
        }
    }

    #[wasm_bindgen(getter)]
    pub fn showing_remote(&self) -> bool {
        self.session.is_remote()
    }

    #[wasm_bindgen(getter)]
    pub fn entry_url(&self) -> Option<String> {
        self.session.entry_url().map(str::to_string)
    }

    /// Navigation request hook. Returns whether the view may load `url`.
    pub fn should_start_load(&mut self, url: &str) -> bool {
        self.session.before_load(&mut self.host, url)
    }

    /// Navigation state change hook. Returns true when this report made the
    /// screen fall back.
    pub fn navigation_state_changed(&mut self, url: &str, title: &str, can_go_back: bool) -> bool {
        let event = LoadEvent::committed(url, title, can_go_back);
        self.session.after_load(&mut self.host, &event).is_some()
    }

    pub fn http_error(&mut self, url: &str, status: u16) -> bool {
        self.session
            .after_load(&mut self.host, &LoadEvent::http_error(url, status))
            .is_some()
    }

    pub fn load_error(&mut self, url: &str) -> bool {
        self.session
            .after_load(&mut self.host, &LoadEvent::transport_failure(url))
            .is_some()
    }

    /// `"go-back"` or `"exit-app"`.
    pub fn back_action(&self) -> String {
        match self.session.back_action() {
            BackAction::GoBack => "go-back".to_string(),
            BackAction::ExitApp => "exit-app".to_string(),
        }
    }
}
