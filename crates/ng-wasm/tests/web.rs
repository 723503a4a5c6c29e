#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

use ng_wasm::{classify_after_load, classify_before_load, init, is_initialized, should_divert, GateScreen};

fn get(obj: &JsValue, key: &str) -> JsValue {
    js_sys::Reflect::get(obj, &JsValue::from_str(key)).unwrap()
}

#[wasm_bindgen_test]
fn before_load_reports_verdict_and_reason() {
    let result = classify_before_load("https://www.google.com/maps/place/x");
    assert_eq!(get(&result, "verdictName").as_string().unwrap(), "divert");
    assert_eq!(get(&result, "reason").as_string().unwrap(), "carve-out");

    assert!(should_divert("tg://resolve?domain=x"));
    assert!(!should_divert("https://www.google.com/search?q=x"));
}

#[wasm_bindgen_test]
fn after_load_lists_causes() {
    let result = classify_after_load("https://site.com/ok?x=gmetrck", "Home", Some(200), false, true);
    assert_eq!(get(&result, "fallback").as_bool(), Some(true));
    assert_eq!(get(&result, "canGoBack").as_bool(), Some(true));
    let causes = js_sys::Array::from(&get(&result, "causes"));
    assert_eq!(causes.length(), 1);
    assert_eq!(causes.get(0).as_string().unwrap(), "URL_SIGNAL");
}

#[wasm_bindgen_test]
fn screen_routes_diverts_and_falls_back_once() {
    let opened = Rc::new(RefCell::new(Vec::<String>::new()));
    let fallbacks = Rc::new(RefCell::new(0u32));

    let opened_cb = opened.clone();
    let open = Closure::<dyn FnMut(String)>::new(move |url: String| opened_cb.borrow_mut().push(url));
    let fallbacks_cb = fallbacks.clone();
    let show_local = Closure::<dyn FnMut(JsValue)>::new(move |_causes: JsValue| {
        *fallbacks_cb.borrow_mut() += 1;
    });

    let mut screen = GateScreen::new(
        "https://portal.example/start".to_string(),
        true,
        open.as_ref().unchecked_ref::<js_sys::Function>().clone(),
        show_local.as_ref().unchecked_ref::<js_sys::Function>().clone(),
    );

    assert!(screen.showing_remote());
    assert!(!screen.should_start_load("https://t.me/somechannel"));
    assert!(screen.should_start_load("https://portal.example/page"));
    assert!(!screen.navigation_state_changed("https://portal.example/page", "Page", true));
    assert_eq!(screen.back_action(), "go-back");

    assert!(screen.http_error("https://portal.example/missing", 404));
    assert!(!screen.load_error("https://portal.example/other"));
    assert!(!screen.showing_remote());
    assert_eq!(screen.back_action(), "exit-app");

    assert_eq!(opened.borrow().as_slice(), ["https://t.me/somechannel".to_string()]);
    assert_eq!(*fallbacks.borrow(), 1);
}

#[wasm_bindgen_test]
fn init_reports_stats_per_list() {
    let lists = js_sys::Array::new();
    lists.push(&JsValue::from_str("domain discord.gg\ndomain discord.gg\n"));
    lists.push(&JsValue::from_str("! extra signals\nfail-title 502 bad gateway\n"));

    let stats = init(lists.clone().into(), true).unwrap();
    assert!(is_initialized());
    assert_eq!(get(&stats, "rulesBefore").as_f64(), Some(3.0));
    assert_eq!(get(&stats, "rulesDeduped").as_f64(), Some(1.0));

    let per_list = js_sys::Array::from(&get(&stats, "listStats"));
    assert_eq!(per_list.length(), 2);
    assert_eq!(get(&per_list.get(0), "rulesAfter").as_f64(), Some(1.0));
    assert_eq!(get(&per_list.get(1), "lines").as_f64(), Some(2.0));

    assert!(should_divert("https://discord.gg/invite"));
    assert!(init(lists.into(), true).is_err());
}
