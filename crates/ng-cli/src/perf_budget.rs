use std::time::Instant;

use ng_core::{Gate, GateRules, LoadEvent};

use crate::rules_file;

pub struct PerfBudgetOptions {
    pub rules_path: Option<String>,
    pub iterations: usize,
}

const BUDGET_COLD_START_MS: f64 = 50.0;
const BUDGET_BEFORE_LOAD_P99_US: f64 = 100.0;
const BUDGET_AFTER_LOAD_P99_US: f64 = 50.0;

const SAMPLE_URLS: &[&str] = &[
    "https://portal.example/news/today",
    "https://t.me/somechannel",
    "https://www.google.com/maps/place/Somewhere",
    "https://accounts.google.com/signin",
    "tg://resolve?domain=channel",
    "mailto:support@portal.example",
    "https://m.youtube.com/watch?v=abc",
    "https://yandex.ru/maps/213/moscow",
    "http://[broken",
];

const SAMPLE_LOADS: &[LoadEvent<'static>] = &[
    LoadEvent {
        url: "https://portal.example/news/today",
        title: "Today",
        status: Some(200),
        transport_error: false,
        can_go_back: true,
    },
    LoadEvent {
        url: "https://portal.example/missing",
        title: "",
        status: Some(404),
        transport_error: false,
        can_go_back: true,
    },
    LoadEvent {
        url: "https://portal.example/r?gmetrck=1",
        title: "Redirecting",
        status: None,
        transport_error: false,
        can_go_back: false,
    },
    LoadEvent {
        url: "https://portal.example/",
        title: "",
        status: None,
        transport_error: true,
        can_go_back: false,
    },
];

pub fn run_perf_budget(opts: PerfBudgetOptions) -> Result<(), String> {
    println!("Performance Budget Check");
    println!("==================================================");

    println!("Loading rule table...");
    let cold_start_begin = Instant::now();
    let rules = rules_file::load_rules(opts.rules_path.as_deref())?;
    let gate = Gate::new(&rules);
    let _ = gate.classify_before_load(SAMPLE_URLS[0]);
    let cold_start_ms = cold_start_begin.elapsed().as_secs_f64() * 1000.0;

    println!("Warming up...");
    for _ in 0..1000 {
        for url in SAMPLE_URLS {
            let _ = gate.classify_before_load(url);
        }
    }

    println!("Measuring classification latency...");
    let before_p99_us = percentile(&measure_before_load(&rules, opts.iterations), 0.99);
    let after_p99_us = percentile(&measure_after_load(&rules, opts.iterations), 0.99);

    let mut passed = true;
    println!();
    println!("Results");
    println!("--------------------------------------------------");

    passed &= report_budget("Cold Start", cold_start_ms, BUDGET_COLD_START_MS, "ms");
    passed &= report_budget("Before-load P99 Latency", before_p99_us, BUDGET_BEFORE_LOAD_P99_US, "μs");
    passed &= report_budget("After-load P99 Latency", after_p99_us, BUDGET_AFTER_LOAD_P99_US, "μs");

    println!();
    println!("==================================================");

    if passed {
        println!("✓ All performance budgets passed");
        Ok(())
    } else {
        Err("Performance budget exceeded".to_string())
    }
}

fn report_budget(name: &str, actual: f64, limit: f64, unit: &str) -> bool {
    let passed = actual <= limit;
    let status = if passed { "✓" } else { "✗" };
    println!(
        "{} {}: {:.2} {} (limit: {:.2} {})",
        status, name, actual, unit, limit, unit
    );
    passed
}

fn measure_before_load(rules: &GateRules, iterations: usize) -> Vec<f64> {
    let gate = Gate::new(rules);
    let mut latencies = Vec::with_capacity(iterations * SAMPLE_URLS.len());

    for _ in 0..iterations {
        for url in SAMPLE_URLS {
            let start = Instant::now();
            let _ = gate.classify_before_load(url);
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
        }
    }

    sort_latencies(&mut latencies);
    latencies
}

fn measure_after_load(rules: &GateRules, iterations: usize) -> Vec<f64> {
    let gate = Gate::new(rules);
    let mut latencies = Vec::with_capacity(iterations * SAMPLE_LOADS.len());

    for _ in 0..iterations {
        for event in SAMPLE_LOADS {
            let start = Instant::now();
            let _ = gate.classify_after_load(event);
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
        }
    }

    sort_latencies(&mut latencies);
    latencies
}

fn sort_latencies(latencies: &mut [f64]) {
    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}
