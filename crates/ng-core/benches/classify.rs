use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ng_core::{Gate, LoadEvent};

const URLS: &[&str] = &[
    "https://portal.example/start?app_key=abc",
    "https://www.google.com/search?q=rust",
    "https://www.google.com/maps/place/x",
    "https://t.me/somechannel",
    "tel:+15550100",
    "https://cdn.example.com/assets/app.js",
    "http://exa mple.com/",
];

fn bench_before_load(c: &mut Criterion) {
    let gate = Gate::builtin();
    c.bench_function("classify_before_load", |b| {
        b.iter(|| {
            for url in URLS {
                black_box(gate.classify_before_load(black_box(url)));
            }
        })
    });
}

fn bench_after_load(c: &mut Criterion) {
    let gate = Gate::builtin();
    let event = LoadEvent {
        url: "https://portal.example/news/2024/10/article?ref=home",
        title: "Portal - Latest news and updates",
        status: Some(200),
        ..LoadEvent::default()
    };
    c.bench_function("classify_after_load", |b| {
        b.iter(|| black_box(gate.classify_after_load(black_box(&event))))
    });
}

criterion_group!(benches, bench_before_load, bench_after_load);
criterion_main!(benches);
