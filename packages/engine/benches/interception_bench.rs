// packages/engine/benches/interception_bench.rs
//! Rewrite cost per intercepted call

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use srproxy_engine::interception::{CallArg, InterceptionPoint, InterceptionRegistry};
use srproxy_engine::interception::{OverrideSnapshot, RewriteEngine};

fn bench_rewrite(c: &mut Criterion) {
    let engine = RewriteEngine::new();
    let active = OverrideSnapshot::new(true, "https://custom.example:9000");
    let inactive = OverrideSnapshot::default();
    let url = "https://api.mihoyo.com/combo/granter/login/v2/login?app_id=11";
    let payload = r#"{"retcode":0,"data":{"gate":"https://globaldp-prod-os01.bhsr.com/query_dispatch","cdn":"https://autopatchos.hoyoverse.com/res","name":"prod_official_asia"}}"#;

    c.bench_function("rewrite_inactive", |b| {
        b.iter(|| engine.rewrite(black_box(url), &inactive))
    });

    c.bench_function("rewrite_url", |b| {
        b.iter(|| engine.rewrite(black_box(url), &active))
    });

    c.bench_function("rewrite_unmatched", |b| {
        b.iter(|| engine.rewrite(black_box("https://example.org/index.html"), &active))
    });

    c.bench_function("rewrite_json_payload", |b| {
        b.iter(|| engine.rewrite(black_box(payload), &active))
    });
}

fn bench_intercept(c: &mut Criterion) {
    let engine = RewriteEngine::new();
    let registry = InterceptionRegistry::with_all();
    let active = OverrideSnapshot::new(true, "https://custom.example:9000");

    c.bench_function("intercept_request_builder", |b| {
        b.iter(|| {
            registry.intercept(
                InterceptionPoint::OkHttpRequestBuilderUrl,
                vec![CallArg::str("https://sdk.hoyoverse.com/combo/box/api/config")],
                &engine,
                &active,
            )
        })
    });
}

criterion_group!(benches, bench_rewrite, bench_intercept);
criterion_main!(benches);
