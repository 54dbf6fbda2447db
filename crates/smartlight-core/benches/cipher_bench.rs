//! Criterion benchmarks for the autokey cipher.
//!
//! Measures encrypt/decrypt latency for the message sizes seen in practice:
//! a bare sysinfo query, a light transition, and a large sysinfo reply.
//!
//! Run with:
//! ```bash
//! cargo bench --package smartlight-core --bench cipher_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smartlight_core::protocol::cipher::{decrypt, decrypt_framed, encrypt, encrypt_framed};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn fixtures() -> Vec<(&'static str, String)> {
    vec![
        ("sysinfo_query", r#"{"system":{"get_sysinfo":null}}"#.to_string()),
        (
            "transition",
            r#"{"smartlife.iot.smartbulb.lightingservice":{"transition_light_state":{"hue":120,"saturation":60,"brightness":60,"transition_period":5000}}}"#
                .to_string(),
        ),
        ("reply_2k", format!(r#"{{"system":{{"get_sysinfo":{{"pad":"{}"}}}}}}"#, "x".repeat(2000))),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::new("plain", name), &msg, |b, msg| {
            b.iter(|| encrypt(black_box(msg)))
        });
        group.bench_with_input(BenchmarkId::new("framed", name), &msg, |b, msg| {
            b.iter(|| encrypt_framed(black_box(msg)))
        });
    }
    group.finish();
}

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt");
    for (name, msg) in fixtures() {
        let plain = encrypt(&msg);
        let framed = encrypt_framed(&msg);
        group.bench_with_input(BenchmarkId::new("plain", name), &plain, |b, bytes| {
            b.iter(|| decrypt(black_box(bytes)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("framed", name), &framed, |b, bytes| {
            b.iter(|| decrypt_framed(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encrypt, bench_decrypt);
criterion_main!(benches);
