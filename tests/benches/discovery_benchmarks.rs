//! # Access-Point Discovery Benchmarks
//!
//! | Area | Path measured |
//! |------|---------------|
//! | Selector | select, failure backoff, release on pools up to 1024 |
//! | Orchestrator | submit → response → completion |
//! | Wire | framing, header parse, body and nested decode |

use ap_tests::benchmarks::{selector, wire};
use criterion::{criterion_group, criterion_main, Criterion};

fn selector_benchmarks(c: &mut Criterion) {
    selector::register_benchmarks(c);
}

fn wire_benchmarks(c: &mut Criterion) {
    wire::register_benchmarks(c);
}

criterion_group!(benches, selector_benchmarks, wire_benchmarks);
criterion_main!(benches);
