use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{ManualMicrotasks, Runtime};

/// One signal observed by `width` effects; each iteration writes and drains.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let microtasks = ManualMicrotasks::new();
            let rt = Runtime::new(microtasks.clone());
            let (source, set_source) = rt.create_signal(0u64);
            let total = Rc::new(Cell::new(0u64));
            for _ in 0..width {
                let source = source.clone();
                let total = total.clone();
                rt.create_effect(move || total.set(total.get().wrapping_add(source.get())));
            }

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                set_source.set(next);
                microtasks.run_until_idle();
                black_box(total.get())
            });
        });
    }
    group.finish();
}

/// A chain of memos; each flush advances the change one link.
fn bench_memo_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_chain");
    for depth in [4usize, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let microtasks = ManualMicrotasks::new();
            let rt = Runtime::new(microtasks.clone());
            let (source, set_source) = rt.create_signal(0u64);

            let mut tail = rt.create_memo(move || source.get() + 1);
            for _ in 1..depth {
                let previous = tail.clone();
                tail = rt.create_memo(move || previous.get() + 1);
            }

            let mut next = 0u64;
            b.iter(|| {
                next += 1;
                set_source.set(next);
                microtasks.run_until_idle();
                // Drain the links deferred by each pass.
                while rt.pending() > 0 {
                    rt.flush();
                }
                black_box(tail.get_untracked())
            });
        });
    }
    group.finish();
}

/// Creating and disposing a root full of effects.
fn bench_root_churn(c: &mut Criterion) {
    c.bench_function("root_churn_64", |b| {
        let microtasks = ManualMicrotasks::new();
        let rt = Runtime::new(microtasks.clone());
        let (source, _set_source) = rt.create_signal(0u64);

        b.iter(|| {
            let root = rt.create_root(|dispose| {
                for _ in 0..64 {
                    let source = source.clone();
                    rt.create_effect(move || {
                        black_box(source.get());
                    });
                }
                dispose
            });
            root.dispose();
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_memo_chain, bench_root_churn);
criterion_main!(benches);
