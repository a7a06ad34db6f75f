//! Provider fan-out benchmarks.
//!
//! Measures one provider update reaching N consumers, once where no consumer's
//! projection changes and once where every consumer re-renders.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parking_lot::Mutex;

use selector_context::host::{Component, Renderer, Setter};
use selector_context::{create_context, use_context_selector, SelectorContext};

#[derive(Debug, Clone, PartialEq)]
struct Counter {
    count: u64,
    label: &'static str,
}

fn mount(consumers: usize, select_count: bool) -> (Renderer, Setter<u64>) {
    let context: SelectorContext<Counter> = create_context(None);
    let setter: Arc<Mutex<Option<Setter<u64>>>> = Arc::default();

    let consumer = {
        let context = context.clone();
        Component::new("Consumer", move |cx, _props: &()| {
            let selected = if select_count {
                use_context_selector(cx, &context, |counter: &Counter| counter.count)
            } else {
                use_context_selector(cx, &context, |counter: &Counter| counter.label.len() as u64)
            };
            black_box(selected);
            Vec::new()
        })
    };
    let root = {
        let setter = Arc::clone(&setter);
        Component::new("Root", move |cx, _props: &()| {
            let (count, set) = cx.use_state(|| 0u64);
            *setter.lock() = Some(set);
            vec![context.provide(
                Counter {
                    count,
                    label: "bench",
                },
                cx.children().to_vec(),
            )]
        })
    };

    let children = (0..consumers)
        .map(|i| consumer.element(()).with_key(i.to_string()))
        .collect();
    let renderer = Renderer::new();
    renderer
        .render(root.element(()).with_children(children))
        .expect("mount benchmark tree");

    let setter = setter.lock().clone().expect("root stored its setter");
    (renderer, setter)
}

fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider_fanout");

    for consumers in [10usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("unchanged_projection", consumers),
            &consumers,
            |b, &consumers| {
                let (_renderer, set) = mount(consumers, false);
                b.iter(|| set.update(|count| count + 1));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("changed_projection", consumers),
            &consumers,
            |b, &consumers| {
                let (_renderer, set) = mount(consumers, true);
                b.iter(|| set.update(|count| count + 1));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_fanout);
criterion_main!(benches);
