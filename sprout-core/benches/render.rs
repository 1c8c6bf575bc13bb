use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sprout_core::{h, use_state, Component, Document, Element, Props, Renderer, Store};

fn table(rows: usize) -> Element {
    h("table")
        .children((0..rows).map(|i| {
            h("tr")
                .key(i)
                .child(h("td").child(i))
                .child(h("td").child(format!("row {i}")))
        }))
        .build()
}

fn identity_short_circuit(c: &mut Criterion) {
    let document = Document::new();
    let body = document.body();
    let mut renderer = Renderer::new(document, Store::new());
    let element = table(1_000);
    renderer.render(element.clone(), body).expect("initial render");

    c.bench_function("identity_short_circuit_1000_rows", |b| {
        b.iter(|| {
            renderer
                .render(black_box(element.clone()), body)
                .expect("render");
        });
    });
}

fn keyed_list_rerender(c: &mut Criterion) {
    let row = Component::new("Row", |props: &Props| {
        let (selected, _) = use_state(|| false)?;
        let label = props.str("label").unwrap_or_default();
        Ok(h("li")
            .class_name(if selected { "selected" } else { "" })
            .child(label.to_string())
            .build())
    });
    let list = |order: &[usize]| {
        h("ul")
            .children(order.iter().map(|&i| {
                row.keyed(i, Props::new().with("label", format!("item {i}")))
            }))
            .build()
    };

    let mut group = c.benchmark_group("keyed_list_rerender");
    for size in [100usize, 1_000] {
        let document = Document::new();
        let body = document.body();
        let mut renderer = Renderer::new(document, Store::new());
        let forward: Vec<usize> = (0..size).collect();
        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        renderer.render(list(&forward), body).expect("initial render");
        renderer.flush().expect("flush");

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let order = if flip { &reversed } else { &forward };
                renderer.render(list(order), body).expect("render");
                renderer.flush().expect("flush");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, identity_short_circuit, keyed_list_rerender);
criterion_main!(benches);
