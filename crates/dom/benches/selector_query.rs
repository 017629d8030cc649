use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dom::{DomArena, NodeId};

/// `body > section*n > div.card*8 > (span.title, a[href])`
fn build_page(sections: usize) -> (DomArena, NodeId) {
    let mut arena = DomArena::new_document();
    let body = arena.body().unwrap();
    let mut last_link = body;

    for s in 0..sections {
        let section = arena.create_element("section");
        arena.append_child(body, section).unwrap();
        for c in 0..8 {
            let card = arena.create_element("div");
            arena.set_attribute(card, "class", "card item").unwrap();
            arena.append_child(section, card).unwrap();

            let title = arena.create_element("span");
            arena.set_attribute(title, "class", "title").unwrap();
            arena.append_child(card, title).unwrap();

            let link = arena.create_element("a");
            arena
                .set_attribute(link, "href", &format!("/s/{s}/c/{c}"))
                .unwrap();
            arena.append_child(card, link).unwrap();
            last_link = link;
        }
    }
    (arena, last_link)
}

fn bench_query_selector_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_selector_all");

    for sections in [10, 100] {
        let (arena, _) = build_page(sections);
        for selector in [
            "div.card",
            "section div.card > a[href^=\"/s/9\"]",
            "div.card:has(a[href=\"/s/9/c/7\"])",
        ] {
            group.bench_with_input(
                BenchmarkId::new(selector, sections),
                &selector,
                |b, selector| b.iter(|| arena.query_selector_all(black_box(selector))),
            );
        }
    }

    group.finish();
}

fn bench_computed_visibility(c: &mut Criterion) {
    let (mut arena, link) = build_page(50);
    let style = arena.create_element("style");
    arena
        .set_text_content(style, "div.card:has(a[href=\"/s/49/c/7\"]) { display: none !important; }")
        .unwrap();
    let html = arena.document_element().unwrap();
    arena.append_child(html, style).unwrap();

    c.bench_function("computed_visibility", |b| {
        b.iter(|| arena.computed_visibility(black_box(link)))
    });
}

criterion_group!(benches, bench_query_selector_all, bench_computed_visibility);
criterion_main!(benches);
