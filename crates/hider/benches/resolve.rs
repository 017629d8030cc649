use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dom::{DomArena, NodeId};
use hider::SelectorResolver;

/// Feed-style page: `main > article.post*n > (header > h2, div.body > p*3, footer > a)`.
/// Nothing carries an id, so every resolution walks ancestors.
fn build_feed(posts: usize) -> (DomArena, Vec<NodeId>) {
    let mut arena = DomArena::new_document();
    let body = arena.body().unwrap();
    let main = arena.create_element("main");
    arena.append_child(body, main).unwrap();

    let mut targets = Vec::new();
    for i in 0..posts {
        let post = arena.create_element("article");
        arena.set_attribute(post, "class", "post").unwrap();
        arena.append_child(main, post).unwrap();

        let header = arena.create_element("header");
        let title = arena.create_element("h2");
        arena.append_child(post, header).unwrap();
        arena.append_child(header, title).unwrap();

        let content = arena.create_element("div");
        arena.set_attribute(content, "class", "body").unwrap();
        arena.append_child(post, content).unwrap();
        for _ in 0..3 {
            let p = arena.create_element("p");
            arena.append_child(content, p).unwrap();
        }

        let footer = arena.create_element("footer");
        let link = arena.create_element("a");
        arena.set_attribute(link, "href", &format!("/post/{i}")).unwrap();
        arena.append_child(post, footer).unwrap();
        arena.append_child(footer, link).unwrap();

        targets.push(post);
    }
    (arena, targets)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for posts in [10, 100] {
        let (arena, targets) = build_feed(posts);
        let resolver = SelectorResolver::new(&arena, "eh-");
        let middle = targets[posts / 2];

        group.bench_with_input(BenchmarkId::new("article_via_has", posts), &middle, |b, &node| {
            b.iter(|| resolver.resolve(black_box(node)))
        });

        let paragraph = arena.element_children(arena.element_children(middle)[1])[2];
        group.bench_with_input(BenchmarkId::new("nested_paragraph", posts), &paragraph, |b, &node| {
            b.iter(|| resolver.resolve(black_box(node)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
