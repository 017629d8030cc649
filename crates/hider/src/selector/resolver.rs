use dom::{DocumentQuery, NodeId};

use super::builder::build_fragment;
use super::descendant::find_unique_descendant;
use super::oracle::is_unique;

/// Turns a clicked element into a selector that matches only it
///
/// Read-only and deterministic: the same document and target always give
/// the same string. Never fails; when nothing unique exists the result is
/// the longest ancestor path tried, which may match more than one element.
pub struct SelectorResolver<'a, D: ?Sized> {
    doc: &'a D,
    class_prefix: &'a str,
}

impl<'a, D> SelectorResolver<'a, D>
where
    D: DocumentQuery + ?Sized,
{
    pub fn new(doc: &'a D, class_prefix: &'a str) -> Self {
        Self { doc, class_prefix }
    }

    pub fn fragment(&self, node: NodeId) -> String {
        build_fragment(self.doc, node, self.class_prefix)
    }

    pub fn resolve(&self, target: NodeId) -> String {
        let own = self.fragment(target);
        if is_unique(self.doc, &own) {
            return own;
        }

        let with_descendant = find_unique_descendant(self.doc, target, self.class_prefix)
            .map(|descendant| format!("{own}:has({descendant})"));
        if let Some(candidate) = &with_descendant {
            if is_unique(self.doc, candidate) {
                return candidate.clone();
            }
        }

        // parts[0] is the outermost ancestor, the target's own fragment is last
        let mut ancestors: Vec<String> = Vec::new();
        let document_element = self.doc.document_element();
        let body = self.doc.body();
        let mut current = self.doc.parent_element(target);

        while let Some(ancestor) = current {
            if Some(ancestor) == document_element || Some(ancestor) == body {
                break;
            }
            let fragment = self.fragment(ancestor);
            let id_rooted = fragment.starts_with('#');
            ancestors.insert(0, fragment);

            let path = join_path(&ancestors, &own);
            if is_unique(self.doc, &path) {
                return path;
            }

            if let Some(candidate) = &with_descendant {
                let path = join_path(&ancestors, candidate);
                if is_unique(self.doc, &path) {
                    return path;
                }
            }

            // An id-rooted path is as specific as walking upward gets
            if id_rooted {
                break;
            }
            current = self.doc.parent_element(ancestor);
        }

        match with_descendant {
            Some(candidate) => candidate,
            None => join_path(&ancestors, &own),
        }
    }
}

fn join_path(ancestors: &[String], last: &str) -> String {
    let mut path = ancestors.join(" ");
    if !path.is_empty() {
        path.push(' ');
    }
    path.push_str(last);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::DomArena;

    struct Page {
        arena: DomArena,
    }

    impl Page {
        fn new() -> Self {
            Self {
                arena: DomArena::new_document(),
            }
        }

        fn body(&self) -> NodeId {
            self.arena.body().unwrap()
        }

        fn add(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
            let node = self.arena.create_element(tag);
            for (name, value) in attrs {
                self.arena.set_attribute(node, name, value).unwrap();
            }
            self.arena.append_child(parent, node).unwrap();
            node
        }

        fn resolve(&self, target: NodeId) -> String {
            SelectorResolver::new(&self.arena, "eh-").resolve(target)
        }

        fn assert_unique_for(&self, target: NodeId) -> String {
            let selector = self.resolve(target);
            assert_eq!(
                self.arena.query_selector_all(&selector).unwrap(),
                vec![target],
                "{selector}"
            );
            selector
        }
    }

    #[test]
    fn test_simple_unique_id() {
        let mut page = Page::new();
        let body = page.body();
        let banner = page.add(body, "div", &[("id", "ad-banner")]);
        page.add(banner, "img", &[]);

        assert_eq!(page.resolve(banner), "#ad-banner");
    }

    #[test]
    fn test_repeated_class_unique_via_descendant() {
        let mut page = Page::new();
        let body = page.body();
        let _plain = page.add(body, "div", &[("class", "card")]);
        let with_badge = page.add(body, "div", &[("class", "card")]);
        page.add(with_badge, "span", &[("id", "unique-badge")]);

        assert_eq!(page.resolve(with_badge), "div.card:has(#unique-badge)");
        page.assert_unique_for(with_badge);
    }

    #[test]
    fn test_anonymous_nesting_uses_ancestor_chain() {
        let mut page = Page::new();
        let body = page.body();
        let outer = page.add(body, "div", &[]);
        let middle = page.add(outer, "div", &[]);
        let inner = page.add(middle, "div", &[]);

        assert_eq!(page.resolve(inner), "div div div");
        page.assert_unique_for(inner);
    }

    #[test]
    fn test_ancestor_chain_with_descendant_variant() {
        // div.item > section.b > (div.item[target] > span#star, div.item)
        let mut page = Page::new();
        let body = page.body();
        let outer = page.add(body, "div", &[("class", "item")]);
        let section = page.add(outer, "section", &[("class", "b")]);
        let target = page.add(section, "div", &[("class", "item")]);
        page.add(target, "span", &[("id", "star")]);
        page.add(section, "div", &[("class", "item")]);

        // `div.item:has(#star)` also matches the outer item
        assert_eq!(page.resolve(target), "section.b div.item:has(#star)");
        page.assert_unique_for(target);
    }

    #[test]
    fn test_stops_at_id_rooted_ancestor() {
        let mut page = Page::new();
        let body = page.body();
        let wrap = page.add(body, "div", &[("class", "wrap")]);
        let main = page.add(wrap, "main", &[("id", "content")]);
        let target = page.add(main, "p", &[]);
        page.add(main, "p", &[]);

        // Not unique, but `div.wrap` is never prepended
        assert_eq!(page.resolve(target), "#content p");
    }

    #[test]
    fn test_pathological_twins_are_best_effort() {
        let mut page = Page::new();
        let body = page.body();
        let left = page.add(body, "div", &[]);
        let target = page.add(left, "span", &[]);
        let right = page.add(body, "div", &[]);
        page.add(right, "span", &[]);

        let selector = page.resolve(target);
        assert_eq!(selector, "div span");
        assert_eq!(page.arena.query_selector_all(&selector).unwrap().len(), 2);
    }

    #[test]
    fn test_detached_target_still_resolves() {
        let mut page = Page::new();
        let body = page.body();
        page.add(body, "p", &[]);
        let loose = page.arena.create_element("p");
        assert_eq!(page.resolve(loose), "p");
    }

    #[test]
    fn test_every_element_of_a_realistic_page() {
        let mut page = Page::new();
        let body = page.body();
        let header = page.add(body, "header", &[("class", "site-header")]);
        page.add(header, "a", &[("class", "logo"), ("href", "/")]);
        let nav = page.add(header, "nav", &[]);
        for href in ["/news", "/sport", "/weather"] {
            page.add(nav, "a", &[("class", "nav-link"), ("href", href)]);
        }
        let feed = page.add(body, "main", &[("id", "feed")]);
        for n in 0..3 {
            let post = page.add(feed, "article", &[("class", "post eh-highlight")]);
            let title = page.add(post, "h2", &[("class", "title")]);
            let id = format!("post-{n}");
            page.add(title, "a", &[("id", id.as_str())]);
            let excerpt = format!("excerpt excerpt-{n}");
            page.add(post, "p", &[("class", excerpt.as_str())]);
        }
        let aside = page.add(body, "aside", &[]);
        page.add(aside, "div", &[("class", "ad"), ("data-slot", "1")]);

        let targets: Vec<NodeId> = page
            .arena
            .elements_in_document_order()
            .into_iter()
            .filter(|&n| Some(n) != page.arena.body() && Some(n) != page.arena.document_element())
            .filter(|&n| page.arena.parent_element(n) != page.arena.document_element())
            .collect();

        for target in targets {
            let first = page.assert_unique_for(target);
            // Same document, same answer
            assert_eq!(page.resolve(target), first);
        }
    }
}
