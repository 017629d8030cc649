//! Selector matching against the arena
//!
//! Right-to-left matching with backtracking on descendant and sibling
//! combinators. `:has()` arguments are matched relative to their anchor
//! element, so `div:has(.a .b)` requires `.a` inside the `div` too.

use crate::arena::DomArena;
use crate::error::Result;
use crate::selector::{
    parse_selector_list, AttrOperator, AttributeSelector, Combinator, ComplexSelector,
    CompoundSelector, PseudoClass, RelativeSelector, SelectorList, SelectorPart,
};
use crate::types::{DomNode, NodeId};

/// Anchor for relative matching: the leftmost compound must stand in
/// `Combinator` relation to this node
type Scope = Option<(NodeId, Combinator)>;

impl DomArena {
    /// `document.querySelectorAll`: connected elements in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = parse_selector_list(selector)?;
        Ok(self.select(&list))
    }

    /// `document.querySelector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// `element.matches`
    pub fn matches(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        let list = parse_selector_list(selector)?;
        Ok(self.matches_list(node_id, &list))
    }

    /// `element.closest`: nearest inclusive ancestor element matching `selector`
    pub fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let list = parse_selector_list(selector)?;
        Ok(self
            .inclusive_ancestors(node_id)
            .find(|&id| self.matches_list(id, &list)))
    }

    /// Run an already parsed selector list over the whole document
    pub fn select(&self, list: &SelectorList) -> Vec<NodeId> {
        if let Some(id) = list.id_only() {
            let candidates = self.elements_with_id(id);
            if candidates.len() <= 1 {
                return candidates.to_vec();
            }
        }

        self.elements_in_document_order()
            .into_iter()
            .filter(|&id| self.matches_list(id, list))
            .collect()
    }

    pub fn matches_list(&self, node_id: NodeId, list: &SelectorList) -> bool {
        list.0
            .iter()
            .any(|complex| self.matches_complex(node_id, complex, None))
    }

    fn matches_complex(&self, node_id: NodeId, complex: &ComplexSelector, scope: Scope) -> bool {
        match complex.parts.len().checked_sub(1) {
            Some(last) => self.match_part(node_id, &complex.parts, last, scope),
            None => false,
        }
    }

    fn match_part(&self, node_id: NodeId, parts: &[SelectorPart], index: usize, scope: Scope) -> bool {
        let part = &parts[index];
        if !self.matches_compound(node_id, &part.compound) {
            return false;
        }

        if index == 0 {
            return match scope {
                None => true,
                Some((anchor, combinator)) => self.related(anchor, node_id, combinator),
            };
        }

        match part.combinator.unwrap_or(Combinator::Descendant) {
            Combinator::Child => self
                .parent_element(node_id)
                .is_some_and(|parent| self.match_part(parent, parts, index - 1, scope)),
            Combinator::Descendant => {
                let mut cursor = self.parent_element(node_id);
                while let Some(ancestor) = cursor {
                    if self.match_part(ancestor, parts, index - 1, scope) {
                        return true;
                    }
                    cursor = self.parent_element(ancestor);
                }
                false
            }
            Combinator::NextSibling => self
                .previous_element_sibling(node_id)
                .is_some_and(|sibling| self.match_part(sibling, parts, index - 1, scope)),
            Combinator::SubsequentSibling => {
                let mut cursor = self.previous_element_sibling(node_id);
                while let Some(sibling) = cursor {
                    if self.match_part(sibling, parts, index - 1, scope) {
                        return true;
                    }
                    cursor = self.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    /// Whether `node_id` stands in `combinator` relation to `anchor`
    fn related(&self, anchor: NodeId, node_id: NodeId, combinator: Combinator) -> bool {
        match combinator {
            Combinator::Child => self.parent_element(node_id) == Some(anchor),
            Combinator::Descendant => self
                .inclusive_ancestors(node_id)
                .skip(1)
                .any(|id| id == anchor),
            Combinator::NextSibling => self.previous_element_sibling(node_id) == Some(anchor),
            Combinator::SubsequentSibling => {
                std::iter::successors(self.previous_element_sibling(node_id), |&id| {
                    self.previous_element_sibling(id)
                })
                .any(|id| id == anchor)
            }
        }
    }

    fn matches_compound(&self, node_id: NodeId, compound: &CompoundSelector) -> bool {
        let Ok(element) = self.get(node_id) else {
            return false;
        };
        if !element.is_element() {
            return false;
        }

        if let Some(tag) = &compound.tag {
            if element.node_name != *tag {
                return false;
            }
        }

        if compound
            .ids
            .iter()
            .any(|id| element.attr("id") != Some(id.as_str()))
        {
            return false;
        }

        if compound.classes.iter().any(|c| !element.has_class(c)) {
            return false;
        }

        if !compound
            .attributes
            .iter()
            .all(|attribute| matches_attribute(element, attribute))
        {
            return false;
        }

        compound
            .pseudo_classes
            .iter()
            .all(|pseudo| self.matches_pseudo(node_id, pseudo))
    }

    fn matches_pseudo(&self, node_id: NodeId, pseudo: &PseudoClass) -> bool {
        match pseudo {
            PseudoClass::Has(relatives) => relatives
                .iter()
                .any(|relative| self.matches_relative(node_id, relative)),
            PseudoClass::Not(list) => !self.matches_list(node_id, list),
            PseudoClass::Is(list) => self.matches_list(node_id, list),
            PseudoClass::FirstChild => self.previous_element_sibling(node_id).is_none(),
            PseudoClass::LastChild => self.next_element_sibling(node_id).is_none(),
            PseudoClass::OnlyChild => {
                self.previous_element_sibling(node_id).is_none()
                    && self.next_element_sibling(node_id).is_none()
            }
        }
    }

    fn matches_relative(&self, anchor: NodeId, relative: &RelativeSelector) -> bool {
        let mut candidates = Vec::new();
        match relative.combinator {
            Combinator::Descendant | Combinator::Child => {
                self.collect_descendant_elements(anchor, &mut candidates);
            }
            Combinator::NextSibling | Combinator::SubsequentSibling => {
                let mut cursor = self.next_element_sibling(anchor);
                while let Some(sibling) = cursor {
                    candidates.push(sibling);
                    self.collect_descendant_elements(sibling, &mut candidates);
                    cursor = self.next_element_sibling(sibling);
                }
            }
        }

        let scope = Some((anchor, relative.combinator));
        candidates
            .into_iter()
            .any(|candidate| self.matches_complex(candidate, &relative.selector, scope))
    }

    fn collect_descendant_elements(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        out.extend(
            self.subtree(node_id)
                .skip(1)
                .filter(|node| node.is_element())
                .map(|node| node.node_id),
        );
    }
}

fn matches_attribute(element: &DomNode, selector: &AttributeSelector) -> bool {
    let Some(actual) = element.attr(&selector.name) else {
        return false;
    };
    let Some((operator, expected)) = &selector.matcher else {
        return true;
    };

    let (actual, expected) = if selector.case_insensitive {
        (actual.to_lowercase(), expected.to_lowercase())
    } else {
        (actual.to_string(), expected.clone())
    };

    match operator {
        AttrOperator::Equals => actual == expected,
        AttrOperator::Includes => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_ascii_whitespace().any(|word| word == expected)
        }
        AttrOperator::DashMatch => {
            actual == expected || actual.starts_with(&format!("{expected}-"))
        }
        AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrOperator::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomError;

    /// body > main#main > (div.card > span.title, div.card > span#badge.title) + p
    fn fixture() -> (DomArena, Vec<NodeId>) {
        let mut arena = DomArena::new_document();
        let body = arena.body().unwrap();

        let main = arena.create_element("main");
        arena.set_attribute(main, "id", "main").unwrap();
        arena.append_child(body, main).unwrap();

        let mut ids = vec![main];
        for badge in [false, true] {
            let card = arena.create_element("div");
            arena.set_attribute(card, "class", "card").unwrap();
            arena.append_child(main, card).unwrap();

            let span = arena.create_element("span");
            arena.set_attribute(span, "class", "title").unwrap();
            if badge {
                arena.set_attribute(span, "id", "badge").unwrap();
            }
            arena.append_child(card, span).unwrap();
            ids.push(card);
            ids.push(span);
        }

        let p = arena.create_element("p");
        arena.set_attribute(p, "data-kind", "promo banner").unwrap();
        arena.append_child(body, p).unwrap();
        ids.push(p);

        (arena, ids)
    }

    #[test]
    fn test_basic_queries() {
        let (arena, ids) = fixture();
        let [main, card1, span1, card2, span2, p] = ids[..] else {
            panic!("fixture shape");
        };

        assert_eq!(arena.query_selector_all("div.card").unwrap(), vec![card1, card2]);
        assert_eq!(arena.query_selector_all("#badge").unwrap(), vec![span2]);
        assert_eq!(arena.query_selector_all("main > div > .title").unwrap(), vec![span1, span2]);
        assert_eq!(arena.query_selector_all("body span").unwrap(), vec![span1, span2]);
        assert_eq!(arena.query_selector_all("#main + p").unwrap(), vec![p]);
        assert_eq!(arena.query_selector_all("div ~ div").unwrap(), vec![card2]);
        assert_eq!(arena.query_selector_all("*").unwrap().len(), 9);
        assert_eq!(arena.query_selector("main").unwrap(), Some(main));
    }

    #[test]
    fn test_descendant_backtracking() {
        let (arena, ids) = fixture();
        // Binding `*` to the nearest ancestor (the card) fails `body >`; `main` must be tried
        assert_eq!(
            arena.query_selector_all("body > * .title").unwrap(),
            vec![ids[2], ids[4]]
        );
        assert!(arena.query_selector_all("p span").unwrap().is_empty());
    }

    #[test]
    fn test_has_is_relative_to_anchor() {
        let (arena, ids) = fixture();
        let card2 = ids[3];

        assert_eq!(arena.query_selector_all("div.card:has(#badge)").unwrap(), vec![card2]);
        assert_eq!(arena.query_selector_all("div:has(> span#badge)").unwrap(), vec![card2]);
        // `main` is an ancestor of the card, not inside it
        assert!(arena.query_selector_all("div:has(main span)").unwrap().is_empty());
        assert_eq!(arena.query_selector_all("main:has(div span#badge)").unwrap(), vec![ids[0]]);
        assert_eq!(arena.query_selector_all("div.card:has(+ div #badge)").unwrap(), vec![ids[1]]);
    }

    #[test]
    fn test_attribute_operators() {
        let (arena, ids) = fixture();
        let p = ids[5];
        for selector in [
            "[data-kind]",
            "[data-kind=\"promo banner\"]",
            "[data-kind~=banner]",
            "[data-kind^=pro]",
            "[data-kind$=ner]",
            "[data-kind*='mo ba']",
            "[data-kind=\"PROMO BANNER\" i]",
        ] {
            assert_eq!(arena.query_selector_all(selector).unwrap(), vec![p], "{selector}");
        }
        assert!(arena.query_selector_all("[data-kind~=\"promo banner\"]").unwrap().is_empty());
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let (arena, ids) = fixture();
        assert_eq!(arena.query_selector_all("div:first-child").unwrap(), vec![ids[1]]);
        assert_eq!(arena.query_selector_all("div:last-child").unwrap(), vec![ids[3]]);
        assert_eq!(arena.query_selector_all("span:only-child").unwrap(), vec![ids[2], ids[4]]);
        assert_eq!(arena.query_selector_all("span:not(#badge)").unwrap(), vec![ids[2]]);
        assert_eq!(arena.query_selector_all(":is(p, main)").unwrap(), vec![ids[0], ids[5]]);
    }

    #[test]
    fn test_closest() {
        let (arena, ids) = fixture();
        assert_eq!(arena.closest(ids[4], ".card").unwrap(), Some(ids[3]));
        assert_eq!(arena.closest(ids[4], "span").unwrap(), Some(ids[4]));
        assert_eq!(arena.closest(ids[4], "p").unwrap(), None);
    }

    #[test]
    fn test_detached_nodes_never_match() {
        let (mut arena, ids) = fixture();
        arena.detach(ids[3]).unwrap();
        assert!(arena.query_selector_all("#badge").unwrap().is_empty());
        assert_eq!(arena.query_selector_all(".card").unwrap(), vec![ids[1]]);
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let (arena, _) = fixture();
        assert!(matches!(
            arena.query_selector_all("div:unknown"),
            Err(DomError::InvalidSelector { .. })
        ));
        assert!(arena.matches(0, "#").is_err());
    }
}
