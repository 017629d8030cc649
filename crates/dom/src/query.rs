//! Injectable document query capability
//!
//! Selector synthesis only ever needs to read the page: count matches for a
//! candidate selector and look at an element's tag, attributes and
//! neighbours. `DocumentQuery` is that read surface, so the synthesis code
//! can run against the arena, a live page bridge, or a test double.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::NodeId;

pub trait DocumentQuery {
    /// All connected elements matching `selector`, in document order.
    /// Invalid selector syntax is an error, never a panic.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// Number of matches; override when counting is cheaper than collecting
    fn count_matches(&self, selector: &str) -> Result<usize> {
        Ok(self.query_selector_all(selector)?.len())
    }

    fn matches(&self, node: NodeId, selector: &str) -> Result<bool>;

    /// Lowercase tag name, `None` for non-elements
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Class names in attribute order
    fn class_list(&self, node: NodeId) -> Vec<&str>;

    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    fn element_children(&self, node: NodeId) -> Vec<NodeId>;

    fn document_element(&self) -> Option<NodeId>;

    fn body(&self) -> Option<NodeId>;
}

impl DocumentQuery for DomArena {
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        DomArena::query_selector_all(self, selector)
    }

    fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        DomArena::matches(self, node, selector)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.get(node).ok()?.tag_name()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node).ok()?.attr(name)
    }

    fn class_list(&self, node: NodeId) -> Vec<&str> {
        self.get(node)
            .map(|n| n.class_list().collect())
            .unwrap_or_default()
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        DomArena::parent_element(self, node)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        DomArena::element_children(self, node)
    }

    fn document_element(&self) -> Option<NodeId> {
        DomArena::document_element(self)
    }

    fn body(&self) -> Option<NodeId> {
        DomArena::body(self)
    }
}
