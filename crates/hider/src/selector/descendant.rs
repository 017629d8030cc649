use dom::{DocumentQuery, NodeId};
use std::collections::VecDeque;

use super::builder::build_fragment;
use super::oracle::is_unique;

/// Breadth-first search below `root` (exclusive) for the first element
/// whose own fragment is unique in the document.
///
/// Shallow descendants win ties, which keeps `:has()` arguments short.
pub fn find_unique_descendant<D>(doc: &D, root: NodeId, class_prefix: &str) -> Option<String>
where
    D: DocumentQuery + ?Sized,
{
    let mut queue: VecDeque<NodeId> = doc.element_children(root).into();

    while let Some(node) = queue.pop_front() {
        let fragment = build_fragment(doc, node, class_prefix);
        if is_unique(doc, &fragment) {
            return Some(fragment);
        }
        queue.extend(doc.element_children(node));
    }
    None
}
