use dom::{css_escape, escape_attribute_value, DocumentQuery, NodeId};

use super::oracle::is_unique;

/// Best single-level selector for `node`, without ancestor context.
///
/// `#id` when that id is unique in the document, otherwise the tag plus
/// every class not starting with `class_prefix`; links also carry their
/// `href`. Never fails: the worst case is the bare tag name.
pub fn build_fragment<D>(doc: &D, node: NodeId, class_prefix: &str) -> String
where
    D: DocumentQuery + ?Sized,
{
    let tag = doc.tag_name(node).unwrap_or("*");

    if let Some(id) = doc.attribute(node, "id").filter(|id| !id.is_empty()) {
        let id_selector = format!("#{}", css_escape(id));
        if is_unique(doc, &id_selector) {
            return id_selector;
        }
    }

    let mut fragment = tag.to_string();
    for class in doc.class_list(node) {
        if class.starts_with(class_prefix) {
            continue;
        }
        fragment.push('.');
        fragment.push_str(&css_escape(class));
    }

    if tag == "a" {
        if let Some(href) = doc.attribute(node, "href").filter(|h| !h.is_empty()) {
            fragment.push_str(&format!("[href=\"{}\"]", escape_attribute_value(href)));
        }
    }

    fragment
}
