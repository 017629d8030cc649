//! Human-readable labels for picked elements

use dom::utils::{normalize_whitespace, truncate_at_word_boundary};
use dom::{DomArena, NodeId};

use crate::error::Result;

const LABEL_ATTRIBUTES: [&str; 4] = ["aria-label", "title", "alt", "placeholder"];

/// Describe `node` in at most `max_len` chars: its text, else a labelling
/// attribute on it or a descendant, else `<tag#id.class>`.
pub fn build_label(doc: &DomArena, node: NodeId, max_len: usize) -> Result<String> {
    let text = normalize_whitespace(&visible_text(doc, node)?);
    if !text.is_empty() {
        return Ok(truncate_at_word_boundary(&text, max_len));
    }

    if let Some(attr) = labelling_attribute(doc, node)? {
        return Ok(attr.chars().take(max_len).collect());
    }

    Ok(fallback_label(doc, node))
}

/// Text of descendant text nodes, skipping script and style bodies
fn visible_text(doc: &DomArena, node: NodeId) -> Result<String> {
    let mut text = String::new();
    doc.traverse_df(node, |n| {
        if n.is_text() {
            let hidden_parent = n
                .parent_id
                .and_then(|p| doc.get(p).ok())
                .and_then(|p| p.tag_name())
                .is_some_and(|tag| matches!(tag, "script" | "style" | "noscript" | "template"));
            if !hidden_parent {
                text.push_str(&n.node_value);
                text.push(' ');
            }
        }
        Ok(())
    })?;
    Ok(text)
}

fn labelling_attribute(doc: &DomArena, node: NodeId) -> Result<Option<String>> {
    let mut found = None;
    doc.traverse_df(node, |n| {
        if found.is_some() || !n.is_element() {
            return Ok(());
        }
        found = LABEL_ATTRIBUTES
            .iter()
            .filter_map(|name| n.attr(name))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string);
        Ok(())
    })?;
    Ok(found)
}

fn fallback_label(doc: &DomArena, node: NodeId) -> String {
    let Ok(element) = doc.get(node) else {
        return String::new();
    };
    let tag = element.tag_name().unwrap_or("?");
    let id = element
        .attr("id")
        .filter(|id| !id.is_empty())
        .map(|id| format!("#{id}"))
        .unwrap_or_default();
    let class = element
        .class_list()
        .next()
        .map(|c| format!(".{c}"))
        .unwrap_or_default();
    format!("<{tag}{id}{class}>")
}
