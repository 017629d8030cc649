//! DOM Service - builds an arena from a CDP `DOM.getDocument` snapshot
//!
//! Pages reach the engine as a serialized tree; this turns that JSON into
//! the arena every other module works on.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;
use serde_json::Value;

/// Main DOM service
#[derive(Debug, Default)]
pub struct DomService {
    arena: DomArena,
}

impl DomService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to internal arena
    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    /// Get mutable reference to internal arena
    pub fn arena_mut(&mut self) -> &mut DomArena {
        &mut self.arena
    }

    pub fn into_arena(self) -> DomArena {
        self.arena
    }

    /// Parse CDP DOM tree response and rebuild the arena
    ///
    /// Input format matches CDP's DOM.getDocument response:
    /// ```json
    /// {
    ///   "root": {
    ///     "nodeType": 9,
    ///     "nodeName": "#document",
    ///     "children": [...]
    ///   }
    /// }
    /// ```
    ///
    /// Frame documents and shadow roots are not followed.
    pub fn parse_cdp_dom_tree(&mut self, cdp_response: &Value) -> Result<NodeId> {
        let root = cdp_response
            .get("root")
            .ok_or_else(|| DomError::CdpError("Missing 'root' in CDP response".to_string()))?;

        self.arena.clear();
        let root_id = self.parse_node(root)?;
        self.arena.set_root(root_id)?;
        Ok(root_id)
    }

    fn parse_node(&mut self, cdp_node: &Value) -> Result<NodeId> {
        let node_type_val = cdp_node["nodeType"]
            .as_u64()
            .ok_or_else(|| DomError::CdpError("Missing nodeType".to_string()))?;

        let node_type = u8::try_from(node_type_val)
            .ok()
            .and_then(NodeType::from_u8)
            .ok_or_else(|| DomError::InvalidNodeType {
                expected: "valid NodeType".to_string(),
                actual: node_type_val.to_string(),
            })?;

        let raw_name = cdp_node["nodeName"].as_str().unwrap_or("");
        let node_name = if node_type == NodeType::Element {
            raw_name.to_ascii_lowercase()
        } else {
            raw_name.to_string()
        };

        let mut node = DomNode::new(0, node_type, node_name);
        node.node_value = cdp_node["nodeValue"].as_str().unwrap_or("").to_string();

        // Attributes arrive flattened: [name, value, name, value, ...]
        if let Some(attrs) = cdp_node["attributes"].as_array() {
            for pair in attrs.chunks_exact(2) {
                if let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                    node.attributes
                        .insert(key.to_ascii_lowercase(), value.to_string());
                }
            }
        }

        let node_id = self.arena.add_node(node);

        if let Some(children) = cdp_node["children"].as_array() {
            for child in children {
                let child_id = self.parse_node(child)?;
                self.arena.append_child(node_id, child_id)?;
            }
        }

        Ok(node_id)
    }
}
