//! Arena-based DOM tree storage
//!
//! "Bad programmers worry about the code. Good programmers worry about
//! data structures and their relationships."
//!
//! The arena is the whole document: every node lives in one `Vec`, links are
//! `u32` indices, and detaching a node only unlinks it. Nothing is ever freed
//! until `clear()`, so a `NodeId` handed out stays valid for the arena's life.
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [#document][html][head][body]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```

use crate::error::{DomError, Result};
use crate::types::{
    DomNode, EventKind, ListenerId, NodeId, NodeType, ScrollIntoViewOptions, ScrollRequest,
};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    capture: bool,
}

/// Arena allocator for DOM nodes
///
/// Design:
/// - Single Vec<DomNode> for sequential allocation
/// - `id` attribute index for `#id` lookups (may hold detached nodes,
///   lookups filter by connectivity)
/// - No Rc/Arc: use indices everywhere
#[derive(Debug)]
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<DomNode>,

    /// `id` attribute value → elements carrying it
    id_index: AHashMap<String, SmallVec<[NodeId; 1]>>,

    /// Root node ID (the `#document` node once set)
    root_id: Option<NodeId>,

    /// Document-level listener registrations
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,

    /// `scrollIntoView` calls, oldest first
    scroll_requests: Vec<ScrollRequest>,
}

impl DomArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(1024) // Pre-allocate for typical page
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            id_index: AHashMap::with_capacity(capacity / 8),
            root_id: None,
            listeners: Vec::new(),
            next_listener_id: 1,
            scroll_requests: Vec::new(),
        }
    }

    /// Create the skeleton every page has: `#document > html > (head, body)`
    pub fn new_document() -> Self {
        let mut arena = Self::new();
        let document = arena.add_node(DomNode::new(0, NodeType::Document, "#document"));
        arena.root_id = Some(document);

        let html = arena.create_element("html");
        let head = arena.create_element("head");
        let body = arena.create_element("body");

        arena.link(document, html);
        arena.link(html, head);
        arena.link(html, body);
        arena
    }

    /// Attach a fresh node with no hierarchy checks
    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child as usize) {
            node.parent_id = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent as usize) {
            node.children_ids.push(child);
        }
    }

    /// Add a node to the arena, returns its ID
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        node.parent_id = None;
        node.children_ids.clear();

        let ids: Vec<String> = node.attr("id").map(str::to_string).into_iter().collect();
        self.nodes.push(node);
        for id in ids {
            self.index_id(&id, node_id);
        }
        node_id
    }

    /// Create a detached element; tag names are stored lowercase
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.add_node(DomNode::new(0, NodeType::Element, tag.to_ascii_lowercase()))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let mut node = DomNode::new(0, NodeType::Text, "#text");
        node.node_value = text.to_string();
        self.add_node(node)
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    ///
    /// Attribute edits that touch `id` must go through `set_attribute` to keep
    /// the index in sync.
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get element by ID, failing for non-element nodes
    pub fn element(&self, node_id: NodeId) -> Result<&DomNode> {
        let node = self.get(node_id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(DomError::InvalidNodeType {
                expected: "Element".to_string(),
                actual: format!("{:?}", node.node_type),
            })
        }
    }

    /// Set root node
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        // Verify node exists
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    /// Get root node ID
    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    /// Total number of nodes, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterator over all nodes
    pub fn iter(&self) -> impl Iterator<Item = &DomNode> {
        self.nodes.iter()
    }

    /// Iterator over all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| i as NodeId)
    }

    // ── Tree mutation ──────────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_type = self.get(parent)?.node_type;
        self.get(child)?;

        if !matches!(
            parent_type,
            NodeType::Element | NodeType::Document | NodeType::DocumentFragment
        ) {
            return Err(DomError::HierarchyRequest(format!(
                "{parent_type:?} node {parent} cannot have children"
            )));
        }
        if self.inclusive_ancestors(parent).any(|id| id == child) {
            return Err(DomError::HierarchyRequest(format!(
                "node {child} is an ancestor of {parent}"
            )));
        }

        self.detach(child)?;
        self.get_mut(child)?.parent_id = Some(parent);
        self.get_mut(parent)?.children_ids.push(child);
        Ok(())
    }

    /// Unlink a node from its parent. The subtree stays intact.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let Some(parent_id) = self.get(node_id)?.parent_id else {
            return Ok(());
        };
        self.get_mut(parent_id)?
            .children_ids
            .retain(|id| *id != node_id);
        self.get_mut(node_id)?.parent_id = None;
        Ok(())
    }

    /// Set an attribute; names are case-folded like HTML does
    pub fn set_attribute(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        self.element(node_id)?;

        let previous = self
            .get_mut(node_id)?
            .attributes
            .insert(name.clone(), value.to_string());

        if name == "id" {
            if let Some(old) = previous {
                self.unindex_id(&old, node_id);
            }
            self.index_id(value, node_id);
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let previous = self.get_mut(node_id)?.attributes.remove(&name);
        if name == "id" {
            if let Some(old) = previous {
                self.unindex_id(&old, node_id);
            }
        }
        Ok(())
    }

    /// `classList.add`
    pub fn add_class(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let node = self.element(node_id)?;
        if node.has_class(class_name) {
            return Ok(());
        }
        let mut classes: Vec<&str> = node.class_list().collect();
        classes.push(class_name);
        let value = classes.join(" ");
        self.set_attribute(node_id, "class", &value)
    }

    /// `classList.remove`
    pub fn remove_class(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let node = self.element(node_id)?;
        if !node.has_class(class_name) {
            return Ok(());
        }
        let value = node
            .class_list()
            .filter(|c| *c != class_name)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node_id, "class", &value)
    }

    pub fn has_class(&self, node_id: NodeId, class_name: &str) -> bool {
        self.get(node_id)
            .map(|n| n.has_class(class_name))
            .unwrap_or(false)
    }

    /// Replace all children with a single text node (none for empty text)
    pub fn set_text_content(&mut self, node_id: NodeId, text: &str) -> Result<()> {
        let children: Vec<NodeId> = self.get(node_id)?.children_ids.to_vec();
        for child in children {
            self.detach(child)?;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node_id, text_node)?;
        }
        Ok(())
    }

    /// Concatenated data of all descendant text nodes
    pub fn text_content(&self, node_id: NodeId) -> Result<String> {
        let mut text = String::new();
        self.traverse_df(node_id, |node| {
            if node.is_text() {
                text.push_str(&node.node_value);
            }
            Ok(())
        })?;
        Ok(text)
    }

    /// Set (or with `None` clear) one inline style property
    pub fn set_style(&mut self, node_id: NodeId, property: &str, value: Option<&str>) -> Result<()> {
        let node = self.get_mut(node_id)?;
        match value {
            Some(value) if !value.is_empty() => {
                node.inline_style
                    .insert(property.to_ascii_lowercase(), value.to_string());
            }
            _ => {
                node.inline_style.remove(&property.to_ascii_lowercase());
            }
        }
        Ok(())
    }

    pub fn style(&self, node_id: NodeId, property: &str) -> Option<&str> {
        self.get(node_id)
            .ok()?
            .inline_style
            .get(&property.to_ascii_lowercase())
            .map(String::as_str)
    }

    // ── Navigation ─────────────────────────────────────────────────────────

    /// Get children of a node
    pub fn children(&self, node_id: NodeId) -> Result<Vec<&DomNode>> {
        let node = self.get(node_id)?;
        node.children_ids
            .iter()
            .map(|&child_id| self.get(child_id))
            .collect()
    }

    /// Get parent of a node
    pub fn parent(&self, node_id: NodeId) -> Result<Option<&DomNode>> {
        let node = self.get(node_id)?;
        match node.parent_id {
            Some(parent_id) => Ok(Some(self.get(parent_id)?)),
            None => Ok(None),
        }
    }

    /// Parent, but only if it is an element (the `html` element has none)
    pub fn parent_element(&self, node_id: NodeId) -> Option<NodeId> {
        let parent_id = self.get(node_id).ok()?.parent_id?;
        self.get(parent_id)
            .ok()
            .filter(|p| p.is_element())
            .map(|p| p.node_id)
    }

    /// Element children in order
    pub fn element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.get(node_id)
            .map(|node| {
                node.children_ids
                    .iter()
                    .copied()
                    .filter(|&id| self.get(id).map(|c| c.is_element()).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent_id = self.get(node_id).ok()?.parent_id?;
        let siblings = &self.get(parent_id).ok()?.children_ids;
        let position = siblings.iter().position(|&id| id == node_id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|&id| self.get(id).map(|n| n.is_element()).unwrap_or(false))
    }

    pub fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let parent_id = self.get(node_id).ok()?.parent_id?;
        let siblings = &self.get(parent_id).ok()?.children_ids;
        let position = siblings.iter().position(|&id| id == node_id)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|&id| self.get(id).map(|n| n.is_element()).unwrap_or(false))
    }

    /// The node itself, then each ancestor up to the top of its tree
    pub fn inclusive_ancestors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(
            self.get(node_id).ok().map(|n| n.node_id),
            move |&id| self.get(id).ok().and_then(|n| n.parent_id),
        )
    }

    /// `document.documentElement`
    pub fn document_element(&self) -> Option<NodeId> {
        let root = self.root_id?;
        self.element_children(root).first().copied()
    }

    /// `document.body`
    pub fn body(&self) -> Option<NodeId> {
        self.html_child("body")
    }

    /// `document.head`
    pub fn head(&self) -> Option<NodeId> {
        self.html_child("head")
    }

    fn html_child(&self, tag: &str) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|&id| self.get(id).map(|n| n.node_name == tag).unwrap_or(false))
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, node_id: NodeId) -> bool {
        match self.root_id {
            Some(root) => self.inclusive_ancestors(node_id).any(|id| id == root),
            None => false,
        }
    }

    /// `document.getElementById`: first connected element in document order
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let candidates = self.elements_with_id(id);
        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => self.first_in_document_order(&candidates),
        }
    }

    /// Connected elements whose `id` attribute equals `id`, unordered
    pub(crate) fn elements_with_id(&self, id: &str) -> SmallVec<[NodeId; 1]> {
        self.id_index
            .get(id)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&node| self.is_connected(node))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn first_in_document_order(&self, candidates: &[NodeId]) -> Option<NodeId> {
        let root = self.root_id?;
        self.subtree(root)
            .map(|node| node.node_id)
            .find(|id| candidates.contains(id))
    }

    /// Connected elements in document (pre-order) order
    pub fn elements_in_document_order(&self) -> Vec<NodeId> {
        let Some(root) = self.root_id else {
            return Vec::new();
        };
        self.subtree(root)
            .filter(|node| node.is_element())
            .map(|node| node.node_id)
            .collect()
    }

    /// Pre-order walk over `start_id` and everything below it.
    /// An unknown id yields nothing.
    pub fn subtree(&self, start_id: NodeId) -> impl Iterator<Item = &DomNode> + '_ {
        let mut stack = vec![start_id];
        std::iter::from_fn(move || {
            while let Some(node_id) = stack.pop() {
                if let Ok(node) = self.get(node_id) {
                    stack.extend(node.children_ids.iter().rev().copied());
                    return Some(node);
                }
            }
            None
        })
    }

    /// Traverse tree depth-first (iterative, no recursion)
    ///
    /// This is the "good taste" version - no special cases for leaf nodes
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Traverse tree breadth-first
    pub fn traverse_bf<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut queue = VecDeque::new();
        queue.push_back(start_id);

        while let Some(node_id) = queue.pop_front() {
            let node = self.get(node_id)?;
            visit(node)?;

            for &child_id in node.children_ids.iter() {
                queue.push_back(child_id);
            }
        }

        Ok(())
    }

    /// Find connected elements matching predicate, in document order
    pub fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&DomNode) -> bool,
    {
        self.elements_in_document_order()
            .into_iter()
            .filter(|&id| self.get(id).map(&predicate).unwrap_or(false))
            .collect()
    }

    /// Find all connected elements by tag name
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.find(|node| node.node_name == tag)
    }

    // ── Event listeners ────────────────────────────────────────────────────

    /// Register a document-level listener
    pub fn add_event_listener(&mut self, kind: EventKind, capture: bool) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(ListenerEntry { id, kind, capture });
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn has_listener(&self, kind: EventKind, capture: bool) -> bool {
        self.listeners
            .iter()
            .any(|l| l.kind == kind && l.capture == capture)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }

    // ── Scrolling ──────────────────────────────────────────────────────────

    /// `element.scrollIntoView(options)`; recorded, there is no viewport
    pub fn scroll_into_view(&mut self, node_id: NodeId, options: ScrollIntoViewOptions) -> Result<()> {
        self.element(node_id)?;
        self.scroll_requests.push(ScrollRequest { node_id, options });
        Ok(())
    }

    pub fn scroll_requests(&self) -> &[ScrollRequest] {
        &self.scroll_requests
    }

    /// Clear arena (reuse allocation)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.id_index.clear();
        self.root_id = None;
        self.listeners.clear();
        self.scroll_requests.clear();
    }

    fn index_id(&mut self, id: &str, node_id: NodeId) {
        if id.is_empty() {
            return;
        }
        let entry = self.id_index.entry(id.to_string()).or_default();
        if !entry.contains(&node_id) {
            entry.push(node_id);
        }
    }

    fn unindex_id(&mut self, id: &str, node_id: NodeId) {
        if let Some(entry) = self.id_index.get_mut(id) {
            entry.retain(|n| *n != node_id);
            if entry.is_empty() {
                self.id_index.remove(id);
            }
        }
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}
