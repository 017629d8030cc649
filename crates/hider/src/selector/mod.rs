//! Unique CSS selector synthesis
//!
//! Four layers, leaves first:
//!
//! ```text
//! builder     element → one-level fragment (#id | tag.class[href])
//! oracle      selector → matches exactly one element?
//! descendant  subtree  → first BFS descendant with a unique fragment
//! resolver    target   → fragment, then :has(), then ancestor chain
//! ```
//!
//! Everything reads the page through [`dom::DocumentQuery`] and never
//! mutates it. Selector syntax errors from page-controlled ids and class
//! names are absorbed by the oracle as "not unique".

mod builder;
mod descendant;
mod oracle;
mod resolver;

pub use builder::build_fragment;
pub use descendant::find_unique_descendant;
pub use oracle::is_unique;
pub use resolver::SelectorResolver;
