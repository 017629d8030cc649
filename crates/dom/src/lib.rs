//! Virtual document for the element hider
//!
//! An arena-backed DOM with just enough of the platform to run selector
//! synthesis and CSS hiding outside a browser.
//!
//! ## Philosophy (Linus Torvalds Style)
//!
//! - **Good taste**: Data structures first, algorithms follow naturally
//! - **No special cases**: a detached node is simply unreachable from the root
//! - **Errors are values**: invalid selectors come back as `DomError`, never a panic
//!
//! ## Core Design
//!
//! ```text
//! CDP JSON ──→ DomService ──→ DomArena ←── selector text
//!                               │   ↑          │ parse
//!                       NodeId (u32) └── match ┘
//!                               ↓
//!                         DocumentQuery (trait seam)
//! ```

pub mod arena;
pub mod error;
pub mod escape;
pub mod matching;
pub mod query;
pub mod selector;
pub mod service;
pub mod style;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use error::{DomError, Result};
pub use escape::{css_escape, escape_attribute_value};
pub use query::DocumentQuery;
pub use selector::{parse_selector_list, SelectorList};
pub use service::DomService;
pub use types::*;
