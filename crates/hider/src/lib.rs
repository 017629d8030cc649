//! Element Hider - pick page elements and keep them hidden
//!
//! Click an element, get a stable CSS selector for it, hide it with one
//! stylesheet rule, and remember it per hostname so it stays hidden on the
//! next visit.
//!
//! # Architecture Philosophy (Linus-approved)
//!
//! 1. **Data structures first**: a site is an ordered list of selectors; the
//!    page state is one stylesheet rendered from that list
//! 2. **Zero special cases**: every way out of the picker is the same `stop`
//! 3. **Never lose the user's work**: storage failures are logged, the page
//!    still does what the user asked
//!
//! ```text
//!  SiteController ──Command──→ PageHandle ══mpsc══→ serve(PageSession)
//!        ↑                                             │  Picker
//!        └──────────── EventBus (PageEvent) ←──────────┤  HideStateStore
//!                                                      │  SelectorResolver
//!                      Persistence (sites, settings) ←─┘
//! ```

pub mod channel;
pub mod config;
pub mod controller;
pub mod early;
pub mod error;
pub mod events;
pub mod highlight;
pub mod label;
pub mod migrate;
pub mod page;
pub mod picker;
pub mod protocol;
pub mod selector;
pub mod site;
pub mod storage;
pub mod store;

pub use channel::{page_channel, serve, ChannelError, PageHandle};
pub use config::{EngineConfig, PageConfig};
pub use controller::SiteController;
pub use early::inject_initial_style;
pub use error::{HiderError, Result};
pub use events::EventBus;
pub use highlight::{Highlighter, SharedDocument};
pub use page::{DispatchOutcome, InputEvent, PageSession};
pub use picker::{Pick, Picker, PickerState};
pub use protocol::{Command, PageEvent, Response};
pub use selector::SelectorResolver;
pub use site::{HideMode, ManagedElement, SiteStorage};
pub use storage::{MemoryStorage, Persistence, Settings};
pub use store::HideStateStore;
