//! Reveal highlights with self-clearing timers
//!
//! Each highlighted element owns at most one pending timer. Starting a new
//! highlight aborts the old task first; a task that fires only removes its
//! own map entry, checked by generation.

use dashmap::DashMap;
use dom::{DomArena, NodeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::Result;

/// The page's document, shared between the session and its timer tasks
pub type SharedDocument = Arc<RwLock<DomArena>>;

#[derive(Debug)]
struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    doc: SharedDocument,
    class: Arc<str>,
    duration: Duration,
    timers: Arc<DashMap<NodeId, Timer>>,
    next_generation: Arc<AtomicU64>,
}

impl Highlighter {
    pub fn new(doc: SharedDocument, class: impl Into<String>, duration: Duration) -> Self {
        Self {
            doc,
            class: Arc::from(class.into()),
            duration,
            timers: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Add the highlight class now and schedule its removal.
    ///
    /// `arena` is the caller's write guard on the shared document; the
    /// timer task takes its own lock when it fires. Must run inside a
    /// tokio runtime.
    pub fn flash(&self, arena: &mut DomArena, node: NodeId) -> Result<()> {
        self.cancel(node);
        arena.add_class(node, &self.class)?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let doc = Arc::clone(&self.doc);
        let timers = Arc::clone(&self.timers);
        let class = Arc::clone(&self.class);
        let duration = self.duration;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Err(err) = doc.write().await.remove_class(node, &class) {
                tracing::debug!(node, %err, "[Highlighter] Highlight target vanished");
            }
            timers.remove_if(&node, |_, timer| timer.generation == generation);
        });

        self.timers.insert(node, Timer { generation, handle });
        Ok(())
    }

    /// Drop any pending timer and the class, immediately
    pub fn clear(&self, arena: &mut DomArena, node: NodeId) -> Result<()> {
        self.cancel(node);
        arena.remove_class(node, &self.class)?;
        Ok(())
    }

    /// Abort every pending timer; classes stay where they are
    pub fn cancel_all(&self) {
        self.timers.retain(|_, timer| {
            timer.handle.abort();
            false
        });
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.timers.contains_key(&node)
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    fn cancel(&self, node: NodeId) {
        if let Some((_, timer)) = self.timers.remove(&node) {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SharedDocument, Highlighter, NodeId) {
        let mut arena = DomArena::new_document();
        let body = arena.body().unwrap();
        let node = arena.create_element("div");
        arena.append_child(body, node).unwrap();

        let doc = Arc::new(RwLock::new(arena));
        let highlighter = Highlighter::new(doc.clone(), "eh-highlight-reveal", Duration::from_millis(2000));
        (doc, highlighter, node)
    }

    #[tokio::test(start_paused = true)]
    async fn test_class_removed_after_duration() {
        let (doc, highlighter, node) = setup();
        highlighter.flash(&mut *doc.write().await, node).unwrap();
        assert!(doc.read().await.has_class(node, "eh-highlight-reveal"));

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert!(doc.read().await.has_class(node, "eh-highlight-reveal"));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!doc.read().await.has_class(node, "eh-highlight-reveal"));
        assert!(!highlighter.is_pending(node));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reflash_replaces_pending_timer() {
        let (doc, highlighter, node) = setup();
        highlighter.flash(&mut *doc.write().await, node).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        highlighter.flash(&mut *doc.write().await, node).unwrap();
        assert_eq!(highlighter.pending_count(), 1);

        // The first timer would have fired here
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(doc.read().await.has_class(node, "eh-highlight-reveal"));
        assert!(highlighter.is_pending(node));

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert!(!doc.read().await.has_class(node, "eh-highlight-reveal"));
        assert_eq!(highlighter.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_immediate() {
        let (doc, highlighter, node) = setup();
        highlighter.flash(&mut *doc.write().await, node).unwrap();
        highlighter.clear(&mut *doc.write().await, node).unwrap();

        assert!(!doc.read().await.has_class(node, "eh-highlight-reveal"));
        assert!(!highlighter.is_pending(node));
    }
}
