//! Command queue — the ordered, append-only buffer the Matomo script drains.
//!
//! The host page owns the queue; the tracker only holds an injected
//! `Arc<dyn CommandQueue>`. [`SharedQueue`] is the in-process implementation,
//! [`QueueSlot`] models the "obtain or lazily create" lookup a page performs.

use std::sync::{Arc, OnceLock};

use matomo_core::{Command, TrackerResult};
use parking_lot::Mutex;
use tracing::debug;

/// Append-only command buffer consumed by the Matomo script.
pub trait CommandQueue: Send + Sync {
    /// Number of tuples currently queued.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one tuple at the end of the queue.
    fn push(&self, command: Command);

    /// Append tuples in order. Default implementation pushes one-by-one.
    fn push_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.push(command);
        }
    }
}

/// In-memory queue shared by every tracker constructed against it.
#[derive(Debug, Clone, Default)]
pub struct SharedQueue {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the queued tuples in queue order.
    pub fn snapshot(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    /// Remove and return everything queued, as the Matomo script does when
    /// it takes over the queue.
    pub fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.lock())
    }

    /// The queue as a JSON array of tuples.
    pub fn to_json(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string(&*self.commands.lock())?)
    }

    pub fn to_json_pretty(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string_pretty(&*self.commands.lock())?)
    }
}

impl CommandQueue for SharedQueue {
    fn len(&self) -> usize {
        self.commands.lock().len()
    }

    fn push(&self, command: Command) {
        self.commands.lock().push(command);
    }

    fn push_all(&self, commands: Vec<Command>) {
        // Single lock so a batch is never interleaved with another writer.
        self.commands.lock().extend(commands);
    }
}

/// Per-page holder for the queue; created on first access and kept for the
/// lifetime of the slot.
#[derive(Debug, Default)]
pub struct QueueSlot {
    queue: OnceLock<Arc<SharedQueue>>,
}

impl QueueSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain the queue, creating an empty one if the slot has none yet.
    pub fn get_or_create(&self) -> Arc<SharedQueue> {
        self.queue
            .get_or_init(|| {
                debug!("command queue created");
                Arc::new(SharedQueue::new())
            })
            .clone()
    }

    pub fn get(&self) -> Option<Arc<SharedQueue>> {
        self.queue.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_preserves_order() {
        let queue = SharedQueue::new();
        assert!(queue.is_empty());

        queue.push(Command::track_page_view());
        queue.push_all(vec![
            Command::set_custom_url("http://x/a"),
            Command::track_link("http://out.example", "link"),
        ]);

        let names: Vec<_> = queue
            .snapshot()
            .iter()
            .map(|c| c.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["trackPageView", "setCustomUrl", "trackLink"]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_clones_share_storage() {
        let queue = SharedQueue::new();
        let other = queue.clone();
        other.push(Command::enable_link_tracking());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_to_json_and_drain() {
        let queue = SharedQueue::new();
        queue.push(Command::set_site_id(json!(2)));
        queue.push(Command::track_page_view());

        assert_eq!(
            queue.to_json().unwrap(),
            r#"[["setSiteId",2],["trackPageView"]]"#
        );

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_slot_creates_once() {
        let slot = QueueSlot::new();
        assert!(slot.get().is_none());

        let first = slot.get_or_create();
        first.push(Command::track_page_view());

        let second = slot.get_or_create();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }
}
