use super::traits::{ChangeSet, ValueChange};
use serde_json::Value;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of change sets to every subscriber of a store.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeSet>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeSet> {
        self.tx.subscribe()
    }

    /// Records `key` going from `old` to `new` unless nothing changed.
    pub fn record(changes: &mut ChangeSet, key: &str, old: Option<Value>, new: Option<Value>) {
        if old != new {
            changes.insert(
                key.to_string(),
                ValueChange {
                    old_value: old,
                    new_value: new,
                },
            );
        }
    }

    pub fn publish(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        // No subscribers is fine.
        let _ = self.tx.send(changes);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
