//! Aggregated, serializable snapshot of in-process state (spec §6).
//!
//! Grounded on the source's `core/api/serializers.py`: an ordered list of
//! zero-argument callables, each contributing a sub-mapping, merged into one
//! dict with later producers overriding earlier ones on key conflict. The
//! Rust shape keeps that ordering contract but swaps the dict-of-callables
//! for a shared, mutex-guarded map so a handler method and a snapshot reader
//! can be invoked from different call sites without threading the producer
//! list through both.
//!
//! `std::sync::Mutex` rather than `tokio::sync::Mutex`: nothing here ever
//! holds the lock across an `.await` point (the teacher's `db.rs` makes the
//! same call for the same reason).

use std::sync::{Arc, Mutex};

use crate::value::Map;

type Producer = Box<dyn Fn() -> Map<String, serde_json::Value> + Send + Sync>;

/// Collects named producers and merges their output into one snapshot on
/// demand.
#[derive(Clone)]
pub struct SnapshotAggregator {
    producers: Arc<Mutex<Vec<Producer>>>,
}

impl SnapshotAggregator {
    pub fn new() -> SnapshotAggregator {
        SnapshotAggregator {
            producers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a producer. Producers run in registration order; a later
    /// producer's keys override an earlier producer's on conflict.
    pub fn register<F>(&self, produce: F)
    where
        F: Fn() -> Map<String, serde_json::Value> + Send + Sync + 'static,
    {
        self.producers.lock().unwrap().push(Box::new(produce));
    }

    /// Run every registered producer in order and merge the results.
    pub fn snapshot(&self) -> Map<String, serde_json::Value> {
        let producers = self.producers.lock().unwrap();
        let mut merged = Map::new();
        for produce in producers.iter() {
            for (key, value) in produce() {
                merged.insert(key, value);
            }
        }
        merged
    }
}

impl Default for SnapshotAggregator {
    fn default() -> SnapshotAggregator {
        SnapshotAggregator::new()
    }
}
