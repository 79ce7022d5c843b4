//! The generic structured value carried inside requests and responses.
//!
//! The source passes arbitrary Python objects across the wire; the closest
//! Rust equivalent that still supports "nested mappings, ordered sequences"
//! (spec §6) without imposing a schema on the embedder's handler is
//! `serde_json::Value`. It round-trips through `bincode` exactly like any
//! other `serde` type, it has no dependency on JSON actually being the wire
//! format, and it is the value type the wider corpus reaches for whenever it
//! needs an "arbitrary serializable payload" (see `serde_json::Value` usage
//! across the retrieved example repos).

pub use serde_json::Map;
pub use serde_json::Value;

/// Convenience for building the `named` map of an `ApiRequest` from literal
/// pairs, used throughout the tests and the demo binaries.
pub fn named(pairs: impl IntoIterator<Item = (String, Value)>) -> Map<String, Value> {
    pairs.into_iter().collect()
}
