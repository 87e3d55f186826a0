//! Reactive data graph and dependency tracking
//!
//! This module provides access to reinhardt-reactive: the store that turns a
//! plain data object into reactive properties, and the watchers that keep
//! bindings up to date.
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_mvvm::reactive::{Store, Watcher};
//! use serde_json::json;
//!
//! let store = Store::new(json!({ "count": 0 }));
//! let watcher = Watcher::new(&store, "count", |value| {
//!     println!("count changed: {value:?}");
//!     Ok(())
//! })?;
//! store.set("count", json!(1))?;
//! ```

// Re-export all reinhardt-reactive functionality
pub use reinhardt_reactive::*;
