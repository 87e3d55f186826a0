//! Reinhardt Reactive - property observation for MVVM bindings
//!
//! Turns a plain data graph into reactive properties and tracks which binding
//! consumers depend on which properties.
//!
//! ## Features
//!
//! - **Reactive Properties**: every object key and array slot carries its own dependency registry
//! - **Dependency Collection**: a watcher registers on each property it reads during its first evaluation
//! - **Change Propagation**: strictly different writes notify every dependent, in registration order
//! - **Computed Members**: derived, read-only properties re-evaluated on every read
//!
//! ## Architecture
//!
//! - [`Store`]: the reactive data graph (property transformer, reads, writes)
//! - [`DependencyRegistry`]: the consumers of one property
//! - [`Watcher`]: a live binding between an expression and a reaction
//! - [`Path`]: a normalized dotted binding expression
//! - [`Scope`]: the receiver handed to computed derivations
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::{Store, Watcher};
//! use serde_json::json;
//!
//! let store = Store::new(json!({ "user": { "name": "Ada" } }));
//! let label = Watcher::new(&store, "user.name", |value| {
//!     println!("name changed: {value:?}");
//!     Ok(())
//! })?;
//!
//! store.set("user.name", json!("Grace"))?;
//! ```
//!
//! All handles are single-threaded (`Rc`/`RefCell`). A store and the
//! watchers created on it must stay on one thread.

#![warn(missing_docs)]

pub mod error;
pub mod path;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod watcher;

pub use error::{ReactiveError, ReactiveResult};
pub use path::Path;
pub use registry::DependencyRegistry;
pub use snapshot::{NodeId, Snapshot, display_value, strict_eq};
pub use store::{ComputedFn, Scope, Store};
pub use watcher::{ActiveReader, Reaction, Watcher, WatcherId};
