//! Per-property dependency registries.

use std::rc::{Rc, Weak};

use crate::error::ReactiveResult;
use crate::watcher::Watcher;

/// The consumers interested in one reactive property.
///
/// Registration order is preserved and entries are not deduplicated: a watcher
/// that reads the same property twice during one evaluation is registered
/// twice. Notifying it twice is harmless because the second `update()` sees an
/// unchanged value.
///
/// Entries are weak. The engine that created a watcher owns it; once the
/// watcher is dropped its entries are skipped and pruned on the next
/// registration.
#[derive(Debug, Default, Clone)]
pub struct DependencyRegistry {
	subscribers: Vec<Weak<Watcher>>,
}

impl DependencyRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a consumer.
	pub fn register(&mut self, watcher: &Weak<Watcher>) {
		self.subscribers.retain(|entry| entry.strong_count() > 0);
		self.subscribers.push(Weak::clone(watcher));
	}

	/// Calls `update()` on every live consumer, in registration order.
	///
	/// The first failing consumer aborts the fan-out and its error is returned;
	/// consumers registered after it are not updated.
	pub fn notify_all(&self) -> ReactiveResult<()> {
		for watcher in self.subscribers.iter().filter_map(Weak::upgrade) {
			watcher.update()?;
		}
		Ok(())
	}

	/// Number of live registrations (duplicates included).
	pub fn len(&self) -> usize {
		self.subscribers
			.iter()
			.filter(|entry| entry.strong_count() > 0)
			.count()
	}

	/// Returns true if no live consumer is registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns true if `watcher` is registered at least once.
	pub fn contains(&self, watcher: &Rc<Watcher>) -> bool {
		self.subscribers
			.iter()
			.filter_map(Weak::upgrade)
			.any(|entry| Rc::ptr_eq(&entry, watcher))
	}
}
