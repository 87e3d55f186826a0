//! Binding consumers.
//!
//! A [`Watcher`] links one binding expression to a reaction. It evaluates the
//! expression once at construction with itself as the [`ActiveReader`], which
//! registers it in the dependency registry of every property on the path.
//! Afterwards, any write to one of those properties calls [`Watcher::update`],
//! which re-evaluates the expression and runs the reaction if the value is
//! strictly different from the last one observed.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::{Store, Watcher};
//! use serde_json::json;
//!
//! let store = Store::new(json!({ "count": 0 }));
//! let watcher = Watcher::new(&store, "count", |value| {
//!     println!("count is now {value:?}");
//!     Ok(())
//! })?;
//!
//! store.set("count", json!(1))?; // prints once
//! store.set("count", json!(1))?; // unchanged, no reaction
//! ```

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::error::ReactiveResult;
use crate::path::Path;
use crate::snapshot::Snapshot;
use crate::store::Store;

/// Callback run when a watched value changes.
pub type Reaction = Box<dyn FnMut(&Snapshot) -> ReactiveResult<()> + 'static>;

/// Unique identifier of a watcher, used in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
	fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for WatcherId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "watcher#{}", self.0)
	}
}

/// The consumer currently evaluating an expression, if any.
///
/// Passed explicitly into every read. While a watcher evaluates its expression
/// for the first time the reader carries that watcher, and each property read
/// registers it before returning. Every other read is untracked.
#[derive(Clone, Copy)]
pub struct ActiveReader<'a> {
	watcher: Option<&'a Weak<Watcher>>,
}

impl<'a> ActiveReader<'a> {
	/// An untracked read.
	pub fn none() -> Self {
		Self { watcher: None }
	}

	/// A read that registers `watcher` on every property it touches.
	pub fn tracking(watcher: &'a Weak<Watcher>) -> Self {
		Self {
			watcher: Some(watcher),
		}
	}

	/// The watcher being registered, if any.
	pub fn watcher(&self) -> Option<&'a Weak<Watcher>> {
		self.watcher
	}

	/// Returns true if reads are being tracked.
	pub fn is_tracking(&self) -> bool {
		self.watcher.is_some()
	}
}

impl fmt::Debug for ActiveReader<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let id = self
			.watcher
			.and_then(Weak::upgrade)
			.map(|watcher| watcher.id());
		f.debug_struct("ActiveReader").field("watcher", &id).finish()
	}
}

/// A live binding between an expression and a reaction.
pub struct Watcher {
	id: WatcherId,
	store: Store,
	path: Path,
	baseline: RefCell<Snapshot>,
	reaction: RefCell<Reaction>,
}

impl Watcher {
	/// Creates a watcher and evaluates `expr` once to collect its dependencies.
	///
	/// The reaction is not invoked for the initial value; callers render the
	/// initial state themselves.
	///
	/// # Errors
	///
	/// Fails if the expression is invalid or does not resolve.
	pub fn new<F>(store: &Store, expr: &str, reaction: F) -> ReactiveResult<Rc<Self>>
	where
		F: FnMut(&Snapshot) -> ReactiveResult<()> + 'static,
	{
		let path = Path::parse(expr)?;
		let watcher = Rc::new(Self {
			id: WatcherId::next(),
			store: store.clone(),
			path,
			baseline: RefCell::new(Snapshot::Value(Value::Null)),
			reaction: RefCell::new(Box::new(reaction)),
		});

		let weak = Rc::downgrade(&watcher);
		let initial = store.read(&watcher.path, ActiveReader::tracking(&weak))?;
		*watcher.baseline.borrow_mut() = initial;

		tracing::trace!(watcher = %watcher.id, path = %watcher.path, "watcher created");
		Ok(watcher)
	}

	/// Re-evaluates the expression and reacts if the value changed.
	///
	/// The comparison is strict inequality against the last observed value.
	/// If this watcher's reaction is already running further up the call
	/// stack, the nested update only records the new baseline.
	pub fn update(&self) -> ReactiveResult<()> {
		let next = self.store.read(&self.path, ActiveReader::none())?;
		if next.strict_eq(&self.baseline.borrow()) {
			return Ok(());
		}
		*self.baseline.borrow_mut() = next.clone();

		match self.reaction.try_borrow_mut() {
			Ok(mut reaction) => reaction(&next),
			Err(_) => {
				tracing::debug!(watcher = %self.id, path = %self.path, "skipping re-entrant update");
				Ok(())
			}
		}
	}

	/// The watcher's identifier.
	pub fn id(&self) -> WatcherId {
		self.id
	}

	/// The watched path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The last observed value.
	pub fn value(&self) -> Snapshot {
		self.baseline.borrow().clone()
	}
}

impl fmt::Debug for Watcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Watcher")
			.field("id", &self.id)
			.field("path", &self.path)
			.field("value", &self.baseline.borrow())
			.finish()
	}
}
