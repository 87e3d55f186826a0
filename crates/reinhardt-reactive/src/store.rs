//! Reactive store
//!
//! The store turns a plain data graph into reactive properties. Every object
//! key and array slot becomes a *cell* that owns a [`DependencyRegistry`];
//! objects and arrays become *composite nodes* whose children are cells.
//!
//! ## Architecture
//!
//! Cells and composites live in an arena keyed by ids drawn from per-store
//! counters. Ids are never reused: when a composite value is overwritten its
//! subtree is removed from the arena, and the stale [`NodeId`] can still be
//! compared against the new one without ever matching it.
//!
//! Reads take an explicit [`ActiveReader`]. When it carries a watcher, each
//! cell on the traversed path registers that watcher before the read returns.
//! Writes compare the new value with the current one using strict equality,
//! make the new value reactive, and notify the cell's registry.
//!
//! ## Invariants
//!
//! 1. One registration per property read while tracking (no deduplication).
//! 2. A write of a strictly equal value is a no-op: no notification.
//! 3. Notification happens after the arena borrow is released, so reactions
//!    may read and write the store freely.

use core::cell::RefCell;
use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ReactiveError, ReactiveResult};
use crate::path::Path;
use crate::registry::DependencyRegistry;
use crate::snapshot::{NodeId, Snapshot, display_value, strict_eq};
use crate::watcher::{ActiveReader, Watcher};

/// A derivation installed as a read-only property of the root object.
pub type ComputedFn = Rc<dyn Fn(&Scope<'_>) -> ReactiveResult<Value> + 'static>;

/// Identifier of a reactive property cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct CellId(u64);

/// Current content of a cell.
#[derive(Debug, Clone)]
enum Content {
	Scalar(Value),
	Node(NodeId),
}

#[derive(Debug)]
struct Cell {
	content: Content,
	registry: DependencyRegistry,
}

#[derive(Debug)]
enum Composite {
	Object(IndexMap<String, CellId>),
	Array(Vec<CellId>),
}

enum Lookup {
	Cell(CellId),
	Length(usize),
	Missing,
}

#[derive(Debug, Default)]
struct Arena {
	cells: BTreeMap<CellId, Cell>,
	nodes: BTreeMap<NodeId, Composite>,
	next_cell: u64,
	next_node: u64,
}

impl Arena {
	/// Recursively converts a plain value into reactive content.
	fn observe(&mut self, value: Value) -> Content {
		match value {
			Value::Object(map) => {
				let mut children = IndexMap::with_capacity(map.len());
				for (key, child) in map {
					let content = self.observe(child);
					children.insert(key, self.alloc_cell(content));
				}
				Content::Node(self.alloc_node(Composite::Object(children)))
			}
			Value::Array(items) => {
				let mut children = Vec::with_capacity(items.len());
				for item in items {
					let content = self.observe(item);
					children.push(self.alloc_cell(content));
				}
				Content::Node(self.alloc_node(Composite::Array(children)))
			}
			scalar => Content::Scalar(scalar),
		}
	}

	fn alloc_cell(&mut self, content: Content) -> CellId {
		let id = CellId(self.next_cell);
		self.next_cell += 1;
		self.cells.insert(
			id,
			Cell {
				content,
				registry: DependencyRegistry::new(),
			},
		);
		id
	}

	fn alloc_node(&mut self, composite: Composite) -> NodeId {
		let id = NodeId(self.next_node);
		self.next_node += 1;
		self.nodes.insert(id, composite);
		id
	}

	/// Drops a replaced subtree.
	fn release(&mut self, content: Content) {
		let Content::Node(node) = content else {
			return;
		};
		let children: Vec<CellId> = match self.nodes.remove(&node) {
			Some(Composite::Object(map)) => map.into_values().collect(),
			Some(Composite::Array(items)) => items,
			None => Vec::new(),
		};
		for child in children {
			if let Some(cell) = self.cells.remove(&child) {
				self.release(cell.content);
			}
		}
	}

	fn lookup(&self, node: NodeId, segment: &str) -> Lookup {
		match self.nodes.get(&node) {
			Some(Composite::Object(map)) => map.get(segment).copied().map_or(Lookup::Missing, Lookup::Cell),
			Some(Composite::Array(items)) if segment == "length" => Lookup::Length(items.len()),
			Some(Composite::Array(items)) => segment
				.parse::<usize>()
				.ok()
				.and_then(|index| items.get(index).copied())
				.map_or(Lookup::Missing, Lookup::Cell),
			None => Lookup::Missing,
		}
	}

	fn to_json(&self, content: &Content) -> Value {
		match content {
			Content::Scalar(value) => value.clone(),
			Content::Node(node) => self.node_to_json(*node),
		}
	}

	fn node_to_json(&self, node: NodeId) -> Value {
		match self.nodes.get(&node) {
			Some(Composite::Object(map)) => {
				let mut object = Map::new();
				for (key, cell) in map {
					if let Some(cell) = self.cells.get(cell) {
						object.insert(key.clone(), self.to_json(&cell.content));
					}
				}
				Value::Object(object)
			}
			Some(Composite::Array(items)) => Value::Array(
				items
					.iter()
					.filter_map(|cell| self.cells.get(cell))
					.map(|cell| self.to_json(&cell.content))
					.collect(),
			),
			None => Value::Null,
		}
	}
}

struct StoreInner {
	arena: RefCell<Arena>,
	computed: RefCell<IndexMap<String, ComputedFn>>,
	root: NodeId,
}

/// A reactive data graph.
///
/// Cloning a `Store` creates a new handle to the same graph.
#[derive(Clone)]
pub struct Store {
	inner: Rc<StoreInner>,
}

impl Store {
	/// Makes `data` reactive.
	///
	/// The root is normally an object. An array root is accepted; a scalar
	/// root is replaced by an empty object.
	pub fn new(data: Value) -> Self {
		let mut arena = Arena::default();
		let root = match arena.observe(data) {
			Content::Node(node) => node,
			Content::Scalar(value) => {
				tracing::warn!(?value, "reactive root is not an object; starting from an empty object");
				arena.alloc_node(Composite::Object(IndexMap::new()))
			}
		};
		tracing::debug!(cells = arena.cells.len(), "reactive store created");

		Self {
			inner: Rc::new(StoreInner {
				arena: RefCell::new(arena),
				computed: RefCell::new(IndexMap::new()),
				root,
			}),
		}
	}

	/// The root composite.
	pub fn root(&self) -> NodeId {
		self.inner.root
	}

	/// Top-level data keys, in insertion order. Computed names are not included.
	pub fn keys(&self) -> Vec<String> {
		let arena = self.inner.arena.borrow();
		match arena.nodes.get(&self.inner.root) {
			Some(Composite::Object(map)) => map.keys().cloned().collect(),
			Some(Composite::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
			None => Vec::new(),
		}
	}

	/// Installs a computed property on the root object.
	///
	/// The derivation runs on every read of `name`; nothing is cached. A
	/// computed name shadows a data key of the same name.
	pub fn define_computed<F>(&self, name: impl Into<String>, derive: F)
	where
		F: Fn(&Scope<'_>) -> ReactiveResult<Value> + 'static,
	{
		self.inner
			.computed
			.borrow_mut()
			.insert(name.into(), Rc::new(derive));
	}

	/// Returns true if `name` is a computed property.
	pub fn is_computed(&self, name: &str) -> bool {
		self.inner.computed.borrow().contains_key(name)
	}

	/// Names of all computed properties.
	pub fn computed_names(&self) -> Vec<String> {
		self.inner.computed.borrow().keys().cloned().collect()
	}

	/// Resolves `path`, registering `reader` on every property read.
	pub fn read(&self, path: &Path, reader: ActiveReader<'_>) -> ReactiveResult<Snapshot> {
		self.resolve(path, path.segments(), reader)
	}

	/// Assigns `value` at `path` and notifies the affected consumers.
	///
	/// # Errors
	///
	/// - [`ReactiveError::ReadOnly`] when the target is computed or an array length.
	/// - [`ReactiveError::UnresolvablePath`] when a parent segment is missing or
	///   is not a reactive object or array.
	/// - Any error raised by a notified consumer. The value has been stored by
	///   then; consumers after the failing one are not updated.
	pub fn write(&self, path: &Path, value: Value) -> ReactiveResult<()> {
		let (parents, last) = path.split_last();
		if parents.is_empty() && self.is_computed(last) {
			return Err(ReactiveError::ReadOnly(last.to_string()));
		}

		let container = match self.resolve(path, parents, ActiveReader::none())? {
			Snapshot::Node(node) => node,
			Snapshot::Value(_) => return Err(ReactiveError::unresolvable(path.as_str(), last)),
		};

		let registry = {
			let mut arena = self.inner.arena.borrow_mut();
			match arena.lookup(container, last) {
				Lookup::Cell(cell_id) => {
					let unchanged = match arena.cells.get(&cell_id).map(|cell| &cell.content) {
						Some(Content::Scalar(current)) => strict_eq(current, &value),
						Some(Content::Node(_)) => false,
						None => return Err(ReactiveError::unresolvable(path.as_str(), last)),
					};
					if unchanged {
						return Ok(());
					}

					let content = arena.observe(value);
					let Some(cell) = arena.cells.get_mut(&cell_id) else {
						return Err(ReactiveError::unresolvable(path.as_str(), last));
					};
					let previous = core::mem::replace(&mut cell.content, content);
					let registry = cell.registry.clone();
					arena.release(previous);
					registry
				}
				Lookup::Length(_) => return Err(ReactiveError::ReadOnly(path.to_string())),
				Lookup::Missing => {
					return Self::insert(&mut arena, container, path, last, value);
				}
			}
		};

		tracing::debug!(path = %path, subscribers = registry.len(), "notifying dependents");
		registry.notify_all()
	}

	/// Reads `expr` without tracking and returns a plain value.
	pub fn get(&self, expr: &str) -> ReactiveResult<Value> {
		let path = Path::parse(expr)?;
		let snapshot = self.read(&path, ActiveReader::none())?;
		Ok(self.snapshot_value(&snapshot))
	}

	/// Reads `expr` without tracking and deserializes it.
	pub fn get_as<T: DeserializeOwned>(&self, expr: &str) -> ReactiveResult<T> {
		let value = self.get(expr)?;
		serde_json::from_value(value).map_err(|source| ReactiveError::Conversion {
			path: expr.to_string(),
			source,
		})
	}

	/// Writes `value` at `expr` and returns the assigned value.
	pub fn set(&self, expr: &str, value: Value) -> ReactiveResult<Value> {
		let path = Path::parse(expr)?;
		self.write(&path, value.clone())?;
		Ok(value)
	}

	/// Converts a snapshot into a plain value (reactive composites are copied out).
	pub fn snapshot_value(&self, snapshot: &Snapshot) -> Value {
		match snapshot {
			Snapshot::Value(value) => value.clone(),
			Snapshot::Node(node) => self.inner.arena.borrow().node_to_json(*node),
		}
	}

	/// Display text for a snapshot.
	pub fn render(&self, snapshot: &Snapshot) -> String {
		match snapshot {
			Snapshot::Value(value) => display_value(value),
			Snapshot::Node(_) => self.snapshot_value(snapshot).to_string(),
		}
	}

	/// The whole data graph as a plain value. Computed properties are omitted.
	pub fn to_json(&self) -> Value {
		self.inner.arena.borrow().node_to_json(self.inner.root)
	}

	/// Number of live registrations on the property at `expr`.
	pub fn subscriber_count(&self, expr: &str) -> ReactiveResult<usize> {
		self.with_registry(expr, DependencyRegistry::len)
	}

	/// Returns true if `watcher` is registered on the property at `expr`.
	pub fn is_registered(&self, expr: &str, watcher: &Rc<Watcher>) -> ReactiveResult<bool> {
		self.with_registry(expr, |registry| registry.contains(watcher))
	}

	/// Number of reactive cells currently held by the store.
	pub fn cell_count(&self) -> usize {
		self.inner.arena.borrow().cells.len()
	}

	fn resolve(
		&self,
		path: &Path,
		segments: &[String],
		reader: ActiveReader<'_>,
	) -> ReactiveResult<Snapshot> {
		let mut cursor = Snapshot::Node(self.inner.root);
		for (index, segment) in segments.iter().enumerate() {
			cursor = match cursor {
				Snapshot::Node(node) => {
					if index == 0
						&& let Some(derive) = self.computed(segment)
					{
						Snapshot::Value(derive(&Scope::new(self, reader))?)
					} else {
						self.read_cell(node, segment, path, reader)?
					}
				}
				Snapshot::Value(value) => descend(value, segment)
					.map(Snapshot::Value)
					.ok_or_else(|| ReactiveError::unresolvable(path.as_str(), segment.as_str()))?,
			};
		}
		Ok(cursor)
	}

	fn read_cell(
		&self,
		node: NodeId,
		segment: &str,
		path: &Path,
		reader: ActiveReader<'_>,
	) -> ReactiveResult<Snapshot> {
		let mut arena = self.inner.arena.borrow_mut();
		let cell_id = match arena.lookup(node, segment) {
			Lookup::Cell(cell_id) => cell_id,
			Lookup::Length(len) => return Ok(Snapshot::Value(Value::from(len))),
			Lookup::Missing => return Err(ReactiveError::unresolvable(path.as_str(), segment)),
		};
		let Some(cell) = arena.cells.get_mut(&cell_id) else {
			return Err(ReactiveError::unresolvable(path.as_str(), segment));
		};

		if let Some(watcher) = reader.watcher() {
			cell.registry.register(watcher);
			tracing::trace!(path = %path, segment, "dependency registered");
		}

		Ok(match &cell.content {
			Content::Scalar(value) => Snapshot::Value(value.clone()),
			Content::Node(node) => Snapshot::Node(*node),
		})
	}

	fn insert(
		arena: &mut Arena,
		container: NodeId,
		path: &Path,
		key: &str,
		value: Value,
	) -> ReactiveResult<()> {
		let is_append = match arena.nodes.get(&container) {
			Some(Composite::Object(_)) => false,
			Some(Composite::Array(items)) if key.parse::<usize>().ok() == Some(items.len()) => true,
			_ => return Err(ReactiveError::unresolvable(path.as_str(), key)),
		};

		let content = arena.observe(value);
		let cell = arena.alloc_cell(content);
		match arena.nodes.get_mut(&container) {
			Some(Composite::Object(map)) if !is_append => {
				map.insert(key.to_string(), cell);
			}
			Some(Composite::Array(items)) if is_append => items.push(cell),
			_ => return Err(ReactiveError::unresolvable(path.as_str(), key)),
		}
		tracing::debug!(path = %path, "reactive property added");
		Ok(())
	}

	fn computed(&self, name: &str) -> Option<ComputedFn> {
		self.inner.computed.borrow().get(name).cloned()
	}

	fn with_registry<R>(
		&self,
		expr: &str,
		f: impl FnOnce(&DependencyRegistry) -> R,
	) -> ReactiveResult<R> {
		let path = Path::parse(expr)?;
		let (parents, last) = path.split_last();
		let container = match self.resolve(&path, parents, ActiveReader::none())? {
			Snapshot::Node(node) => node,
			Snapshot::Value(_) => return Err(ReactiveError::unresolvable(path.as_str(), last)),
		};

		let arena = self.inner.arena.borrow();
		match arena.lookup(container, last) {
			Lookup::Cell(cell_id) => arena
				.cells
				.get(&cell_id)
				.map(|cell| f(&cell.registry))
				.ok_or_else(|| ReactiveError::unresolvable(path.as_str(), last)),
			Lookup::Length(_) | Lookup::Missing => {
				Err(ReactiveError::unresolvable(path.as_str(), last))
			}
		}
	}
}

impl fmt::Debug for Store {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store")
			.field("data", &self.to_json())
			.field("computed", &self.computed_names())
			.finish()
	}
}

/// Indexes into a value that lives outside the store.
fn descend(value: Value, segment: &str) -> Option<Value> {
	match value {
		Value::Object(mut map) => map.remove(segment),
		Value::Array(items) if segment == "length" => Some(Value::from(items.len())),
		Value::Array(mut items) => {
			let index = segment.parse::<usize>().ok()?;
			(index < items.len()).then(|| items.swap_remove(index))
		}
		_ => None,
	}
}

/// The receiver handed to computed derivations.
///
/// Reads through a scope inherit the active reader of the evaluation that
/// triggered the computed read, so a watcher bound to a computed name is
/// registered on every property the derivation touches.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
	store: &'a Store,
	reader: ActiveReader<'a>,
}

impl<'a> Scope<'a> {
	/// Creates a scope reading from `store` on behalf of `reader`.
	pub fn new(store: &'a Store, reader: ActiveReader<'a>) -> Self {
		Self { store, reader }
	}

	/// Reads `expr` as a plain value.
	pub fn get(&self, expr: &str) -> ReactiveResult<Value> {
		let path = Path::parse(expr)?;
		let snapshot = self.store.read(&path, self.reader)?;
		Ok(self.store.snapshot_value(&snapshot))
	}

	/// Reads `expr` and deserializes it.
	pub fn get_as<T: DeserializeOwned>(&self, expr: &str) -> ReactiveResult<T> {
		let value = self.get(expr)?;
		serde_json::from_value(value).map_err(|source| ReactiveError::Conversion {
			path: expr.to_string(),
			source,
		})
	}

	/// The underlying store.
	pub fn store(&self) -> &'a Store {
		self.store
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn store() -> Store {
		Store::new(json!({
			"title": "Inbox",
			"user": { "name": "Ada", "tags": ["admin", "ops"] },
			"count": 0
		}))
	}

	#[rstest]
	fn test_round_trips_data_graph(store: Store) {
		assert_eq!(
			store.to_json(),
			json!({
				"title": "Inbox",
				"user": { "name": "Ada", "tags": ["admin", "ops"] },
				"count": 0
			})
		);
		assert_eq!(store.keys(), vec!["title", "user", "count"]);
	}

	#[rstest]
	#[case("title", json!("Inbox"))]
	#[case(" user . name ", json!("Ada"))]
	#[case("user.tags.1", json!("ops"))]
	#[case("user.tags.length", json!(2))]
	#[case("user.tags", json!(["admin", "ops"]))]
	fn test_get(store: Store, #[case] expr: &str, #[case] expected: Value) {
		assert_eq!(store.get(expr).unwrap(), expected);
	}

	#[rstest]
	#[case("missing", "missing")]
	#[case("user.email", "email")]
	#[case("user.email.domain", "email")]
	#[case("title.length", "length")]
	#[case("user.tags.9", "9")]
	fn test_get_unresolvable(store: Store, #[case] expr: &str, #[case] segment: &str) {
		let err = store.get(expr).unwrap_err();
		assert!(
			matches!(err, ReactiveError::UnresolvablePath { segment: ref s, .. } if s == segment),
			"unexpected error: {err}"
		);
	}

	#[rstest]
	fn test_set_returns_assigned_value(store: Store) {
		let assigned = store.set("user.name", json!("Grace")).unwrap();
		assert_eq!(assigned, json!("Grace"));
		assert_eq!(store.get("user.name").unwrap(), json!("Grace"));
	}

	#[rstest]
	fn test_assigned_object_becomes_reactive(store: Store) {
		store
			.set("user", json!({ "name": "Linus", "address": { "city": "Helsinki" } }))
			.unwrap();

		let watcher = Watcher::new(&store, "user.address.city", |_| Ok(())).unwrap();
		assert!(store.is_registered("user.address.city", &watcher).unwrap());

		store.set("user.address.city", json!("Portland")).unwrap();
		assert!(watcher.value().strict_eq(&Snapshot::Value(json!("Portland"))));
	}

	#[rstest]
	fn test_replaced_subtree_is_released(store: Store) {
		let before = store.cell_count();
		store.set("user", json!("anonymous")).unwrap();
		// user.name, user.tags, and both tag slots are gone.
		assert_eq!(store.cell_count(), before - 4);
	}

	#[rstest]
	fn test_missing_key_is_added_reactively(store: Store) {
		store.set("user.email", json!("ada@example.com")).unwrap();
		assert_eq!(store.get("user.email").unwrap(), json!("ada@example.com"));

		store.set("user.tags.2", json!("dev")).unwrap();
		assert_eq!(store.get("user.tags").unwrap(), json!(["admin", "ops", "dev"]));
	}

	#[rstest]
	#[case("user.tags.5")]
	#[case("title.first")]
	#[case("nothing.here")]
	fn test_write_to_unresolvable_target(store: Store, #[case] expr: &str) {
		let err = store.set(expr, json!(1)).unwrap_err();
		assert!(matches!(err, ReactiveError::UnresolvablePath { .. }));
	}

	#[rstest]
	fn test_computed_reads_through_scope(store: Store) {
		store.define_computed("greeting", |scope| {
			let title: String = scope.get_as("title")?;
			let name: String = scope.get_as("user.name")?;
			Ok(json!(format!("{title} for {name}")))
		});

		assert_eq!(store.get("greeting").unwrap(), json!("Inbox for Ada"));
		assert!(store.is_computed("greeting"));
		assert!(!store.keys().contains(&"greeting".to_string()));

		let watcher = Watcher::new(&store, "greeting", |_| Ok(())).unwrap();
		assert!(store.is_registered("title", &watcher).unwrap());
		assert!(store.is_registered("user.name", &watcher).unwrap());

		store.set("user.name", json!("Grace")).unwrap();
		assert!(watcher.value().strict_eq(&Snapshot::Value(json!("Inbox for Grace"))));
	}

	#[rstest]
	fn test_computed_is_read_only(store: Store) {
		store.define_computed("total", |scope| scope.get("count"));
		let err = store.set("total", json!(3)).unwrap_err();
		assert!(matches!(err, ReactiveError::ReadOnly(ref name) if name == "total"));
	}

	#[rstest]
	fn test_get_as_conversion_error(store: Store) {
		let err = store.get_as::<u32>("title").unwrap_err();
		assert!(matches!(err, ReactiveError::Conversion { .. }));
		assert_eq!(store.get_as::<u32>("count").unwrap(), 0);
	}

	#[rstest]
	fn test_render_snapshots(store: Store) {
		let path = Path::parse("user.tags").unwrap();
		let tags = store.read(&path, ActiveReader::none()).unwrap();
		assert_eq!(store.render(&tags), r#"["admin","ops"]"#);
		assert_eq!(store.render(&Snapshot::Value(json!(7))), "7");
	}

	#[rstest]
	fn test_scalar_root_becomes_empty_object() {
		let store = Store::new(json!(42));
		assert_eq!(store.to_json(), json!({}));
		store.set("answer", json!(42)).unwrap();
		assert_eq!(store.get("answer").unwrap(), json!(42));
	}
}
