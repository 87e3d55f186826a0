//! View model: the root coordinator.
//!
//! A [`ViewModel`] makes its data reactive, installs computed members and
//! methods, and compiles the markup under its root element. Top-level data
//! keys are then readable and writable through the view model itself.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_directives::{Node, ViewModel, ViewModelOptions};
//! use serde_json::json;
//!
//! let el = Node::parse("div", r#"<p>{{ count }}</p><button v-on:click="inc">+</button>"#)?;
//! let vm = ViewModel::new(
//!     ViewModelOptions::new()
//!         .el(el.clone())
//!         .data(json!({ "count": 0 }))
//!         .method("inc", |vm, _event| {
//!             vm.update("count", |n| json!(n.as_i64().unwrap_or(0) + 1))
//!         }),
//! )?;
//!
//! el.find("button").unwrap().dispatch("click")?;
//! assert_eq!(el.find("p").unwrap().text_content(), "1");
//! ```
//!
//! ## Lifetime
//!
//! The view model owns every binding it creates. Dropping the last handle
//! disposes them: later writes to the store update nothing, and event
//! listeners left on the tree become no-ops.

use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use reinhardt_reactive::{ReactiveError, ReactiveResult, Scope, Store, Watcher};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::compiler::Compiler;
use crate::dom::{Event, Node};
use crate::error::{TemplateError, TemplateResult};
use crate::handlers::DirectiveTable;
use crate::settings::TemplateSettings;

/// A view-model method. Receives the view model and the triggering event.
pub type Method = Rc<dyn Fn(&ViewModel, &Event) -> TemplateResult<()> + 'static>;

/// A computed member derivation.
pub type Derivation = Rc<dyn Fn(&Scope<'_>) -> ReactiveResult<Value> + 'static>;

/// Construction options for a [`ViewModel`].
#[derive(Clone, Default)]
pub struct ViewModelOptions {
	el: Option<Node>,
	data: Value,
	computed: IndexMap<String, Derivation>,
	methods: IndexMap<String, Method>,
	settings: TemplateSettings,
	directives: DirectiveTable,
}

impl ViewModelOptions {
	/// Creates empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the root element.
	pub fn el(mut self, el: Node) -> Self {
		self.el = Some(el);
		self
	}

	/// Sets the data object.
	pub fn data(mut self, data: Value) -> Self {
		self.data = data;
		self
	}

	/// Adds a computed member.
	pub fn computed<F>(mut self, name: impl Into<String>, derive: F) -> Self
	where
		F: Fn(&Scope<'_>) -> ReactiveResult<Value> + 'static,
	{
		self.computed.insert(name.into(), Rc::new(derive));
		self
	}

	/// Adds a method.
	pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
	where
		F: Fn(&ViewModel, &Event) -> TemplateResult<()> + 'static,
	{
		self.methods.insert(name.into(), Rc::new(method));
		self
	}

	/// Sets the template settings.
	pub fn settings(mut self, settings: TemplateSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Replaces the directive handler table.
	pub fn directives(mut self, table: DirectiveTable) -> Self {
		self.directives = table;
		self
	}
}

impl fmt::Debug for ViewModelOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewModelOptions")
			.field("el", &self.el)
			.field("data", &self.data)
			.field("computed", &self.computed.keys().collect::<Vec<_>>())
			.field("methods", &self.methods.keys().collect::<Vec<_>>())
			.field("settings", &self.settings)
			.field("directives", &self.directives)
			.finish()
	}
}

enum State {
	/// No root element: data is kept as given.
	Inert(Value),
	Mounted(Store),
}

struct ViewModelInner {
	el: Option<Node>,
	state: State,
	methods: IndexMap<String, Method>,
	settings: TemplateSettings,
	bindings: RefCell<Vec<Rc<Watcher>>>,
}

/// The root coordinator of a bound template.
///
/// Cloning creates another handle to the same view model.
#[derive(Clone)]
pub struct ViewModel {
	inner: Rc<ViewModelInner>,
}

/// A non-owning handle to a [`ViewModel`].
#[derive(Clone)]
pub struct WeakViewModel {
	inner: Weak<ViewModelInner>,
}

impl WeakViewModel {
	/// Returns the view model if it is still alive.
	pub fn upgrade(&self) -> Option<ViewModel> {
		self.inner.upgrade().map(|inner| ViewModel { inner })
	}
}

impl ViewModel {
	/// Builds a view model and compiles its root element.
	///
	/// Without a root element nothing is made reactive and nothing is
	/// compiled; the data is available through [`ViewModel::raw_data`].
	///
	/// # Errors
	///
	/// Invalid settings, or any compilation error. A failed compilation leaves
	/// the markup unchanged.
	pub fn new(options: ViewModelOptions) -> TemplateResult<Self> {
		let ViewModelOptions {
			el,
			data,
			computed,
			methods,
			settings,
			directives,
		} = options;
		settings.validate()?;

		let state = match &el {
			None => {
				tracing::debug!("view model has no root element; staying inert");
				State::Inert(data)
			}
			Some(_) => {
				let store = Store::new(data);
				for (name, derive) in computed {
					store.define_computed(name, move |scope| derive(scope));
				}
				State::Mounted(store)
			}
		};

		let view_model = Self {
			inner: Rc::new(ViewModelInner {
				el,
				state,
				methods,
				settings,
				bindings: RefCell::new(Vec::new()),
			}),
		};

		if let Some(root) = &view_model.inner.el {
			let watchers = Compiler::new(&view_model, &view_model.inner.settings)?
				.with_table(directives)
				.compile(root)?;
			tracing::debug!(bindings = watchers.len(), "view model mounted");
			*view_model.inner.bindings.borrow_mut() = watchers;
		}

		Ok(view_model)
	}

	/// The root element.
	pub fn el(&self) -> Option<&Node> {
		self.inner.el.as_ref()
	}

	/// The template settings.
	pub fn settings(&self) -> &TemplateSettings {
		&self.inner.settings
	}

	/// The reactive store, if mounted.
	pub fn store(&self) -> Option<&Store> {
		match &self.inner.state {
			State::Mounted(store) => Some(store),
			State::Inert(_) => None,
		}
	}

	pub(crate) fn mounted_store(&self) -> TemplateResult<&Store> {
		self.store().ok_or(TemplateError::Unmounted)
	}

	/// The current data as a plain value.
	pub fn raw_data(&self) -> Value {
		match &self.inner.state {
			State::Mounted(store) => store.to_json(),
			State::Inert(data) => data.clone(),
		}
	}

	/// Number of live bindings.
	pub fn binding_count(&self) -> usize {
		self.inner.bindings.borrow().len()
	}

	/// Returns a non-owning handle.
	pub fn downgrade(&self) -> WeakViewModel {
		WeakViewModel {
			inner: Rc::downgrade(&self.inner),
		}
	}

	// ------------------------------------------------------------------
	// Proxied data access
	// ------------------------------------------------------------------

	/// Reads a top-level data key or computed member.
	pub fn get(&self, key: &str) -> TemplateResult<Value> {
		let store = self.mounted_store()?;
		if !store.is_computed(key) && !self.has_data_key(store, key) {
			return Err(TemplateError::UnknownProperty(key.to_string()));
		}
		Ok(store.get(key)?)
	}

	/// Reads a top-level data key or computed member and deserializes it.
	pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> TemplateResult<T> {
		let value = self.get(key)?;
		serde_json::from_value(value).map_err(|source| {
			TemplateError::Reactive(ReactiveError::Conversion {
				path: key.to_string(),
				source,
			})
		})
	}

	/// Writes a top-level data key.
	///
	/// # Errors
	///
	/// Computed members are read-only; unknown keys are rejected. Errors
	/// raised by bindings reacting to the write are returned after the value
	/// has been stored.
	pub fn set(&self, key: &str, value: Value) -> TemplateResult<()> {
		let store = self.mounted_store()?;
		if !store.is_computed(key) && !self.has_data_key(store, key) {
			return Err(TemplateError::UnknownProperty(key.to_string()));
		}
		store.set(key, value)?;
		Ok(())
	}

	/// Replaces a top-level data key with a value derived from the current one.
	pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) -> TemplateResult<()> {
		let current = self.get(key)?;
		self.set(key, f(current))
	}

	fn has_data_key(&self, store: &Store, key: &str) -> bool {
		store.keys().iter().any(|existing| existing == key)
	}

	// ------------------------------------------------------------------
	// Methods
	// ------------------------------------------------------------------

	/// Returns true if a method named `name` was declared.
	pub fn has_method(&self, name: &str) -> bool {
		self.inner.methods.contains_key(name)
	}

	/// Invokes a method with this view model as its receiver.
	pub fn call(&self, name: &str, event: &Event) -> TemplateResult<()> {
		self.mounted_store()?;
		let method = self
			.inner
			.methods
			.get(name)
			.cloned()
			.ok_or_else(|| TemplateError::UnknownMethod(name.to_string()))?;
		tracing::trace!(method = name, event = event.event_type(), "calling method");
		method(self, event)
	}
}

impl fmt::Debug for ViewModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewModel")
			.field("el", &self.inner.el)
			.field("data", &self.raw_data())
			.field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
			.field("bindings", &self.binding_count())
			.finish()
	}
}

impl fmt::Debug for WeakViewModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakViewModel")
			.field("alive", &(self.inner.strong_count() > 0))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn mounted(markup: &str, data: Value) -> (Node, ViewModel) {
		let el = Node::parse("div", markup).unwrap();
		let vm = ViewModel::new(ViewModelOptions::new().el(el.clone()).data(data)).unwrap();
		(el, vm)
	}

	#[rstest]
	fn test_inert_without_root_element() {
		let vm = ViewModel::new(ViewModelOptions::new().data(json!({ "a": 1 }))).unwrap();

		assert!(vm.store().is_none());
		assert_eq!(vm.raw_data(), json!({ "a": 1 }));
		assert!(matches!(vm.get("a"), Err(TemplateError::Unmounted)));
		assert!(matches!(vm.set("a", json!(2)), Err(TemplateError::Unmounted)));
	}

	#[rstest]
	fn test_proxy_reads_and_writes_top_level_keys() {
		let (el, vm) = mounted("<p>{{ title }}</p>", json!({ "title": "Draft" }));

		assert_eq!(vm.get("title").unwrap(), json!("Draft"));
		vm.set("title", json!("Final")).unwrap();

		assert_eq!(el.inner_html(), "<p>Final</p>");
		assert_eq!(vm.get_as::<String>("title").unwrap(), "Final");
	}

	#[rstest]
	#[case("missing")]
	#[case("user.name")]
	fn test_proxy_rejects_unknown_keys(#[case] key: &str) {
		let (_el, vm) = mounted("", json!({ "user": { "name": "Ada" } }));
		assert!(matches!(vm.get(key), Err(TemplateError::UnknownProperty(_))));
		assert!(matches!(vm.set(key, json!(1)), Err(TemplateError::UnknownProperty(_))));
	}

	#[rstest]
	fn test_computed_is_readable_not_writable() {
		let el = Node::parse("div", "<span>{{ full }}</span>").unwrap();
		let vm = ViewModel::new(
			ViewModelOptions::new()
				.el(el.clone())
				.data(json!({ "first": "Ada", "last": "Lovelace" }))
				.computed("full", |scope| {
					let first: String = scope.get_as("first")?;
					let last: String = scope.get_as("last")?;
					Ok(json!(format!("{first} {last}")))
				}),
		)
		.unwrap();

		assert_eq!(vm.get("full").unwrap(), json!("Ada Lovelace"));
		assert!(matches!(
			vm.set("full", json!("x")),
			Err(TemplateError::Reactive(ReactiveError::ReadOnly(_)))
		));

		vm.set("last", json!("Byron")).unwrap();
		assert_eq!(el.text_content(), "Ada Byron");
	}

	#[rstest]
	fn test_call_unknown_method() {
		let (el, vm) = mounted("", json!({}));
		let err = vm.call("nope", &Event::new("click", &el)).unwrap_err();
		assert!(matches!(err, TemplateError::UnknownMethod(ref name) if name == "nope"));
	}

	#[rstest]
	fn test_dropping_view_model_disposes_bindings() {
		let (el, vm) = mounted("<p>{{ n }}</p>", json!({ "n": 1 }));
		let store = vm.store().unwrap().clone();
		assert_eq!(vm.binding_count(), 1);
		assert_eq!(store.subscriber_count("n").unwrap(), 1);

		drop(vm);
		store.set("n", json!(2)).unwrap();

		assert_eq!(store.subscriber_count("n").unwrap(), 0);
		assert_eq!(el.inner_html(), "<p>1</p>");
	}

	#[rstest]
	fn test_invalid_settings_are_rejected() {
		let result = ViewModel::new(
			ViewModelOptions::new().settings(TemplateSettings::new().prefix("")),
		);
		assert!(matches!(result, Err(TemplateError::InvalidSettings(_))));
	}
}
