//! Directive handlers and the dispatch table.
//!
//! Each handler renders the current value into its node once and returns the
//! [`Watcher`]s that keep the node up to date. The view model owns the
//! returned watchers; the `on` handler only installs a listener and returns
//! none.

use core::fmt;
use std::collections::HashMap;
use std::rc::Rc;

use reinhardt_reactive::Watcher;
use serde_json::Value;

use crate::directive::{Directive, DirectiveKind};
use crate::dom::Node;
use crate::error::{TemplateError, TemplateResult};
use crate::interpolation::Interpolator;
use crate::view_model::ViewModel;

/// The watchers created by a handler.
pub type Binding = Vec<Rc<Watcher>>;

/// A directive handler.
pub type Handler = fn(&ViewModel, &Node, &Directive) -> TemplateResult<Binding>;

/// Maps directive kinds to their handlers.
#[derive(Clone)]
pub struct DirectiveTable {
	handlers: HashMap<DirectiveKind, Handler>,
}

impl DirectiveTable {
	/// The table with the built-in handler for every kind.
	pub fn builtin() -> Self {
		let mut handlers: HashMap<DirectiveKind, Handler> = HashMap::new();
		handlers.insert(DirectiveKind::Html, bind_html);
		handlers.insert(DirectiveKind::Model, bind_model);
		handlers.insert(DirectiveKind::On, bind_on);
		handlers.insert(DirectiveKind::Text, bind_text);
		Self { handlers }
	}

	/// Replaces the handler for `kind`.
	pub fn register(&mut self, kind: DirectiveKind, handler: Handler) {
		self.handlers.insert(kind, handler);
	}

	/// The handler for `kind`.
	pub fn get(&self, kind: DirectiveKind) -> Option<Handler> {
		self.handlers.get(&kind).copied()
	}

	/// Runs the handler for `directive` against `node`.
	pub fn dispatch(
		&self,
		view_model: &ViewModel,
		node: &Node,
		directive: &Directive,
	) -> TemplateResult<Binding> {
		let handler = self
			.get(directive.kind)
			.ok_or_else(|| TemplateError::UnknownDirective {
				attribute: directive.attribute.clone(),
				element: node.tag_name().unwrap_or_default(),
			})?;
		handler(view_model, node, directive)
	}
}

impl fmt::Debug for DirectiveTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut kinds: Vec<&'static str> = self.handlers.keys().map(DirectiveKind::name).collect();
		kinds.sort_unstable();
		f.debug_struct("DirectiveTable").field("kinds", &kinds).finish()
	}
}

impl Default for DirectiveTable {
	fn default() -> Self {
		Self::builtin()
	}
}

/// `html`: unescaped markup content.
fn bind_html(view_model: &ViewModel, node: &Node, directive: &Directive) -> TemplateResult<Binding> {
	let store = view_model.mounted_store()?;
	let target = node.clone();
	let renderer = store.clone();
	let watcher = Watcher::new(store, &directive.expression, move |value| {
		target
			.set_inner_html(&renderer.render(value))
			.map_err(|err| TemplateError::from(err).into_reaction())
	})?;

	node.set_inner_html(&store.render(&watcher.value()))?;
	Ok(vec![watcher])
}

/// `model`: value rendering plus write-back on `input`.
fn bind_model(view_model: &ViewModel, node: &Node, directive: &Directive) -> TemplateResult<Binding> {
	let store = view_model.mounted_store()?;
	let target = node.clone();
	let renderer = store.clone();
	let watcher = Watcher::new(store, &directive.expression, move |value| {
		target.set_value(renderer.render(value));
		Ok(())
	})?;

	let writer = store.clone();
	let expression = directive.expression.clone();
	node.add_event_listener("input", move |event| {
		writer.set(&expression, Value::String(event.target().value()))?;
		Ok(())
	});

	node.set_value(store.render(&watcher.value()));
	Ok(vec![watcher])
}

/// `text`: the attribute value as an interpolated template, written as
/// escaped text content. A value without markers is static text.
fn bind_text(view_model: &ViewModel, node: &Node, directive: &Directive) -> TemplateResult<Binding> {
	let interpolator = Interpolator::from_settings(view_model.settings())?;
	let target = node.clone();
	watch_template(view_model, &interpolator, &directive.expression, move |text| {
		replace_text(&target, text)
	})
}

/// `on:<event>`: invokes a view-model method with the event.
fn bind_on(view_model: &ViewModel, node: &Node, directive: &Directive) -> TemplateResult<Binding> {
	let event_type = directive
		.event
		.clone()
		.ok_or_else(|| TemplateError::MissingEventName(directive.attribute.clone()))?;
	let method = directive.expression.trim().to_string();
	let owner = view_model.downgrade();

	node.add_event_listener(event_type, move |event| match owner.upgrade() {
		Some(view_model) => view_model.call(&method, event),
		None => {
			tracing::debug!(method = %method, "view model dropped; ignoring event");
			Ok(())
		}
	});
	Ok(Vec::new())
}

/// Text interpolation: one watcher per distinct path, each re-rendering the
/// whole text.
pub(crate) fn bind_interpolation(
	view_model: &ViewModel,
	interpolator: &Interpolator,
	node: &Node,
	template: &str,
) -> TemplateResult<Binding> {
	let target = node.clone();
	watch_template(view_model, interpolator, template, move |text| {
		target.set_data(text)
	})
}

fn watch_template<W>(
	view_model: &ViewModel,
	interpolator: &Interpolator,
	template: &str,
	write: W,
) -> TemplateResult<Binding>
where
	W: Fn(String) + Clone + 'static,
{
	let store = view_model.mounted_store()?;
	let paths = interpolator.expressions(template)?;

	let mut watchers = Vec::with_capacity(paths.len());
	for path in paths {
		let write = write.clone();
		let renderer = store.clone();
		let interpolator = interpolator.clone();
		let template = template.to_string();
		watchers.push(Watcher::new(store, path.as_str(), move |_| {
			write(interpolator.render(&template, &renderer)?);
			Ok(())
		})?);
	}

	write(interpolator.render(template, store)?);
	Ok(watchers)
}

fn replace_text(node: &Node, text: String) {
	drop(node.take_children());
	node.append_child(&Node::text(text));
}
