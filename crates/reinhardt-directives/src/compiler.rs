//! Template compiler.
//!
//! Compilation moves the root's children into a detached fragment, walks the
//! fragment once, and moves it back in a single append.
//!
//! The walk is split in two phases:
//!
//! 1. **Plan**: depth-first, attributes before descent. Every directive is
//!    parsed and validated and every interpolated text node is recorded.
//!    Paths must resolve and `on` methods must exist.
//! 2. **Bind**: handlers run in plan order.
//!
//! A template that fails planning is reattached unchanged and creates no
//! binding.
//!
//! Markup injected by `html` is compiled once, right after the handler has
//! rendered it, so its markers and directives are live. Planning renders the
//! same markup into a scratch fragment first to validate it. Markup written
//! by later updates is not compiled.

use std::rc::Rc;

use reinhardt_reactive::{Snapshot, Watcher};

use crate::directive::{Directive, DirectiveKind};
use crate::dom::{Node, NodeType};
use crate::error::{TemplateError, TemplateResult};
use crate::handlers::{DirectiveTable, bind_interpolation};
use crate::interpolation::Interpolator;
use crate::settings::TemplateSettings;
use crate::view_model::ViewModel;

/// How deeply `html` content may inject further `html` content.
pub const MAX_INJECTION_DEPTH: usize = 16;

/// One binding site found during planning.
#[derive(Debug)]
enum Site {
	Directive { node: Node, directive: Directive },
	Interpolation { node: Node, template: String },
	/// Children rendered by an `html` directive on `node`.
	Injected { node: Node, depth: usize },
}

/// Compiles markup under a root element against a view model.
#[derive(Debug)]
pub struct Compiler<'a> {
	view_model: &'a ViewModel,
	settings: &'a TemplateSettings,
	interpolator: Interpolator,
	table: DirectiveTable,
}

impl<'a> Compiler<'a> {
	/// Creates a compiler with the built-in directive table.
	pub fn new(view_model: &'a ViewModel, settings: &'a TemplateSettings) -> TemplateResult<Self> {
		Ok(Self {
			view_model,
			settings,
			interpolator: Interpolator::from_settings(settings)?,
			table: DirectiveTable::builtin(),
		})
	}

	/// Replaces the directive table.
	pub fn with_table(mut self, table: DirectiveTable) -> Self {
		self.table = table;
		self
	}

	/// Compiles the children of `root` and returns the created watchers.
	pub fn compile(&self, root: &Node) -> TemplateResult<Vec<Rc<Watcher>>> {
		let staged = Node::fragment();
		for child in root.take_children() {
			staged.append_child(&child);
		}

		let mut plan = Vec::new();
		if let Err(err) = self.plan(&staged, &mut plan, 0) {
			root.append_child(&staged);
			return Err(err);
		}

		let result = self.bind(plan);
		root.append_child(&staged);
		let watchers = result?;

		tracing::debug!(bindings = watchers.len(), "template compiled");
		Ok(watchers)
	}

	fn plan(&self, parent: &Node, plan: &mut Vec<Site>, depth: usize) -> TemplateResult<()> {
		for child in parent.children() {
			match child.node_type() {
				NodeType::Element => {
					let owns_content = self.plan_element(&child, plan, depth)?;
					if !owns_content {
						self.plan(&child, plan, depth)?;
					}
				}
				NodeType::Text => {
					let Some(template) = child.data() else {
						continue;
					};
					if !self.interpolator.has_markers(&template) {
						continue;
					}
					self.check_template(&template)?;
					plan.push(Site::Interpolation {
						node: child,
						template,
					});
				}
				NodeType::Comment | NodeType::Fragment => {}
			}
		}
		Ok(())
	}

	/// Plans the directives of one element. Returns true if a directive
	/// replaces the element's authored content.
	fn plan_element(&self, element: &Node, plan: &mut Vec<Site>, depth: usize) -> TemplateResult<bool> {
		let tag = element.tag_name().unwrap_or_default();
		let mut owns_content = false;
		let mut injects = false;

		for (name, value) in element.attrs() {
			let parsed = Directive::parse(&tag, &name, &value, &self.settings.directive_prefix);
			let directive = match parsed {
				Ok(Some(directive)) => directive,
				Ok(None) => continue,
				Err(TemplateError::UnknownDirective { attribute, element }) if !self.settings.strict_directives => {
					tracing::warn!(attribute = %attribute, element = %element, "skipping unknown directive");
					continue;
				}
				Err(err) => return Err(err),
			};

			self.validate(&directive)?;
			if directive.kind == DirectiveKind::Html {
				self.check_injected(&directive.expression, depth + 1)?;
				injects = true;
			}
			owns_content |= directive.kind.owns_content();
			plan.push(Site::Directive {
				node: element.clone(),
				directive,
			});
		}

		if injects {
			plan.push(Site::Injected {
				node: element.clone(),
				depth: depth + 1,
			});
		}
		Ok(owns_content)
	}

	fn validate(&self, directive: &Directive) -> TemplateResult<()> {
		match directive.kind {
			DirectiveKind::On => {
				let method = directive.expression.trim();
				if self.view_model.has_method(method) {
					Ok(())
				} else {
					Err(TemplateError::UnknownMethod(method.to_string()))
				}
			}
			DirectiveKind::Html | DirectiveKind::Model => self.check_path(&directive.expression),
			DirectiveKind::Text => self.check_template(&directive.expression),
		}
	}

	fn check_path(&self, expression: &str) -> TemplateResult<()> {
		self.view_model.mounted_store()?.get(expression)?;
		Ok(())
	}

	fn check_template(&self, template: &str) -> TemplateResult<()> {
		for path in self.interpolator.expressions(template)? {
			self.check_path(path.as_str())?;
		}
		Ok(())
	}

	/// Renders the current `html` value into a scratch fragment and plans it,
	/// discarding the plan.
	fn check_injected(&self, expression: &str, depth: usize) -> TemplateResult<()> {
		if depth > MAX_INJECTION_DEPTH {
			return Err(TemplateError::InjectionTooDeep(MAX_INJECTION_DEPTH));
		}
		let store = self.view_model.mounted_store()?;
		let markup = store.render(&Snapshot::Value(store.get(expression)?));
		let scratch = Node::fragment();
		scratch.set_inner_html(&markup)?;
		self.plan(&scratch, &mut Vec::new(), depth)
	}

	fn bind(&self, plan: Vec<Site>) -> TemplateResult<Vec<Rc<Watcher>>> {
		let mut watchers = Vec::new();
		for site in plan {
			match site {
				Site::Directive { node, directive } => {
					tracing::trace!(directive = %directive.attribute, expression = %directive.expression, "binding directive");
					watchers.extend(self.table.dispatch(self.view_model, &node, &directive)?);
				}
				Site::Interpolation { node, template } => {
					watchers.extend(bind_interpolation(
						self.view_model,
						&self.interpolator,
						&node,
						&template,
					)?);
				}
				Site::Injected { node, depth } => {
					let mut nested = Vec::new();
					self.plan(&node, &mut nested, depth)?;
					watchers.extend(self.bind(nested)?);
				}
			}
		}
		Ok(watchers)
	}
}
