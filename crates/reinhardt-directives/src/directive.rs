//! Directive attribute recognition.
//!
//! A directive attribute name is `<prefix><kind>[:<event>][-<ignored>]`. The
//! prefix is stripped, the remainder is cut at the first `-`, and what is left
//! is split at `:` into the directive kind and an optional event name:
//!
//! | attribute | kind | event |
//! |---|---|---|
//! | `v-html` | [`DirectiveKind::Html`] | |
//! | `v-model` | [`DirectiveKind::Model`] | |
//! | `v-text` | [`DirectiveKind::Text`] | |
//! | `v-on:click` | [`DirectiveKind::On`] | `click` |

use core::fmt;

use crate::error::{TemplateError, TemplateResult};

/// The built-in directive vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
	/// Renders the expression's value as unescaped markup content.
	Html,
	/// Two-way binding of a form element's value.
	Model,
	/// Attaches an event listener that invokes a view-model method.
	On,
	/// Renders the attribute value, with its markers substituted, as the
	/// element's text content.
	Text,
}

impl DirectiveKind {
	/// Every built-in kind.
	pub const ALL: [DirectiveKind; 4] = [
		DirectiveKind::Html,
		DirectiveKind::Model,
		DirectiveKind::On,
		DirectiveKind::Text,
	];

	/// Looks up a kind by its attribute name.
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.name() == name)
	}

	/// The attribute name of this kind, without prefix.
	pub fn name(&self) -> &'static str {
		match self {
			DirectiveKind::Html => "html",
			DirectiveKind::Model => "model",
			DirectiveKind::On => "on",
			DirectiveKind::Text => "text",
		}
	}

	/// Returns true if the directive needs an event name.
	pub fn requires_event(&self) -> bool {
		matches!(self, DirectiveKind::On)
	}

	/// Returns true if the directive replaces the element's authored content,
	/// so the compiler must not descend into it.
	pub fn owns_content(&self) -> bool {
		matches!(self, DirectiveKind::Html | DirectiveKind::Text)
	}
}

impl fmt::Display for DirectiveKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A parsed directive attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
	/// The directive kind.
	pub kind: DirectiveKind,
	/// The full attribute name, e.g. `v-on:click`.
	pub attribute: String,
	/// The attribute value: a binding path, a method name for `on`, or a
	/// marker template for `text`.
	pub expression: String,
	/// The event name after `:`, if any.
	pub event: Option<String>,
}

impl Directive {
	/// Recognizes a directive attribute.
	///
	/// Returns `Ok(None)` for attributes that do not start with `prefix`.
	///
	/// # Errors
	///
	/// - [`TemplateError::MalformedDirective`] when nothing names a kind
	///   (`v-`, `v--x`, `v-:click`).
	/// - [`TemplateError::UnknownDirective`] for an unrecognized kind.
	/// - [`TemplateError::MissingEventName`] for `on` without an event.
	pub fn parse(
		element: &str,
		attribute: &str,
		expression: &str,
		prefix: &str,
	) -> TemplateResult<Option<Self>> {
		let Some(rest) = attribute.strip_prefix(prefix) else {
			return Ok(None);
		};

		let base = rest.split('-').next().unwrap_or_default();
		let (name, event) = match base.split_once(':') {
			Some((name, event)) => (name, Some(event)),
			None => (base, None),
		};
		if name.is_empty() {
			return Err(TemplateError::MalformedDirective(attribute.to_string()));
		}

		let kind = DirectiveKind::from_name(name).ok_or_else(|| TemplateError::UnknownDirective {
			attribute: attribute.to_string(),
			element: element.to_string(),
		})?;

		let event = event.filter(|event| !event.is_empty()).map(str::to_string);
		if kind.requires_event() && event.is_none() {
			return Err(TemplateError::MissingEventName(attribute.to_string()));
		}

		Ok(Some(Self {
			kind,
			attribute: attribute.to_string(),
			expression: expression.to_string(),
			event,
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("v-html", DirectiveKind::Html, None)]
	#[case("v-model", DirectiveKind::Model, None)]
	#[case("v-text", DirectiveKind::Text, None)]
	#[case("v-on:click", DirectiveKind::On, Some("click"))]
	#[case("v-on:keyup-enter", DirectiveKind::On, Some("keyup"))]
	#[case("v-model-lazy", DirectiveKind::Model, None)]
	fn test_parse(#[case] attribute: &str, #[case] kind: DirectiveKind, #[case] event: Option<&str>) {
		let directive = Directive::parse("div", attribute, "x", "v-").unwrap().unwrap();
		assert_eq!(directive.kind, kind);
		assert_eq!(directive.event.as_deref(), event);
		assert_eq!(directive.attribute, attribute);
		assert_eq!(directive.expression, "x");
	}

	#[rstest]
	#[case("class")]
	#[case("data-v-html")]
	#[case("von")]
	fn test_plain_attributes_are_not_directives(#[case] attribute: &str) {
		assert!(Directive::parse("div", attribute, "x", "v-").unwrap().is_none());
	}

	#[rstest]
	#[case("v-")]
	#[case("v--html")]
	#[case("v-:click")]
	fn test_malformed(#[case] attribute: &str) {
		let err = Directive::parse("div", attribute, "x", "v-").unwrap_err();
		assert!(matches!(err, TemplateError::MalformedDirective(ref a) if a == attribute));
	}

	#[rstest]
	fn test_unknown_kind() {
		let err = Directive::parse("li", "v-for", "item in items", "v-").unwrap_err();
		assert!(matches!(
			err,
			TemplateError::UnknownDirective { ref attribute, ref element } if attribute == "v-for" && element == "li"
		));
	}

	#[rstest]
	#[case("v-on")]
	#[case("v-on:")]
	fn test_on_requires_event(#[case] attribute: &str) {
		let err = Directive::parse("button", attribute, "save", "v-").unwrap_err();
		assert!(matches!(err, TemplateError::MissingEventName(_)));
	}

	#[rstest]
	fn test_custom_prefix() {
		let directive = Directive::parse("p", "x-text", "msg", "x-").unwrap().unwrap();
		assert_eq!(directive.kind, DirectiveKind::Text);
		assert!(Directive::parse("p", "v-text", "msg", "x-").unwrap().is_none());
	}
}
