//! Error types for template compilation and view-model access.

use reinhardt_reactive::ReactiveError;
use thiserror::Error;

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Markup parsing errors.
///
/// Offsets are byte positions in the parsed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
	/// A closing tag with no open element to close.
	#[error("unexpected closing tag </{tag}> at byte {offset}")]
	UnexpectedClose {
		/// Tag name of the closing tag.
		tag: String,
		/// Position of the closing tag.
		offset: usize,
	},

	/// A closing tag that does not match the innermost open element.
	#[error("mismatched closing tag at byte {offset}: expected </{expected}>, found </{found}>")]
	MismatchedClose {
		/// Tag name of the innermost open element.
		expected: String,
		/// Tag name of the closing tag.
		found: String,
		/// Position of the closing tag.
		offset: usize,
	},

	/// Input ended while an element was still open.
	#[error("unclosed element <{0}>")]
	Unclosed(String),
}

/// Template compilation and view-model errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
	/// A directive attribute names a directive that does not exist.
	#[error("unknown directive `{attribute}` on <{element}>")]
	UnknownDirective {
		/// Full attribute name.
		attribute: String,
		/// Tag name of the element carrying the attribute.
		element: String,
	},

	/// A directive attribute with nothing after the prefix.
	#[error("malformed directive attribute `{0}`")]
	MalformedDirective(String),

	/// An event directive without an event name.
	#[error("directive `{0}` requires an event name after `:`")]
	MissingEventName(String),

	/// An event directive names a method the view model does not declare.
	#[error("unknown method `{0}`")]
	UnknownMethod(String),

	/// Proxy access to a name that is neither a data key nor computed.
	#[error("unknown property `{0}`")]
	UnknownProperty(String),

	/// Proxy access on a view model constructed without a root element.
	#[error("view model has no root element")]
	Unmounted,

	/// `html` content kept injecting further `html` content.
	#[error("injected markup nested deeper than {0} levels")]
	InjectionTooDeep(usize),

	/// Markup could not be parsed.
	#[error("markup parse error: {0}")]
	Parse(#[from] ParseError),

	/// Settings could not be deserialized.
	#[error("failed to load template settings: {0}")]
	Settings(#[from] toml::de::Error),

	/// Settings were loaded but are not usable.
	#[error("invalid template settings: {0}")]
	InvalidSettings(String),

	/// A reactive read, write, or reaction failed.
	#[error(transparent)]
	Reactive(#[from] ReactiveError),
}

impl TemplateError {
	/// Wraps this error so it can be returned from a binding reaction.
	pub fn into_reaction(self) -> ReactiveError {
		match self {
			TemplateError::Reactive(inner) => inner,
			other => ReactiveError::reaction(other),
		}
	}
}
