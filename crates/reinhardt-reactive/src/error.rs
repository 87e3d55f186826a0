//! Error types for the reactive store.

use thiserror::Error;

/// Result type for reactive operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;

/// Errors raised while resolving, reading, or writing reactive properties.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReactiveError {
	/// The expression is empty or contains an empty path segment.
	#[error("invalid binding expression: {0:?}")]
	InvalidExpression(String),

	/// A segment of the binding path does not exist in the data graph.
	#[error("unresolvable binding path `{path}`: segment `{segment}` not found")]
	UnresolvablePath {
		/// The normalized expression being resolved.
		path: String,
		/// The first segment that could not be resolved.
		segment: String,
	},

	/// Attempted to write a computed (derived) property.
	#[error("property `{0}` is read-only")]
	ReadOnly(String),

	/// A resolved value could not be converted into the requested type.
	#[error("cannot convert value of `{path}`: {source}")]
	Conversion {
		/// The expression whose value failed to convert.
		path: String,
		/// Underlying deserialization error.
		#[source]
		source: serde_json::Error,
	},

	/// A binding reaction failed while applying a change.
	#[error("binding reaction failed: {0}")]
	Reaction(#[source] Box<dyn std::error::Error + 'static>),
}

impl ReactiveError {
	/// Wraps an arbitrary reaction failure.
	pub fn reaction(error: impl std::error::Error + 'static) -> Self {
		Self::Reaction(Box::new(error))
	}

	pub(crate) fn unresolvable(path: impl Into<String>, segment: impl Into<String>) -> Self {
		Self::UnresolvablePath {
			path: path.into(),
			segment: segment.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unresolvable_display() {
		let err = ReactiveError::unresolvable("user.profile.name", "profile");
		assert_eq!(
			err.to_string(),
			"unresolvable binding path `user.profile.name`: segment `profile` not found"
		);
	}

	#[rstest]
	fn test_reaction_preserves_source() {
		let io = std::io::Error::other("render failed");
		let err = ReactiveError::reaction(io);
		assert!(std::error::Error::source(&err).is_some());
		assert_eq!(err.to_string(), "binding reaction failed: render failed");
	}
}
