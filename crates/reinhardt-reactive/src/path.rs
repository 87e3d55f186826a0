//! Dotted binding paths.
//!
//! A binding expression such as `user.profile.name` is normalized by removing
//! every whitespace character and splitting on `.`. The resulting [`Path`] is
//! folded left to right through the data graph by the store.

use core::fmt;
use core::str::FromStr;

use crate::error::{ReactiveError, ReactiveResult};

/// A parsed, normalized binding expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
	normalized: String,
	segments: Vec<String>,
}

impl Path {
	/// Parses a binding expression.
	///
	/// Whitespace anywhere in the expression is discarded, so `{{ a . b }}`
	/// resolves the same path as `{{a.b}}`.
	///
	/// # Errors
	///
	/// Returns [`ReactiveError::InvalidExpression`] when the expression is empty
	/// or contains an empty segment (`a..b`, `.a`, `a.`).
	pub fn parse(expr: &str) -> ReactiveResult<Self> {
		let normalized: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
		if normalized.is_empty() {
			return Err(ReactiveError::InvalidExpression(expr.to_string()));
		}

		let segments: Vec<String> = normalized.split('.').map(str::to_string).collect();
		if segments.iter().any(String::is_empty) {
			return Err(ReactiveError::InvalidExpression(expr.to_string()));
		}

		Ok(Self {
			normalized,
			segments,
		})
	}

	/// The whitespace-free expression.
	pub fn as_str(&self) -> &str {
		&self.normalized
	}

	/// Path segments in traversal order.
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	/// The first segment, i.e. the top-level property name.
	pub fn head(&self) -> &str {
		&self.segments[0]
	}

	/// Splits the path into its parent segments and the terminal segment.
	pub fn split_last(&self) -> (&[String], &str) {
		match self.segments.split_last() {
			Some((last, parents)) => (parents, last.as_str()),
			None => (&self.segments[..0], ""),
		}
	}

	/// Number of segments.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// Always false: a parsed path has at least one segment.
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.normalized)
	}
}

impl FromStr for Path {
	type Err = ReactiveError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
