//! Text interpolation markers.
//!
//! A marker is the shortest `open … close` span on one line, e.g.
//! `{{ user.name }}`. The text between the delimiters is a binding path.

use indexmap::IndexSet;
use regex::Regex;
use reinhardt_reactive::{ActiveReader, Path, ReactiveResult, Store};

use crate::error::{TemplateError, TemplateResult};
use crate::settings::TemplateSettings;

/// Finds and renders interpolation markers.
#[derive(Debug, Clone)]
pub struct Interpolator {
	pattern: Regex,
}

impl Interpolator {
	/// Builds the marker pattern from the configured delimiters.
	pub fn new(open: &str, close: &str) -> TemplateResult<Self> {
		let source = format!("{}(.+?){}", regex::escape(open), regex::escape(close));
		let pattern =
			Regex::new(&source).map_err(|err| TemplateError::InvalidSettings(err.to_string()))?;
		Ok(Self { pattern })
	}

	/// Builds the marker pattern from settings.
	pub fn from_settings(settings: &TemplateSettings) -> TemplateResult<Self> {
		Self::new(&settings.interpolation_open, &settings.interpolation_close)
	}

	/// Returns true if `text` contains at least one marker.
	pub fn has_markers(&self, text: &str) -> bool {
		self.pattern.is_match(text)
	}

	/// The distinct paths referenced by `text`, in order of first appearance.
	///
	/// Markers that differ only in whitespace name the same path.
	pub fn expressions(&self, text: &str) -> ReactiveResult<Vec<Path>> {
		let mut paths = IndexSet::new();
		for caps in self.pattern.captures_iter(text) {
			if let Some(expr) = caps.get(1) {
				paths.insert(Path::parse(expr.as_str())?);
			}
		}
		Ok(paths.into_iter().collect())
	}

	/// Substitutes every marker in `text` with its current value.
	///
	/// Reads are untracked.
	pub fn render(&self, text: &str, store: &Store) -> ReactiveResult<String> {
		let mut out = String::with_capacity(text.len());
		let mut last = 0;
		for caps in self.pattern.captures_iter(text) {
			let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
				continue;
			};
			out.push_str(&text[last..whole.start()]);
			let path = Path::parse(expr.as_str())?;
			let snapshot = store.read(&path, ActiveReader::none())?;
			out.push_str(&store.render(&snapshot));
			last = whole.end();
		}
		out.push_str(&text[last..]);
		Ok(out)
	}
}
