//! Template compilation settings.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! directive_prefix = "x-"
//! interpolation_open = "[["
//! interpolation_close = "]]"
//! strict_directives = false
//! ```
//!
//! Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};

/// Options controlling directive recognition and interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
	/// Attribute prefix marking a directive.
	pub directive_prefix: String,
	/// Opening interpolation delimiter.
	pub interpolation_open: String,
	/// Closing interpolation delimiter.
	pub interpolation_close: String,
	/// Fail compilation on unknown directive names.
	///
	/// When false, unknown directives are logged and skipped.
	pub strict_directives: bool,
}

impl Default for TemplateSettings {
	fn default() -> Self {
		Self {
			directive_prefix: "v-".to_string(),
			interpolation_open: "{{".to_string(),
			interpolation_close: "}}".to_string(),
			strict_directives: true,
		}
	}
}

impl TemplateSettings {
	/// Creates default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates settings from a TOML document.
	pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Sets the directive prefix.
	pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
		self.directive_prefix = prefix.into();
		self
	}

	/// Sets the interpolation delimiters.
	pub fn delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
		self.interpolation_open = open.into();
		self.interpolation_close = close.into();
		self
	}

	/// Skips unknown directives instead of failing.
	pub fn lenient(mut self) -> Self {
		self.strict_directives = false;
		self
	}

	/// Checks that the prefix and delimiters are non-empty.
	pub fn validate(&self) -> TemplateResult<()> {
		if self.directive_prefix.is_empty() {
			return Err(TemplateError::InvalidSettings(
				"directive_prefix must not be empty".into(),
			));
		}
		if self.interpolation_open.is_empty() || self.interpolation_close.is_empty() {
			return Err(TemplateError::InvalidSettings(
				"interpolation delimiters must not be empty".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let settings = TemplateSettings::new();
		assert_eq!(settings.directive_prefix, "v-");
		assert_eq!(settings.interpolation_open, "{{");
		assert_eq!(settings.interpolation_close, "}}");
		assert!(settings.strict_directives);
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	fn test_builder() {
		let settings = TemplateSettings::new()
			.prefix("x-")
			.delimiters("[[", "]]")
			.lenient();
		assert_eq!(settings.directive_prefix, "x-");
		assert_eq!(settings.interpolation_open, "[[");
		assert!(!settings.strict_directives);
	}

	#[rstest]
	fn test_from_toml_partial() {
		let settings = TemplateSettings::from_toml_str("directive_prefix = \"ng-\"").unwrap();
		assert_eq!(settings.directive_prefix, "ng-");
		assert_eq!(settings.interpolation_open, "{{");
	}

	#[rstest]
	#[case("directive_prefix = \"\"")]
	#[case("interpolation_close = \"\"")]
	fn test_from_toml_rejects_empty(#[case] source: &str) {
		let err = TemplateSettings::from_toml_str(source).unwrap_err();
		assert!(matches!(err, TemplateError::InvalidSettings(_)));
	}

	#[rstest]
	fn test_from_toml_type_error() {
		let err = TemplateSettings::from_toml_str("strict_directives = \"yes\"").unwrap_err();
		assert!(matches!(err, TemplateError::Settings(_)));
	}
}
