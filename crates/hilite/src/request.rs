//! Request and result types.

use serde::{Deserialize, Serialize};

/// Class prefix used when the caller does not choose one.
pub const DEFAULT_CLASS_PREFIX: &str = "hljs-";

/// Arguments of a highlight call.
///
/// Fields are optional so absent input is reported as
/// [`Error::MissingArgument`](crate::Error::MissingArgument) rather than being unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRequest<'a> {
	/// Source text to highlight.
	pub code: Option<&'a str>,
	/// Language alias understood by the engine, e.g. `"javascript"`.
	pub language_alias: Option<&'a str>,
	/// Prefix for generated CSS classes. Absent or blank means no prefix.
	pub class_prefix: Option<&'a str>,
}

impl Default for HighlightRequest<'_> {
	fn default() -> Self {
		Self {
			code: None,
			language_alias: None,
			class_prefix: Some(DEFAULT_CLASS_PREFIX),
		}
	}
}

impl<'a> HighlightRequest<'a> {
	/// Creates a request with the default class prefix.
	pub fn new(code: &'a str, language_alias: &'a str) -> Self {
		Self {
			code: Some(code),
			language_alias: Some(language_alias),
			..Self::default()
		}
	}

	/// Sets the class prefix.
	pub fn class_prefix(mut self, class_prefix: &'a str) -> Self {
		self.class_prefix = Some(class_prefix);
		self
	}

	/// Removes the class prefix.
	pub fn without_class_prefix(mut self) -> Self {
		self.class_prefix = None;
		self
	}
}

/// Outcome of automatic language detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightAutoResult {
	/// Detected language, if any language matched.
	#[serde(default)]
	pub language: Option<String>,
	/// Detection score of `language`.
	#[serde(default)]
	pub relevance: u32,
	/// Highlighted markup.
	pub value: String,
	/// Runner-up detection.
	#[serde(default)]
	pub second_best: Option<Box<HighlightAutoResult>>,
}

impl HighlightAutoResult {
	/// Result returned for blank input, which is never sent to the runtime.
	pub(crate) fn unchanged(code: &str) -> Self {
		Self {
			language: None,
			relevance: 0,
			value: code.to_string(),
			second_best: None,
		}
	}
}

/// Normalizes a class prefix; blank prefixes become empty.
pub(crate) fn normalize_class_prefix(class_prefix: Option<&str>) -> &str {
	match class_prefix {
		Some(prefix) if !prefix.trim().is_empty() => prefix,
		_ => "",
	}
}
