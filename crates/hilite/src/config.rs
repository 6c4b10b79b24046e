//! Service configuration.

use std::path::{Path, PathBuf};

use hilite_runtime::NodeOptions;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Options for building a [`HighlightService`](crate::HighlightService).
///
/// ```toml
/// bundle-dir = "/opt/hilite"
///
/// [node]
/// project-path = "/srv/highlighter"
/// timeout-ms = 10000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HighlightOptions {
	/// Settings for the node process.
	pub node: NodeOptions,
	/// Directory holding a `bundle.js` to load instead of the embedded bundle.
	pub bundle_dir: Option<PathBuf>,
}

impl HighlightOptions {
	/// Parses options from TOML text.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses options from a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}
}
