//! Error types.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
///
/// Cloneable so a single alias population failure can be delivered to every caller waiting on
/// it.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum Error {
	/// A required argument was absent.
	#[error("missing required argument `{0}`")]
	MissingArgument(&'static str),
	/// The language alias is not recognized by the highlighting engine.
	#[error("`{0}` is not a valid language alias")]
	InvalidLanguageAlias(String),
	/// The runtime failed to execute an operation.
	#[error(transparent)]
	Runtime(Arc<hilite_runtime::Error>),
	/// The service released its runtime before or during the call.
	#[error("highlight service has been disposed")]
	Disposed,
	/// The caller abandoned the operation.
	#[error("operation cancelled")]
	Cancelled,
}

impl Error {
	/// Returns true for errors caused by the caller's arguments.
	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Self::MissingArgument(_) | Self::InvalidLanguageAlias(_))
	}

	/// Returns the underlying runtime error, if any.
	pub fn as_runtime(&self) -> Option<&hilite_runtime::Error> {
		match self {
			Self::Runtime(e) => Some(e),
			_ => None,
		}
	}
}

impl From<hilite_runtime::Error> for Error {
	fn from(error: hilite_runtime::Error) -> Self {
		match error {
			hilite_runtime::Error::Cancelled => Self::Cancelled,
			hilite_runtime::Error::Disposed => Self::Disposed,
			other => Self::Runtime(Arc::new(other)),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(error: serde_json::Error) -> Self {
		hilite_runtime::Error::Deserialize(error).into()
	}
}

/// Errors loading [`HighlightOptions`](crate::HighlightOptions).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Read {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
	/// Error parsing TOML.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),
}
