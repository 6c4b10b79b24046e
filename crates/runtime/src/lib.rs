//! Invocation layer for an external script runtime.
//!
//! This crate is centered on the [`RuntimeInvoker`] trait: execute a named export of a module
//! living inside an external process. Modules are identified by a [`ModuleCacheKey`]; a caller
//! first tries [`RuntimeInvoker::try_invoke_from_cache`] and only ships the module definition
//! (through [`RuntimeInvoker::invoke_from_stream`]) when the runtime reports it has not loaded
//! that key yet.
//!
//! - [`node::NodeInvoker`]: the real implementation, hosting modules in a `node` child process.
//! - [`ModuleSource`]: supplier of module bytes, see [`EmbeddedModules`] and [`DirectoryModules`].
//!
//! ## Cargo features
//!
//! - `test-support`: in-memory doubles in [`testing`] for exercising callers without a runtime.
//!   *Disabled by default.*
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod invoker;
pub mod node;
mod source;

pub use invoker::{ModuleCacheKey, ModuleStream, RuntimeInvoker};
pub use node::{NodeInvoker, NodeOptions};
pub use source::{DirectoryModules, EmbeddedModules, ModuleSource};

#[cfg(feature = "test-support")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod testing;

/// Re-export of the JSON value type used for invocation arguments and results.
pub use serde_json::Value as JsonValue;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An exception raised by script code inside the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
	/// The exception message.
	pub message: String,
	/// The script stack trace, if the runtime reported one.
	#[serde(default)]
	pub stack: Option<String>,
}

impl RemoteError {
	/// Creates a remote error without a stack trace.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			stack: None,
		}
	}
}

impl fmt::Display for RemoteError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The runtime process could not be started.
	#[error("failed to spawn `{command}`: {reason}")]
	Spawn {
		/// The executable that failed to start.
		command: String,
		/// Reason reported by the operating system.
		reason: String,
	},
	/// No reply arrived within the configured timeout.
	#[error("invocation of `{export}` timed out after {timeout:?}")]
	Timeout {
		/// The export being invoked.
		export: String,
		/// The configured invocation timeout.
		timeout: Duration,
	},
	/// Script code raised an error while executing an export.
	#[error("invocation of `{export}` failed: {error}")]
	Invocation {
		/// The export being invoked.
		export: String,
		/// The error reported by the runtime.
		error: RemoteError,
	},
	/// The runtime replied with a value that could not be decoded.
	#[error("deserialization failed: {0}")]
	Deserialize(#[from] serde_json::Error),
	/// The runtime violated the wire protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// Input/output errors from the underlying channels.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// The runtime process exited or its channel closed before replying.
	#[error("runtime process stopped")]
	ServiceStopped,
	/// The requested module resource does not exist.
	#[error("module `{0}` not found")]
	ModuleNotFound(String),
	/// The caller abandoned the invocation.
	#[error("operation cancelled")]
	Cancelled,
	/// The invoker was disposed before or during the call.
	#[error("runtime invoker has been disposed")]
	Disposed,
}
