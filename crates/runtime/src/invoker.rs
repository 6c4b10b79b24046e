//! The runtime invocation boundary.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Byte stream carrying a module definition.
pub type ModuleStream = Box<dyn AsyncRead + Send + Unpin>;

/// Stable identifier of a module loaded into a runtime.
///
/// A cache attempt and a definition-stream invocation that share a key refer to the same
/// module, so the key must be unique per distinct module definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleCacheKey(Cow<'static, str>);

impl ModuleCacheKey {
	/// Creates a key from a static string.
	pub const fn from_static(key: &'static str) -> Self {
		Self(Cow::Borrowed(key))
	}

	/// Creates a key from an owned string.
	pub fn new(key: impl Into<String>) -> Self {
		Self(Cow::Owned(key.into()))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ModuleCacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Executes named module exports inside an external runtime.
///
/// Implementations must be safe to share across concurrent callers. Every method that crosses
/// into the runtime honours `cancel` by abandoning the wait with [`Error::Cancelled`]; the
/// runtime itself may still finish the work on its own schedule.
///
/// [`Error::Cancelled`]: crate::Error::Cancelled
#[async_trait]
pub trait RuntimeInvoker: Send + Sync {
	/// Invokes `export` on the module cached under `key`.
	///
	/// Returns `Ok(None)` when the runtime has not loaded a module under `key`.
	async fn try_invoke_from_cache(
		&self,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<Option<JsonValue>>;

	/// Loads the module read from `module`, caches it under `key` and invokes `export` on it.
	async fn invoke_from_stream(
		&self,
		module: ModuleStream,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<JsonValue>;

	/// Releases the runtime. Subsequent invocations fail with [`Error::Disposed`].
	///
	/// [`Error::Disposed`]: crate::Error::Disposed
	fn dispose(&self);
}
