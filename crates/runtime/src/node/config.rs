//! Configuration for the node runtime process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Returns the default invocation timeout in milliseconds.
fn default_timeout_ms() -> Option<u64> {
	Some(60_000)
}

/// Configuration for spawning and talking to a node process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NodeOptions {
	/// Executable to spawn.
	pub executable: String,
	/// Extra arguments passed to node before the host script.
	pub args: Vec<String>,
	/// Environment variables to set.
	pub env: HashMap<String, String>,
	/// Working directory of the process; modules resolve `require()` from here.
	///
	/// `None` inherits the current directory.
	pub project_path: Option<PathBuf>,
	/// Invocation timeout in milliseconds, covering process start and the round trip.
	///
	/// `None` waits forever.
	pub timeout_ms: Option<u64>,
}

impl Default for NodeOptions {
	fn default() -> Self {
		Self {
			executable: "node".to_string(),
			args: Vec::new(),
			env: HashMap::new(),
			project_path: None,
			timeout_ms: default_timeout_ms(),
		}
	}
}

impl NodeOptions {
	/// Create options with the defaults.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the node executable.
	pub fn executable(mut self, executable: impl Into<String>) -> Self {
		self.executable = executable.into();
		self
	}

	/// Add node command line arguments.
	pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	/// Add environment variables.
	pub fn env(mut self, env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
		self.env = env.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
		self
	}

	/// Set the project directory.
	pub fn project_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.project_path = Some(path.into());
		self
	}

	/// Set the invocation timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
		self
	}

	/// Wait for replies without a deadline.
	pub fn no_timeout(mut self) -> Self {
		self.timeout_ms = None;
		self
	}

	/// Returns the invocation timeout, if any.
	pub fn timeout_duration(&self) -> Option<Duration> {
		self.timeout_ms.map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests;
