//! Module source providers.

use std::collections::HashMap;
use std::io::{Cursor, ErrorKind};
use std::path::{Component, Path, PathBuf};

use crate::{Error, ModuleStream, Result};

/// Supplies module definitions as byte streams, looked up by resource name.
pub trait ModuleSource: Send + Sync {
	/// Opens the resource `name`.
	///
	/// # Errors
	///
	/// Returns [`Error::ModuleNotFound`] if no resource is registered under `name`.
	fn read_as_stream(&self, name: &str) -> Result<ModuleStream>;
}

/// Module definitions compiled into the binary.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedModules {
	modules: HashMap<&'static str, &'static [u8]>,
}

impl EmbeddedModules {
	/// Creates an empty set of embedded modules.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `bytes` under `name`.
	pub fn with(mut self, name: &'static str, bytes: &'static [u8]) -> Self {
		self.modules.insert(name, bytes);
		self
	}

	/// Returns true if a module is registered under `name`.
	pub fn contains(&self, name: &str) -> bool {
		self.modules.contains_key(name)
	}
}

impl ModuleSource for EmbeddedModules {
	fn read_as_stream(&self, name: &str) -> Result<ModuleStream> {
		let bytes = self
			.modules
			.get(name)
			.ok_or_else(|| Error::ModuleNotFound(name.to_string()))?;
		Ok(Box::new(Cursor::new(*bytes)))
	}
}

/// Module definitions read from files below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryModules {
	root: PathBuf,
}

impl DirectoryModules {
	/// Creates a source rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Returns the root directory.
	pub fn root(&self) -> &Path {
		&self.root
	}

	fn resolve(&self, name: &str) -> Option<PathBuf> {
		let relative = Path::new(name);
		// Names are relative resource paths; refuse anything escaping the root.
		let mut components = relative.components().peekable();
		let plain = components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)));
		plain.then(|| self.root.join(relative))
	}
}

impl ModuleSource for DirectoryModules {
	fn read_as_stream(&self, name: &str) -> Result<ModuleStream> {
		let path = self
			.resolve(name)
			.ok_or_else(|| Error::ModuleNotFound(name.to_string()))?;
		match std::fs::File::open(&path) {
			Ok(file) => Ok(Box::new(tokio::fs::File::from_std(file))),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ModuleNotFound(name.to_string())),
			Err(e) => Err(Error::Io(e)),
		}
	}
}

#[cfg(test)]
mod tests;
