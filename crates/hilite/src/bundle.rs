//! The highlighting bundle loaded into the runtime.

use std::sync::Arc;

use hilite_runtime::{DirectoryModules, EmbeddedModules, ModuleCacheKey, ModuleSource};

use crate::HighlightOptions;

/// Resource name of the bundle.
pub const BUNDLE_NAME: &str = "bundle.js";

/// Key the bundle is cached under inside the runtime.
pub const MODULE_CACHE_KEY: ModuleCacheKey = ModuleCacheKey::from_static(concat!(env!("CARGO_PKG_NAME"), "@", env!("CARGO_PKG_VERSION")));

/// Bundle compiled into the crate.
pub const EMBEDDED_BUNDLE: &[u8] = include_bytes!("../assets/bundle.js");

/// Exports of the bundle.
pub(crate) mod exports {
	pub const HIGHLIGHT: &str = "highlight";
	pub const HIGHLIGHT_AUTO: &str = "highlightAuto";
	pub const GET_ALIASES: &str = "getAliases";
}

/// Returns the module source selected by `options`.
pub fn module_source(options: &HighlightOptions) -> Arc<dyn ModuleSource> {
	match &options.bundle_dir {
		Some(dir) => Arc::new(DirectoryModules::new(dir)),
		None => Arc::new(EmbeddedModules::new().with(BUNDLE_NAME, EMBEDDED_BUNDLE)),
	}
}
