//! The highlight service.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hilite_runtime::{JsonValue, ModuleSource, NodeInvoker, RuntimeInvoker};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::aliases::AliasCache;
use crate::bundle::{self, BUNDLE_NAME, MODULE_CACHE_KEY, exports};
use crate::request::{HighlightAutoResult, HighlightRequest, normalize_class_prefix};
use crate::{Error, HighlightOptions, Result};

/// Highlights code by invoking the bundle inside a runtime.
///
/// One service owns one runtime. The bundle is sent to the runtime only when the runtime
/// reports it has not cached it yet; every other call is a short cache lookup.
pub struct HighlightService {
	invoker: Arc<dyn RuntimeInvoker>,
	modules: Arc<dyn ModuleSource>,
	aliases: AliasCache,
	disposed: AtomicBool,
}

impl std::fmt::Debug for HighlightService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HighlightService")
			.field("aliases", &self.aliases.get().map(|set| set.len()))
			.field("disposed", &self.is_disposed())
			.finish_non_exhaustive()
	}
}

impl HighlightService {
	/// Creates a service backed by a node process. The process starts on first use.
	pub fn new(options: &HighlightOptions) -> Self {
		Self::with_runtime(Arc::new(NodeInvoker::new(options.node.clone())), bundle::module_source(options))
	}

	/// Creates a service over an arbitrary runtime and bundle source.
	pub fn with_runtime(invoker: Arc<dyn RuntimeInvoker>, modules: Arc<dyn ModuleSource>) -> Self {
		Self {
			invoker,
			modules,
			aliases: AliasCache::new(),
			disposed: AtomicBool::new(false),
		}
	}

	/// Highlights `request.code` as `request.language_alias`.
	///
	/// Blank code is returned unchanged without contacting the runtime or validating the alias.
	///
	/// # Errors
	///
	/// - [`Error::MissingArgument`] if the code or the alias is absent.
	/// - [`Error::InvalidLanguageAlias`] if the engine does not know the alias.
	/// - [`Error::Runtime`] if the runtime fails.
	/// - [`Error::Disposed`] and [`Error::Cancelled`].
	pub async fn highlight(&self, request: HighlightRequest<'_>, cancel: Option<&CancellationToken>) -> Result<String> {
		self.ensure_live()?;
		let code = request.code.ok_or(Error::MissingArgument("code"))?;
		if code.trim().is_empty() {
			return Ok(code.to_string());
		}

		let alias = request.language_alias.ok_or(Error::MissingArgument("language_alias"))?;
		self.validate_alias(alias, cancel).await?;

		let args = [json!(code), json!(alias), json!(normalize_class_prefix(request.class_prefix))];
		self.invoke(exports::HIGHLIGHT, &args, cancel).await
	}

	/// Highlights `code` in whichever language the engine detects.
	///
	/// A non-empty `language_subset` restricts detection to those aliases, each of which must be
	/// valid. Blank code comes back unchanged with no detected language.
	pub async fn highlight_auto(
		&self,
		code: Option<&str>,
		language_subset: &[&str],
		class_prefix: Option<&str>,
		cancel: Option<&CancellationToken>,
	) -> Result<HighlightAutoResult> {
		self.ensure_live()?;
		let code = code.ok_or(Error::MissingArgument("code"))?;
		if code.trim().is_empty() {
			return Ok(HighlightAutoResult::unchanged(code));
		}

		for alias in language_subset {
			self.validate_alias(alias, cancel).await?;
		}

		let args = [json!(code), json!(language_subset), json!(normalize_class_prefix(class_prefix))];
		self.invoke(exports::HIGHLIGHT_AUTO, &args, cancel).await
	}

	/// Returns true if the engine recognizes `language_alias`. Matching is case-sensitive.
	///
	/// The first call fetches the alias set from the runtime; later calls answer from memory.
	/// Blank aliases are invalid and never reach the runtime.
	pub async fn is_valid_language_alias(&self, language_alias: &str, cancel: Option<&CancellationToken>) -> Result<bool> {
		self.ensure_live()?;
		if language_alias.trim().is_empty() {
			return Ok(false);
		}
		Ok(self.alias_set(cancel).await?.contains(language_alias))
	}

	/// Returns every alias the engine recognizes, sorted.
	pub async fn language_aliases(&self, cancel: Option<&CancellationToken>) -> Result<Vec<String>> {
		self.ensure_live()?;
		let mut aliases: Vec<String> = self.alias_set(cancel).await?.iter().cloned().collect();
		aliases.sort_unstable();
		Ok(aliases)
	}

	/// Releases the runtime. Later calls fail with [`Error::Disposed`].
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		info!("Disposing highlight service");
		self.invoker.dispose();
	}

	/// Returns true once [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	fn ensure_live(&self) -> Result<()> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		Ok(())
	}

	async fn validate_alias(&self, alias: &str, cancel: Option<&CancellationToken>) -> Result<()> {
		if self.is_valid_language_alias(alias, cancel).await? {
			Ok(())
		} else {
			Err(Error::InvalidLanguageAlias(alias.to_string()))
		}
	}

	async fn alias_set(&self, cancel: Option<&CancellationToken>) -> Result<&HashSet<String>> {
		self.aliases
			.get_or_populate(cancel, || async {
				// Nothing is cached yet on a fresh runtime; loading the bundle here also caches it.
				let module = self.modules.read_as_stream(BUNDLE_NAME)?;
				let value = self
					.invoker
					.invoke_from_stream(module, &MODULE_CACHE_KEY, exports::GET_ALIASES, &[], cancel)
					.await?;
				decode(value)
			})
			.await
	}

	/// Invokes `export`, sending the bundle only if the runtime has not cached it.
	async fn invoke<T: DeserializeOwned>(&self, export: &str, args: &[JsonValue], cancel: Option<&CancellationToken>) -> Result<T> {
		if let Some(value) = self
			.invoker
			.try_invoke_from_cache(&MODULE_CACHE_KEY, export, args, cancel)
			.await?
		{
			return decode(value);
		}

		debug!(export, key = %MODULE_CACHE_KEY, "bundle not cached; sending definition");
		let module = self.modules.read_as_stream(BUNDLE_NAME)?;
		let value = self
			.invoker
			.invoke_from_stream(module, &MODULE_CACHE_KEY, export, args, cancel)
			.await?;
		decode(value)
	}
}

impl Drop for HighlightService {
	fn drop(&mut self) {
		self.dispose();
	}
}

fn decode<T: DeserializeOwned>(value: JsonValue) -> Result<T> {
	Ok(serde_json::from_value(value)?)
}
