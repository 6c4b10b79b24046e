//! Process-wide access to a shared [`HighlightService`].

use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::request::{HighlightAutoResult, HighlightRequest};
use crate::{HighlightOptions, HighlightService, Result};

type ServiceFactory = dyn Fn(HighlightOptions) -> HighlightService + Send + Sync;

/// Holder of the current [`HighlightService`], built lazily and rebuilt on reconfiguration.
///
/// Readers load the current service without locking. Creation and replacement happen under a
/// dedicated lock, and a replacement is published atomically: a caller sees either the old
/// service or the new one, never a half-applied configuration.
pub struct HighlightAccessor {
	current: ArcSwapOption<HighlightService>,
	/// Options for the next service, if a reconfiguration is pending.
	staged: ArcSwapOption<HighlightOptions>,
	create_lock: Mutex<()>,
	factory: Box<ServiceFactory>,
}

impl Default for HighlightAccessor {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for HighlightAccessor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HighlightAccessor")
			.field("current", &self.current.load().as_deref())
			.field("staged", &self.staged.load().as_deref())
			.finish_non_exhaustive()
	}
}

impl HighlightAccessor {
	/// Creates an accessor building node-backed services.
	pub fn new() -> Self {
		Self::with_factory(|options| HighlightService::new(&options))
	}

	/// Creates an accessor building services with `factory`.
	pub fn with_factory(factory: impl Fn(HighlightOptions) -> HighlightService + Send + Sync + 'static) -> Self {
		Self {
			current: ArcSwapOption::empty(),
			staged: ArcSwapOption::empty(),
			create_lock: Mutex::new(()),
			factory: Box::new(factory),
		}
	}

	/// Stages a change for the next service.
	///
	/// The current service is left untouched; the next call through the accessor replaces it.
	/// Changes made before that replacement accumulate, starting from the default options.
	/// Concurrent `configure` calls race with last-writer-wins semantics.
	pub fn configure(&self, configure: impl FnOnce(&mut HighlightOptions)) {
		let mut options = self.staged.load().as_deref().cloned().unwrap_or_default();
		configure(&mut options);
		self.staged.store(Some(Arc::new(options)));
	}

	/// Returns true if a configuration is waiting to be applied.
	pub fn has_pending_configuration(&self) -> bool {
		self.staged.load().is_some()
	}

	/// Disposes the current service. The next call builds a new one.
	pub fn dispose_current(&self) {
		let _guard = self.create_lock.lock();
		if let Some(previous) = self.current.swap(None) {
			info!("Disposing current highlight service");
			previous.dispose();
		}
	}

	/// Returns the current service, building or replacing it first if needed.
	pub fn current(&self) -> Arc<HighlightService> {
		if self.staged.load().is_none()
			&& let Some(service) = self.current.load_full()
		{
			return service;
		}

		let _guard = self.create_lock.lock();
		let staged = self.staged.load_full();
		if staged.is_none()
			&& let Some(service) = self.current.load_full()
		{
			return service;
		}

		let options = staged.as_deref().cloned().unwrap_or_default();
		let service = Arc::new((self.factory)(options));
		let previous = self.current.swap(Some(Arc::clone(&service)));
		// Published first; a `configure` that landed meanwhile stays staged for the next rebuild.
		let _ = self.staged.compare_and_swap(&staged, None);
		info!(
			reconfigured = staged.is_some(),
			replaced = previous.is_some(),
			pending = self.has_pending_configuration(),
			"Created highlight service"
		);

		if let Some(previous) = previous {
			previous.dispose();
		}
		service
	}

	/// Highlights through the current service. See [`HighlightService::highlight`].
	pub async fn highlight(&self, request: HighlightRequest<'_>, cancel: Option<&CancellationToken>) -> Result<String> {
		self.current().highlight(request, cancel).await
	}

	/// Detects the language and highlights through the current service. See
	/// [`HighlightService::highlight_auto`].
	pub async fn highlight_auto(
		&self,
		code: Option<&str>,
		language_subset: &[&str],
		class_prefix: Option<&str>,
		cancel: Option<&CancellationToken>,
	) -> Result<HighlightAutoResult> {
		self.current()
			.highlight_auto(code, language_subset, class_prefix, cancel)
			.await
	}

	/// Checks an alias through the current service. See
	/// [`HighlightService::is_valid_language_alias`].
	pub async fn is_valid_language_alias(&self, language_alias: &str, cancel: Option<&CancellationToken>) -> Result<bool> {
		self.current().is_valid_language_alias(language_alias, cancel).await
	}

	/// Lists aliases through the current service.
	pub async fn language_aliases(&self, cancel: Option<&CancellationToken>) -> Result<Vec<String>> {
		self.current().language_aliases(cancel).await
	}
}

static GLOBAL: LazyLock<HighlightAccessor> = LazyLock::new(HighlightAccessor::new);

/// Returns the process-wide accessor.
pub fn global() -> &'static HighlightAccessor {
	&GLOBAL
}

/// Highlights `request` with the process-wide service.
pub async fn highlight(request: HighlightRequest<'_>, cancel: Option<&CancellationToken>) -> Result<String> {
	GLOBAL.highlight(request, cancel).await
}

/// Detects the language of `code` and highlights it with the process-wide service.
pub async fn highlight_auto(
	code: Option<&str>,
	language_subset: &[&str],
	class_prefix: Option<&str>,
	cancel: Option<&CancellationToken>,
) -> Result<HighlightAutoResult> {
	GLOBAL.highlight_auto(code, language_subset, class_prefix, cancel).await
}

/// Checks `language_alias` with the process-wide service.
pub async fn is_valid_language_alias(language_alias: &str, cancel: Option<&CancellationToken>) -> Result<bool> {
	GLOBAL.is_valid_language_alias(language_alias, cancel).await
}

/// Stages a configuration change for the next process-wide service.
pub fn configure(configure: impl FnOnce(&mut HighlightOptions)) {
	GLOBAL.configure(configure);
}

/// Disposes the process-wide service. It is rebuilt on next use.
pub fn dispose_current() {
	GLOBAL.dispose_current();
}
