//! In-memory doubles for exercising [`RuntimeInvoker`] callers without a real runtime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::{Error, ModuleCacheKey, ModuleSource, ModuleStream, RemoteError, Result, RuntimeInvoker};

/// Behaviour of a single mocked export.
pub type ExportFn = Arc<dyn Fn(&[JsonValue]) -> Result<JsonValue> + Send + Sync>;

/// How a recorded call reached the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
	/// A cache attempt; `hit` tells whether the key was loaded.
	FromCache {
		/// Whether the key was already cached.
		hit: bool,
	},
	/// A definition-stream invocation.
	FromStream,
}

/// One invocation observed by [`MockInvoker`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
	/// Path taken by the call.
	pub mode: CallMode,
	/// Module cache key used.
	pub cache_key: String,
	/// Export name invoked.
	pub export: String,
	/// Arguments passed.
	pub args: Vec<JsonValue>,
}

/// Scriptable [`RuntimeInvoker`] that emulates a module cache.
///
/// A cache attempt misses until a stream invocation has loaded the key, after which the key
/// stays cached. Every call is journaled.
#[derive(Default)]
pub struct MockInvoker {
	exports: HashMap<String, ExportFn>,
	latency: Option<Duration>,
	cached: Mutex<HashSet<String>>,
	calls: Mutex<Vec<RecordedCall>>,
	loaded_bytes: AtomicUsize,
	dispose_count: AtomicUsize,
}

impl MockInvoker {
	/// Creates an invoker with no exports.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers the behaviour of `name`.
	pub fn export<F>(mut self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&[JsonValue]) -> Result<JsonValue> + Send + Sync + 'static,
	{
		self.exports.insert(name.into(), Arc::new(f));
		self
	}

	/// Registers an export that always raises `message` in the runtime.
	pub fn failing_export(self, name: impl Into<String>, message: impl Into<String>) -> Self {
		let name = name.into();
		let message = message.into();
		let export = name.clone();
		self.export(name, move |_| {
			Err(Error::Invocation {
				export: export.clone(),
				error: RemoteError::new(message.clone()),
			})
		})
	}

	/// Delays every call by `latency`; cancellation interrupts the delay.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);
		self
	}

	/// Forgets `key`, as a restarted runtime would.
	pub fn evict(&self, key: &ModuleCacheKey) {
		self.cached.lock().remove(key.as_str());
	}

	/// Returns a snapshot of every call so far.
	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}

	/// Counts calls that invoked `export` through any path.
	pub fn export_calls(&self, export: &str) -> usize {
		self.calls.lock().iter().filter(|c| c.export == export).count()
	}

	/// Counts stream invocations.
	pub fn stream_calls(&self) -> usize {
		self.count_mode(|mode| mode == CallMode::FromStream)
	}

	/// Counts cache attempts that found the module loaded.
	pub fn cache_hits(&self) -> usize {
		self.count_mode(|mode| mode == CallMode::FromCache { hit: true })
	}

	/// Counts cache attempts that missed.
	pub fn cache_misses(&self) -> usize {
		self.count_mode(|mode| mode == CallMode::FromCache { hit: false })
	}

	/// Total module bytes received through stream invocations.
	pub fn loaded_bytes(&self) -> usize {
		self.loaded_bytes.load(Ordering::SeqCst)
	}

	/// Number of times [`RuntimeInvoker::dispose`] was called.
	pub fn dispose_count(&self) -> usize {
		self.dispose_count.load(Ordering::SeqCst)
	}

	/// Returns `true` once disposed.
	pub fn is_disposed(&self) -> bool {
		self.dispose_count() > 0
	}

	fn count_mode(&self, pred: impl Fn(CallMode) -> bool) -> usize {
		self.calls.lock().iter().filter(|c| pred(c.mode)).count()
	}

	fn record(&self, mode: CallMode, key: &ModuleCacheKey, export: &str, args: &[JsonValue]) {
		self.calls.lock().push(RecordedCall {
			mode,
			cache_key: key.to_string(),
			export: export.to_string(),
			args: args.to_vec(),
		});
	}

	async fn delay(&self, cancel: Option<&CancellationToken>) -> Result<()> {
		let Some(latency) = self.latency else {
			return match cancel {
				Some(cancel) if cancel.is_cancelled() => Err(Error::Cancelled),
				_ => Ok(()),
			};
		};
		match cancel {
			Some(cancel) => tokio::select! {
				biased;
				_ = cancel.cancelled() => Err(Error::Cancelled),
				_ = tokio::time::sleep(latency) => Ok(()),
			},
			None => {
				tokio::time::sleep(latency).await;
				Ok(())
			}
		}
	}

	fn run(&self, export: &str, args: &[JsonValue]) -> Result<JsonValue> {
		let f = self.exports.get(export).ok_or_else(|| Error::Invocation {
			export: export.to_string(),
			error: RemoteError::new(format!("no export named {export}")),
		})?;
		f(args)
	}
}

#[async_trait]
impl RuntimeInvoker for MockInvoker {
	async fn try_invoke_from_cache(
		&self,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<Option<JsonValue>> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		let hit = self.cached.lock().contains(key.as_str());
		self.record(CallMode::FromCache { hit }, key, export, args);
		self.delay(cancel).await?;
		if !hit {
			return Ok(None);
		}
		self.run(export, args).map(Some)
	}

	async fn invoke_from_stream(
		&self,
		mut module: ModuleStream,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<JsonValue> {
		if self.is_disposed() {
			return Err(Error::Disposed);
		}
		let mut bytes = Vec::new();
		module.read_to_end(&mut bytes).await?;
		self.loaded_bytes.fetch_add(bytes.len(), Ordering::SeqCst);
		self.record(CallMode::FromStream, key, export, args);
		self.delay(cancel).await?;
		self.cached.lock().insert(key.to_string());
		self.run(export, args)
	}

	fn dispose(&self) {
		self.dispose_count.fetch_add(1, Ordering::SeqCst);
	}
}

/// [`ModuleSource`] wrapper counting how often modules are opened.
pub struct CountingModules<S> {
	inner: S,
	reads: AtomicUsize,
}

impl<S: ModuleSource> CountingModules<S> {
	/// Wraps `inner`.
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			reads: AtomicUsize::new(0),
		}
	}

	/// Number of [`ModuleSource::read_as_stream`] calls so far.
	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}
}

impl<S: ModuleSource> ModuleSource for CountingModules<S> {
	fn read_as_stream(&self, name: &str) -> Result<ModuleStream> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		self.inner.read_as_stream(name)
	}
}
