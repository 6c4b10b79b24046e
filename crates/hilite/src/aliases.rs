//! Lazily populated set of valid language aliases.

use std::collections::HashSet;
use std::future::Future;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, Result};

/// Alias set populated at most once per owner.
///
/// Readers take the lock-free path once the set exists. Until then callers serialize on a gate
/// so only one of them fetches the aliases; the rest wait for it and read the result.
#[derive(Debug, Default)]
pub(crate) struct AliasCache {
	aliases: OnceLock<HashSet<String>>,
	gate: Mutex<Option<Error>>,
	/// Number of failed population attempts, bumped under `gate`.
	failures: AtomicU64,
}

impl AliasCache {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Returns the populated set, if any.
	pub(crate) fn get(&self) -> Option<&HashSet<String>> {
		self.aliases.get()
	}

	/// Returns the alias set, running `populate` if no caller has populated it yet.
	///
	/// A failed attempt is handed to every caller that was already waiting on it. Later callers
	/// start a new attempt. An attempt abandoned through cancellation is not a failure.
	pub(crate) async fn get_or_populate<F, Fut>(&self, cancel: Option<&CancellationToken>, populate: F) -> Result<&HashSet<String>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Vec<String>>>,
	{
		if let Some(aliases) = self.aliases.get() {
			return Ok(aliases);
		}

		let observed = self.failures.load(Ordering::Acquire);
		let mut last_failure = until_cancelled(cancel, async { Ok(self.gate.lock().await) }).await?;

		if let Some(aliases) = self.aliases.get() {
			return Ok(aliases);
		}
		if self.failures.load(Ordering::Acquire) != observed
			&& let Some(error) = last_failure.as_ref()
		{
			return Err(error.clone());
		}

		debug!("populating language aliases");
		match until_cancelled(cancel, populate()).await {
			Ok(list) => {
				let aliases = self.aliases.get_or_init(|| list.into_iter().collect());
				*last_failure = None;
				debug!(count = aliases.len(), "language aliases populated");
				Ok(aliases)
			}
			Err(Error::Cancelled) => Err(Error::Cancelled),
			Err(error) => {
				debug!(error = %error, "language alias population failed");
				*last_failure = Some(error.clone());
				self.failures.fetch_add(1, Ordering::AcqRel);
				Err(error)
			}
		}
	}
}

/// Runs `fut` unless `cancel` fires first.
async fn until_cancelled<T>(cancel: Option<&CancellationToken>, fut: impl Future<Output = Result<T>>) -> Result<T> {
	match cancel {
		Some(cancel) => tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(Error::Cancelled),
			result = fut => result,
		},
		None => fut.await,
	}
}
