//! Node process runtime.
//!
//! [`NodeInvoker`] runs modules inside a `node` child process. The process is started lazily on
//! the first invocation and hosts a small script that compiles module definitions, keeps their
//! exports cached per [`ModuleCacheKey`], and calls exports in callback style
//! (`export(callback, ...args)`).
//!
//! If the process exits it is restarted on the next invocation. The new process starts with an
//! empty module cache, which callers observe as a cache miss.

mod config;
mod io;
mod protocol;

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use config::NodeOptions;
use io::PendingRequest;
use protocol::{InvokeParams, METHOD_INVOKE, Request, Response};

use crate::{Error, ModuleCacheKey, ModuleStream, Result, RuntimeInvoker};

/// Script evaluated by every node process.
const HOST_SCRIPT: &str = include_str!("host.js");

/// State for a running node process.
struct NodeProcess {
	/// The child process handle; killed when dropped.
	child: Child,
	/// Channel feeding the process IO loop.
	outbound_tx: mpsc::UnboundedSender<PendingRequest>,
}

/// [`RuntimeInvoker`] backed by a `node` child process.
///
/// Thread-safe; share it across tasks via `Arc<NodeInvoker>`. Concurrent invocations are
/// multiplexed over the same process.
pub struct NodeInvoker {
	options: NodeOptions,
	/// The live process, if started.
	process: Mutex<Option<NodeProcess>>,
	/// Generator for request IDs.
	next_id: AtomicU64,
	disposed: AtomicBool,
}

impl std::fmt::Debug for NodeInvoker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NodeInvoker")
			.field("options", &self.options)
			.field("running", &self.is_running())
			.field("disposed", &self.disposed.load(Ordering::Acquire))
			.finish_non_exhaustive()
	}
}

impl NodeInvoker {
	/// Create an invoker. No process is started until the first invocation.
	pub fn new(options: NodeOptions) -> Self {
		Self {
			options,
			process: Mutex::new(None),
			next_id: AtomicU64::new(1),
			disposed: AtomicBool::new(false),
		}
	}

	/// Get the options this invoker was created with.
	pub fn options(&self) -> &NodeOptions {
		&self.options
	}

	/// Check if a process is currently connected.
	pub fn is_running(&self) -> bool {
		self.process
			.lock()
			.as_ref()
			.is_some_and(|p| !p.outbound_tx.is_closed())
	}

	/// Spawn a process and its IO tasks.
	fn spawn_process(&self) -> Result<NodeProcess> {
		let executable = &self.options.executable;
		let mut cmd = Command::new(executable);
		cmd.args(&self.options.args)
			.arg("-e")
			.arg(HOST_SCRIPT)
			.envs(&self.options.env)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		if let Some(path) = &self.options.project_path {
			cmd.current_dir(path);
		}

		let mut child = cmd.spawn().map_err(|e| Error::Spawn {
			command: executable.clone(),
			reason: e.to_string(),
		})?;

		let capture_failed = |stream: &str| Error::Spawn {
			command: executable.clone(),
			reason: format!("failed to capture {stream}"),
		};
		let stdin = child.stdin.take().ok_or_else(|| capture_failed("stdin"))?;
		let stdout = child.stdout.take().ok_or_else(|| capture_failed("stdout"))?;
		let stderr = child.stderr.take().ok_or_else(|| capture_failed("stderr"))?;

		let pid = child.id().unwrap_or_default();
		info!(pid, executable = %executable, project_path = ?self.options.project_path, "Started node runtime");

		tokio::spawn(io::forward_stderr(pid, stderr));
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		tokio::spawn(io::run_process_io(pid, stdin, stdout, outbound_rx));

		Ok(NodeProcess { child, outbound_tx })
	}

	/// Returns the outbound channel of the live process, starting one if needed.
	fn connection(&self) -> Result<mpsc::UnboundedSender<PendingRequest>> {
		let mut slot = self.process.lock();
		if self.disposed.load(Ordering::Acquire) {
			return Err(Error::Disposed);
		}

		if let Some(process) = slot.as_ref() {
			if !process.outbound_tx.is_closed() {
				return Ok(process.outbound_tx.clone());
			}
			debug!(pid = ?process.child.id(), "node runtime exited; restarting");
		}

		let process = self.spawn_process()?;
		let outbound_tx = process.outbound_tx.clone();
		*slot = Some(process);
		Ok(outbound_tx)
	}

	/// Sends one invocation and waits for its response.
	async fn invoke(&self, params: InvokeParams, cancel: Option<&CancellationToken>) -> Result<Response> {
		let export = params.export.clone();
		let exchange = async move {
			let outbound = self.connection()?;
			let (response_tx, response_rx) = oneshot::channel();
			let request = Request {
				id: self.next_id.fetch_add(1, Ordering::Relaxed),
				method: METHOD_INVOKE,
				params,
			};
			outbound
				.send(PendingRequest { request, response_tx })
				.map_err(|_| Error::ServiceStopped)?;
			response_rx.await.map_err(|_| Error::ServiceStopped)?
		};

		let bounded = async move {
			match self.options.timeout_duration() {
				Some(timeout) => tokio::time::timeout(timeout, exchange)
					.await
					.map_err(|_| Error::Timeout { export, timeout })?,
				None => exchange.await,
			}
		};

		match cancel {
			Some(cancel) => {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => Err(Error::Cancelled),
					result = bounded => result,
				}
			}
			None => bounded.await,
		}
	}
}

#[async_trait]
impl RuntimeInvoker for NodeInvoker {
	async fn try_invoke_from_cache(
		&self,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<Option<JsonValue>> {
		let params = InvokeParams {
			cache_key: key.to_string(),
			export: export.to_string(),
			args: args.to_vec(),
			module: None,
		};
		match self.invoke(params, cancel).await? {
			Response::Ok { result, .. } => Ok(Some(result)),
			Response::NotCached { .. } => Ok(None),
			Response::Error { error, .. } => Err(Error::Invocation {
				export: export.to_string(),
				error,
			}),
		}
	}

	async fn invoke_from_stream(
		&self,
		mut module: ModuleStream,
		key: &ModuleCacheKey,
		export: &str,
		args: &[JsonValue],
		cancel: Option<&CancellationToken>,
	) -> Result<JsonValue> {
		let mut source = String::new();
		module.read_to_string(&mut source).await?;

		let params = InvokeParams {
			cache_key: key.to_string(),
			export: export.to_string(),
			args: args.to_vec(),
			module: Some(source),
		};
		match self.invoke(params, cancel).await? {
			Response::Ok { result, .. } => Ok(result),
			Response::NotCached { .. } => Err(Error::Protocol(format!(
				"runtime reported module `{key}` as not cached while loading it"
			))),
			Response::Error { error, .. } => Err(Error::Invocation {
				export: export.to_string(),
				error,
			}),
		}
	}

	fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}

		if let Some(mut process) = self.process.lock().take() {
			info!(pid = ?process.child.id(), "Disposing node runtime");
			// Best-effort kill; dropping the handle reaps it in the background.
			let _ = process.child.start_kill();
		}
	}
}

impl Drop for NodeInvoker {
	fn drop(&mut self) {
		self.dispose();
	}
}
