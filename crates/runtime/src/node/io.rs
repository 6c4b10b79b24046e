use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::protocol::{Request, Response, read_frame, write_frame};
use crate::{Error, Result};

/// A request waiting to be written, paired with the channel its response goes to.
pub(super) struct PendingRequest {
	pub(super) request: Request,
	pub(super) response_tx: oneshot::Sender<Result<Response>>,
}

/// Runs the I/O loop for a single node process.
///
/// Writes are handled sequentially in submission order; responses may arrive in any order and
/// are matched to their request by id. Ends when the process closes its output, a write fails,
/// or every outbound sender is dropped. Requests still in flight then fail with
/// [`Error::ServiceStopped`].
pub(super) async fn run_process_io<R, W>(
	pid: u32,
	mut stdin: W,
	stdout: R,
	mut outbound_rx: mpsc::UnboundedReceiver<PendingRequest>,
) where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin,
{
	// Frame parsing lives in its own task so a half-read frame is never dropped by `select!`.
	let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
	let reader = tokio::spawn(read_responses(pid, stdout, inbound_tx));
	let mut pending: HashMap<u64, oneshot::Sender<Result<Response>>> = HashMap::new();

	loop {
		tokio::select! {
			out = outbound_rx.recv() => {
				let Some(out) = out else {
					debug!(pid, "node runtime released; closing IO loop");
					break;
				};
				let id = out.request.id;
				match write_frame(&mut stdin, &out.request).await {
					Ok(()) => {
						pending.insert(id, out.response_tx);
					}
					Err(e) => {
						error!(pid, error = %e, "Outbound write failed; terminating IO loop");
						let _ = out.response_tx.send(Err(Error::ServiceStopped));
						break;
					}
				}
			}

			inbound = inbound_rx.recv() => {
				let Some(resp) = inbound else {
					info!(pid, "node runtime closed connection");
					break;
				};
				match pending.remove(&resp.id()) {
					Some(tx) => {
						// The caller may have timed out or been cancelled; nothing left to do then.
						let _ = tx.send(Ok(resp));
					}
					None => warn!(pid, id = resp.id(), "Response for unknown request"),
				}
			}
		}
	}

	reader.abort();

	for (_, tx) in pending.drain() {
		let _ = tx.send(Err(Error::ServiceStopped));
	}

	outbound_rx.close();
	while let Ok(out) = outbound_rx.try_recv() {
		let _ = out.response_tx.send(Err(Error::ServiceStopped));
	}
}

/// Reads framed responses until end of input or a framing error.
async fn read_responses<R>(pid: u32, stdout: R, inbound_tx: mpsc::UnboundedSender<Response>)
where
	R: AsyncRead + Unpin,
{
	let mut reader = BufReader::new(stdout);
	let mut buf = String::new();
	loop {
		match read_frame(&mut reader, &mut buf).await {
			Ok(Some(body)) => match serde_json::from_slice::<Response>(&body) {
				Ok(resp) => {
					if inbound_tx.send(resp).is_err() {
						break;
					}
				}
				Err(e) => warn!(pid, error = %e, "Failed to parse response"),
			},
			Ok(None) => break,
			Err(e) => {
				error!(pid, error = %e, "Error reading from node runtime");
				break;
			}
		}
	}
}

/// Forwards process diagnostics written to stderr into the log.
pub(super) async fn forward_stderr<R>(pid: u32, stderr: R)
where
	R: AsyncRead + Unpin,
{
	let mut lines = BufReader::new(stderr).lines();
	while let Ok(Some(line)) = lines.next_line().await {
		debug!(pid, stderr = %line, "node runtime stderr");
	}
}

#[cfg(test)]
mod tests;
