//! Wire protocol spoken with the node host script.
//!
//! Messages are JSON bodies framed with a `Content-Length` header, the same framing the
//! Language Server Protocol uses over stdio.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, RemoteError, Result};

/// Method name of module invocations.
pub(crate) const METHOD_INVOKE: &str = "invoke";

/// An outbound request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Request {
	pub id: u64,
	pub method: &'static str,
	pub params: InvokeParams,
}

/// Parameters of an `invoke` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvokeParams {
	pub cache_key: String,
	pub export: String,
	pub args: Vec<JsonValue>,
	/// Module source for definition-stream invocations; `None` asks for the cached module.
	pub module: Option<String>,
}

/// An inbound response, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub(crate) enum Response {
	/// The export ran and produced `result`.
	Ok {
		id: u64,
		#[serde(default)]
		result: JsonValue,
	},
	/// A cache attempt found no module under the key.
	NotCached { id: u64 },
	/// Loading the module or running the export raised an error.
	Error { id: u64, error: RemoteError },
}

impl Response {
	pub fn id(&self) -> u64 {
		match self {
			Self::Ok { id, .. } | Self::NotCached { id } | Self::Error { id, .. } => *id,
		}
	}
}

/// Writes `msg` as one framed message.
pub(crate) async fn write_frame<T: Serialize>(output: &mut (impl AsyncWrite + Unpin), msg: &T) -> Result<()> {
	let json = serde_json::to_vec(msg)?;
	let header = format!("Content-Length: {}\r\n\r\n", json.len());
	output.write_all(header.as_bytes()).await?;
	output.write_all(&json).await?;
	output.flush().await?;
	Ok(())
}

/// Reads one framed message body.
///
/// Returns `Ok(None)` at end of input.
pub(crate) async fn read_frame(input: &mut (impl AsyncBufRead + Unpin), buf: &mut String) -> Result<Option<Vec<u8>>> {
	let mut content_length: Option<usize> = None;
	loop {
		buf.clear();
		let bytes_read = input.read_line(buf).await?;
		if bytes_read == 0 {
			return Ok(None);
		}

		let line = buf.trim();
		if line.is_empty() {
			break;
		}

		if let Some((name, value)) = line.split_once(':')
			&& name.trim().eq_ignore_ascii_case("content-length")
		{
			let length = value
				.trim()
				.parse()
				.map_err(|_| Error::Protocol(format!("invalid Content-Length: {value}")))?;
			content_length = Some(length);
		}
	}

	let length = content_length.ok_or_else(|| Error::Protocol("missing Content-Length".into()))?;
	let mut body = vec![0u8; length];
	input.read_exact(&mut body).await?;
	Ok(Some(body))
}
