use serde_json::{Value as JsonValue, json};
use tokio::io::{BufReader, DuplexStream, duplex};

use super::*;
use crate::node::protocol::{InvokeParams, METHOD_INVOKE};

/// The process side of a running IO loop.
struct FakeProcess {
	stdin: BufReader<DuplexStream>,
	stdout: DuplexStream,
	buf: String,
}

impl FakeProcess {
	async fn next_request(&mut self) -> JsonValue {
		let body = read_frame(&mut self.stdin, &mut self.buf).await.unwrap().unwrap();
		serde_json::from_slice(&body).unwrap()
	}

	async fn reply(&mut self, value: JsonValue) {
		write_frame(&mut self.stdout, &value).await.unwrap();
	}
}

fn start_loop() -> (mpsc::UnboundedSender<PendingRequest>, FakeProcess) {
	let (stdin_ours, stdin_theirs) = duplex(4096);
	let (stdout_theirs, stdout_ours) = duplex(4096);
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
	tokio::spawn(run_process_io(0, stdin_ours, stdout_ours, outbound_rx));
	let process = FakeProcess {
		stdin: BufReader::new(stdin_theirs),
		stdout: stdout_theirs,
		buf: String::new(),
	};
	(outbound_tx, process)
}

fn submit(outbound: &mpsc::UnboundedSender<PendingRequest>, id: u64, export: &str) -> oneshot::Receiver<Result<Response>> {
	let (response_tx, response_rx) = oneshot::channel();
	let request = Request {
		id,
		method: METHOD_INVOKE,
		params: InvokeParams {
			cache_key: "test-module".into(),
			export: export.into(),
			args: vec![json!("code")],
			module: None,
		},
	};
	outbound.send(PendingRequest { request, response_tx }).ok().unwrap();
	response_rx
}

#[tokio::test]
async fn responses_are_matched_by_id_out_of_order() {
	let (outbound, mut process) = start_loop();

	let first = submit(&outbound, 1, "highlight");
	let second = submit(&outbound, 2, "getAliases");

	let req1 = process.next_request().await;
	let req2 = process.next_request().await;
	assert_eq!(req1["id"], 1);
	assert_eq!(req1["params"]["export"], "highlight");
	assert_eq!(req2["id"], 2);

	process.reply(json!({"status": "ok", "id": 2, "result": ["js"]})).await;
	process.reply(json!({"status": "notCached", "id": 1})).await;

	let second = second.await.unwrap().unwrap();
	assert_eq!(
		second,
		Response::Ok {
			id: 2,
			result: json!(["js"]),
		}
	);
	assert_eq!(first.await.unwrap().unwrap(), Response::NotCached { id: 1 });
}

#[tokio::test]
async fn unparseable_frames_are_skipped() {
	let (outbound, mut process) = start_loop();

	let rx = submit(&outbound, 5, "highlight");
	process.next_request().await;
	process.reply(json!({"status": "bogus", "id": 5})).await;
	process.reply(json!({"status": "ok", "id": 5, "result": "done"})).await;

	assert_eq!(
		rx.await.unwrap().unwrap(),
		Response::Ok {
			id: 5,
			result: json!("done"),
		}
	);
}

#[tokio::test]
async fn pending_requests_fail_when_process_closes_output() {
	let (outbound, mut process) = start_loop();

	let rx = submit(&outbound, 9, "highlight");
	process.next_request().await;
	drop(process);

	let err = rx.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::ServiceStopped));
}

#[tokio::test]
async fn loop_ends_when_senders_are_dropped() {
	let (stdin_ours, stdin_theirs) = duplex(64);
	let (_stdout_theirs, stdout_ours) = duplex(64);
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<PendingRequest>();
	let io = tokio::spawn(run_process_io(0, stdin_ours, stdout_ours, outbound_rx));

	drop(outbound_tx);
	io.await.unwrap();

	// The loop dropped its end of stdin, so the process observes end of input.
	let mut reader = BufReader::new(stdin_theirs);
	let mut buf = String::new();
	assert!(read_frame(&mut reader, &mut buf).await.unwrap().is_none());
}
