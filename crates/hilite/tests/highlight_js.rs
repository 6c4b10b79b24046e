//! End-to-end highlighting through node and highlight.js.
//!
//! Requires: HILITE_NODE_TESTS=1, `node` on PATH, and the `highlight.js` package installed
//! under HILITE_PROJECT_PATH (defaults to the current directory).

use std::path::PathBuf;
use std::time::Duration;

use hilite::{Error, HighlightAccessor, HighlightOptions, HighlightRequest, HighlightService};
use serial_test::serial;

fn require_node_tests() -> bool {
	if std::env::var("HILITE_NODE_TESTS").as_deref() == Ok("1") {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
		return true;
	}
	eprintln!("skipping: set HILITE_NODE_TESTS=1 to run highlight.js integration tests");
	false
}

fn project_path() -> Option<PathBuf> {
	std::env::var_os("HILITE_PROJECT_PATH").map(PathBuf::from)
}

fn options() -> HighlightOptions {
	let mut options = HighlightOptions::default();
	options.node.project_path = project_path();
	options
}

fn point_global_at_project() {
	hilite::configure(|options| options.node.project_path = project_path());
}

#[tokio::test(flavor = "multi_thread")]
async fn highlights_javascript_and_csharp() {
	if !require_node_tests() {
		return;
	}
	let service = HighlightService::new(&options());

	let js = service
		.highlight(HighlightRequest::new("function f(a){return a;}", "javascript"), None)
		.await
		.unwrap();
	assert!(js.contains(r#"<span class="hljs-keyword">function</span>"#), "{js}");
	assert!(js.contains(r#"<span class="hljs-keyword">return</span>"#), "{js}");

	let again = service
		.highlight(HighlightRequest::new("function f(a){return a;}", "javascript"), None)
		.await
		.unwrap();
	assert_eq!(js, again);

	let cs = service
		.highlight(
			HighlightRequest::new("public string ExampleFunction(string arg)\n{\n    return arg + \"dummyString\";\n}", "csharp"),
			None,
		)
		.await
		.unwrap();
	assert!(cs.contains(r#"<span class="hljs-keyword">public</span>"#), "{cs}");
	assert!(cs.contains(r#"<span class="hljs-string">&quot;dummyString&quot;</span>"#), "{cs}");

	let unprefixed = service
		.highlight(HighlightRequest::new("return 1;", "js").without_class_prefix(), None)
		.await
		.unwrap();
	assert!(unprefixed.contains(r#"<span class="keyword">return</span>"#), "{unprefixed}");
}

#[tokio::test(flavor = "multi_thread")]
async fn validates_aliases_against_engine() {
	if !require_node_tests() {
		return;
	}
	let service = HighlightService::new(&options());

	assert!(service.is_valid_language_alias("css", None).await.unwrap());
	assert!(service.is_valid_language_alias("javascript", None).await.unwrap());
	assert!(service.is_valid_language_alias("cs", None).await.unwrap());
	assert!(!service.is_valid_language_alias("made-up-lang", None).await.unwrap());

	let err = service
		.highlight(HighlightRequest::new("x", "not-a-real-language"), None)
		.await
		.unwrap_err();
	assert!(err.is_invalid_argument());

	let aliases = service.language_aliases(None).await.unwrap();
	assert!(aliases.windows(2).all(|w| w[0] <= w[1]));
	assert!(aliases.iter().any(|a| a == "csharp"));
}

#[tokio::test(flavor = "multi_thread")]
async fn detects_language_automatically() {
	if !require_node_tests() {
		return;
	}
	let service = HighlightService::new(&options());

	let result = service
		.highlight_auto(Some("body { color: red; }"), &["css", "javascript"], None, None)
		.await
		.unwrap();
	assert_eq!(result.language.as_deref(), Some("css"));
	assert!(result.value.contains("red"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn global_accessor_recovers_from_bad_configuration() {
	if !require_node_tests() {
		return;
	}

	hilite::dispose_current();
	hilite::configure(|options| {
		options.node.project_path = project_path();
		options.node.timeout_ms = Some(0);
	});

	let err = hilite::highlight(HighlightRequest::new("let a = 1;", "javascript"), None)
		.await
		.unwrap_err();
	assert!(
		matches!(err.as_runtime(), Some(hilite::runtime::Error::Timeout { .. })),
		"unexpected error: {err:?}"
	);

	hilite::dispose_current();
	point_global_at_project();

	let html = hilite::highlight(HighlightRequest::new("let a = 1;", "javascript"), None)
		.await
		.unwrap();
	assert!(html.contains(r#"<span class="hljs-keyword">let</span>"#), "{html}");
	assert!(hilite::is_valid_language_alias("css", None).await.unwrap());
	assert!(!hilite::is_valid_language_alias("made-up-lang", None).await.unwrap());

	hilite::dispose_current();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn disposed_service_is_replaced_transparently() {
	if !require_node_tests() {
		return;
	}
	let accessor = HighlightAccessor::new();
	accessor.configure(|options| {
		options.node.project_path = project_path();
		options.node = options.node.clone().timeout(Duration::from_secs(30));
	});

	let first = accessor.current();
	assert!(accessor.is_valid_language_alias("css", None).await.unwrap());

	accessor.dispose_current();
	let err = first.is_valid_language_alias("css", None).await.unwrap_err();
	assert!(matches!(err, Error::Disposed));

	accessor.configure(|options| options.node.project_path = project_path());
	assert!(accessor.is_valid_language_alias("css", None).await.unwrap());
	accessor.dispose_current();
}
