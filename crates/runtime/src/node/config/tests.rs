use super::*;

#[test]
fn test_node_options_defaults() {
	let options = NodeOptions::default();
	assert_eq!(options.executable, "node");
	assert!(options.args.is_empty());
	assert_eq!(options.project_path, None);
	assert_eq!(options.timeout_duration(), Some(Duration::from_secs(60)));
}

#[test]
fn test_node_options_builder() {
	let options = NodeOptions::new()
		.executable("/usr/local/bin/node")
		.args(["--max-old-space-size=256"])
		.env([("NODE_ENV", "production")])
		.project_path("/srv/site")
		.timeout(Duration::from_millis(1500));

	assert_eq!(options.executable, "/usr/local/bin/node");
	assert_eq!(options.args, vec!["--max-old-space-size=256"]);
	assert_eq!(options.env.get("NODE_ENV").map(String::as_str), Some("production"));
	assert_eq!(options.project_path, Some(PathBuf::from("/srv/site")));
	assert_eq!(options.timeout_ms, Some(1500));
	assert_eq!(options.no_timeout().timeout_duration(), None);
}

#[test]
fn test_node_options_deserialize_partial() {
	let options: NodeOptions = serde_json::from_value(serde_json::json!({
		"project-path": "/srv/site",
		"timeout-ms": 0,
	}))
	.unwrap();

	assert_eq!(options.executable, "node");
	assert_eq!(options.project_path, Some(PathBuf::from("/srv/site")));
	assert_eq!(options.timeout_duration(), Some(Duration::ZERO));
}
