use tokio::io::AsyncReadExt;

use super::*;

async fn read_all(mut stream: ModuleStream) -> String {
	let mut out = String::new();
	stream.read_to_string(&mut out).await.unwrap();
	out
}

#[tokio::test]
async fn embedded_modules_stream_registered_bytes() {
	let modules = EmbeddedModules::new().with("bundle.js", b"module.exports = {};");

	assert!(modules.contains("bundle.js"));
	let stream = modules.read_as_stream("bundle.js").unwrap();
	assert_eq!(read_all(stream).await, "module.exports = {};");
}

#[test]
fn embedded_modules_reject_unknown_names() {
	let modules = EmbeddedModules::new();
	let err = modules.read_as_stream("bundle.js").err().unwrap();
	assert!(matches!(err, Error::ModuleNotFound(name) if name == "bundle.js"));
}

#[tokio::test]
async fn directory_modules_read_files_below_root() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::write(dir.path().join("bundle.js"), "exports.answer = 42;").unwrap();
	let modules = DirectoryModules::new(dir.path());

	let stream = modules.read_as_stream("bundle.js").unwrap();
	assert_eq!(read_all(stream).await, "exports.answer = 42;");
}

#[test]
fn directory_modules_report_missing_files_as_not_found() {
	let dir = tempfile::tempdir().unwrap();
	let modules = DirectoryModules::new(dir.path());

	let err = modules.read_as_stream("missing.js").err().unwrap();
	assert!(matches!(err, Error::ModuleNotFound(_)));
}

#[test]
fn directory_modules_refuse_paths_outside_root() {
	let dir = tempfile::tempdir().unwrap();
	let modules = DirectoryModules::new(dir.path().join("inner"));

	for name in ["../bundle.js", "/etc/passwd", ""] {
		let err = modules.read_as_stream(name).err().unwrap();
		assert!(matches!(err, Error::ModuleNotFound(_)), "{name} should be rejected");
	}
}
