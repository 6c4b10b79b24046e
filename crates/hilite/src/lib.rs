//! Syntax highlighting through [highlight.js] running in an external node runtime.
//!
//! [`HighlightService`] validates input, keeps the set of valid language aliases in memory
//! after fetching it once, and invokes the bundled highlighting module through a
//! [`RuntimeInvoker`](hilite_runtime::RuntimeInvoker). The module is sent to the runtime only
//! when the runtime reports it has not cached it yet.
//!
//! [`HighlightAccessor`] shares one service across a process. It is built on first use,
//! rebuilt when [`configure`](HighlightAccessor::configure) stages new options, and released by
//! [`dispose_current`](HighlightAccessor::dispose_current). The free functions in this crate
//! operate on a process-wide accessor:
//!
//! ```no_run
//! # async fn demo() -> hilite::Result<()> {
//! use hilite::HighlightRequest;
//!
//! let html = hilite::highlight(HighlightRequest::new("function f(a){return a;}", "javascript"), None).await?;
//! assert!(html.contains(r#"<span class="hljs-keyword">function</span>"#));
//! assert!(!hilite::is_valid_language_alias("made-up-lang", None).await?);
//! # Ok(())
//! # }
//! ```
//!
//! The node process resolves the `highlight.js` package from
//! [`NodeOptions::project_path`](hilite_runtime::NodeOptions::project_path).
//!
//! [highlight.js]: https://highlightjs.org
#![warn(missing_docs)]

mod accessor;
mod aliases;
mod bundle;
mod config;
mod error;
mod request;
mod service;

pub use accessor::{HighlightAccessor, configure, dispose_current, global, highlight, highlight_auto, is_valid_language_alias};
pub use bundle::{BUNDLE_NAME, EMBEDDED_BUNDLE, MODULE_CACHE_KEY, module_source};
pub use config::HighlightOptions;
pub use error::{ConfigError, Error, Result};
pub use hilite_runtime as runtime;
pub use request::{DEFAULT_CLASS_PREFIX, HighlightAutoResult, HighlightRequest};
pub use service::HighlightService;
