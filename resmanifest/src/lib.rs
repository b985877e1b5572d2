pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod index;
pub mod store;
pub mod tree;

pub use config::StoreConfig;
pub use diagnostics::{DiagnosticSink, LogSink, MemorySink};
pub use document::DocumentNode;
pub use error::{ErrorKind, ManifestError, Result};
pub use store::{ResourceStore, StoreState};
pub use tree::{CanonicalNode, Instance, RawNode};
