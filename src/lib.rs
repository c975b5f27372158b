//! RubyLens: a go-to-definition and find-references engine for Ruby
//!
//! RubyLens indexes a Ruby source tree without a real parser: a line-oriented
//! scanner with pluggable pattern matchers extracts symbols, a trigram index
//! answers text searches, and a debounced watcher keeps both in sync as files
//! change on disk. It is a deliberately "good enough" regex-level tool, not a
//! semantic analyzer.
//!
//! # Architecture
//!
//! - **Matchers**: priority-ordered line classifiers (class, module, def,
//!   constants, Rails relations, block keywords)
//! - **Scanner**: drives the line scan, folds multi-line constructs, tracks
//!   namespace scope and block nesting
//! - **SymbolIndex**: full-name / short-name / per-file maps behind one lock,
//!   with scope-aware resolution of partially qualified names
//! - **TrigramIndex**: inverted 3-byte-substring index with a Ruby-aware
//!   word-boundary verifier for `?` / `!` / `=` method suffixes
//! - **Server**: Content-Length framed JSON-RPC over stdio
//!
//! # Example
//!
//! ```no_run
//! use rubylens::{CancelToken, IndexConfig, SymbolIndex};
//! use rubylens::matchers::Registry;
//!
//! let index = SymbolIndex::new("/path/to/project", Registry::with_defaults(), IndexConfig::default());
//! index.build(&CancelToken::new()).unwrap();
//!
//! for sym in index.find_definitions("User") {
//!     println!("{} at {}:{}", sym.full_name, sym.file_path, sym.line);
//! }
//! ```

pub mod cli;
pub mod index;
pub mod matchers;
pub mod models;
pub mod protocol;
pub mod scanner;
pub mod server;
pub mod trigram;
pub mod watcher;

// Re-export commonly used types
pub use index::{CancelToken, Cancelled, SymbolIndex};
pub use models::{IndexConfig, Reference, Symbol, SymbolKind};
pub use scanner::Scanner;
pub use server::Server;
pub use trigram::TrigramIndex;
