//! # Langtree - Layered multi-language syntax trees
//!
//! A document may embed other languages inside its text (a template embedding a
//! script embedding markup). Tree-sitter parses one grammar over one set of byte
//! ranges at a time, so langtree keeps a *tree of trees*:
//!
//! - one [`LanguageTree`] per language, each owning its own parser
//! - [`Region`]s describing the ranges of the source each layer parses
//! - injection queries that discover embedded languages inside a parsed layer
//! - edit propagation that keeps every live tree aligned with the text
//!
//! ```no_run
//! use langtree::{LanguageRegistry, LanguageTree, Source, TextBuffer, TreeOptions};
//! use std::rc::Rc;
//!
//! let registry = Rc::new(LanguageRegistry::with_builtin());
//! let source = Source::shared(TextBuffer::new("const q = python`x = 1`;"));
//! let mut tree = LanguageTree::create(source, "javascript", registry, TreeOptions::default())?;
//! tree.parse()?;
//! assert!(tree.children().contains_key("python"));
//! # Ok::<(), langtree::Error>(())
//! ```

pub mod config;
pub mod injection;
pub mod range;
pub mod registry;
pub mod source;
pub mod tree;

// Re-exports for convenient access
pub use injection::{CaptureRole, InjectionQuery};
pub use range::{Range, Region, RegionRange};
pub use registry::{Grammar, LanguageRegistry};
pub use source::{SharedSource, Source, TextBuffer, TextEdit};
pub use tree::{LanguageTree, Observers, Parsed, TreeOptions};

/// Result type alias for langtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for langtree operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Malformed injection query for {language}: {message}")]
    MalformedQuery { language: String, message: String },

    #[error("Invalid region shape: {0}")]
    InvalidRegionShape(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
