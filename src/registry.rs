//! Language registry
//!
//! Grammars are registered once and handed to nodes on construction. The
//! registry is an explicit service passed into every [`LanguageTree`](crate::LanguageTree)
//! rather than process-wide state.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Language;

/// A loadable grammar and its default injection query
#[derive(Clone)]
pub struct Grammar {
    id: String,
    language: Language,
    injections: Option<String>,
    extensions: Vec<String>,
}

impl Grammar {
    pub fn new(id: &str, language: Language) -> Self {
        Self {
            id: id.to_string(),
            language,
            injections: None,
            extensions: Vec::new(),
        }
    }

    /// Attach the default injection query source
    pub fn with_injections(mut self, query_source: &str) -> Self {
        self.injections = Some(query_source.to_string());
        self
    }

    /// File extensions this grammar handles
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Default injection query, if the language ships one
    pub fn injections(&self) -> Option<&str> {
        self.injections.as_deref()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("id", &self.id)
            .field("injections", &self.injections.is_some())
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Registry of grammars keyed by language id
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    grammars: HashMap<String, Grammar>,
    aliases: HashMap<String, String>,
}

impl LanguageRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in grammar
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            Grammar::new("javascript", tree_sitter_javascript::LANGUAGE.into())
                .with_injections(include_str!("../queries/javascript/injections.scm"))
                .with_extensions(&["js", "jsx", "mjs", "cjs"]),
        );
        registry.register(
            Grammar::new("python", tree_sitter_python::LANGUAGE.into()).with_extensions(&["py", "pyi"]),
        );
        registry.register(
            Grammar::new("rust", tree_sitter_rust::LANGUAGE.into())
                .with_injections(include_str!("../queries/rust/injections.scm"))
                .with_extensions(&["rs"]),
        );
        registry.register(Grammar::new("go", tree_sitter_go::LANGUAGE.into()).with_extensions(&["go"]));

        registry.alias("js", "javascript");
        registry.alias("py", "python");
        registry.alias("rs", "rust");
        registry.alias("golang", "go");
        registry
    }

    /// Register a grammar, replacing any grammar with the same id
    pub fn register(&mut self, grammar: Grammar) {
        self.grammars.insert(grammar.id.clone(), grammar);
    }

    /// Accept `alias` wherever `id` is accepted
    pub fn alias(&mut self, alias: &str, id: &str) {
        self.aliases.insert(alias.to_string(), id.to_string());
    }

    /// Canonical id for a name or alias, if it is registered
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.grammars.contains_key(name) {
            return Some(name);
        }
        self.aliases
            .get(name)
            .map(String::as_str)
            .filter(|id| self.grammars.contains_key(*id))
    }

    /// Load the grammar for a language id or alias
    pub fn load(&self, name: &str) -> Result<Grammar> {
        self.resolve(name)
            .and_then(|id| self.grammars.get(id))
            .cloned()
            .ok_or_else(|| Error::UnknownLanguage(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Find the grammar handling a file, by extension
    pub fn language_for_path(&self, path: &Path) -> Option<&str> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        self.grammars
            .values()
            .find(|g| g.extensions.iter().any(|e| e == ext))
            .map(|g| g.id.as_str())
    }

    /// Registered language ids, sorted
    pub fn languages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.grammars.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
