//! Injection discovery
//!
//! An injection query locates the places inside a parsed tree where another
//! language begins. Capture names carry the meaning:
//!
//! - `language` → literal text naming the injected language (always wins)
//! - `content` → node whose range is handed to the injected language
//! - `combined` → flag: every content node of this pattern in one tree forms one region
//! - `_anything` → ignored, free for predicates
//! - any other name → fallback language id (the capture name itself) and
//!   fallback content node when the match has no explicit ones

use crate::range::{Range, Region};
use crate::registry::LanguageRegistry;
use crate::source::Source;
use crate::{Error, Result};
use indexmap::IndexMap;
use tree_sitter::{Language, Node, Point, Query, QueryCursor, QueryMatch, Tree};

/// Regions per injected language, in discovery order
pub type Injections = IndexMap<String, Vec<Region>>;

/// What a capture contributes to an injection site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRole {
    Language,
    Combined,
    Content,
    Fallback,
    Ignored,
}

impl CaptureRole {
    /// Classify a capture by its name
    pub fn of(name: &str) -> Self {
        match name {
            "language" => CaptureRole::Language,
            "combined" => CaptureRole::Combined,
            "content" => CaptureRole::Content,
            _ if name.starts_with('_') => CaptureRole::Ignored,
            _ => CaptureRole::Fallback,
        }
    }
}

/// A location where another language's content begins
#[derive(Debug)]
pub struct InjectionSite<'tree> {
    pub tree_index: usize,
    pub language: String,
    pub pattern: usize,
    pub combined: bool,
    pub content: Vec<Node<'tree>>,
}

/// A compiled injection query with capture roles resolved once
pub struct InjectionQuery {
    query: Query,
    roles: Vec<CaptureRole>,
}

#[derive(Default)]
struct PatternGroup {
    combined: bool,
    ranges: Vec<Range>,
}

impl InjectionQuery {
    /// Compile `query_source` against a grammar
    pub fn new(language: &Language, language_id: &str, query_source: &str) -> Result<Self> {
        let query = Query::new(language, query_source).map_err(|e| Error::MalformedQuery {
            language: language_id.to_string(),
            message: e.to_string(),
        })?;
        let roles = query.capture_names().iter().map(|name| CaptureRole::of(name)).collect();
        Ok(Self { query, roles })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn roles(&self) -> &[CaptureRole] {
        &self.roles
    }

    /// Find every injection inside `trees`.
    ///
    /// Matches are grouped by tree, then language, then pattern; groups from
    /// different trees are never merged.
    pub fn discover<'t>(
        &self,
        trees: impl IntoIterator<Item = &'t Tree>,
        source: &Source,
        registry: &LanguageRegistry,
    ) -> Injections {
        let text = source.text().as_bytes();
        let mut cursor = QueryCursor::new();
        let mut result = Injections::new();

        for (tree_index, tree) in trees.into_iter().enumerate() {
            let root = tree.root_node();
            cursor.set_point_range(
                Point::new(root.start_position().row, 0)..Point::new(root.end_position().row + 1, 0),
            );

            let mut groups: IndexMap<String, IndexMap<usize, PatternGroup>> = IndexMap::new();
            for query_match in cursor.matches(&self.query, root, text) {
                let Some(site) = self.site(tree_index, &query_match, source, registry) else {
                    continue;
                };
                tracing::trace!(
                    "injection {} at tree {} pattern {} ({} nodes)",
                    site.language,
                    site.tree_index,
                    site.pattern,
                    site.content.len()
                );
                let group = groups
                    .entry(site.language)
                    .or_default()
                    .entry(site.pattern)
                    .or_default();
                group.combined |= site.combined;
                group.ranges.extend(site.content.iter().map(Range::of_node));
            }

            for (language, patterns) in groups {
                let regions = result.entry(language).or_default();
                for group in patterns.into_values() {
                    if group.combined {
                        let mut region = Region::new(group.ranges);
                        region.normalize();
                        regions.push(region);
                    } else {
                        regions.extend(group.ranges.into_iter().map(Region::single));
                    }
                }
            }
        }

        result
    }

    /// Interpret one match. Returns `None` when it names no language or no content.
    fn site<'tree>(
        &self,
        tree_index: usize,
        query_match: &QueryMatch<'_, 'tree>,
        source: &Source,
        registry: &LanguageRegistry,
    ) -> Option<InjectionSite<'tree>> {
        let mut language: Option<String> = None;
        let mut fallback: Option<(&str, Node<'tree>)> = None;
        let mut combined = false;
        let mut content = Vec::new();

        for capture in query_match.captures {
            let index = capture.index as usize;
            match self.roles[index] {
                CaptureRole::Language => {
                    language = Some(source.node_text(&capture.node).trim().to_string());
                }
                CaptureRole::Combined => combined = true,
                CaptureRole::Content => content.push(capture.node),
                CaptureRole::Fallback => {
                    if fallback.is_none() {
                        fallback = Some((self.query.capture_names()[index], capture.node));
                    }
                }
                CaptureRole::Ignored => {}
            }
        }

        if content.is_empty() {
            content.extend(fallback.map(|(_, node)| node));
        }
        let language = language
            .or_else(|| fallback.map(|(name, _)| name.to_string()))
            .filter(|l| !l.is_empty())?;
        if content.is_empty() {
            return None;
        }

        let language = registry
            .resolve(&language)
            .map(str::to_string)
            .unwrap_or(language);

        Some(InjectionSite {
            tree_index,
            language,
            pattern: query_match.pattern_index,
            combined,
            content,
        })
    }
}

impl std::fmt::Debug for InjectionQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionQuery")
            .field("patterns", &self.query.pattern_count())
            .field("roles", &self.roles)
            .finish()
    }
}
