//! Layered language trees
//!
//! A [`LanguageTree`] owns one parser for one language, the regions of the
//! source that language parses, one tree per region, and a child node for
//! every language injected into those trees. Parsing is driven top-down from
//! the root; edits are pushed top-down with [`LanguageTree::notify_edit`].

mod edit;
mod lookup;
mod observers;

#[cfg(test)]
mod tests;

pub use observers::{BytesHandler, ChildHandler, Observers, TreeChangedHandler};

use crate::injection::{InjectionQuery, Injections};
use crate::range::{Range, Region, RegionRange};
use crate::registry::{Grammar, LanguageRegistry};
use crate::source::{SharedSource, Source};
use crate::{Error, Result};
use observers::ObserverSet;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tree_sitter::{Parser, Tree};

/// Construction options shared by a root and every node it creates
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Injection query overrides keyed by language id. An empty query disables
    /// injections for that language.
    pub injections: HashMap<String, String>,
}

impl TreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `query_source` instead of the language's default injection query.
    ///
    /// `language` may be a canonical id or any alias known to the registry.
    pub fn with_injection_query(mut self, language: &str, query_source: &str) -> Self {
        self.injections.insert(language.to_string(), query_source.to_string());
        self
    }

    /// The override for canonical `id`, keyed by the id itself or an alias of it
    fn injection_query(&self, id: &str, registry: &LanguageRegistry) -> Option<&str> {
        self.injections
            .get(id)
            .or_else(|| {
                self.injections
                    .iter()
                    .find(|(key, _)| registry.resolve(key) == Some(id))
                    .map(|(_, query_source)| query_source)
            })
            .map(String::as_str)
    }
}

/// Output of [`LanguageTree::parse`]
#[derive(Debug)]
pub struct Parsed<'a> {
    /// This node's trees, index-aligned with its regions
    pub trees: Vec<&'a Tree>,
    /// Changed ranges across this node and every reparsed descendant
    pub changes: Vec<Range>,
}

/// One language layer of a document and the layers injected into it
pub struct LanguageTree {
    language: String,
    grammar: Grammar,
    parser: Parser,
    source: SharedSource,
    registry: Rc<LanguageRegistry>,
    options: Rc<TreeOptions>,
    injection_query: Option<InjectionQuery>,
    regions: Vec<Region>,
    /// `trees[i]` is the parse of `regions[i]`; `None` until that region is parsed
    trees: Vec<Option<Tree>>,
    valid: bool,
    /// Spans edited since the last parse, reported in the next change list
    pending: Vec<Range>,
    children: BTreeMap<String, LanguageTree>,
    observers: ObserverSet,
    depth: usize,
}

impl LanguageTree {
    /// Create a root node for `language` over `source`.
    ///
    /// Fails with [`Error::UnknownLanguage`] if the registry has no grammar and
    /// with [`Error::MalformedQuery`] if an injection override does not compile.
    pub fn create(
        source: SharedSource,
        language: &str,
        registry: Rc<LanguageRegistry>,
        options: TreeOptions,
    ) -> Result<Self> {
        Self::build(source, language, registry, Rc::new(options), 0)
    }

    fn build(
        source: SharedSource,
        language: &str,
        registry: Rc<LanguageRegistry>,
        options: Rc<TreeOptions>,
        depth: usize,
    ) -> Result<Self> {
        let grammar = registry.load(language)?;

        let mut parser = Parser::new();
        parser
            .set_language(grammar.language())
            .map_err(|e| Error::UnknownLanguage(format!("{}: {}", grammar.id(), e)))?;

        let injection_query = match options.injection_query(grammar.id(), &registry) {
            Some(query_source) if query_source.trim().is_empty() => None,
            Some(query_source) => Some(InjectionQuery::new(grammar.language(), grammar.id(), query_source)?),
            None => match grammar.injections().map(|q| InjectionQuery::new(grammar.language(), grammar.id(), q)) {
                Some(Ok(query)) => Some(query),
                Some(Err(e)) => {
                    tracing::warn!("{}; {} will not produce injections", e, grammar.id());
                    None
                }
                None => None,
            },
        };

        Ok(Self {
            language: grammar.id().to_string(),
            grammar,
            parser,
            source,
            registry,
            options,
            injection_query,
            regions: Vec::new(),
            trees: Vec::new(),
            valid: false,
            pending: Vec::new(),
            children: BTreeMap::new(),
            observers: ObserverSet::default(),
            depth,
        })
    }

    /// Canonical language id of this node
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Injection nesting depth; the root is 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn has_injection_query(&self) -> bool {
        self.injection_query.is_some()
    }

    /// Trees from the last parse, in region order
    pub fn trees(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.trees.iter().flatten()
    }

    pub fn children(&self) -> &BTreeMap<String, LanguageTree> {
        &self.children
    }

    pub fn child(&self, language: &str) -> Option<&LanguageTree> {
        self.children.get(language)
    }

    pub fn child_mut(&mut self, language: &str) -> Option<&mut LanguageTree> {
        self.children.get_mut(language)
    }

    pub fn included_regions(&self) -> &[Region] {
        &self.regions
    }

    /// True if this node and every descendant are parsed and up to date
    pub fn is_valid(&self) -> bool {
        self.valid && self.children.values().all(LanguageTree::is_valid)
    }

    /// Force this node and every descendant to reparse on the next `parse()`
    pub fn invalidate(&mut self) {
        self.valid = false;
        for child in self.children.values_mut() {
            child.invalidate();
        }
    }

    /// Register event handlers. Recursive registrations also apply to every
    /// current descendant and to children created later.
    pub fn register_observers(&mut self, observers: Observers, recursive: bool) {
        self.observers.add(&observers);
        if recursive {
            for child in self.children.values_mut() {
                child.register_observers(observers.clone(), true);
            }
            self.observers.recursive.push(observers);
        }
    }

    /// Replace the regions this node parses.
    ///
    /// Point-only ranges are resolved to byte offsets against the source. On
    /// error the previous regions are kept.
    pub fn set_included_regions(&mut self, regions: Vec<Vec<RegionRange>>) -> Result<()> {
        let resolved = {
            let source = self.source.borrow();
            regions
                .into_iter()
                .map(|region| {
                    region
                        .into_iter()
                        .map(|range| resolve_range(&source, range))
                        .collect::<Result<Vec<_>>>()
                        .map(Region::new)
                })
                .collect::<Result<Vec<_>>>()?
        };
        self.set_regions(resolved)
    }

    /// Replace the regions this node parses with already resolved regions.
    ///
    /// A tree is kept as a reuse hint only when its region is unchanged at the
    /// same index. Children are left alone until the next parse.
    pub fn set_regions(&mut self, regions: Vec<Region>) -> Result<()> {
        for region in &regions {
            region.validate()?;
        }

        if regions.len() != self.regions.len() {
            self.trees.clear();
        } else {
            for (i, tree) in self.trees.iter_mut().enumerate() {
                if self.regions.get(i) != regions.get(i) {
                    *tree = None;
                }
            }
        }

        self.regions = regions;
        self.valid = false;
        Ok(())
    }

    /// Bring this node and its descendants up to date.
    ///
    /// A valid node returns its current trees and an empty change list without
    /// touching the parser.
    pub fn parse(&mut self) -> Result<Parsed<'_>> {
        let mut changes = Vec::new();

        if !self.valid {
            changes = self.parse_regions()?;
            let injections = self.injections();
            self.reconcile_children(injections, &mut changes);
            self.valid = true;
        } else {
            for child in self.children.values_mut() {
                if !child.is_valid() {
                    changes.extend(child.parse()?.changes);
                }
            }
        }

        Ok(Parsed {
            trees: self.trees().collect(),
            changes,
        })
    }

    /// Reparse every region, or the whole source when no regions were set
    fn parse_regions(&mut self) -> Result<Vec<Range>> {
        let shared = Rc::clone(&self.source);
        let source = shared.borrow();
        let count = self.regions.len().max(1);
        self.trees.resize_with(count, || None);

        let mut changes = Vec::new();
        for index in 0..count {
            let ranges = self.regions.get(index).map(Region::to_ts_ranges).unwrap_or_default();
            self.parser
                .set_included_ranges(&ranges)
                .map_err(|e| Error::InvalidRegionShape(format!("parser rejected region {}: {:?}", index, e)))?;

            let old = self.trees[index].as_ref();
            let tree = self
                .parser
                .parse(source.text(), old)
                .ok_or_else(|| Error::Parse(format!("{} parser produced no tree", self.language)))?;

            let tree_changes: Vec<Range> = match old {
                Some(old) => old.changed_ranges(&tree).map(Range::from).collect(),
                None => vec![Range::of_node(&tree.root_node())],
            };
            tracing::debug!(
                "parsed {} region {} ({} changed ranges)",
                self.language,
                index,
                tree_changes.len()
            );

            self.observers.tree_changed(&tree_changes, &tree);
            changes.extend(tree_changes);
            self.trees[index] = Some(tree);
        }

        // Edited spans are only consumed once every region has reparsed
        let mut edited = std::mem::take(&mut self.pending);
        edited.extend(changes);
        Ok(edited)
    }

    fn injections(&self) -> Injections {
        match &self.injection_query {
            Some(query) => query.discover(self.trees(), &self.source.borrow(), &self.registry),
            None => Injections::new(),
        }
    }

    /// Create, update and drop children so they match `injections` exactly.
    ///
    /// Sites whose language cannot be loaded are skipped without affecting
    /// their siblings.
    fn reconcile_children(&mut self, injections: Injections, changes: &mut Vec<Range>) {
        let mut injected = Vec::with_capacity(injections.len());

        for (language, regions) in injections {
            let existed = self.children.contains_key(&language);
            if !existed {
                if let Err(e) = self.add_child(&language) {
                    tracing::warn!("skipping {} injection in {}: {}", language, self.language, e);
                    continue;
                }
            }
            let Some(child) = self.children.get_mut(&language) else {
                continue;
            };
            if let Err(e) = child.set_regions(regions) {
                // A new child has no previous regions to fall back on
                if !existed {
                    tracing::warn!("skipping {} injection in {}: {}", language, self.language, e);
                    continue;
                }
                tracing::warn!("keeping previous {} regions in {}: {}", language, self.language, e);
            }
            match child.parse() {
                Ok(parsed) => changes.extend(parsed.changes),
                Err(e) => {
                    tracing::warn!("failed to parse {} injection in {}: {}", language, self.language, e);
                    continue;
                }
            }
            injected.push(language);
        }

        let stale: Vec<String> = self
            .children
            .keys()
            .filter(|language| !injected.contains(*language))
            .cloned()
            .collect();
        for language in stale {
            self.remove_child(&language);
        }
    }

    /// Create a child for `language`, replacing any existing child for it
    pub fn add_child(&mut self, language: &str) -> Result<&mut LanguageTree> {
        let mut child = Self::build(
            Rc::clone(&self.source),
            language,
            Rc::clone(&self.registry),
            Rc::clone(&self.options),
            self.depth + 1,
        )?;
        for observers in &self.observers.recursive {
            child.register_observers(observers.clone(), true);
        }

        let id = child.language.clone();
        self.remove_child(&id);

        tracing::debug!("adding {} child to {}", id, self.language);
        self.observers.child_added(&child);
        Ok(self.children.entry(id).or_insert(child))
    }

    /// Destroy the child for `language` and its whole subtree.
    ///
    /// Returns false if there was no such child.
    pub fn remove_child(&mut self, language: &str) -> bool {
        let Some(mut child) = self.children.remove(language) else {
            return false;
        };
        child.destroy();
        tracing::debug!("removed {} child from {}", language, self.language);
        self.observers.child_removed(&child);
        true
    }

    /// Tear down every descendant, firing child-removed for each
    pub fn destroy(&mut self) {
        let languages: Vec<String> = self.children.keys().cloned().collect();
        for language in languages {
            self.remove_child(&language);
        }
    }

    /// Visit descendants in pre-order, optionally starting with this node
    pub fn for_each_child(&self, mut f: impl FnMut(&LanguageTree), include_self: bool) {
        self.visit(&mut f, include_self);
    }

    fn visit(&self, f: &mut dyn FnMut(&LanguageTree), include_self: bool) {
        if include_self {
            f(self);
        }
        for child in self.children.values() {
            child.visit(f, true);
        }
    }

    /// Visit every tree of this node and its descendants with its owner
    pub fn for_each_tree(&self, mut f: impl FnMut(&Tree, &LanguageTree)) {
        self.for_each_child(
            |node| {
                for tree in node.trees() {
                    f(tree, node);
                }
            },
            true,
        );
    }
}

fn resolve_range(source: &Source, range: RegionRange) -> Result<Range> {
    match range {
        RegionRange::Resolved(range) => Ok(range),
        RegionRange::Points { start, end } => Ok(Range::new(
            start.row,
            start.column,
            source.byte_offset_of_point(start)?,
            end.row,
            end.column,
            source.byte_offset_of_point(end)?,
        )),
    }
}

impl std::fmt::Debug for LanguageTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageTree")
            .field("language", &self.language)
            .field("depth", &self.depth)
            .field("valid", &self.valid)
            .field("regions", &self.regions)
            .field("trees", &self.trees.iter().flatten().count())
            .field("children", &self.children)
            .finish()
    }
}
