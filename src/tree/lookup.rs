//! Range containment and layer lookup

use super::LanguageTree;
use crate::range::Range;
use tree_sitter::{Node, Tree};

impl LanguageTree {
    /// True if any region of this node encloses `range` by row/column.
    ///
    /// A node without explicit regions covers the whole source.
    pub fn contains(&self, range: &Range) -> bool {
        self.regions.is_empty() || self.regions.iter().any(|region| region.contains(range))
    }

    /// The deepest layer whose regions contain `range`.
    ///
    /// Children are searched in language order and the first match wins.
    pub fn language_for_range(&self, range: &Range) -> &LanguageTree {
        self.children
            .values()
            .find(|child| child.contains(range))
            .map(|child| child.language_for_range(range))
            .unwrap_or(self)
    }

    /// The tree of the deepest layer whose root node encloses `range`
    pub fn tree_for_range(&self, range: &Range) -> Option<&Tree> {
        self.children
            .values()
            .find_map(|child| child.tree_for_range(range))
            .or_else(|| {
                self.trees()
                    .find(|tree| Range::of_node(&tree.root_node()).encloses(range))
            })
    }

    /// Smallest named node covering `range` in the deepest enclosing tree
    pub fn named_node_for_range(&self, range: &Range) -> Option<Node<'_>> {
        self.tree_for_range(range)?
            .root_node()
            .named_descendant_for_point_range(range.start_point(), range.end_point())
    }
}
