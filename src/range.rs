//! Range and Region value types
//!
//! A [`Range`] carries both coordinate systems at once: byte offsets for the
//! parser and row/column points for query matching and lookups. A [`Region`]
//! is an ordered list of ranges handed to the parser as one contiguous context.

use crate::{Error, Result};
use serde::Serialize;
use tree_sitter::{Node, Point};

/// A half-open span over the source in both byte and point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start_row: usize,
    pub start_col: usize,
    pub start_byte: usize,
    pub end_row: usize,
    pub end_col: usize,
    pub end_byte: usize,
}

impl Range {
    /// Create a range from its six coordinates
    pub fn new(
        start_row: usize,
        start_col: usize,
        start_byte: usize,
        end_row: usize,
        end_col: usize,
        end_byte: usize,
    ) -> Self {
        Self {
            start_row,
            start_col,
            start_byte,
            end_row,
            end_col,
            end_byte,
        }
    }

    /// The range spanned by a syntax node
    pub fn of_node(node: &Node) -> Self {
        node.range().into()
    }

    pub fn start_point(&self) -> Point {
        Point::new(self.start_row, self.start_col)
    }

    pub fn end_point(&self) -> Point {
        Point::new(self.end_row, self.end_col)
    }

    pub fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }

    /// Check the start <= end invariant in both coordinate systems
    pub fn validate(&self) -> Result<()> {
        if self.start_byte > self.end_byte {
            return Err(Error::InvalidRegionShape(format!(
                "start byte {} is after end byte {}",
                self.start_byte, self.end_byte
            )));
        }
        if (self.start_row, self.start_col) > (self.end_row, self.end_col) {
            return Err(Error::InvalidRegionShape(format!(
                "start point {}:{} is after end point {}:{}",
                self.start_row, self.start_col, self.end_row, self.end_col
            )));
        }
        Ok(())
    }

    /// True if `other` lies entirely within this range, compared by row/column only
    pub fn encloses(&self, other: &Range) -> bool {
        (self.start_row, self.start_col) <= (other.start_row, other.start_col)
            && (other.end_row, other.end_col) <= (self.end_row, self.end_col)
    }

    /// True if the two ranges share at least one byte
    pub fn overlaps_bytes(&self, other: &Range) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

impl From<tree_sitter::Range> for Range {
    fn from(range: tree_sitter::Range) -> Self {
        Self {
            start_row: range.start_point.row,
            start_col: range.start_point.column,
            start_byte: range.start_byte,
            end_row: range.end_point.row,
            end_col: range.end_point.column,
            end_byte: range.end_byte,
        }
    }
}

impl From<Range> for tree_sitter::Range {
    fn from(range: Range) -> Self {
        tree_sitter::Range {
            start_byte: range.start_byte,
            end_byte: range.end_byte,
            start_point: range.start_point(),
            end_point: range.end_point(),
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{} [{}..{})",
            self.start_row, self.start_col, self.end_row, self.end_col, self.start_byte, self.end_byte
        )
    }
}

/// A range as supplied to region assignment.
///
/// Point-only ranges are resolved to byte offsets against the source before
/// they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRange {
    Resolved(Range),
    Points { start: Point, end: Point },
}

impl From<Range> for RegionRange {
    fn from(range: Range) -> Self {
        Self::Resolved(range)
    }
}

impl From<tree_sitter::Range> for RegionRange {
    fn from(range: tree_sitter::Range) -> Self {
        Self::Resolved(range.into())
    }
}

impl From<Node<'_>> for RegionRange {
    fn from(node: Node<'_>) -> Self {
        Self::Resolved(Range::of_node(&node))
    }
}

/// An ordered, non-empty list of ranges parsed together as one context
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Region(Vec<Range>);

impl Region {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }

    /// A region holding a single range
    pub fn single(range: Range) -> Self {
        Self(vec![range])
    }

    pub fn ranges(&self) -> &[Range] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort ranges by start byte and merge ranges that overlap, so nested or
    /// duplicated content collapses into the outermost span.
    pub fn normalize(&mut self) {
        self.0.sort_by_key(|r| (r.start_byte, r.end_byte));
        let mut merged: Vec<Range> = Vec::with_capacity(self.0.len());
        for range in self.0.drain(..) {
            match merged.last_mut() {
                Some(last) if range.start_byte < last.end_byte || range == *last => {
                    if range.end_byte > last.end_byte {
                        last.end_byte = range.end_byte;
                        last.end_row = range.end_row;
                        last.end_col = range.end_col;
                    }
                }
                _ => merged.push(range),
            }
        }
        self.0 = merged;
    }

    /// Check that the region is non-empty, every range is well formed, and
    /// ranges are in increasing, non-overlapping order as the parser requires.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidRegionShape("region has no ranges".to_string()));
        }
        for range in &self.0 {
            range.validate()?;
        }
        for pair in self.0.windows(2) {
            if pair[0].end_byte > pair[1].start_byte {
                return Err(Error::InvalidRegionShape(format!(
                    "ranges {} and {} overlap or are out of order",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    /// True if any range of this region encloses `range` in point order
    pub fn contains(&self, range: &Range) -> bool {
        self.0.iter().any(|r| r.encloses(range))
    }

    /// The ranges in the form the parser accepts
    pub fn to_ts_ranges(&self) -> Vec<tree_sitter::Range> {
        self.0.iter().copied().map(Into::into).collect()
    }
}

impl From<Vec<Range>> for Region {
    fn from(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }
}

impl<'a> IntoIterator for &'a Region {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
