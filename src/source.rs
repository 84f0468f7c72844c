//! Source text abstraction
//!
//! Every node of a layered tree reads the same text through a [`SharedSource`].
//! Nodes never mutate it: the host edits the text, then reports the edit with
//! [`LanguageTree::notify_edit`](crate::LanguageTree::notify_edit).

use crate::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;
use tree_sitter::{InputEdit, Node, Point};

/// Source shared between a root tree and all of its descendants
pub type SharedSource = Rc<RefCell<Source>>;

/// The text a layered tree parses
#[derive(Debug, Clone)]
pub enum Source {
    /// Editable buffer with a line-start table
    Buffer(TextBuffer),
    /// Plain string. Row/column positions cannot be resolved to bytes.
    Text(String),
}

impl Source {
    /// Wrap a source for sharing across a layered tree
    pub fn shared(source: impl Into<Source>) -> SharedSource {
        Rc::new(RefCell::new(source.into()))
    }

    pub fn text(&self) -> &str {
        match self {
            Source::Buffer(buffer) => buffer.text(),
            Source::Text(text) => text,
        }
    }

    pub fn len(&self) -> usize {
        self.text().len()
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }

    /// Byte offset of the first byte of `row`
    pub fn byte_offset_of_line_start(&self, row: usize) -> Result<usize> {
        match self {
            Source::Buffer(buffer) => buffer.line_start(row).ok_or_else(|| {
                Error::InvalidRegionShape(format!(
                    "row {} is past the end of the buffer ({} lines)",
                    row,
                    buffer.line_count()
                ))
            }),
            Source::Text(_) => Err(Error::UnsupportedSource(
                "row/column to byte conversion needs a buffer-backed source".to_string(),
            )),
        }
    }

    /// Byte offset of a row/column point. Columns are byte columns and may not
    /// run past the end of their line.
    pub fn byte_offset_of_point(&self, point: Point) -> Result<usize> {
        let line_start = self.byte_offset_of_line_start(point.row)?;
        let line_end = match self.byte_offset_of_line_start(point.row + 1) {
            Ok(next) => next - 1,
            Err(_) => self.len(),
        };
        if point.column > line_end - line_start {
            return Err(Error::InvalidRegionShape(format!(
                "point {}:{} is past the end of its line ({} columns)",
                point.row,
                point.column,
                line_end - line_start
            )));
        }
        Ok(line_start + point.column)
    }

    /// Edit a buffer-backed source, returning the record for `notify_edit`
    pub fn edit(&mut self, start_byte: usize, old_end_byte: usize, new_text: &str) -> Result<TextEdit> {
        match self {
            Source::Buffer(buffer) => buffer.edit(start_byte, old_end_byte, new_text),
            Source::Text(_) => Err(Error::UnsupportedSource(
                "string sources are read-only; use a TextBuffer".to_string(),
            )),
        }
    }

    /// Text spanned by a node; empty if the node does not fall on valid UTF-8
    pub fn node_text<'s>(&'s self, node: &Node) -> &'s str {
        node.utf8_text(self.text().as_bytes()).unwrap_or("")
    }
}

impl From<TextBuffer> for Source {
    fn from(buffer: TextBuffer) -> Self {
        Source::Buffer(buffer)
    }
}

impl From<String> for Source {
    fn from(text: String) -> Self {
        Source::Text(text)
    }
}

impl From<&str> for Source {
    fn from(text: &str) -> Self {
        Source::Text(text.to_string())
    }
}

/// An in-memory text buffer that tracks where each line starts
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    text: String,
    line_starts: Vec<usize>,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, row: usize) -> Option<usize> {
        self.line_starts.get(row).copied()
    }

    /// Row/column point of a byte offset
    pub fn point_of_byte(&self, byte: usize) -> Point {
        let row = match self.line_starts.binary_search(&byte) {
            Ok(row) => row,
            Err(next) => next - 1,
        };
        Point::new(row, byte - self.line_starts[row])
    }

    /// Replace `start_byte..old_end_byte` with `new_text`.
    ///
    /// Returns the edit record to pass to `notify_edit`.
    pub fn edit(&mut self, start_byte: usize, old_end_byte: usize, new_text: &str) -> Result<TextEdit> {
        if start_byte > old_end_byte
            || old_end_byte > self.text.len()
            || !self.text.is_char_boundary(start_byte)
            || !self.text.is_char_boundary(old_end_byte)
        {
            return Err(Error::InvalidRegionShape(format!(
                "edit {}..{} does not fit a buffer of {} bytes",
                start_byte,
                old_end_byte,
                self.text.len()
            )));
        }

        let start = self.point_of_byte(start_byte);
        let (old_rows, old_end_col) = extent(&self.text[start_byte..old_end_byte]);
        let (new_rows, new_end_col) = extent(new_text);

        self.text.replace_range(start_byte..old_end_byte, new_text);
        self.line_starts = compute_line_starts(&self.text);

        Ok(TextEdit {
            start_row: start.row,
            start_col: start.column,
            start_byte,
            old_rows,
            old_end_col,
            old_len: old_end_byte - start_byte,
            new_rows,
            new_end_col,
            new_len: new_text.len(),
        })
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// Rows spanned and the byte column reached in the last row
fn extent(text: &str) -> (usize, usize) {
    let rows = text.matches('\n').count();
    let col = match text.rfind('\n') {
        Some(i) => text.len() - i - 1,
        None => text.len(),
    };
    (rows, col)
}

/// One atomic text mutation: where it starts, what was deleted, what was inserted.
///
/// Extents follow the usual convention: `*_rows` is the number of line breaks
/// spanned, `*_end_col` is the column count when no line break is spanned and
/// the column in the last line otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub start_row: usize,
    pub start_col: usize,
    pub start_byte: usize,
    pub old_rows: usize,
    pub old_end_col: usize,
    pub old_len: usize,
    pub new_rows: usize,
    pub new_end_col: usize,
    pub new_len: usize,
}

impl TextEdit {
    pub fn start_point(&self) -> Point {
        Point::new(self.start_row, self.start_col)
    }

    pub fn old_end_point(&self) -> Point {
        self.end_point(self.old_rows, self.old_end_col)
    }

    pub fn new_end_point(&self) -> Point {
        self.end_point(self.new_rows, self.new_end_col)
    }

    fn end_point(&self, rows: usize, col: usize) -> Point {
        if rows == 0 {
            Point::new(self.start_row, self.start_col + col)
        } else {
            Point::new(self.start_row + rows, col)
        }
    }

    /// The span of text after the edit: start through the end of the insertion
    pub fn inserted_range(&self) -> crate::Range {
        let end = self.new_end_point();
        crate::Range::new(
            self.start_row,
            self.start_col,
            self.start_byte,
            end.row,
            end.column,
            self.start_byte + self.new_len,
        )
    }

    pub fn to_input_edit(&self) -> InputEdit {
        InputEdit {
            start_byte: self.start_byte,
            old_end_byte: self.start_byte + self.old_len,
            new_end_byte: self.start_byte + self.new_len,
            start_position: self.start_point(),
            old_end_position: self.old_end_point(),
            new_end_position: self.new_end_point(),
        }
    }
}
