//! Edit propagation
//!
//! An edit shifts every live tree in the subtree before any byte-edit
//! observer runs, so observers always see positions that match the new text.

use super::LanguageTree;
use crate::range::Range;
use crate::source::TextEdit;
use tree_sitter::{InputEdit, Point};

impl LanguageTree {
    /// Report one atomic text mutation to this node and all descendants.
    ///
    /// Call once per edit, after the source text has been changed.
    pub fn notify_edit(&mut self, edit: &TextEdit) {
        let input = edit.to_input_edit();
        self.shift_trees(&input, edit.inserted_range());
        self.fire_bytes(edit);
    }

    fn shift_trees(&mut self, input: &InputEdit, span: Range) {
        self.valid = false;
        for tree in self.trees.iter_mut().flatten() {
            tree.edit(input);
        }
        for pending in &mut self.pending {
            *pending = shift_span(pending, input);
        }
        self.pending.push(span);
        for child in self.children.values_mut() {
            child.shift_trees(input, span);
        }
    }

    fn fire_bytes(&self, edit: &TextEdit) {
        for handler in &self.observers.bytes {
            handler(edit, self);
        }
        for child in self.children.values() {
            child.fire_bytes(edit);
        }
    }
}

/// Move an earlier edited span through a later edit.
///
/// Endpoints inside the replaced text are clipped to the edit: a start moves
/// to the edit start and an end moves to the end of the inserted text.
fn shift_span(span: &Range, edit: &InputEdit) -> Range {
    let (start_byte, start) = shift_position(span.start_byte, span.start_point(), edit, false);
    let (end_byte, end) = shift_position(span.end_byte, span.end_point(), edit, true);
    Range::new(start.row, start.column, start_byte, end.row, end.column, end_byte)
}

fn shift_position(byte: usize, point: Point, edit: &InputEdit, is_end: bool) -> (usize, Point) {
    if byte <= edit.start_byte {
        return (byte, point);
    }
    if byte < edit.old_end_byte {
        return if is_end {
            (edit.new_end_byte, edit.new_end_position)
        } else {
            (edit.start_byte, edit.start_position)
        };
    }

    let old_end = edit.old_end_position;
    let new_end = edit.new_end_position;
    let point = if point.row == old_end.row {
        Point::new(new_end.row, point.column - old_end.column + new_end.column)
    } else {
        Point::new(point.row - old_end.row + new_end.row, point.column)
    };
    (byte - edit.old_end_byte + edit.new_end_byte, point)
}
