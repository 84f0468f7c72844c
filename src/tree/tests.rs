use super::*;
use crate::source::TextBuffer;
use std::cell::{Cell, RefCell};
use tree_sitter::Point;

const TAGGED: &str = "((call_expression function: (identifier) @language arguments: (template_string) @content))";
const TAGGED_COMBINED: &str =
    "((call_expression function: (identifier) @language arguments: (template_string) @content) @combined)";

fn registry() -> Rc<LanguageRegistry> {
    Rc::new(LanguageRegistry::with_builtin())
}

fn create(language: &str, text: &str, options: TreeOptions) -> (SharedSource, LanguageTree) {
    let source = Source::shared(TextBuffer::new(text));
    let tree = LanguageTree::create(Rc::clone(&source), language, registry(), options)
        .expect("Failed to create tree");
    (source, tree)
}

fn javascript(text: &str) -> (SharedSource, LanguageTree) {
    create("javascript", text, TreeOptions::default())
}

/// Range of the nth backtick-delimited template on the first line
fn template(text: &str, nth: usize) -> Range {
    let mut ticks = text.match_indices('`').map(|(i, _)| i);
    let start = ticks.nth(nth * 2).unwrap();
    let end = ticks.next().unwrap() + 1;
    Range::new(0, start, start, 0, end, end)
}

fn line(row: usize, start_byte: usize, len: usize) -> Range {
    Range::new(row, 0, start_byte, row, len, start_byte + len)
}

fn child_languages(tree: &LanguageTree) -> Vec<&str> {
    tree.children().keys().map(String::as_str).collect()
}

#[test]
fn test_injected_block_becomes_child() {
    let text = "const q = python`x = 1`;";
    let (_, mut tree) = javascript(text);
    tree.parse().expect("Failed to parse");

    assert_eq!(child_languages(&tree), vec!["python"]);
    let child = tree.child("python").unwrap();
    assert_eq!(child.included_regions(), &[Region::single(template(text, 0))]);
    assert_eq!(child.trees().count(), 1);
    assert_eq!(child.depth(), 1);
    assert!(tree.is_valid());

    let child = tree.child_mut("python").unwrap();
    assert!(child.parse().is_ok());
}

#[test]
fn test_parse_is_idempotent() {
    let (_, mut tree) = javascript("const q = python`x = 1`;");

    let first: Vec<usize> = {
        let parsed = tree.parse().unwrap();
        assert!(!parsed.changes.is_empty());
        parsed.trees.iter().map(|t| t.root_node().id()).collect()
    };

    let parsed = tree.parse().unwrap();
    assert!(parsed.changes.is_empty());
    let second: Vec<usize> = parsed.trees.iter().map(|t| t.root_node().id()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_one_tree_per_region() {
    let (_, mut root) = javascript("let a = 1;");
    root.parse().unwrap();
    assert!(root.included_regions().is_empty());
    assert_eq!(root.trees().count(), 1);

    let (_, mut tree) = create("python", "x = 1\ny = 2\n", TreeOptions::default());
    tree.set_included_regions(vec![vec![line(0, 0, 5).into()], vec![line(1, 6, 5).into()]])
        .unwrap();
    let parsed = tree.parse().unwrap();
    assert_eq!(parsed.trees.len(), 2);
    assert_eq!(tree.trees().count(), tree.included_regions().len());
}

#[test]
fn test_unchanged_regions_keep_their_trees() {
    let (_, mut tree) = create("python", "x = 1\ny = 2\n", TreeOptions::default());
    let regions = vec![Region::single(line(0, 0, 5)), Region::single(line(1, 6, 5))];
    tree.set_regions(regions.clone()).unwrap();
    tree.parse().unwrap();

    tree.set_regions(regions).unwrap();
    assert!(!tree.is_valid());
    assert_eq!(tree.trees().count(), 2);

    tree.set_regions(vec![Region::single(line(0, 0, 5)), Region::single(line(1, 6, 3))])
        .unwrap();
    assert_eq!(tree.trees().count(), 1);

    tree.set_regions(vec![Region::single(line(0, 0, 5))]).unwrap();
    assert_eq!(tree.trees().count(), 0);
}

#[test]
fn test_point_ranges_resolve_against_buffer() {
    let (_, mut tree) = create("python", "x = 1\ny = 2\n", TreeOptions::default());
    tree.set_included_regions(vec![vec![RegionRange::Points {
        start: Point::new(1, 0),
        end: Point::new(1, 5),
    }]])
    .unwrap();

    let range = tree.included_regions()[0].ranges()[0];
    assert_eq!((range.start_byte, range.end_byte), (6, 11));
}

#[test]
fn test_string_source_rejects_point_ranges() {
    let source = Source::shared("x = 1\ny = 2\n");
    let mut tree = LanguageTree::create(source, "python", registry(), TreeOptions::default()).unwrap();
    tree.set_included_regions(vec![vec![line(0, 0, 5).into()]]).unwrap();

    let err = tree
        .set_included_regions(vec![vec![RegionRange::Points {
            start: Point::new(1, 0),
            end: Point::new(1, 5),
        }]])
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedSource(_)));
    assert_eq!(tree.included_regions(), &[Region::single(line(0, 0, 5))]);
}

#[test]
fn test_invalid_region_keeps_previous_regions() {
    let (_, mut tree) = create("python", "x = 1\ny = 2\n", TreeOptions::default());
    tree.set_included_regions(vec![vec![line(0, 0, 5).into()]]).unwrap();

    let reversed = Range::new(1, 5, 11, 1, 0, 6);
    let err = tree.set_included_regions(vec![vec![reversed.into()]]).unwrap_err();
    assert!(matches!(err, Error::InvalidRegionShape(_)));
    assert!(tree.set_included_regions(vec![vec![]]).is_err());
    assert_eq!(tree.included_regions(), &[Region::single(line(0, 0, 5))]);
}

#[test]
fn test_edit_invalidates_and_reports_edited_span() {
    let (source, mut tree) = javascript("const a = 1;\nconst q = python`x = 1`;");
    tree.parse().unwrap();

    let edit = source.borrow_mut().edit(10, 11, "42").unwrap();
    tree.notify_edit(&edit);
    assert!(!tree.is_valid());
    assert!(!tree.child("python").unwrap().is_valid());

    let changes = tree.parse().unwrap().changes;
    assert!(changes.contains(&edit.inserted_range()));
    assert!(tree.is_valid());
    assert!(tree.child("python").is_some());
}

#[test]
fn test_earlier_edits_follow_later_ones() {
    let (source, mut tree) = create("python", "a = 1\n", TreeOptions::default());
    tree.parse().unwrap();

    let first = source.borrow_mut().edit(4, 5, "2").unwrap();
    tree.notify_edit(&first);
    let second = source.borrow_mut().edit(0, 0, "b=0\n").unwrap();
    tree.notify_edit(&second);

    assert_eq!(source.borrow().text(), "b=0\na = 2\n");
    let changes = tree.parse().unwrap().changes;

    // The first edit's "2" now sits at byte 8, row 1
    assert!(changes.contains(&Range::new(1, 4, 8, 1, 5, 9)));
    assert!(changes.contains(&second.inserted_range()));
    for edited in [8, 0, 3] {
        assert!(
            changes.iter().any(|c| c.start_byte <= edited && edited < c.end_byte),
            "edited byte {} missing from {:?}",
            edited,
            changes
        );
    }
}

#[test]
fn test_deleting_block_removes_child() {
    let text = "const q = python`x = 1`;";
    let (source, mut tree) = javascript(text);
    tree.parse().unwrap();

    let removed = Rc::new(RefCell::new(Vec::new()));
    {
        let removed = Rc::clone(&removed);
        tree.register_observers(
            Observers::new().on_child_removed(move |child| {
                removed.borrow_mut().push(child.language().to_string());
            }),
            false,
        );
    }

    let block = template(text, 0);
    let start = text.find("python").unwrap();
    let edit = source.borrow_mut().edit(start, block.end_byte, "1").unwrap();
    tree.notify_edit(&edit);
    tree.parse().unwrap();

    assert_eq!(source.borrow().text(), "const q = 1;");
    assert!(tree.children().is_empty());
    assert_eq!(*removed.borrow(), vec!["python".to_string()]);
}

#[test]
fn test_children_match_injected_languages() {
    let text = "const a = python`x = 1`;\nconst b = go`x`;\n";
    let (source, mut tree) = javascript(text);
    tree.parse().unwrap();
    assert_eq!(child_languages(&tree), vec!["go", "python"]);

    let start = text.find("\nconst b").unwrap();
    let edit = source.borrow_mut().edit(start, text.len(), "\n").unwrap();
    tree.notify_edit(&edit);
    tree.parse().unwrap();
    assert_eq!(child_languages(&tree), vec!["python"]);
}

#[test]
fn test_combined_pattern_yields_one_region() {
    let text = "python`a = 1`; python`b = 2`;";
    let options = TreeOptions::new().with_injection_query("javascript", TAGGED_COMBINED);
    let (_, mut tree) = create("javascript", text, options);
    tree.parse().unwrap();

    let child = tree.child("python").unwrap();
    assert_eq!(child.included_regions().len(), 1);
    assert_eq!(
        child.included_regions()[0].ranges(),
        &[template(text, 0), template(text, 1)]
    );
    assert_eq!(child.trees().count(), 1);
}

#[test]
fn test_nested_combined_content_keeps_child() {
    let text = "python`a = 1`; python`b ${python`c`} d`;";
    let options = TreeOptions::new().with_injection_query("javascript", TAGGED_COMBINED);
    let (_, mut tree) = create("javascript", text, options);
    tree.parse().unwrap();

    assert_eq!(child_languages(&tree), vec!["python"]);
    let child = tree.child("python").unwrap();
    assert_eq!(child.included_regions().len(), 1);
    assert_eq!(child.included_regions()[0].len(), 2);
    assert_eq!(child.trees().count(), 1);
}

#[test]
fn test_uncombined_pattern_yields_region_per_node() {
    let text = "python`a = 1`; python`b = 2`;";
    let options = TreeOptions::new().with_injection_query("javascript", TAGGED);
    let (_, mut tree) = create("javascript", text, options);
    tree.parse().unwrap();

    let child = tree.child("python").unwrap();
    assert_eq!(child.included_regions().len(), 2);
    assert_eq!(child.trees().count(), 2);
}

#[test]
fn test_unknown_injected_language_is_skipped() {
    let options = TreeOptions::new().with_injection_query("javascript", TAGGED);
    let (_, mut tree) = create("javascript", "sql`select 1`; python`x = 1`;", options);
    tree.parse().expect("unknown injections must not fail the parse");

    assert_eq!(child_languages(&tree), vec!["python"]);
}

#[test]
fn test_language_for_range() {
    let text = "const q = python`x = 1`;";
    let (_, mut tree) = javascript(text);
    tree.parse().unwrap();

    let x = text.find("x = 1").unwrap();
    let inside = Range::new(0, x, x, 0, x + 1, x + 1);
    let outside = Range::new(0, 0, 0, 0, 5, 5);

    assert_eq!(tree.language_for_range(&inside).language(), "python");
    assert_eq!(tree.language_for_range(&outside).language(), "javascript");
    assert!(tree.contains(&outside));
    assert!(!tree.child("python").unwrap().contains(&outside));

    let python_root = tree.child("python").unwrap().trees().next().unwrap().root_node().id();
    let found = tree.tree_for_range(&inside).unwrap().root_node().id();
    assert_eq!(found, python_root);
    assert!(tree.named_node_for_range(&outside).is_some());
}

#[test]
fn test_edit_shifts_every_tree_before_observers() {
    let (source, mut tree) = javascript("const q = python`x = 1`;");
    tree.parse().unwrap();

    let root_end = tree.trees().next().unwrap().root_node().end_byte();
    let child_end = tree.child("python").unwrap().trees().next().unwrap().root_node().end_byte();

    let seen = Rc::new(Cell::new(None));
    {
        let seen = Rc::clone(&seen);
        tree.register_observers(
            Observers::new().on_bytes(move |_, node| {
                let root = node.trees().next().map(|t| t.root_node().end_byte());
                let child = node
                    .child("python")
                    .and_then(|c| c.trees().next())
                    .map(|t| t.root_node().end_byte());
                seen.set(Some((root, child)));
            }),
            false,
        );
    }

    let edit = source.borrow_mut().edit(0, 0, "let a;\n").unwrap();
    tree.notify_edit(&edit);

    assert_eq!(seen.get(), Some((Some(root_end + 7), Some(child_end + 7))));
}

#[test]
fn test_recursive_observers_reach_new_children() {
    let (_, mut tree) = javascript("const q = python`x = 1`;");

    let reparsed = Rc::new(Cell::new(0));
    let added = Rc::new(RefCell::new(Vec::new()));
    {
        let reparsed = Rc::clone(&reparsed);
        let added = Rc::clone(&added);
        tree.register_observers(
            Observers::new()
                .on_tree_changed(move |_, _| reparsed.set(reparsed.get() + 1))
                .on_child_added(move |child| added.borrow_mut().push(child.language().to_string())),
            true,
        );
    }
    tree.parse().unwrap();

    // javascript root + python child
    assert_eq!(reparsed.get(), 2);
    assert_eq!(*added.borrow(), vec!["python".to_string()]);
}

#[test]
fn test_manual_child_lifecycle() {
    let (_, mut tree) = javascript("let a = 1;");

    let child = tree.add_child("py").unwrap();
    assert_eq!(child.language(), "python");
    assert!(matches!(tree.add_child("cobol"), Err(Error::UnknownLanguage(_))));
    assert_eq!(child_languages(&tree), vec!["python"]);

    assert!(tree.remove_child("python"));
    assert!(!tree.remove_child("python"));
    assert!(tree.children().is_empty());
}

#[test]
fn test_destroy_tears_down_subtree() {
    let (_, mut tree) = javascript("const a = python`x = 1`;\nconst b = go`x`;\n");
    tree.parse().unwrap();

    let removed = Rc::new(Cell::new(0));
    {
        let removed = Rc::clone(&removed);
        tree.register_observers(
            Observers::new().on_child_removed(move |_| removed.set(removed.get() + 1)),
            false,
        );
    }
    tree.destroy();

    assert_eq!(removed.get(), 2);
    assert!(tree.children().is_empty());
}

#[test]
fn test_malformed_override_fails_create() {
    let source = Source::shared(TextBuffer::new("let a = 1;"));
    let options = TreeOptions::new().with_injection_query("javascript", "((oops");
    let err = LanguageTree::create(source, "javascript", registry(), options).unwrap_err();
    assert!(matches!(err, Error::MalformedQuery { .. }));
}

#[test]
fn test_malformed_default_query_disables_injections() {
    let mut registry = LanguageRegistry::new();
    registry.register(
        Grammar::new("javascript", tree_sitter_javascript::LANGUAGE.into()).with_injections("((oops"),
    );
    registry.register(Grammar::new("python", tree_sitter_python::LANGUAGE.into()));

    let source = Source::shared(TextBuffer::new("const q = python`x = 1`;"));
    let mut tree =
        LanguageTree::create(source, "javascript", Rc::new(registry), TreeOptions::default()).unwrap();
    assert!(!tree.has_injection_query());

    tree.parse().unwrap();
    assert_eq!(tree.trees().count(), 1);
    assert!(tree.children().is_empty());
}

#[test]
fn test_empty_override_disables_injections() {
    let options = TreeOptions::new().with_injection_query("javascript", "");
    let (_, mut tree) = create("javascript", "const q = python`x = 1`;", options);
    tree.parse().unwrap();
    assert!(tree.children().is_empty());
}

#[test]
fn test_override_keyed_by_alias() {
    let options = TreeOptions::new().with_injection_query("js", "");
    let (_, mut tree) = create("javascript", "const q = python`x = 1`;", options);
    assert!(!tree.has_injection_query());
    tree.parse().unwrap();
    assert!(tree.children().is_empty());

    let options = TreeOptions::new().with_injection_query("js", TAGGED_COMBINED);
    let (_, mut tree) = create("javascript", "python`a`; python`b`;", options);
    tree.parse().unwrap();
    assert_eq!(tree.child("python").unwrap().included_regions().len(), 1);
}

#[test]
fn test_walk_children_and_trees() {
    let (_, mut tree) = javascript("const q = python`x = 1`;");
    tree.parse().unwrap();

    let mut with_self = Vec::new();
    tree.for_each_child(|node| with_self.push(node.language().to_string()), true);
    assert_eq!(with_self, vec!["javascript", "python"]);

    let mut without_self = Vec::new();
    tree.for_each_child(|node| without_self.push(node.language().to_string()), false);
    assert_eq!(without_self, vec!["python"]);

    let mut trees = 0;
    tree.for_each_tree(|_, _| trees += 1);
    assert_eq!(trees, 2);
}

#[test]
fn test_invalidate_is_recursive() {
    let (_, mut tree) = javascript("const q = python`x = 1`;");
    tree.parse().unwrap();

    tree.child_mut("python").unwrap().invalidate();
    assert!(!tree.is_valid());
    tree.parse().unwrap();
    assert!(tree.is_valid());

    tree.invalidate();
    assert!(!tree.child("python").unwrap().is_valid());
    tree.parse().unwrap();
    assert!(tree.is_valid());
}

#[test]
fn test_rust_macro_injection() {
    let text = "fn main() {\n    javascript! { let a = 1; }\n}\n";
    let (_, mut tree) = create("rust", text, TreeOptions::default());
    tree.parse().unwrap();

    let child = tree.child("javascript").expect("javascript child");
    let start = text.find("{ let").unwrap();
    let range = child.included_regions()[0].ranges()[0];
    assert_eq!(range.start_byte, start);
    assert_eq!(range.end_byte, start + "{ let a = 1; }".len());
    assert_eq!(range.start_row, 1);
}
