use sourcemap_verify::{GeneratedPosition, MapDocument, SegmentIndex, SourceView};

fn minified_doc() -> MapDocument {
    // function add(a,b){return a+b}add(1,2);
    let input: &[_] = br#"{
        "version": 3,
        "sources": ["add.js", "add.js"],
        "names": ["add", "a", "b"],
        "mappings": "AAAA,SAASA,IAAIC,EAAGC,GACd,OAAOD,EAAIC,ECDJF,IDGL"
    }"#;
    MapDocument::from_slice(input).unwrap()
}

#[test]
fn test_forward_and_reverse_agree() {
    let doc = minified_doc();
    let index = SegmentIndex::build(&doc);

    for token in doc.tokens() {
        let pos = match index.original_position_for(token.get_dst_line(), token.get_dst_col()) {
            Some(pos) => pos,
            None => continue,
        };
        let back = index.all_generated_positions_for(&pos.source, pos.line, pos.column);
        assert!(back.contains(&GeneratedPosition {
            line: token.get_dst_line(),
            column: token.get_dst_col(),
        }));
    }
}

#[test]
fn test_reverse_lookup_covers_duplicate_sources() {
    let doc = minified_doc();
    let index = SegmentIndex::build(&doc);

    // `add` is referenced from both copies of the source
    let positions = index.all_generated_positions_for("add.js", 0, 9);
    assert_eq!(
        positions,
        vec![
            GeneratedPosition { line: 0, column: 9 },
            GeneratedPosition { line: 0, column: 29 },
        ]
    );
    assert_eq!(index.generated_positions_for_id(0, 0, 9).len(), 1);
    assert_eq!(index.generated_positions_for_id(1, 0, 9).len(), 1);
    assert!(index.all_generated_positions_for("other.js", 0, 9).is_empty());
}

#[test]
fn test_identifiers_at_generated_positions() {
    let code = "function add(a,b){return a+b}add(1,2);";
    let doc = minified_doc();
    let index = SegmentIndex::build(&doc);
    let view = SourceView::new(code);

    for pos in index.all_generated_positions_for("add.js", 0, 9) {
        assert_eq!(view.get_identifier_at(pos.line, pos.column), Some("add"));
    }
    assert_eq!(view.get_identifier_at(0, 13), Some("a"));
    assert_eq!(view.get_identifier_at(0, 14), None);
}

#[test]
fn test_find_all_counts_utf16_columns() {
    let view = SourceView::new("let s = \"\u{1F600}\"; f(\"x0\");\r\nf(\"x0\") // x01\n");
    assert_eq!(view.find_all("\"x0\""), vec![(0, 16), (1, 2)]);
    assert_eq!(view.find_all("x0"), vec![(0, 17), (1, 3)]);
    assert_eq!(view.line_count(), 3);
    assert_eq!(view.get_line(1), Some("f(\"x0\") // x01"));
    assert!(view.has_text_at(0, 16, "\"x0\""));
    assert_eq!(view.get_line_slice(0, 16, 4), Some("\"x0\""));
}
