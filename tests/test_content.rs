use std::fs;
use std::path::Path;

use sourcemap_verify::{ContentOrigin, ContentResolver, Error, MapDocumentBuilder};

#[test]
fn test_resolution_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/a.js"), "let a = 1;\n").unwrap();
    fs::write(dir.path().join("src/inline.js"), "on disk\n").unwrap();

    let mut builder = MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some("../src/a.js"), None);
    builder.add(1, 0, 0, 0, Some("missing.js"), None);
    let inline = builder.add(2, 0, 0, 0, Some("../src/inline.js"), None);
    builder.set_source_contents(inline.src_id, Some("embedded\n"));
    builder.set_base_dir(Some(dir.path().join("out")));
    let doc = builder.into_document();

    let mut resolver = ContentResolver::new();
    let (text, origin) = resolver.resolve(&doc, 0).unwrap();
    assert_eq!(text, "let a = 1;\n");
    assert_eq!(origin, ContentOrigin::File);

    let (text, origin) = resolver.resolve(&doc, 2).unwrap();
    assert_eq!(text, "embedded\n");
    assert_eq!(origin, ContentOrigin::Embedded);

    match resolver.content_for(&doc, 1) {
        Err(ref err @ Error::MissingContent(_)) => {
            assert_eq!(err.to_string(), "cannot resolve contents of missing.js");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    match resolver.content_for(&doc, 7) {
        Err(Error::BadSourceReference(7)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_backfill_is_keyed_by_resolved_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let mut builder = MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some("../src/gone.js"), None);
    builder.set_base_dir(Some(out.clone()));
    let doc = builder.into_document();

    let mut resolver = ContentResolver::new();
    assert!(resolver.content_for(&doc, 0).is_err());

    // recorded by a layer living in another directory
    resolver.record_backfill(Some(&dir.path().join("mid")), "../src/gone.js", "first\n");
    resolver.record_backfill(Some(dir.path()), "src/gone.js", "second\n");
    assert_eq!(resolver.backfill_count(), 1);
    assert_eq!(
        resolver.get_backfill(Some(&out), "../src/gone.js"),
        Some("first\n")
    );

    let (text, origin) = resolver.resolve(&doc, 0).unwrap();
    assert_eq!(text, "first\n");
    assert_eq!(origin, ContentOrigin::Backfill);
}

#[test]
fn test_virtual_sources_use_their_name() {
    let mut resolver = ContentResolver::new();
    resolver.record_backfill(None, "<stdin>", "input\n");
    assert_eq!(resolver.get_backfill(Some(Path::new("/anywhere")), "<stdin>"), None);
    assert_eq!(resolver.get_backfill(None, "<stdin>"), Some("input\n"));
}
