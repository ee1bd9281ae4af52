use std::fs;
use std::path::{Path, PathBuf};

use sourcemap_verify::{
    compose, resolve_layered, Composer, ContentOrigin, Error, ErrorCategory, GeneratedArtifact,
    MapDocument, MapDocumentBuilder, Result, TrackedArtifacts,
};

const ORIGINAL: &str = "let c = 1;\nconsole.log(\"a\" + \"b\" + c);\n";
const TRANSPILED: &str = "var c = 1;\nconsole.log(\"a\" + \"b\" + c);\n";
const MINIFIED: &str = "var c=1;console.log(\"ab\"+c);\n";

fn write_artifact(path: &Path, code: &str, doc: &MapDocument) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let map_name = format!("{}.map", path.file_name().unwrap().to_string_lossy());
    fs::write(path.with_file_name(&map_name), doc.to_json_string().unwrap()).unwrap();
    fs::write(path, format!("{}//# sourceMappingURL={}\n", code, map_name)).unwrap();
}

/// src/a.js -> mid/a.js (transpiled) -> out/a.js (minified)
fn two_pass_build(root: &Path) -> (PathBuf, PathBuf) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/a.js"), ORIGINAL).unwrap();

    let mut builder = MapDocumentBuilder::new(Some("a.js"));
    builder.add(0, 0, 0, 0, Some("../src/a.js"), None);
    builder.add(0, 4, 0, 4, Some("../src/a.js"), Some("c"));
    builder.add(1, 0, 1, 0, Some("../src/a.js"), None);
    builder.add(1, 12, 1, 12, Some("../src/a.js"), None);
    let raw = builder.add(1, 24, 1, 24, Some("../src/a.js"), Some("c"));
    builder.set_source_contents(raw.src_id, Some(ORIGINAL));
    let mid = root.join("mid/a.js");
    write_artifact(&mid, TRANSPILED, &builder.into_document());

    let mut builder = MapDocumentBuilder::new(Some("a.js"));
    builder.add(0, 0, 0, 0, Some("../mid/a.js"), None);
    builder.add(0, 4, 0, 4, Some("../mid/a.js"), None);
    builder.add(0, 8, 1, 0, Some("../mid/a.js"), None);
    builder.add(0, 20, 1, 12, Some("../mid/a.js"), None);
    builder.add(0, 25, 1, 24, Some("../mid/a.js"), Some("x"));
    let out = root.join("out/a.js");
    write_artifact(&out, MINIFIED, &builder.into_document());

    (mid, out)
}

#[test]
fn test_compose_through_minifier() {
    let dir = tempfile::tempdir().unwrap();
    let (mid, out) = two_pass_build(dir.path());
    let artifact = GeneratedArtifact::load(&out).unwrap();
    assert_eq!(artifact.code(), MINIFIED);

    let mut tracked = TrackedArtifacts::new();
    tracked.track(&mid);
    let mut composer = Composer::new(tracked);
    let composed = composer
        .compose_artifact(artifact.document(), artifact.path())
        .unwrap();

    assert_eq!(composed.sources().collect::<Vec<_>>(), vec!["../src/a.js"]);
    let folded = composed.lookup_original(0, 20).unwrap();
    assert_eq!(folded.to_string(), "../src/a.js:1:12");
    // the inner layer knows the real name
    let c = composed.lookup_original(0, 25).unwrap();
    assert_eq!((c.line, c.column, c.name.as_deref()), (1, 24, Some("c")));

    let src_id = composed.get_source_id("../src/a.js").unwrap();
    let (text, origin) = composer.contents().resolve(&composed, src_id).unwrap();
    assert_eq!(text, ORIGINAL);
    assert_eq!(origin, ContentOrigin::Embedded);

    let outer = artifact.document();
    for token in outer.tokens() {
        let (line, col) = token.get_dst();
        assert_eq!(
            resolve_layered(outer, composer.resolver(), line, col).unwrap(),
            composed.lookup_original(line, col)
        );
    }
}

#[test]
fn test_untracked_sources_pass_through() {
    let dir = tempfile::tempdir().unwrap();
    let (_, out) = two_pass_build(dir.path());
    let artifact = GeneratedArtifact::load(&out).unwrap();

    let composed = compose(artifact.document(), TrackedArtifacts::new()).unwrap();
    assert_eq!(composed.sources().collect::<Vec<_>>(), vec!["../mid/a.js"]);
    assert_eq!(
        composed.lookup_original(0, 25).unwrap().name.as_deref(),
        Some("x")
    );
}

fn layer(source: &str, name: Option<&str>, contents: Option<&str>) -> MapDocument {
    let mut builder = MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some(source), None);
    let raw = builder.add(0, 5, 0, 10, Some(source), name);
    builder.add_partial(0, 20);
    if let Some(contents) = contents {
        builder.set_source_contents(raw.src_id, Some(contents));
    }
    builder.into_document()
}

#[test]
fn test_three_layers_are_associative() {
    let a = layer("b.js", Some("outer"), None);
    let b = layer("c.js", None, None);
    let c = {
        let mut builder = MapDocumentBuilder::new(None);
        builder.add(0, 0, 3, 1, Some("orig.js"), None);
        builder.add(0, 10, 7, 2, Some("orig.js"), Some("inner"));
        let src_id = builder.add_source("orig.js");
        builder.set_source_contents(src_id, Some("original text"));
        builder.into_document()
    };

    let resolver = |source: &str, _: Option<&Path>| -> Result<Option<MapDocument>> {
        Ok(match source {
            "b.js" => Some(b.clone()),
            "c.js" => Some(c.clone()),
            _ => None,
        })
    };
    let mut composer = Composer::new(resolver);
    let composed = composer.compose(&a).unwrap();

    let pos = composed.lookup_original(0, 6).unwrap();
    assert_eq!(pos.to_string(), "orig.js:7:2 name=inner");
    assert_eq!(composed.lookup_original(0, 0).unwrap().line, 3);
    assert!(composed.lookup_original(0, 20).is_none());
    assert_eq!(composed.get_source_contents(0), Some("original text"));

    // (A . B) . C and A . (B . C) agree
    let ab = compose(&a, |source: &str, _: Option<&Path>| -> Result<Option<MapDocument>> {
        Ok(if source == "b.js" { Some(b.clone()) } else { None })
    })
    .unwrap();
    let ab_c = compose(&ab, |source: &str, _: Option<&Path>| -> Result<Option<MapDocument>> {
        Ok(if source == "c.js" { Some(c.clone()) } else { None })
    })
    .unwrap();
    for col in 0..25 {
        assert_eq!(ab_c.lookup_original(0, col), composed.lookup_original(0, col));
        assert_eq!(
            resolve_layered(&a, composer.resolver(), 0, col).unwrap(),
            composed.lookup_original(0, col)
        );
    }

    assert_eq!(composer.contents().backfill_count(), 1);
    assert_eq!(
        composer.contents().get_backfill(None, "orig.js"),
        Some("original text")
    );
}

#[test]
fn test_outer_name_survives_nameless_inner() {
    let a = layer("b.js", Some("outer"), None);
    let b = layer("orig.js", None, None);
    let composed = compose(&a, |source: &str, _: Option<&Path>| -> Result<Option<MapDocument>> {
        Ok(if source == "b.js" { Some(b.clone()) } else { None })
    })
    .unwrap();
    let pos = composed.lookup_original(0, 5).unwrap();
    assert_eq!(pos.to_string(), "orig.js:0:10 name=outer");
}

fn self_referencing(source: &str, _: Option<&Path>) -> Result<Option<MapDocument>> {
    Ok(if source == "self.js" {
        Some(layer("self.js", None, None))
    } else {
        None
    })
}

#[test]
fn test_cycles_are_reported() {
    let a = layer("self.js", None, None);
    match compose(&a, self_referencing) {
        Err(err @ Error::Cycle(_)) => assert_eq!(err.category(), ErrorCategory::Cycle),
        other => panic!("unexpected result: {:?}", other),
    }
    let mut resolver = self_referencing;
    match resolve_layered(&a, &mut resolver, 0, 0) {
        Err(Error::Cycle(ref source)) => assert_eq!(source, "self.js"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_broken_chain() {
    let dir = tempfile::tempdir().unwrap();
    let (mid, out) = two_pass_build(dir.path());
    fs::write(mid.with_file_name("a.js.map"), "{\"version\":3,").unwrap();

    let artifact = GeneratedArtifact::load(&out).unwrap();
    let mut tracked = TrackedArtifacts::new();
    tracked.track(&mid);
    match compose(artifact.document(), tracked.clone()) {
        Err(err @ Error::BrokenChain(..)) => {
            assert_eq!(err.category(), ErrorCategory::BrokenChain);
            assert!(std::error::Error::source(&err).is_some());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    match resolve_layered(artifact.document(), &mut tracked, 0, 0) {
        Err(Error::BrokenChain(ref source, _)) => assert_eq!(source, "../mid/a.js"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_tracked_artifact_as_its_own_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/self.js");
    let mut builder = MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some("self.js"), None);
    write_artifact(&path, "x();\n", &builder.into_document());

    let artifact = GeneratedArtifact::load(&path).unwrap();
    let mut tracked = TrackedArtifacts::new();
    tracked.track(&path);
    assert!(tracked.is_tracked(dir.path().join("out/./self.js")));
    match Composer::new(tracked).compose_artifact(artifact.document(), artifact.path()) {
        Err(Error::Cycle(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}
