use std::path::{Path, PathBuf};

use sourcemap_verify::{
    is_sourcemap_slice, locate_sourcemap_reference, locate_sourcemap_reference_slice,
    SourceMapRef,
};

#[test]
fn test_basic_locate() {
    let input: &[_] = b"foo();\nbar();\n//# sourceMappingURL=foo.js";
    assert_eq!(
        locate_sourcemap_reference(input).unwrap(),
        SourceMapRef::Ref("foo.js".into())
    );
    assert_eq!(
        locate_sourcemap_reference(input).unwrap().get_url(),
        Some("foo.js")
    );
}

#[test]
fn test_legacy_locate() {
    let input: &[_] = b"foo();\nbar();\n//@ sourceMappingURL=foo.js";
    assert_eq!(
        locate_sourcemap_reference(input).unwrap(),
        SourceMapRef::LegacyRef("foo.js".into())
    );
    assert_eq!(
        locate_sourcemap_reference(input).unwrap().get_url(),
        Some("foo.js")
    );
}

#[test]
fn test_css_locate() {
    let input: &[_] = b"a { color: red }\n/*# sourceMappingURL=out.css.map */\n";
    assert_eq!(
        locate_sourcemap_reference_slice(input).unwrap(),
        SourceMapRef::Ref("out.css.map".into())
    );
}

#[test]
fn test_last_reference_wins() {
    let input: &[_] = b"//# sourceMappingURL=first.js.map\r\nfoo();\r\n//# sourceMappingURL=second.js.map\r\n";
    let reference = locate_sourcemap_reference_slice(input).unwrap();
    assert_eq!(reference.get_url(), Some("second.js.map"));
    assert!(!reference.is_embedded());
    assert_eq!(
        reference.resolve_path("/w/out/a.js"),
        Some(PathBuf::from("/w/out/second.js.map"))
    );
}

#[test]
fn test_embedded_reference() {
    let input: &[_] = b"foo();\n//# sourceMappingURL=data:application/json;base64,\
        eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbImEuanMiXSwibmFtZXMiOltdLCJtYXBwaW5ncyI6IkFBQUEifQ==\n";
    let reference = locate_sourcemap_reference_slice(input).unwrap();
    assert!(reference.is_embedded());
    assert_eq!(reference.resolve_path(Path::new("/w/out/a.js")), None);
    let doc = reference.get_embedded_sourcemap().unwrap().unwrap();
    assert_eq!(doc.get_source(0), Some("a.js"));
}

#[test]
fn test_no_ref() {
    let input: &[_] = b"foo();\nbar();\n// whatever";
    assert_eq!(
        locate_sourcemap_reference(input).unwrap(),
        SourceMapRef::Missing
    );
    assert_eq!(SourceMapRef::Missing.get_embedded_sourcemap().unwrap(), None);
}

#[test]
fn test_detect_basic_sourcemap() {
    let input: &[_] = b"{
        \"version\":3,
        \"sources\":[\"coolstuff.js\"],
        \"names\":[\"x\",\"alert\"],
        \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    }";
    assert!(is_sourcemap_slice(input));
}

#[test]
fn test_detect_bad_sourcemap() {
    let input: &[_] = b"{
        \"sources\":[\"coolstuff.js\"],
        \"names\":[\"x\",\"alert\"]
    }";
    assert!(!is_sourcemap_slice(input));
}

#[test]
fn test_detect_basic_sourcemap_with_junk_header() {
    let input: &[_] = b")]}garbage\n
    {
        \"version\":3,
        \"sources\":[\"coolstuff.js\"],
        \"names\":[\"x\",\"alert\"],
        \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    }";
    assert!(is_sourcemap_slice(input));
}
