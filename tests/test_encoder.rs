use sourcemap_verify::{decode_data_url, DataUrlEncoding, MapDocument, MapDocumentBuilder};

#[test]
fn test_basic_sourcemap() {
    let input: &[_] = b"{
        \"version\":3,
        \"sources\":[\"coolstuff.js\"],
        \"names\":[\"x\",\"alert\"],
        \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    }";
    let doc = MapDocument::from_reader(input).unwrap();
    let mut out: Vec<u8> = vec![];
    doc.to_writer(&mut out).unwrap();

    let doc2 = MapDocument::from_reader(&out[..]).unwrap();

    for (tok1, tok2) in doc.tokens().zip(doc2.tokens()) {
        assert_eq!(tok1, tok2);
    }
}

#[test]
fn test_partial_segments_are_kept() {
    let mut builder = MapDocumentBuilder::new(Some("out.js"));
    builder.add(0, 0, 0, 0, Some("a.js"), Some("foo"));
    builder.add_partial(0, 6);
    builder.add(2, 2, 1, 2, Some("a.js"), None);
    let src_id = builder.add_source("a.js");
    builder.set_source_contents(src_id, Some("foo();\n  bar();\n"));
    let doc = builder.into_document();

    let json = doc.to_json_string().unwrap();
    assert!(json.contains(r#""mappings":"AAAAA,M;;EACE""#));
    assert!(json.contains(r#""sourcesContent":["foo();\n  bar();\n"]"#));

    let decoded = MapDocument::from_slice(json.as_bytes()).unwrap();
    assert_eq!(decoded.get_file(), Some("out.js"));
    assert!(decoded.get_token(1).unwrap().get_raw_token().is_partial());
    assert_eq!(decoded.get_source_contents(0), Some("foo();\n  bar();\n"));
}

#[test]
fn test_data_url_embeddings() {
    let mut builder = MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some("dir with space/a.js"), None);
    let src_id = builder.add_source("dir with space/a.js");
    builder.set_source_contents(src_id, Some("let s = \"%\";\n"));
    let doc = builder.into_document();

    for &encoding in &[DataUrlEncoding::Base64, DataUrlEncoding::Percent] {
        let url = doc.to_data_url(encoding).unwrap();
        assert!(!url.contains(' '));
        let decoded = decode_data_url(&url).unwrap();
        assert_eq!(decoded.get_source(0), Some("dir with space/a.js"));
        assert_eq!(decoded.get_source_contents(0), Some("let s = \"%\";\n"));
    }
}
