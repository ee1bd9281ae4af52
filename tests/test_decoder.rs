use sourcemap_verify::{decode_data_url, decode_data_url_payload, DataUrlEncoding, Error, ErrorCategory, MapDocument};

#[test]
fn test_basic_sourcemap() {
    let input: &[_] = b"{
        \"version\":3,
        \"sources\":[\"coolstuff.js\"],
        \"names\":[\"x\",\"alert\"],
        \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    }";
    let doc = MapDocument::from_reader(input).unwrap();
    let mut iter = doc.tokens().filter(|t| t.has_name());
    assert_eq!(iter.next().unwrap().to_tuple(), ("coolstuff.js", 0, 4, Some("x")));
    assert_eq!(iter.next().unwrap().to_tuple(), ("coolstuff.js", 1, 4, Some("x")));
    assert_eq!(iter.next().unwrap().to_tuple(), ("coolstuff.js", 2, 2, Some("alert")));
    assert!(iter.next().is_none());
}

#[test]
fn test_basic_sourcemap_with_root() {
    let input: &[_] = b"{
        \"version\":3,
        \"sources\":[\"coolstuff.js\"],
        \"sourceRoot\":\"x\",
        \"names\":[\"x\",\"alert\"],
        \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    }";
    let doc = MapDocument::from_reader(input).unwrap();
    let mut iter = doc.tokens().filter(|t| t.has_name());
    assert_eq!(doc.get_version(), 3);
    assert_eq!(iter.next().unwrap().to_tuple(), ("x/coolstuff.js", 0, 4, Some("x")));
    assert_eq!(iter.next().unwrap().to_tuple(), ("x/coolstuff.js", 1, 4, Some("x")));
    assert_eq!(iter.next().unwrap().to_tuple(), ("x/coolstuff.js", 2, 2, Some("alert")));
    assert!(iter.next().is_none());
}

#[test]
fn test_junk_header_is_skipped() {
    let input: &[_] = b")]}'\n{\"version\":3,\"sources\":[\"a.js\"],\"names\":[],\"mappings\":\"AAAA\"}";
    let doc = MapDocument::from_slice(input).unwrap();
    assert_eq!(doc.get_token_count(), 1);
}

#[test]
fn test_partial_segments_and_empty_lines() {
    let input: &[_] = br#"{
        "version": 3,
        "sources": ["a.js"],
        "names": [],
        "mappings": "AAAA,E;;AACA"
    }"#;
    let doc = MapDocument::from_slice(input).unwrap();
    assert_eq!(doc.get_token_count(), 3);
    assert_eq!(doc.get_line_count(), 3);
    assert!(doc.get_token(1).unwrap().get_raw_token().is_partial());
    assert_eq!(doc.line_tokens(1).len(), 0);
    assert_eq!(doc.lookup_original(0, 3), None);
    let pos = doc.lookup_original(2, 0).unwrap();
    assert_eq!((pos.line, pos.column), (1, 0));
}

#[test]
fn test_null_sources_and_numeric_names() {
    let input: &[_] = br#"{
        "version": 3,
        "sources": [null, "b.js"],
        "names": [42],
        "mappings": "AAAAA"
    }"#;
    let doc = MapDocument::from_slice(input).unwrap();
    assert_eq!(doc.get_source(0), Some(""));
    assert_eq!(doc.get_name(0), Some("42"));
}

#[test]
fn test_rejects_malformed_documents() {
    let bad_version: &[_] = br#"{"version":2,"sources":[],"names":[],"mappings":""}"#;
    match MapDocument::from_slice(bad_version) {
        Err(Error::UnsupportedVersion(Some(2))) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    let bad_source: &[_] = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"ACAA"}"#;
    match MapDocument::from_slice(bad_source) {
        Err(Error::BadSourceReference(1)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    let bad_name: &[_] = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAAA"}"#;
    match MapDocument::from_slice(bad_name) {
        Err(Error::BadNameReference(0)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    let bad_size: &[_] = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAA"}"#;
    match MapDocument::from_slice(bad_size) {
        Err(Error::BadSegmentSize(3)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    // the second column is 1 - 3
    let negative: &[_] = br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"CAAA,HAAA"}"#;
    match MapDocument::from_slice(negative) {
        Err(ref err @ Error::BadPosition(-2)) => {
            assert_eq!(err.category(), ErrorCategory::Format);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let negative_source_line: &[_] =
        br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA;AADA"}"#;
    match MapDocument::from_slice(negative_source_line) {
        Err(Error::BadPosition(-1)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    let bad_contents: &[_] =
        br#"{"version":3,"sources":["a.js","b.js"],"sourcesContent":["x"],"names":[],"mappings":""}"#;
    match MapDocument::from_slice(bad_contents) {
        Err(Error::SourcesContentMismatch {
            sources: 2,
            contents: 1,
        }) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_decode_data_url() {
    let url = "data:application/json;base64,\
               eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbImEuanMiXSwibmFtZXMiOltdLCJtYXBwaW5ncyI6IkFBQUEifQ==";
    let doc = decode_data_url(url).unwrap();
    assert_eq!(doc.get_source(0), Some("a.js"));
    assert_eq!(doc.get_token_count(), 1);

    let url = "data:application/json;charset=utf-8;base64,\
               eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbImEuanMiXSwibmFtZXMiOltdLCJtYXBwaW5ncyI6IkFBQUEifQ==";
    assert_eq!(decode_data_url_payload(url).unwrap().0, DataUrlEncoding::Base64);
}

#[test]
fn test_decode_percent_data_url() {
    let url = "data:application/json,%7B%22version%22%3A3%2C%22sources%22%3A%5B%22a.js%22%5D\
               %2C%22names%22%3A%5B%5D%2C%22mappings%22%3A%22AAAA%22%7D";
    let (encoding, data) = decode_data_url_payload(url).unwrap();
    assert_eq!(encoding, DataUrlEncoding::Percent);
    assert_eq!(
        &data[..],
        &br#"{"version":3,"sources":["a.js"],"names":[],"mappings":"AAAA"}"#[..]
    );
    assert_eq!(decode_data_url(url).unwrap().get_source(0), Some("a.js"));
}

#[test]
fn test_bad_data_urls() {
    match decode_data_url("data:application/json;base64,e30=!") {
        Err(Error::InvalidBase64) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    match decode_data_url("data:application/json,%7B%2") {
        Err(Error::InvalidPercentEncoding(_)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    match decode_data_url("data:text/plain;base64,e30=") {
        Err(Error::InvalidDataUrl) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    match decode_data_url("foo.js.map") {
        Err(Error::InvalidDataUrl) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}
