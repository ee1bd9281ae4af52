use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use crate::decoder::DataUrlEncoding;
use crate::errors::Result;
use crate::jsontypes::RawSourceMap;
use crate::types::MapDocument;
use crate::vlq::encode_vlq;

/// Characters escaped in percent-encoded `data:` payloads.
const DATA_URL_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'\\')
    .add(b'^')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn encode_vlq_diff(out: &mut String, a: u32, b: u32) {
    encode_vlq(out, i64::from(a) - i64::from(b))
}

fn serialize_mappings(doc: &MapDocument) -> String {
    let mut rv = String::new();
    // dst == minified == generated
    let mut prev_dst_line = 0;
    let mut prev_dst_col = 0;
    let mut prev_src_line = 0;
    let mut prev_src_col = 0;
    let mut prev_name_id = 0;
    let mut prev_src_id = 0;
    let mut first_on_line = true;

    for token in doc.tokens() {
        if token.get_dst_line() != prev_dst_line {
            prev_dst_col = 0;
            while token.get_dst_line() != prev_dst_line {
                rv.push(';');
                prev_dst_line += 1;
            }
            first_on_line = true;
        }
        if !first_on_line {
            rv.push(',');
        }
        first_on_line = false;

        encode_vlq_diff(&mut rv, token.get_dst_col(), prev_dst_col);
        prev_dst_col = token.get_dst_col();

        if token.has_source() {
            encode_vlq_diff(&mut rv, token.get_src_id(), prev_src_id);
            prev_src_id = token.get_src_id();
            encode_vlq_diff(&mut rv, token.get_src_line(), prev_src_line);
            prev_src_line = token.get_src_line();
            encode_vlq_diff(&mut rv, token.get_src_col(), prev_src_col);
            prev_src_col = token.get_src_col();
            if token.has_name() {
                encode_vlq_diff(&mut rv, token.get_name_id(), prev_name_id);
                prev_name_id = token.get_name_id();
            }
        }
    }

    rv
}

fn as_raw_sourcemap(doc: &MapDocument) -> RawSourceMap {
    RawSourceMap {
        version: Some(3),
        file: doc.get_file().map(|x| Value::String(x.to_string())),
        sources: Some(doc.sources().map(|x| Some(x.to_string())).collect()),
        source_root: None,
        sources_content: if doc.has_sources_content() {
            Some(
                doc.source_contents()
                    .map(|x| x.map(str::to_string))
                    .collect(),
            )
        } else {
            None
        },
        names: Some(doc.names().map(|x| Value::String(x.to_string())).collect()),
        mappings: Some(serialize_mappings(doc)),
    }
}

impl MapDocument {
    /// Serializes the document as JSON into a writer.
    pub fn to_writer<W: Write>(&self, mut w: W) -> Result<()> {
        serde_json::to_writer(&mut w, &as_raw_sourcemap(self))?;
        Ok(())
    }

    /// Serializes the document as JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&as_raw_sourcemap(self))?)
    }

    /// Serializes the document into a `data:` URL.
    pub fn to_data_url(&self, encoding: DataUrlEncoding) -> Result<String> {
        let json = self.to_json_string()?;
        Ok(match encoding {
            DataUrlEncoding::Base64 => format!(
                "data:application/json;base64,{}",
                STANDARD.encode(json.as_bytes())
            ),
            DataUrlEncoding::Percent => format!(
                "data:application/json,{}",
                utf8_percent_encode(&json, DATA_URL_ESCAPES)
            ),
        })
    }
}

#[test]
fn test_serialize_partial_and_named_tokens() {
    let mut builder = crate::builder::MapDocumentBuilder::new(None);
    builder.add(0, 0, 0, 0, Some("a.js"), None);
    builder.add_partial(0, 3);
    builder.add(0, 4, 0, 4, Some("a.js"), Some("x"));
    builder.add(2, 1, 1, 0, Some("a.js"), None);
    let doc = builder.into_document();
    assert_eq!(serialize_mappings(&doc), "AAAA,G,CAAIA;;CACJ");
}
