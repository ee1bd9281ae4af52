use std::convert::TryFrom;
use std::io;
use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::jsontypes::RawSourceMap;
use crate::types::{MapDocument, RawToken};
use crate::vlq::parse_vlq_segment_into;

fn is_junk_json(byte: u8) -> bool {
    byte == b')' || byte == b']' || byte == b'}' || byte == b'\''
}

pub(crate) fn strip_junk_header(slice: &[u8]) -> io::Result<&[u8]> {
    if slice.is_empty() || !is_junk_json(slice[0]) {
        return Ok(slice);
    }
    let mut need_newline = false;
    for (idx, &byte) in slice.iter().enumerate() {
        if need_newline && byte != b'\n' {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "expected newline",
            ));
        } else if is_junk_json(byte) {
            continue;
        } else if byte == b'\r' {
            need_newline = true;
        } else if byte == b'\n' {
            return Ok(&slice[idx..]);
        }
    }
    Ok(&slice[slice.len()..])
}

fn to_position(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::BadPosition(value))
}

fn decode_mappings(
    mappings: &str,
    source_count: usize,
    name_count: usize,
) -> Result<Vec<RawToken>> {
    let mut src_id = 0i64;
    let mut src_line = 0i64;
    let mut src_col = 0i64;
    let mut name_id = 0i64;

    let mut tokens = vec![];
    let mut nums = Vec::with_capacity(6);

    for (dst_line, line) in mappings.split(';').enumerate() {
        let mut dst_col = 0i64;

        for segment in line.split(',') {
            if segment.is_empty() {
                continue;
            }

            parse_vlq_segment_into(segment, &mut nums)?;
            dst_col += nums[0];

            let mut src = !0;
            let mut name = !0;

            if nums.len() > 1 {
                if nums.len() != 4 && nums.len() != 5 {
                    return Err(Error::BadSegmentSize(nums.len() as u32));
                }
                src_id += nums[1];
                if src_id < 0 || src_id >= source_count as i64 {
                    return Err(Error::BadSourceReference(src_id as u32));
                }

                src = src_id as u32;
                src_line += nums[2];
                src_col += nums[3];

                if nums.len() > 4 {
                    name_id += nums[4];
                    if name_id < 0 || name_id >= name_count as i64 {
                        return Err(Error::BadNameReference(name_id as u32));
                    }
                    name = name_id as u32;
                }
            }

            tokens.push(RawToken {
                dst_line: to_position(dst_line as i64)?,
                dst_col: to_position(dst_col)?,
                src_line: to_position(src_line)?,
                src_col: to_position(src_col)?,
                src_id: src,
                name_id: name,
            });
        }
    }

    Ok(tokens)
}

pub(crate) fn decode_regular(rsm: RawSourceMap) -> Result<MapDocument> {
    if rsm.version != Some(3) {
        return Err(Error::UnsupportedVersion(rsm.version));
    }

    let mut sources: Vec<String> = rsm
        .sources
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();

    // apparently we can encounter some non string types in real world
    // sourcemaps :(
    let names = rsm
        .names
        .unwrap_or_default()
        .into_iter()
        .map(|val| match val {
            Value::String(s) => s,
            Value::Number(num) => num.to_string(),
            _ => "".into(),
        })
        .collect::<Vec<String>>();

    if let Some(ref contents) = rsm.sources_content {
        if contents.len() != sources.len() {
            return Err(Error::SourcesContentMismatch {
                sources: sources.len(),
                contents: contents.len(),
            });
        }
    }

    let mappings = rsm.mappings.unwrap_or_default();
    let tokens = decode_mappings(&mappings, sources.len(), names.len())?;

    if let Some(source_root) = rsm.source_root {
        if !source_root.is_empty() {
            let source_root = source_root.trim_end_matches('/');
            sources = sources
                .into_iter()
                .map(|x| {
                    if !x.is_empty()
                        && (x.starts_with('/')
                            || x.starts_with("http:")
                            || x.starts_with("https:")
                            || x.starts_with("file:"))
                    {
                        x
                    } else {
                        format!("{}/{}", source_root, x)
                    }
                })
                .collect();
        }
    }

    // file sometimes is not a string for unexplicable reasons
    let file = rsm.file.map(|val| match val {
        Value::String(s) => s,
        _ => "<invalid>".into(),
    });

    Ok(MapDocument::new(
        file,
        tokens,
        names,
        sources,
        rsm.sources_content,
    ))
}

/// Decodes a document from a reader
pub fn decode<R: Read>(mut rdr: R) -> Result<MapDocument> {
    let mut buf = vec![];
    rdr.read_to_end(&mut buf)?;
    decode_slice(&buf)
}

/// Decodes a document from a byte slice
pub fn decode_slice(slice: &[u8]) -> Result<MapDocument> {
    let content = strip_junk_header(slice)?;
    let rsm: RawSourceMap = serde_json::from_slice(content)?;
    decode_regular(rsm)
}

/// The payload encodings a `data:` URL can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataUrlEncoding {
    /// `data:application/json;base64,...`
    Base64,
    /// `data:application/json,...` with percent escapes
    Percent,
}

fn check_percent_escapes(data: &str) -> Result<()> {
    let bytes = data.as_bytes();
    for (idx, &byte) in bytes.iter().enumerate() {
        if byte == b'%' {
            let valid = bytes
                .get(idx + 1..idx + 3)
                .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(Error::InvalidPercentEncoding(idx));
            }
        }
    }
    Ok(())
}

/// Splits a `data:` URL into its payload encoding and its decoded bytes.
pub fn decode_data_url_payload(url: &str) -> Result<(DataUrlEncoding, Vec<u8>)> {
    let rest = match url.get(..5) {
        Some(scheme) if scheme.eq_ignore_ascii_case("data:") => &url[5..],
        _ => return Err(Error::InvalidDataUrl),
    };
    let comma = rest.find(',').ok_or(Error::InvalidDataUrl)?;
    let (header, data) = (&rest[..comma], &rest[comma + 1..]);

    let mut params = header.split(';').map(str::trim);
    let media_type = params.next().unwrap_or("");
    if !media_type.is_empty() && !media_type.eq_ignore_ascii_case("application/json") {
        return Err(Error::InvalidDataUrl);
    }

    if params.any(|param| param.eq_ignore_ascii_case("base64")) {
        let data = STANDARD
            .decode(data.trim())
            .map_err(|_| Error::InvalidBase64)?;
        Ok((DataUrlEncoding::Base64, data))
    } else {
        check_percent_escapes(data)?;
        Ok((
            DataUrlEncoding::Percent,
            percent_decode_str(data).collect(),
        ))
    }
}

/// Loads a document from a data URL.
///
/// Both base64 and percent-escaped payloads are supported.
pub fn decode_data_url(url: &str) -> Result<MapDocument> {
    let (_, data) = decode_data_url_payload(url)?;
    decode_slice(&data[..])
}

#[test]
fn test_percent_escape_validation() {
    assert!(check_percent_escapes("%7B%22a%22%7D").is_ok());
    match check_percent_escapes("%7B%2") {
        Err(Error::InvalidPercentEncoding(3)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    match check_percent_escapes("abc%zz") {
        Err(Error::InvalidPercentEncoding(3)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_junk_header() {
    assert_eq!(
        strip_junk_header(b")]}'\n{\"a\":1}").unwrap(),
        b"\n{\"a\":1}"
    );
    assert!(strip_junk_header(b")]}'\r{}").is_err());
}
