use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::decoder::{decode_data_url, strip_junk_header};
use crate::errors::Result;
use crate::jsontypes::MinimalRawSourceMap;
use crate::types::MapDocument;

/// Represents a reference to a sourcemap
#[derive(PartialEq, Debug, Clone)]
pub enum SourceMapRef {
    /// A regular URL reference
    Ref(String),
    /// A legacy URL reference
    LegacyRef(String),
    /// Indicates a missing reference
    Missing,
}

impl SourceMapRef {
    /// Return the URL of the reference
    pub fn get_url(&self) -> Option<&str> {
        match *self {
            SourceMapRef::Ref(ref u) => Some(u.as_str()),
            SourceMapRef::LegacyRef(ref u) => Some(u.as_str()),
            SourceMapRef::Missing => None,
        }
    }

    /// Returns `true` if the reference is an inline `data:` payload.
    pub fn is_embedded(&self) -> bool {
        self.get_url()
            .map_or(false, |url| url.get(..5).map_or(false, |x| x.eq_ignore_ascii_case("data:")))
    }

    /// Load an embedded sourcemap if there is a data URL.
    pub fn get_embedded_sourcemap(&self) -> Result<Option<MapDocument>> {
        match self.get_url() {
            Some(url) if self.is_embedded() => Ok(Some(decode_data_url(url)?)),
            _ => Ok(None),
        }
    }

    /// Resolves a linked reference against the artifact's own directory.
    ///
    /// Returns `None` for embedded maps and for absolute URLs with a scheme.
    pub fn resolve_path<P: AsRef<Path>>(&self, artifact_path: P) -> Option<PathBuf> {
        let url = self.get_url()?;
        if self.is_embedded() || url.contains("://") {
            return None;
        }
        let url = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
        let dir = artifact_path
            .as_ref()
            .parent()
            .unwrap_or_else(|| Path::new(""));
        Some(dir.join(url))
    }
}

fn parse_reference_line(line: &str) -> Option<SourceMapRef> {
    let line = line.trim();
    let (body, is_block) = if let Some(rest) = line.strip_prefix("//") {
        (rest, false)
    } else if let Some(rest) = line.strip_prefix("/*") {
        (rest.strip_suffix("*/")?, true)
    } else {
        return None;
    };
    let legacy = body.starts_with('@');
    if !legacy && !body.starts_with('#') {
        return None;
    }
    let url = body[1..].trim_start().strip_prefix("sourceMappingURL=")?;
    let url = if is_block { url.trim() } else { url.trim_end() }.to_owned();
    Some(if legacy {
        SourceMapRef::LegacyRef(url)
    } else {
        SourceMapRef::Ref(url)
    })
}

/// Locates a sourcemap reference
///
/// Given a reader to a generated file this finds the trailing sourcemap
/// reference comment.  When several references are present the last one
/// wins.
pub fn locate_sourcemap_reference<R: Read>(rdr: R) -> Result<SourceMapRef> {
    let mut rv = SourceMapRef::Missing;
    for line in BufReader::new(rdr).lines() {
        if let Some(reference) = parse_reference_line(&line?) {
            rv = reference;
        }
    }
    Ok(rv)
}

/// Locates a sourcemap reference in a slice
///
/// This is an alternative to `locate_sourcemap_reference` that operates
/// on slices.
pub fn locate_sourcemap_reference_slice(slice: &[u8]) -> Result<SourceMapRef> {
    locate_sourcemap_reference(slice)
}

/// Returns the byte offset where the reference line of `text` starts.
pub fn find_reference_line(text: &str) -> Option<usize> {
    let mut rv = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if parse_reference_line(line).is_some() {
            rv = Some(offset);
        }
        offset += line.len();
    }
    rv
}

fn is_sourcemap_common(rsm: MinimalRawSourceMap) -> bool {
    rsm.version.is_some()
        && (rsm.sources.is_some() || rsm.names.is_some())
        && rsm.mappings.is_some()
}

fn is_sourcemap_slice_impl(slice: &[u8]) -> Result<bool> {
    let content = strip_junk_header(slice)?;
    let rsm: MinimalRawSourceMap = serde_json::from_slice(content)?;
    Ok(is_sourcemap_common(rsm))
}

/// Checks if the given byte slice contains a sourcemap
pub fn is_sourcemap_slice(slice: &[u8]) -> bool {
    is_sourcemap_slice_impl(slice).unwrap_or(false)
}

#[test]
fn test_parse_reference_line() {
    assert_eq!(
        parse_reference_line("/*# sourceMappingURL=out.css.map */"),
        Some(SourceMapRef::Ref("out.css.map".into()))
    );
    assert_eq!(
        parse_reference_line("//# sourceMappingURL=out.js.map\r"),
        Some(SourceMapRef::Ref("out.js.map".into()))
    );
    assert_eq!(parse_reference_line("// sourceMappingURL=out.js.map"), None);
    assert_eq!(parse_reference_line("x = 1; //# sourceMappingURL=a"), None);
}

#[test]
fn test_find_reference_line() {
    let text = "a();\n//# sourceMappingURL=a.js.map\n";
    assert_eq!(find_reference_line(text), Some(5));
    assert_eq!(find_reference_line("a();\n"), None);
}
