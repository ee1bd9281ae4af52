//! The individual assertions run against a generated artifact.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use if_chain::if_chain;
use lazy_static::lazy_static;
use regex::Regex;

use crate::compose::{resolve_layered, InnerMapResolver};
use crate::content::ContentResolver;
use crate::index::SegmentIndex;
use crate::js_identifiers::{is_valid_continue, is_valid_start, leading_identifier};
use crate::sourceview::SourceView;
use crate::types::{GeneratedPosition, MapDocument, OriginalPosition};
use crate::verify::fixture::{Fixture, WrittenFixture};
use crate::verify::report::{CheckKind, Failure};

lazy_static! {
    static ref LEADING_COMMENTS_RE: Regex = Regex::new(r"^(?:\s*/\*.*?\*/)*\s*").unwrap();
}

/// A marker occurrence attributed to a location in a fixture file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHit {
    pub marker: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for MarkerHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}:{}", self.marker, self.file, self.line, self.column)
    }
}

fn format_locations(file: &str, locations: &[(u32, u32)]) -> String {
    let rv: Vec<_> = locations
        .iter()
        .map(|&(line, col)| format!("{}:{}:{}", file, line, col))
        .collect();
    rv.join(", ")
}

/// Checks that no source is listed twice.
pub fn check_uniqueness(doc: &MapDocument) -> Vec<Failure> {
    doc.duplicate_sources()
        .into_iter()
        .map(|source| {
            Failure::new(CheckKind::Uniqueness, "source is listed more than once")
                .observed(source)
        })
        .collect()
}

/// Resolves every marker occurrence of the generated code.
///
/// Each occurrence must resolve to a place the marker was declared at,
/// and that place must map back to the occurrence.  Returns the resolved
/// hits; use `check_marker_attribution` once all artifacts are checked.
pub fn check_round_trip(
    code: &str,
    index: &SegmentIndex<'_>,
    fixture: &Fixture,
    files: &WrittenFixture,
) -> (BTreeSet<MarkerHit>, Vec<Failure>) {
    let doc = index.document();
    let view = SourceView::new(code);
    let mut hits = BTreeSet::new();
    let mut failures = vec![];

    for marker in &fixture.markers {
        let mut declared = BTreeMap::new();
        for name in &marker.files {
            if let Some(file) = files.get(name) {
                declared.insert(&name[..], SourceView::new(&file.text).find_all(&marker.text));
            }
        }

        for (line, column) in view.find_all(&marker.text) {
            let pos = match index.original_position_for(line, column) {
                Some(pos) => pos,
                None => {
                    failures.push(
                        Failure::new(
                            CheckKind::RoundTrip,
                            format!("marker {} at {}:{} has no mapping", marker.text, line, column),
                        )
                        .observed("unmapped"),
                    );
                    continue;
                }
            };

            let file = files.match_source(doc.get_base_dir(), &pos.source);
            let known = file.and_then(|f| declared.get(&f.name[..]).map(|locs| (f, locs)));
            let file = match known {
                Some((file, locations)) if locations.contains(&(pos.line, pos.column)) => file,
                _ => {
                    let expected: Vec<_> = declared
                        .iter()
                        .map(|(name, locs)| format_locations(name, locs))
                        .collect();
                    failures.push(
                        Failure::new(
                            CheckKind::RoundTrip,
                            format!(
                                "marker {} at {}:{} resolves to an undeclared location",
                                marker.text, line, column
                            ),
                        )
                        .expected(expected.join(", "))
                        .observed(&pos),
                    );
                    continue;
                }
            };

            let generated = GeneratedPosition { line, column };
            let back = index.all_generated_positions_for(&pos.source, pos.line, pos.column);
            if !back.contains(&generated) {
                let back: Vec<_> = back.iter().map(|x| x.to_string()).collect();
                failures.push(
                    Failure::new(
                        CheckKind::RoundTrip,
                        format!(
                            "{}:{}:{} does not map back to marker {}",
                            file.name, pos.line, pos.column, marker.text
                        ),
                    )
                    .expected(generated)
                    .observed(format!("[{}]", back.join(", "))),
                );
                continue;
            }

            hits.insert(MarkerHit {
                marker: marker.text.clone(),
                file: file.name.clone(),
                line: pos.line,
                column: pos.column,
            });
        }
    }

    (hits, failures)
}

/// Checks that every declared occurrence of every marker was resolved to.
///
/// Occurrences are identified by file, line and column, so a marker that
/// is declared in several files needs a hit at each of its places.
pub fn check_marker_attribution(
    fixture: &Fixture,
    files: &WrittenFixture,
    hits: &BTreeSet<MarkerHit>,
) -> Vec<Failure> {
    let mut failures = vec![];
    for marker in &fixture.markers {
        for name in &marker.files {
            let file = match files.get(name) {
                Some(file) => file,
                None => continue,
            };
            for (line, column) in SourceView::new(&file.text).find_all(&marker.text) {
                let hit = MarkerHit {
                    marker: marker.text.clone(),
                    file: name.clone(),
                    line,
                    column,
                };
                if !hits.contains(&hit) {
                    let resolved: Vec<_> = hits
                        .iter()
                        .filter(|hit| hit.marker == marker.text)
                        .map(|hit| format!("{}:{}:{}", hit.file, hit.line, hit.column))
                        .collect();
                    failures.push(
                        Failure::new(
                            CheckKind::RoundTrip,
                            format!(
                                "declared occurrence of marker {} is never resolved to",
                                marker.text
                            ),
                        )
                        .expected(format!("{}:{}:{}", name, line, column))
                        .observed(format!("[{}]", resolved.join(", "))),
                    );
                }
            }
        }
    }
    failures
}

/// Returns the byte offset the code of a line starts at.
///
/// Lines that hold nothing but comments or whitespace have no code.
/// `in_block` carries an unterminated block comment to the next line.
fn code_start(line: &str, in_block: &mut bool) -> Option<usize> {
    let mut start = 0;
    if *in_block {
        start = line.find("*/")? + 2;
        *in_block = false;
    }
    start += LEADING_COMMENTS_RE
        .find(&line[start..])
        .map_or(0, |m| m.end());
    let rest = &line[start..];
    if rest.starts_with("/*") {
        *in_block = true;
        return None;
    }
    if rest.is_empty() || rest.starts_with("//") || rest.starts_with("#!") {
        return None;
    }
    Some(start)
}

/// Iterates over the identifiers of a line with their byte offsets.
fn identifiers(line: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut prev = None;
    line.char_indices().filter_map(move |(idx, c)| {
        let starts = is_valid_start(c) && !prev.map_or(false, is_valid_continue);
        prev = Some(c);
        if starts {
            leading_identifier(&line[idx..]).map(|name| (idx, name))
        } else {
            None
        }
    })
}

/// Checks that every non-blank code line is covered by segments.
///
/// The first non-whitespace column of a line must resolve, and no partial
/// segment may end the coverage before the end of the line.
pub fn check_coverage(code: &str, doc: &MapDocument) -> Vec<Failure> {
    let view = SourceView::new(code);
    let mut failures = vec![];
    let mut in_block = false;

    for (line_idx, line) in view.lines().enumerate() {
        let start = match code_start(line, &mut in_block) {
            Some(start) => start,
            None => continue,
        };
        let line_idx = line_idx as u32;
        let first = line[..start].encode_utf16().count() as u32;
        if doc.lookup_original(line_idx, first).is_none() {
            failures.push(
                Failure::new(
                    CheckKind::Coverage,
                    format!("line {} is not mapped at column {}", line_idx, first),
                )
                .observed(line[start..].trim_end()),
            );
            continue;
        }
        let len = view.line_len(line_idx).unwrap_or(0);
        if let Some(raw) = doc
            .line_tokens(line_idx)
            .iter()
            .find(|raw| raw.is_partial() && raw.dst_col >= first && raw.dst_col < len)
        {
            failures.push(
                Failure::new(
                    CheckKind::Coverage,
                    format!("line {} loses its mapping at column {}", line_idx, raw.dst_col),
                )
                .observed(view.get_line_from(line_idx, raw.dst_col).unwrap_or("")),
            );
        }
    }

    failures
}

/// Checks that tagged identifiers keep their names through the build.
///
/// Every generated position an occurrence maps to must either spell the
/// name or carry it as the segment name.  Each tagged name must be mapped
/// at least once.
pub fn check_names(
    code: &str,
    index: &SegmentIndex<'_>,
    fixture: &Fixture,
    files: &WrittenFixture,
) -> Vec<Failure> {
    let prefix = match fixture.name_prefix {
        Some(ref prefix) if !prefix.is_empty() => prefix,
        _ => return vec![],
    };
    let doc = index.document();
    let view = SourceView::new(code);
    let mut mapped: BTreeMap<String, bool> = BTreeMap::new();
    let mut failures = vec![];

    for file in &files.files {
        let src_id = match files.source_id(doc, &file.name) {
            Some(src_id) => src_id,
            None => continue,
        };
        let original = SourceView::new(&file.text);
        for (line_idx, line) in original.lines().enumerate() {
            for (offset, name) in identifiers(line) {
                if !name.starts_with(&prefix[..]) {
                    continue;
                }
                let column = line[..offset].encode_utf16().count() as u32;
                let positions = index.generated_positions_for_id(src_id, line_idx as u32, column);
                let any_mapped = mapped.entry(name.to_string()).or_insert(false);
                *any_mapped |= !positions.is_empty();

                for pos in positions {
                    let literal = view.get_identifier_at(pos.line, pos.column);
                    if literal == Some(name) {
                        continue;
                    }
                    if_chain! {
                        if let Some(token) = doc.lookup_token(pos.line, pos.column);
                        if token.get_dst() == (pos.line, pos.column);
                        if token.get_name() == Some(name);
                        then {
                            continue;
                        }
                    }
                    failures.push(
                        Failure::new(
                            CheckKind::NameFidelity,
                            format!(
                                "{}:{}:{} is renamed at {} without a segment name",
                                file.name, line_idx, column, pos
                            ),
                        )
                        .expected(name)
                        .observed(literal.unwrap_or("<no identifier>")),
                    );
                }
            }
        }
    }

    for (name, _) in mapped.into_iter().filter(|&(_, any)| !any) {
        failures.push(
            Failure::new(CheckKind::NameFidelity, "identifier is never mapped").expected(name),
        );
    }

    failures
}

/// Checks that the resolved text of every fixture source is the fixture file.
pub fn check_contents(
    doc: &MapDocument,
    resolver: &mut ContentResolver,
    files: &WrittenFixture,
) -> Vec<Failure> {
    let mut failures = vec![];
    for file in &files.files {
        let src_id = match files.source_id(doc, &file.name) {
            Some(src_id) => src_id,
            None => continue,
        };
        match resolver.resolve(doc, src_id) {
            Ok((ref text, _)) if *text == file.text => {}
            Ok((text, origin)) => failures.push(
                Failure::new(
                    CheckKind::Content,
                    format!("{} resolves to different text ({:?})", file.name, origin),
                )
                .expected(format!("{:?}", file.text))
                .observed(format!("{:?}", text)),
            ),
            Err(err) => failures.push(
                Failure::new(CheckKind::Content, format!("{} has no text", file.name))
                    .observed(err),
            ),
        }
    }
    failures
}

/// Checks that a composed document agrees with resolving layer by layer.
pub fn check_associativity<R: InnerMapResolver>(
    outer: &MapDocument,
    composed: &MapDocument,
    resolver: &mut R,
) -> Vec<Failure> {
    let mut failures = vec![];
    for token in outer.tokens() {
        let (line, column) = token.get_dst();
        let observed = composed.lookup_original(line, column);
        match resolve_layered(outer, resolver, line, column) {
            Ok(expected) if expected == observed => {}
            Ok(expected) => {
                let show = |pos: Option<&OriginalPosition>| {
                    pos.map_or_else(|| "unmapped".to_string(), |x| x.to_string())
                };
                failures.push(
                    Failure::new(
                        CheckKind::Associativity,
                        format!("composed lookup at {}:{} differs from layered lookup", line, column),
                    )
                    .expected(show(expected.as_ref()))
                    .observed(show(observed.as_ref())),
                );
            }
            Err(err) => failures.push(
                Failure::new(
                    CheckKind::Associativity,
                    format!("layered lookup at {}:{} failed", line, column),
                )
                .observed(err),
            ),
        }
    }
    failures
}

/// Compares the marker hits of a re-bundled artifact with the primary ones.
pub fn check_chain_hits(primary: &BTreeSet<MarkerHit>, chained: &BTreeSet<MarkerHit>) -> Vec<Failure> {
    let mut failures = vec![];
    for hit in primary.difference(chained) {
        failures.push(
            Failure::new(CheckKind::Chain, "marker location is lost after re-bundling")
                .expected(hit),
        );
    }
    for hit in chained.difference(primary) {
        failures.push(
            Failure::new(CheckKind::Chain, "re-bundling resolves a marker to a new location")
                .observed(hit),
        );
    }
    failures
}

#[test]
fn test_coverage_skips_comments_and_blank_lines() {
    let mut builder = crate::builder::MapDocumentBuilder::new(None);
    builder.add(1, 2, 0, 0, Some("a.js"), None);
    builder.add(1, 6, 0, 4, Some("a.js"), None);
    builder.add_partial(2, 4);
    let doc = builder.into_document();

    let code = "// banner\n  foo(bar);\n    x;\n\n";
    let failures = check_coverage(code, &doc);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].check, CheckKind::Coverage);
    assert_eq!(failures[0].message, "line 2 is not mapped at column 4");
}

#[test]
fn test_coverage_starts_after_leading_block_comments() {
    let mut builder = crate::builder::MapDocumentBuilder::new(None);
    builder.add(4, 2, 3, 0, Some("a.js"), None);
    let doc = builder.into_document();

    let code = "/* @__PURE__ */ call();\n/*\n * banner\n */\n  x;\n";
    let failures = check_coverage(code, &doc);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "line 0 is not mapped at column 16");
    assert_eq!(failures[0].observed.as_deref(), Some("call();"));
}

#[test]
fn test_identifiers_skip_inner_matches() {
    let found: Vec<_> = identifiers("a1.tag_x(ü_tag, 2tag_y)").collect();
    assert_eq!(found, vec![(0, "a1"), (3, "tag_x"), (9, "ü_tag")]);
}
