use crate::js_identifiers::{is_valid_continue, leading_identifier};

/// Provides line and column access to generated and original sources.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`.  Columns are counted in
/// UTF-16 code units, the way JavaScript tooling writes them into maps.
#[derive(Clone)]
pub struct SourceView<'a> {
    source: &'a str,
    lines: Vec<(usize, usize)>,
}

fn index_lines(source: &str) -> Vec<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut lines = vec![];
    let mut start = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\n' => {
                lines.push((start, idx));
                start = idx + 1;
            }
            b'\r' => {
                lines.push((start, idx));
                if bytes.get(idx + 1) == Some(&b'\n') {
                    idx += 1;
                }
                start = idx + 1;
            }
            _ => {}
        }
        idx += 1;
    }
    lines.push((start, bytes.len()));
    lines
}

fn utf16_to_byte_offset(line: &str, col: u32) -> Option<usize> {
    let mut off = 0;
    let mut idx = 0;
    for c in line.chars() {
        if idx >= col as usize {
            break;
        }
        off += c.len_utf8();
        idx += c.len_utf16();
    }
    if idx == col as usize {
        Some(off)
    } else {
        None
    }
}

fn byte_to_utf16_offset(line: &str, byte_offset: usize) -> u32 {
    line.get(..byte_offset)
        .unwrap_or(line)
        .chars()
        .map(char::len_utf16)
        .sum::<usize>() as u32
}

impl<'a> SourceView<'a> {
    /// Creates a view of a given source.
    pub fn new(source: &'a str) -> SourceView<'a> {
        SourceView {
            lines: index_lines(source),
            source,
        }
    }

    /// Returns a requested line without its terminator.
    pub fn get_line(&self, idx: u32) -> Option<&str> {
        self.lines
            .get(idx as usize)
            .map(|&(start, end)| &self.source[start..end])
    }

    /// Returns a line slice.
    ///
    /// Note that columns are indexed as JavaScript WTF-16 columns.
    pub fn get_line_slice(&self, line: u32, col: u32, span: u32) -> Option<&str> {
        let line = self.get_line(line)?;
        let start = utf16_to_byte_offset(line, col)?;
        let rest = &line[start..];
        let end = utf16_to_byte_offset(rest, span)?;
        Some(&rest[..end])
    }

    /// Returns the rest of a line starting at a column.
    pub fn get_line_from(&self, line: u32, col: u32) -> Option<&str> {
        let line = self.get_line(line)?;
        utf16_to_byte_offset(line, col).map(|off| &line[off..])
    }

    /// Returns the identifier starting exactly at a position, if any.
    pub fn get_identifier_at(&self, line: u32, col: u32) -> Option<&str> {
        self.get_line_from(line, col).and_then(leading_identifier)
    }

    /// Returns `true` if `text` occurs at the given position.
    pub fn has_text_at(&self, line: u32, col: u32, text: &str) -> bool {
        self.get_line_from(line, col)
            .map_or(false, |rest| rest.starts_with(text))
    }

    /// Finds every occurrence of `needle` and returns its line and column.
    ///
    /// If the needle starts or ends with an identifier character, matches
    /// that are part of a longer identifier are skipped.
    pub fn find_all(&self, needle: &str) -> Vec<(u32, u32)> {
        let mut rv = vec![];
        if needle.is_empty() {
            return rv;
        }
        let guard_start = needle.chars().next().map_or(false, is_valid_continue);
        let guard_end = needle.chars().last().map_or(false, is_valid_continue);

        for (line_idx, line) in self.lines().enumerate() {
            for (off, _) in line.match_indices(needle) {
                let before = line[..off].chars().last();
                let after = line[off + needle.len()..].chars().next();
                if guard_start && before.map_or(false, is_valid_continue) {
                    continue;
                }
                if guard_end && after.map_or(false, is_valid_continue) {
                    continue;
                }
                rv.push((line_idx as u32, byte_to_utf16_offset(line, off)));
            }
        }
        rv
    }

    /// Returns the UTF-16 length of a line.
    pub fn line_len(&self, idx: u32) -> Option<u32> {
        self.get_line(idx)
            .map(|line| byte_to_utf16_offset(line, line.len()))
    }

    /// Returns an iterator over all lines.
    pub fn lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        let source = self.source;
        self.lines
            .iter()
            .map(move |&(start, end)| &source[start..end])
    }

    /// Returns the number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

#[test]
fn test_source_view_lines() {
    let view = SourceView::new("a\nb\nc");
    assert_eq!(view.get_line(0), Some("a"));
    assert_eq!(view.get_line(2), Some("c"));
    assert_eq!(view.get_line(1), Some("b"));
    assert_eq!(view.get_line(3), None);
    assert_eq!(view.line_count(), 3);

    let view = SourceView::new("a\r\nb\r\nc");
    assert_eq!(view.get_line(1), Some("b"));
    assert_eq!(view.line_count(), 3);

    let view = SourceView::new("a\rb");
    assert_eq!(view.get_line(1), Some("b"));

    let view = SourceView::new("abc👌def\nblah");
    assert_eq!(view.get_line_slice(0, 0, 3), Some("abc"));
    assert_eq!(view.get_line_slice(0, 3, 2), Some("👌"));
    assert_eq!(view.get_line_slice(0, 3, 3), Some("👌d"));
    assert_eq!(view.get_line_slice(0, 3, 1), None);
    assert_eq!(view.get_line_slice(1, 0, 4), Some("blah"));
    assert_eq!(view.get_line_slice(1, 0, 5), None);
    assert_eq!(view.line_len(0), Some(8));

    let view = SourceView::new("a\nb\nc\n");
    assert_eq!(view.get_line(3), Some(""));
    assert_eq!(view.get_line(4), None);
}

#[test]
fn test_find_all_respects_identifier_boundaries() {
    let view = SourceView::new("let x0 = 1, x01 = 2;\n👌x0(\"x0\")");
    assert_eq!(view.find_all("x0"), vec![(0, 4), (1, 2), (1, 6)]);
    assert_eq!(view.find_all("\"x0\""), vec![(1, 5)]);
    assert_eq!(view.get_identifier_at(0, 12), Some("x01"));
    assert!(view.has_text_at(1, 5, "\"x0\""));
}
