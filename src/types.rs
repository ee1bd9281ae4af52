use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::decoder::decode;
use crate::errors::Result;

/// Represents a raw token
///
/// Raw tokens are the records a `MapDocument` keeps for every decoded
/// segment.  A token without a source (`src_id == !0`) is a partial
/// mapping: it only marks a generated column.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct RawToken {
    /// the destination (generated) line number
    pub dst_line: u32,
    /// the destination (generated) column number
    pub dst_col: u32,
    /// the source line number
    pub src_line: u32,
    /// the source line column
    pub src_col: u32,
    /// source identifier (`!0` for partial mappings)
    pub src_id: u32,
    /// name identifier (`!0` in case there is no associated name)
    pub name_id: u32,
}

impl RawToken {
    /// Returns `true` if the token only carries a generated column.
    pub fn is_partial(&self) -> bool {
        self.src_id == !0
    }
}

/// Represents a token from a document
#[derive(Copy, Clone)]
pub struct Token<'a> {
    raw: &'a RawToken,
    doc: &'a MapDocument,
}

impl<'a> PartialEq for Token<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<'a> Token<'a> {
    /// get the destination (generated) line number
    pub fn get_dst_line(&self) -> u32 {
        self.raw.dst_line
    }

    /// get the destination (generated) column number
    pub fn get_dst_col(&self) -> u32 {
        self.raw.dst_col
    }

    /// get the destination line and column
    pub fn get_dst(&self) -> (u32, u32) {
        (self.get_dst_line(), self.get_dst_col())
    }

    /// get the source line number
    pub fn get_src_line(&self) -> u32 {
        self.raw.src_line
    }

    /// get the source column number
    pub fn get_src_col(&self) -> u32 {
        self.raw.src_col
    }

    /// get the source line and column
    pub fn get_src(&self) -> (u32, u32) {
        (self.get_src_line(), self.get_src_col())
    }

    /// Return the source ID of the token
    pub fn get_src_id(&self) -> u32 {
        self.raw.src_id
    }

    /// get the source if it exists as string
    pub fn get_source(&self) -> Option<&'a str> {
        if self.raw.is_partial() {
            None
        } else {
            self.doc.get_source(self.raw.src_id)
        }
    }

    /// Is there a source for this token?
    pub fn has_source(&self) -> bool {
        !self.raw.is_partial()
    }

    /// get the name if it exists as string
    pub fn get_name(&self) -> Option<&'a str> {
        if self.raw.name_id == !0 {
            None
        } else {
            self.doc.get_name(self.raw.name_id)
        }
    }

    /// returns `true` if a name exists, `false` otherwise
    pub fn has_name(&self) -> bool {
        self.get_name().is_some()
    }

    /// Return the name ID of the token
    pub fn get_name_id(&self) -> u32 {
        self.raw.name_id
    }

    /// Converts the token into a debug tuple in the form
    /// `(source, src_line, src_col, name)`
    pub fn to_tuple(&self) -> (&'a str, u32, u32, Option<&'a str>) {
        (
            self.get_source().unwrap_or(""),
            self.get_src_line(),
            self.get_src_col(),
            self.get_name(),
        )
    }

    /// Converts the token into an owned original position.
    ///
    /// Partial tokens have no original position.
    pub fn to_original_position(&self) -> Option<OriginalPosition> {
        Some(OriginalPosition {
            source: self.get_source()?.to_string(),
            line: self.get_src_line(),
            column: self.get_src_col(),
            name: self.get_name().map(str::to_string),
        })
    }

    /// Get the underlying raw token
    pub fn get_raw_token(&self) -> RawToken {
        *self.raw
    }
}

impl<'a> fmt::Debug for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Token {}>", self)
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_source() {
            Some(source) => write!(
                f,
                "{}:{}:{}{}",
                source,
                self.get_src_line(),
                self.get_src_col(),
                self.get_name()
                    .map(|x| format!(" name={}", x))
                    .unwrap_or_default()
            ),
            None => write!(
                f,
                "<partial {}:{}>",
                self.get_dst_line(),
                self.get_dst_col()
            ),
        }
    }
}

/// Iterates over all tokens in a document
pub struct TokenIter<'a> {
    i: &'a MapDocument,
    next_idx: u32,
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        self.i.get_token(self.next_idx).map(|tok| {
            self.next_idx += 1;
            tok
        })
    }
}

/// An original position a generated position resolves to.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
}

impl fmt::Display for OriginalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)?;
        if let Some(ref name) = self.name {
            write!(f, " name={}", name)?;
        }
        Ok(())
    }
}

/// A position in the generated file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GeneratedPosition {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for GeneratedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Represents a decoded revision 3 source map in memory.
///
/// All tokens live in one vector ordered by generated line and column.
/// `line_offsets[n]..line_offsets[n + 1]` is the token range of generated
/// line `n`.
#[derive(Clone, Debug, PartialEq)]
pub struct MapDocument {
    file: Option<String>,
    tokens: Vec<RawToken>,
    line_offsets: Vec<u32>,
    names: Vec<String>,
    sources: Vec<String>,
    sources_content: Option<Vec<Option<String>>>,
    base_dir: Option<PathBuf>,
}

impl MapDocument {
    /// Creates a document from a reader over a JSON stream in UTF-8
    /// format.  Optionally a "garbage header" as defined by the
    /// sourcemap draft specification is supported.
    ///
    /// ```rust
    /// use sourcemap_verify::MapDocument;
    /// let input: &[_] = b"{
    ///     \"version\":3,
    ///     \"sources\":[\"coolstuff.js\"],
    ///     \"names\":[\"x\",\"alert\"],
    ///     \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
    /// }";
    /// let doc = MapDocument::from_reader(input).unwrap();
    /// ```
    pub fn from_reader<R: Read>(rdr: R) -> Result<MapDocument> {
        decode(rdr)
    }

    /// Creates a document from a byte slice.
    pub fn from_slice(slice: &[u8]) -> Result<MapDocument> {
        crate::decoder::decode_slice(slice)
    }

    /// Constructs a new document from raw components.
    ///
    /// Tokens are sorted by generated position (stable, so tokens sharing a
    /// column keep their order) and the per-line index is rebuilt.
    pub fn new(
        file: Option<String>,
        mut tokens: Vec<RawToken>,
        names: Vec<String>,
        sources: Vec<String>,
        sources_content: Option<Vec<Option<String>>>,
    ) -> MapDocument {
        tokens.sort_by_key(|t| (t.dst_line, t.dst_col));
        let line_offsets = build_line_offsets(&tokens);
        MapDocument {
            file,
            tokens,
            line_offsets,
            names,
            sources,
            sources_content,
            base_dir: None,
        }
    }

    /// Returns the version of the document.  Only version 3 is supported.
    pub fn get_version(&self) -> u32 {
        3
    }

    /// Returns the embedded filename in case there is one.
    pub fn get_file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Returns the directory relative sources resolve against.
    pub fn get_base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Sets the directory relative sources resolve against.
    pub fn set_base_dir<P: Into<PathBuf>>(&mut self, base_dir: Option<P>) {
        self.base_dir = base_dir.map(Into::into);
    }

    /// Looks up a token by its index.
    pub fn get_token(&self, idx: u32) -> Option<Token<'_>> {
        self.tokens
            .get(idx as usize)
            .map(|raw| Token { raw, doc: self })
    }

    /// Returns the number of tokens in the document.
    pub fn get_token_count(&self) -> u32 {
        self.tokens.len() as u32
    }

    /// Returns an iterator over the tokens.
    pub fn tokens(&self) -> TokenIter<'_> {
        TokenIter {
            i: self,
            next_idx: 0,
        }
    }

    /// Returns the raw tokens of the document.
    pub fn raw_tokens(&self) -> &[RawToken] {
        &self.tokens
    }

    /// Returns the number of generated lines covered by the mappings.
    pub fn get_line_count(&self) -> u32 {
        (self.line_offsets.len() as u32).saturating_sub(1)
    }

    /// Returns all tokens of a generated line.
    pub fn line_tokens(&self, line: u32) -> &[RawToken] {
        let line = line as usize;
        if line + 1 >= self.line_offsets.len() {
            return &[];
        }
        let start = self.line_offsets[line] as usize;
        let end = self.line_offsets[line + 1] as usize;
        &self.tokens[start..end]
    }

    /// Looks up the token governing a generated position.
    ///
    /// This is the last token on `line` whose column is not greater than
    /// `col`.  Unlike `lookup_original` partial tokens are returned too.
    pub fn lookup_token(&self, line: u32, col: u32) -> Option<Token<'_>> {
        let tokens = self.line_tokens(line);
        let idx = tokens.partition_point(|t| t.dst_col <= col);
        if idx == 0 {
            return None;
        }
        let offset = self.line_offsets[line as usize] + idx as u32 - 1;
        self.get_token(offset)
    }

    /// Resolves a generated position to its original position.
    ///
    /// Returns `None` if the line has no tokens before `col` or if the
    /// governing token is partial.
    pub fn lookup_original(&self, line: u32, col: u32) -> Option<OriginalPosition> {
        self.lookup_token(line, col)
            .and_then(|token| token.to_original_position())
    }

    /// Returns the number of sources in the document.
    pub fn get_source_count(&self) -> u32 {
        self.sources.len() as u32
    }

    /// Looks up a source for a specific index.
    pub fn get_source(&self, idx: u32) -> Option<&str> {
        self.sources.get(idx as usize).map(|x| &x[..])
    }

    /// Replaces the source string at an index.
    pub fn set_source(&mut self, idx: u32, value: &str) {
        if let Some(source) = self.sources.get_mut(idx as usize) {
            *source = value.to_string();
        }
    }

    /// Finds the index of a source.  With duplicate sources the first wins.
    pub fn get_source_id(&self, source: &str) -> Option<u32> {
        self.sources
            .iter()
            .position(|x| x == source)
            .map(|x| x as u32)
    }

    /// Iterates over all sources
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|x| &x[..])
    }

    /// Returns every source string that occurs more than once.
    pub fn duplicate_sources(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut rv = vec![];
        for source in self.sources() {
            if !seen.insert(source) && !rv.contains(&source) {
                rv.push(source);
            }
        }
        rv
    }

    /// Returns the embedded contents of a source.
    ///
    /// `None` covers both an absent `sourcesContent` and the explicit
    /// missing marker.
    pub fn get_source_contents(&self, idx: u32) -> Option<&str> {
        self.sources_content
            .as_ref()
            .and_then(|x| x.get(idx as usize))
            .and_then(|x| x.as_deref())
    }

    /// Iterates over all embedded source contents.
    pub fn source_contents(&self) -> impl Iterator<Item = Option<&str>> {
        let count = self.sources.len();
        let contents = self.sources_content.as_ref();
        (0..count).map(move |idx| contents.and_then(|x| x.get(idx)).and_then(|x| x.as_deref()))
    }

    /// Returns `true` if the document has a `sourcesContent` array.
    pub fn has_sources_content(&self) -> bool {
        self.sources_content.is_some()
    }

    /// Sets the embedded contents of a source.
    pub fn set_source_contents(&mut self, idx: u32, value: Option<&str>) {
        let count = self.sources.len();
        let contents = self
            .sources_content
            .get_or_insert_with(|| vec![None; count]);
        if contents.len() < count {
            contents.resize(count, None);
        }
        if let Some(slot) = contents.get_mut(idx as usize) {
            *slot = value.map(str::to_owned);
        }
    }

    /// Returns the number of names in the document.
    pub fn get_name_count(&self) -> u32 {
        self.names.len() as u32
    }

    /// Looks up a name for a specific index.
    pub fn get_name(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(|x| &x[..])
    }

    /// Iterates over all names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|x| &x[..])
    }
}

fn build_line_offsets(tokens: &[RawToken]) -> Vec<u32> {
    let line_count = tokens.last().map_or(0, |t| t.dst_line as usize + 1);
    let mut offsets = Vec::with_capacity(line_count + 1);
    let mut idx = 0;
    for line in 0..line_count {
        offsets.push(idx as u32);
        while idx < tokens.len() && tokens[idx].dst_line as usize == line {
            idx += 1;
        }
    }
    offsets.push(tokens.len() as u32);
    offsets
}

#[test]
fn test_line_offsets_skip_empty_lines() {
    let tok = |dst_line, dst_col| RawToken {
        dst_line,
        dst_col,
        src_line: 0,
        src_col: 0,
        src_id: 0,
        name_id: !0,
    };
    let doc = MapDocument::new(
        None,
        vec![tok(2, 4), tok(0, 0), tok(2, 1)],
        vec![],
        vec!["a.js".into()],
        None,
    );
    assert_eq!(doc.get_line_count(), 3);
    assert_eq!(doc.line_tokens(0).len(), 1);
    assert!(doc.line_tokens(1).is_empty());
    assert_eq!(doc.line_tokens(2)[0].dst_col, 1);
    assert!(doc.line_tokens(3).is_empty());
    assert!(doc.lookup_token(1, 10).is_none());
    assert_eq!(doc.lookup_token(2, 3).unwrap().get_dst_col(), 1);
}
