use std::collections::HashMap;
use std::path::PathBuf;

use crate::types::{MapDocument, RawToken};

/// Helper for document generation
///
/// Composing chains and re-embedding artifacts both need to assemble new
/// documents token by token.  The builder deduplicates sources and names
/// and keeps source contents aligned with the sources.
pub struct MapDocumentBuilder {
    file: Option<String>,
    name_map: HashMap<String, u32>,
    names: Vec<String>,
    tokens: Vec<RawToken>,
    source_map: HashMap<String, u32>,
    sources: Vec<String>,
    source_contents: Vec<Option<String>>,
    base_dir: Option<PathBuf>,
}

impl MapDocumentBuilder {
    /// Creates a new document builder and sets the file.
    pub fn new(file: Option<&str>) -> MapDocumentBuilder {
        MapDocumentBuilder {
            file: file.map(str::to_owned),
            name_map: HashMap::new(),
            names: vec![],
            tokens: vec![],
            source_map: HashMap::new(),
            sources: vec![],
            source_contents: vec![],
            base_dir: None,
        }
    }

    /// Sets the directory relative sources resolve against.
    pub fn set_base_dir(&mut self, base_dir: Option<PathBuf>) {
        self.base_dir = base_dir;
    }

    /// Registers a new source with the builder and returns the source ID.
    pub fn add_source(&mut self, src: &str) -> u32 {
        let count = self.sources.len() as u32;
        let id = *self.source_map.entry(src.into()).or_insert(count);
        if id == count {
            self.sources.push(src.into());
        }
        id
    }

    /// Looks up a source name for an ID.
    pub fn get_source(&self, src_id: u32) -> Option<&str> {
        self.sources.get(src_id as usize).map(|x| &x[..])
    }

    /// Sets the source contents for an already existing source.
    pub fn set_source_contents(&mut self, src_id: u32, contents: Option<&str>) {
        assert!(src_id != !0, "Cannot set sources for tombstone source id");
        if self.sources.len() > self.source_contents.len() {
            self.source_contents.resize(self.sources.len(), None);
        }
        self.source_contents[src_id as usize] = contents.map(str::to_owned);
    }

    /// Returns the current source contents for a source.
    pub fn get_source_contents(&self, src_id: u32) -> Option<&str> {
        self.source_contents
            .get(src_id as usize)
            .and_then(|x| x.as_deref())
    }

    /// Checks if a given source ID has source contents available.
    pub fn has_source_contents(&self, src_id: u32) -> bool {
        self.get_source_contents(src_id).is_some()
    }

    /// Registers a name with the builder and returns the name ID.
    pub fn add_name(&mut self, name: &str) -> u32 {
        let count = self.names.len() as u32;
        let id = *self.name_map.entry(name.into()).or_insert(count);
        if id == count {
            self.names.push(name.into());
        }
        id
    }

    /// Adds a new mapping to the builder.
    ///
    /// A mapping without a source becomes a partial mapping.
    pub fn add(
        &mut self,
        dst_line: u32,
        dst_col: u32,
        src_line: u32,
        src_col: u32,
        source: Option<&str>,
        name: Option<&str>,
    ) -> RawToken {
        let src_id = match source {
            Some(source) => self.add_source(source),
            None => !0,
        };
        let name_id = match name {
            Some(name) if src_id != !0 => self.add_name(name),
            _ => !0,
        };
        self.add_raw(dst_line, dst_col, src_line, src_col, src_id, name_id)
    }

    /// Adds a partial mapping that only marks a generated column.
    pub fn add_partial(&mut self, dst_line: u32, dst_col: u32) -> RawToken {
        self.add_raw(dst_line, dst_col, 0, 0, !0, !0)
    }

    /// Adds a new mapping with already registered source and name IDs.
    pub fn add_raw(
        &mut self,
        dst_line: u32,
        dst_col: u32,
        src_line: u32,
        src_col: u32,
        src_id: u32,
        name_id: u32,
    ) -> RawToken {
        let raw = RawToken {
            dst_line,
            dst_col,
            src_line,
            src_col,
            src_id,
            name_id,
        };
        self.tokens.push(raw);
        raw
    }

    /// Converts the builder into a document.
    pub fn into_document(mut self) -> MapDocument {
        let contents = if self.source_contents.iter().any(Option::is_some) {
            self.source_contents.resize(self.sources.len(), None);
            Some(self.source_contents)
        } else {
            None
        };
        let mut doc = MapDocument::new(self.file, self.tokens, self.names, self.sources, contents);
        doc.set_base_dir(self.base_dir);
        doc
    }
}

#[test]
fn test_builder_dedupes_sources_and_names() {
    let mut builder = MapDocumentBuilder::new(Some("out.js"));
    builder.add(0, 0, 0, 0, Some("a.js"), Some("x"));
    builder.add(0, 4, 1, 0, Some("b.js"), Some("x"));
    builder.add(0, 8, 2, 0, Some("a.js"), None);
    builder.add_partial(0, 12);
    let src_id = builder.add_source("b.js");
    builder.set_source_contents(src_id, Some("let x;"));

    let doc = builder.into_document();
    assert_eq!(doc.sources().collect::<Vec<_>>(), vec!["a.js", "b.js"]);
    assert_eq!(doc.get_name_count(), 1);
    assert_eq!(doc.get_source_contents(0), None);
    assert_eq!(doc.get_source_contents(1), Some("let x;"));
    assert!(doc.lookup_original(0, 13).is_none());
}
