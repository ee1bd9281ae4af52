//! Resolution of original source text.
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::trace;

use crate::errors::{Error, Result};
use crate::types::MapDocument;
use crate::utils::{resolve_source_path, source_key};

/// The channel a source text was resolved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    /// the document's own `sourcesContent`
    Embedded,
    /// a file next to the map
    File,
    /// an inner layer of a composition chain
    Backfill,
}

/// Resolves the original text of a document's sources.
///
/// Channels are tried in order: embedded `sourcesContent`, a readable
/// file relative to the map's directory, and finally texts that an inner
/// layer of a composition chain already resolved for the same source.
#[derive(Default, Debug)]
pub struct ContentResolver {
    backfill: HashMap<String, String>,
    files: HashMap<String, Option<String>>,
}

impl ContentResolver {
    /// Creates an empty resolver.
    pub fn new() -> ContentResolver {
        ContentResolver::default()
    }

    /// Records text an inner layer resolved for `source`.
    ///
    /// `base_dir` is the directory of the document naming the source.  The
    /// first recorded text for a source wins.
    pub fn record_backfill(&mut self, base_dir: Option<&Path>, source: &str, text: &str) {
        self.backfill
            .entry(source_key(base_dir, source))
            .or_insert_with(|| text.to_string());
    }

    /// Returns the backfilled text for a source, if any.
    pub fn get_backfill(&self, base_dir: Option<&Path>, source: &str) -> Option<&str> {
        self.backfill
            .get(&source_key(base_dir, source))
            .map(|x| &x[..])
    }

    /// Returns the number of backfilled sources.
    pub fn backfill_count(&self) -> usize {
        self.backfill.len()
    }

    fn read_file(&mut self, doc: &MapDocument, source: &str) -> Option<String> {
        let path = resolve_source_path(doc.get_base_dir(), source)?;
        let key = path.to_string_lossy().into_owned();
        self.files
            .entry(key)
            .or_insert_with(|| fs::read_to_string(&path).ok())
            .clone()
    }

    /// Resolves the text of a source together with its origin.
    pub fn resolve<'d>(
        &mut self,
        doc: &'d MapDocument,
        src_id: u32,
    ) -> Result<(Cow<'d, str>, ContentOrigin)> {
        let source = doc
            .get_source(src_id)
            .ok_or(Error::BadSourceReference(src_id))?;

        if let Some(contents) = doc.get_source_contents(src_id) {
            return Ok((Cow::Borrowed(contents), ContentOrigin::Embedded));
        }

        if let Some(contents) = self.read_file(doc, source) {
            trace!(source, "resolved source contents from file");
            return Ok((Cow::Owned(contents), ContentOrigin::File));
        }

        if let Some(contents) = self.get_backfill(doc.get_base_dir(), source) {
            trace!(source, "resolved source contents from composition chain");
            return Ok((Cow::Owned(contents.to_string()), ContentOrigin::Backfill));
        }

        Err(Error::MissingContent(source.to_string()))
    }

    /// Resolves the text of a source.
    pub fn content_for<'d>(&mut self, doc: &'d MapDocument, src_id: u32) -> Result<Cow<'d, str>> {
        self.resolve(doc, src_id).map(|(text, _)| text)
    }
}
