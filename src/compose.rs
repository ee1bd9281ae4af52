//! Composition of documents across several build passes.
//!
//! When a build consumes a file that an earlier build generated, the new
//! document points into that intermediate file.  Composing replaces every
//! such position with the position the intermediate file's own document
//! resolves it to, so lookups reach the earliest known original source.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::artifact::GeneratedArtifact;
use crate::builder::MapDocumentBuilder;
use crate::content::ContentResolver;
use crate::errors::{Error, Result};
use crate::types::{MapDocument, OriginalPosition};
use crate::utils::{normalize_path, rebase_source, resolve_source_path, source_key};

/// Provides the documents of sources that are themselves build outputs.
pub trait InnerMapResolver {
    /// Returns the document of the build output `source` refers to.
    ///
    /// `base_dir` is the directory of the document naming `source`.
    /// Sources that are not tracked build outputs yield `Ok(None)`.
    fn inner_map(&mut self, source: &str, base_dir: Option<&Path>) -> Result<Option<MapDocument>>;
}

impl<F> InnerMapResolver for F
where
    F: FnMut(&str, Option<&Path>) -> Result<Option<MapDocument>>,
{
    fn inner_map(&mut self, source: &str, base_dir: Option<&Path>) -> Result<Option<MapDocument>> {
        self(source, base_dir)
    }
}

/// Resolves inner documents for the outputs of earlier builds.
///
/// Only paths registered with `track` count as build outputs; their
/// documents are loaded from the artifact on disk once and kept.
#[derive(Default, Debug, Clone)]
pub struct TrackedArtifacts {
    outputs: HashSet<PathBuf>,
    loaded: HashMap<PathBuf, MapDocument>,
}

impl TrackedArtifacts {
    /// Creates an empty set of tracked outputs.
    pub fn new() -> TrackedArtifacts {
        TrackedArtifacts::default()
    }

    /// Registers a build output.
    pub fn track<P: AsRef<Path>>(&mut self, path: P) {
        self.outputs.insert(normalize_path(path.as_ref()));
    }

    /// Checks if a path is a registered build output.
    pub fn is_tracked<P: AsRef<Path>>(&self, path: P) -> bool {
        self.outputs.contains(&normalize_path(path.as_ref()))
    }
}

impl InnerMapResolver for TrackedArtifacts {
    fn inner_map(&mut self, source: &str, base_dir: Option<&Path>) -> Result<Option<MapDocument>> {
        let path = match resolve_source_path(base_dir, source) {
            Some(path) if self.outputs.contains(&path) => path,
            _ => return Ok(None),
        };
        if let Some(doc) = self.loaded.get(&path) {
            return Ok(Some(doc.clone()));
        }
        let doc = GeneratedArtifact::load(&path)?.into_document();
        self.loaded.insert(path, doc.clone());
        Ok(Some(doc))
    }
}

/// Composes documents with the documents of their inputs.
///
/// A composer is meant for one verification run: inner documents are
/// composed once and cached, and every original text an inner layer
/// resolves is recorded in the composer's `ContentResolver`.
pub struct Composer<R> {
    resolver: R,
    contents: ContentResolver,
    cache: HashMap<String, Option<Rc<MapDocument>>>,
    stack: Vec<String>,
}

impl<R: InnerMapResolver> Composer<R> {
    /// Creates a composer around an inner map resolver.
    pub fn new(resolver: R) -> Composer<R> {
        Composer {
            resolver,
            contents: ContentResolver::new(),
            cache: HashMap::new(),
            stack: vec![],
        }
    }

    /// Returns the content resolver holding backfilled texts.
    pub fn contents(&mut self) -> &mut ContentResolver {
        &mut self.contents
    }

    /// Returns the inner resolver.
    pub fn resolver(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Composes a document that is attached to the artifact at `path`.
    ///
    /// The artifact itself takes part in cycle detection.
    pub fn compose_artifact(&mut self, outer: &MapDocument, path: &Path) -> Result<MapDocument> {
        self.stack.push(normalize_path(path).to_string_lossy().into_owned());
        let rv = self.compose(outer);
        self.stack.pop();
        rv
    }

    /// Composes `outer` with the documents of its tracked sources.
    pub fn compose(&mut self, outer: &MapDocument) -> Result<MapDocument> {
        let base_dir = outer.get_base_dir();
        let mut inners = Vec::with_capacity(outer.get_source_count() as usize);
        for source in outer.sources() {
            inners.push(self.inner_for(source, base_dir)?);
        }

        let mut builder = MapDocumentBuilder::new(outer.get_file());
        builder.set_base_dir(base_dir.map(Path::to_path_buf));

        for token in outer.tokens() {
            let (dst_line, dst_col) = token.get_dst();
            let source = match token.get_source() {
                Some(source) => source,
                None => {
                    builder.add_partial(dst_line, dst_col);
                    continue;
                }
            };

            let inner = match inners[token.get_src_id() as usize] {
                Some(ref inner) => inner,
                None => {
                    let raw = builder.add(
                        dst_line,
                        dst_col,
                        token.get_src_line(),
                        token.get_src_col(),
                        Some(source),
                        token.get_name(),
                    );
                    if let Some(contents) = outer.get_source_contents(token.get_src_id()) {
                        if !builder.has_source_contents(raw.src_id) {
                            builder.set_source_contents(raw.src_id, Some(contents));
                        }
                    }
                    continue;
                }
            };

            let inner_token = match inner.lookup_token(token.get_src_line(), token.get_src_col()) {
                Some(inner_token) if inner_token.has_source() => inner_token,
                _ => {
                    trace!(source, dst_line, dst_col, "inner lookup failed, degrading to partial");
                    builder.add_partial(dst_line, dst_col);
                    continue;
                }
            };

            let inner_source = inner_token.get_source().unwrap_or("");
            let rebased = rebase_source(inner_source, inner.get_base_dir(), base_dir);
            let raw = builder.add(
                dst_line,
                dst_col,
                inner_token.get_src_line(),
                inner_token.get_src_col(),
                Some(&rebased),
                inner_token.get_name().or_else(|| token.get_name()),
            );
            if let Some(contents) = inner.get_source_contents(inner_token.get_src_id()) {
                if !builder.has_source_contents(raw.src_id) {
                    builder.set_source_contents(raw.src_id, Some(contents));
                }
            }
        }

        Ok(builder.into_document())
    }

    fn inner_for(&mut self, source: &str, base_dir: Option<&Path>) -> Result<Option<Rc<MapDocument>>> {
        let key = source_key(base_dir, source);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        if self.stack.contains(&key) {
            return Err(Error::Cycle(source.to_string()));
        }

        let inner = match self.resolver.inner_map(source, base_dir) {
            Ok(Some(inner)) => inner,
            Ok(None) => {
                self.cache.insert(key, None);
                return Ok(None);
            }
            Err(err) => return Err(Error::BrokenChain(source.to_string(), Box::new(err))),
        };
        debug!(source, "composing through inner sourcemap");

        self.stack.push(key.clone());
        let composed = self.compose(&inner);
        self.stack.pop();
        let composed = Rc::new(composed?);

        for src_id in 0..composed.get_source_count() {
            if let Ok(text) = self.contents.content_for(&composed, src_id) {
                let text = text.into_owned();
                if let Some(inner_source) = composed.get_source(src_id) {
                    self.contents
                        .record_backfill(composed.get_base_dir(), inner_source, &text);
                }
            }
        }

        self.cache.insert(key, Some(composed.clone()));
        Ok(Some(composed))
    }
}

/// Composes a document with a resolver in one call.
pub fn compose<R: InnerMapResolver>(outer: &MapDocument, resolver: R) -> Result<MapDocument> {
    Composer::new(resolver).compose(outer)
}

/// Resolves one generated position through the chain, a layer at a time.
///
/// This does not build any composed document and serves as the reference
/// a composed document must agree with.
pub fn resolve_layered<R: InnerMapResolver>(
    outer: &MapDocument,
    resolver: &mut R,
    line: u32,
    column: u32,
) -> Result<Option<OriginalPosition>> {
    let mut pos = match outer.lookup_original(line, column) {
        Some(pos) => pos,
        None => return Ok(None),
    };
    let mut base_dir = outer.get_base_dir().map(Path::to_path_buf);
    let mut seen = HashSet::new();

    loop {
        let key = source_key(base_dir.as_deref(), &pos.source);
        if !seen.insert(key) {
            return Err(Error::Cycle(pos.source));
        }
        let inner = match resolver.inner_map(&pos.source, base_dir.as_deref()) {
            Ok(Some(inner)) => inner,
            Ok(None) => break,
            Err(err) => return Err(Error::BrokenChain(pos.source, Box::new(err))),
        };
        let next = match inner.lookup_original(pos.line, pos.column) {
            Some(next) => next,
            None => return Ok(None),
        };
        pos = OriginalPosition {
            name: next.name.or(pos.name),
            ..next
        };
        base_dir = inner.get_base_dir().map(Path::to_path_buf);
    }

    pos.source = rebase_source(&pos.source, base_dir.as_deref(), outer.get_base_dir());
    Ok(Some(pos))
}
