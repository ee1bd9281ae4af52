//! Fixture descriptions and the flag permutations they run under.
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::Embedding;
use crate::errors::Result;
use crate::types::MapDocument;
use crate::utils::{normalize_path, resolve_source_path};

/// Line terminators fixture files are written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    /// Rewrites all line terminators of `text`.
    pub fn apply(self, text: &str) -> String {
        let text = text.replace("\r\n", "\n");
        match self {
            LineEnding::Lf => text,
            LineEnding::Crlf => text.replace('\n', "\r\n"),
        }
    }
}

/// How the entry point is handed to the build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryMode {
    File,
    Stdin,
}

/// How the build tool should attach its maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapMode {
    Linked,
    Inline,
}

/// The orders an artifact is re-bundled in during the chain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainOrder {
    /// the artifact is the only entry
    Alone,
    /// the artifact is imported before the extra file
    ArtifactFirst,
    /// the artifact is imported after the extra file
    ArtifactSecond,
}

impl ChainOrder {
    /// All supported orders.
    pub fn all() -> Vec<ChainOrder> {
        vec![
            ChainOrder::Alone,
            ChainOrder::ArtifactFirst,
            ChainOrder::ArtifactSecond,
        ]
    }

    /// Returns the text of the entry file importing both inputs.
    ///
    /// `None` means the artifact itself is the entry.
    pub fn entry_source(self, artifact: &str, extra: &str) -> Option<String> {
        let (first, second) = match self {
            ChainOrder::Alone => return None,
            ChainOrder::ArtifactFirst => (artifact, extra),
            ChainOrder::ArtifactSecond => (extra, artifact),
        };
        Some(format!(
            "import \"./{}\";\nimport \"./{}\";\n",
            first, second
        ))
    }
}

impl fmt::Display for ChainOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            ChainOrder::Alone => "alone",
            ChainOrder::ArtifactFirst => "artifact-first",
            ChainOrder::ArtifactSecond => "artifact-second",
        })
    }
}

/// One combination of build flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildFlags {
    pub minify: bool,
    pub line_ending: LineEnding,
    pub entry_mode: EntryMode,
    pub bundle: bool,
    pub code_splitting: bool,
    pub sourcemap: MapMode,
}

impl Default for BuildFlags {
    fn default() -> BuildFlags {
        BuildFlags {
            minify: false,
            line_ending: LineEnding::Lf,
            entry_mode: EntryMode::File,
            bundle: false,
            code_splitting: false,
            sourcemap: MapMode::Linked,
        }
    }
}

impl fmt::Display for BuildFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![];
        if self.minify {
            parts.push("minify");
        }
        if self.line_ending == LineEnding::Crlf {
            parts.push("crlf");
        }
        if self.entry_mode == EntryMode::Stdin {
            parts.push("stdin");
        }
        if self.bundle {
            parts.push("bundle");
        }
        if self.code_splitting {
            parts.push("splitting");
        }
        parts.push(match self.sourcemap {
            MapMode::Linked => "linked",
            MapMode::Inline => "inline",
        });
        f.write_str(&parts.join(","))
    }
}

fn both() -> Vec<bool> {
    vec![false, true]
}

fn no() -> Vec<bool> {
    vec![false]
}

fn all_line_endings() -> Vec<LineEnding> {
    vec![LineEnding::Lf, LineEnding::Crlf]
}

fn all_entry_modes() -> Vec<EntryMode> {
    vec![EntryMode::File, EntryMode::Stdin]
}

fn all_map_modes() -> Vec<MapMode> {
    vec![MapMode::Linked, MapMode::Inline]
}

/// The flag values a fixture is run with.
///
/// Every combination is tried, except that stdin requires exactly one
/// entry and code splitting requires bundling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matrix {
    pub minify: Vec<bool>,
    pub line_endings: Vec<LineEnding>,
    pub entry_modes: Vec<EntryMode>,
    pub bundle: Vec<bool>,
    pub code_splitting: Vec<bool>,
    pub sourcemap: Vec<MapMode>,
}

impl Default for Matrix {
    fn default() -> Matrix {
        Matrix {
            minify: both(),
            line_endings: all_line_endings(),
            entry_modes: all_entry_modes(),
            bundle: both(),
            code_splitting: no(),
            sourcemap: all_map_modes(),
        }
    }
}

/// An extra, unrelated file bundled next to a re-fed artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFile {
    pub name: String,
    pub text: String,
}

impl Default for ExtraFile {
    fn default() -> ExtraFile {
        ExtraFile {
            name: "extra.js".into(),
            text: "console.log(\"extra\");\n".into(),
        }
    }
}

/// Settings of the chain check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSetup {
    pub embeddings: Vec<Embedding>,
    pub orders: Vec<ChainOrder>,
    pub extra: ExtraFile,
}

impl Default for ChainSetup {
    fn default() -> ChainSetup {
        ChainSetup {
            embeddings: Embedding::all(),
            orders: ChainOrder::all(),
            extra: ExtraFile::default(),
        }
    }
}

/// A search text placed at known locations of fixture files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub text: String,
    pub files: Vec<String>,
}

/// A set of input files plus what to verify about their build output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub files: BTreeMap<String, String>,
    pub entries: Vec<String>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub matrix: Matrix,
    #[serde(default)]
    pub chain: Option<ChainSetup>,
}

impl Fixture {
    /// Loads fixtures from a JSON manifest (an array of fixtures).
    pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<Fixture>> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Returns the tag failures of this fixture are reported with.
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.name)
    }

    /// Returns every valid flag combination of the matrix.
    pub fn permutations(&self) -> Vec<BuildFlags> {
        let m = &self.matrix;
        let mut rv = vec![];
        for &minify in &m.minify {
            for &line_ending in &m.line_endings {
                for &entry_mode in &m.entry_modes {
                    for &bundle in &m.bundle {
                        for &code_splitting in &m.code_splitting {
                            for &sourcemap in &m.sourcemap {
                                if entry_mode == EntryMode::Stdin && self.entries.len() != 1 {
                                    continue;
                                }
                                if code_splitting && !bundle {
                                    continue;
                                }
                                rv.push(BuildFlags {
                                    minify,
                                    line_ending,
                                    entry_mode,
                                    bundle,
                                    code_splitting,
                                    sourcemap,
                                });
                            }
                        }
                    }
                }
            }
        }
        rv
    }

    /// Writes the fixture files into `dir` with the requested line endings.
    pub fn write_to(&self, dir: &Path, line_ending: LineEnding) -> Result<WrittenFixture> {
        let mut files = vec![];
        for (name, text) in &self.files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let text = line_ending.apply(text);
            fs::write(&path, &text)?;
            files.push(FixtureFile {
                name: name.clone(),
                path: normalize_path(&path),
                text,
            });
        }
        Ok(WrittenFixture {
            dir: dir.to_path_buf(),
            files,
        })
    }
}

/// One file of a written fixture.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

/// The fixture files as they were written to disk.
#[derive(Debug, Clone)]
pub struct WrittenFixture {
    pub dir: PathBuf,
    pub files: Vec<FixtureFile>,
}

impl WrittenFixture {
    /// Looks up a file by its fixture name.
    pub fn get(&self, name: &str) -> Option<&FixtureFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Finds the fixture file a document source refers to.
    ///
    /// Sources that resolve to the written path match.  Sources that do
    /// not resolve there (stdin input, virtual paths) match by name.
    pub fn match_source(&self, base_dir: Option<&Path>, source: &str) -> Option<&FixtureFile> {
        if let Some(path) = resolve_source_path(base_dir, source) {
            if let Some(file) = self.files.iter().find(|f| f.path == path) {
                return Some(file);
            }
        }
        let source = source.replace('\\', "/");
        self.files.iter().find(|f| {
            source == f.name || source.ends_with(&format!("/{}", f.name))
        })
    }

    /// Finds the source index a fixture file has in a document.
    pub fn source_id(&self, doc: &MapDocument, name: &str) -> Option<u32> {
        doc.sources()
            .position(|source| {
                self.match_source(doc.get_base_dir(), source)
                    .map_or(false, |f| f.name == name)
            })
            .map(|x| x as u32)
    }
}

#[test]
fn test_permutations_skip_invalid_combinations() {
    let mut fixture = Fixture {
        name: "multi".into(),
        kind: None,
        files: BTreeMap::new(),
        entries: vec!["a.js".into(), "b.js".into()],
        markers: vec![],
        name_prefix: None,
        matrix: Matrix::default(),
        chain: None,
    };
    fixture.matrix.code_splitting = both();
    let perms = fixture.permutations();
    assert!(perms.iter().all(|p| p.entry_mode == EntryMode::File));
    assert!(perms.iter().all(|p| !p.code_splitting || p.bundle));
    // minify x line endings x (bundle off, bundle on, bundle+split) x map modes
    assert_eq!(perms.len(), 2 * 2 * 3 * 2);

    fixture.entries.pop();
    assert_eq!(fixture.permutations().len(), 2 * 2 * 2 * 3 * 2);
}

#[test]
fn test_chain_entry_source() {
    assert_eq!(ChainOrder::Alone.entry_source("input.js", "extra.js"), None);
    assert_eq!(
        ChainOrder::ArtifactSecond
            .entry_source("input.js", "extra.js")
            .unwrap(),
        "import \"./extra.js\";\nimport \"./input.js\";\n"
    );
}
