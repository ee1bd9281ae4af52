//! Generated files together with the document attached to them.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::decoder::{decode_data_url_payload, decode_slice, DataUrlEncoding};
use crate::detector::{find_reference_line, locate_sourcemap_reference_slice};
use crate::errors::{Error, Result};
use crate::types::MapDocument;
use crate::utils::rebase_source;

/// How a document is attached to its generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Embedding {
    /// `sourceMappingURL=<file>.map` next to the artifact
    Linked,
    /// `sourceMappingURL=data:application/json;base64,...`
    InlineBase64,
    /// `sourceMappingURL=data:application/json,...` percent-escaped
    InlinePercent,
}

impl Embedding {
    /// All supported embeddings.
    pub fn all() -> Vec<Embedding> {
        vec![
            Embedding::Linked,
            Embedding::InlineBase64,
            Embedding::InlinePercent,
        ]
    }
}

impl fmt::Display for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Embedding::Linked => "linked",
            Embedding::InlineBase64 => "inline-base64",
            Embedding::InlinePercent => "inline-percent",
        })
    }
}

/// A generated file with its decoded document.
#[derive(Debug, Clone)]
pub struct GeneratedArtifact {
    path: PathBuf,
    text: String,
    map: MapDocument,
    embedding: Embedding,
    map_path: Option<PathBuf>,
}

fn is_css(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "css")
}

impl GeneratedArtifact {
    /// Reads a generated file and the document it references.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GeneratedArtifact> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        GeneratedArtifact::from_text(path, text)
    }

    /// Decodes the document referenced by already loaded text.
    ///
    /// Linked references are read relative to `path`'s directory.
    pub fn from_text<P: Into<PathBuf>>(path: P, text: String) -> Result<GeneratedArtifact> {
        let path = path.into();
        let reference = locate_sourcemap_reference_slice(text.as_bytes())?;
        let url = reference
            .get_url()
            .ok_or_else(|| Error::MissingReference(path.clone()))?;

        let (mut map, embedding, map_path) = if reference.is_embedded() {
            let (encoding, data) = decode_data_url_payload(url)?;
            let embedding = match encoding {
                DataUrlEncoding::Base64 => Embedding::InlineBase64,
                DataUrlEncoding::Percent => Embedding::InlinePercent,
            };
            (decode_slice(&data)?, embedding, None)
        } else {
            let map_path = reference
                .resolve_path(&path)
                .ok_or_else(|| Error::MissingReference(path.clone()))?;
            let data = fs::read(&map_path)?;
            (decode_slice(&data)?, Embedding::Linked, Some(map_path))
        };

        let base_dir = map_path
            .as_deref()
            .unwrap_or(path.as_path())
            .parent()
            .map(Path::to_path_buf);
        map.set_base_dir(base_dir);

        Ok(GeneratedArtifact {
            path,
            text,
            map,
            embedding,
            map_path,
        })
    }

    /// Returns the path of the generated file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the full generated text, reference included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the generated text without the reference line.
    pub fn code(&self) -> &str {
        match find_reference_line(&self.text) {
            Some(offset) => &self.text[..offset],
            None => &self.text,
        }
    }

    /// Returns the attached document.
    pub fn document(&self) -> &MapDocument {
        &self.map
    }

    /// Converts the artifact into its document.
    pub fn into_document(self) -> MapDocument {
        self.map
    }

    /// Returns how the document was attached.
    pub fn embedding(&self) -> Embedding {
        self.embedding
    }

    /// Returns the path of a linked map file.
    pub fn map_path(&self) -> Option<&Path> {
        self.map_path.as_deref()
    }

    /// Returns a copy of the document with sources relative to `dir`.
    pub fn rebased_document(&self, dir: &Path) -> MapDocument {
        let mut doc = self.map.clone();
        for idx in 0..doc.get_source_count() {
            if let Some(source) = self.map.get_source(idx) {
                let rebased = rebase_source(source, self.map.get_base_dir(), Some(dir));
                doc.set_source(idx, &rebased);
            }
        }
        doc.set_base_dir(Some(dir));
        doc
    }

    /// Writes the code to `dest` with the document attached as requested.
    ///
    /// Linked documents are written to `<dest>.map`.  Returns the written
    /// artifact.
    pub fn write_to(&self, dest: &Path, embedding: Embedding) -> Result<GeneratedArtifact> {
        let dir = dest.parent().unwrap_or_else(|| Path::new(""));
        let doc = self.rebased_document(dir);

        let url = match embedding {
            Embedding::Linked => {
                let file_name = dest
                    .file_name()
                    .map(|x| x.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let map_name = format!("{}.map", file_name);
                fs::write(dir.join(&map_name), doc.to_json_string()?)?;
                map_name
            }
            Embedding::InlineBase64 => doc.to_data_url(DataUrlEncoding::Base64)?,
            Embedding::InlinePercent => doc.to_data_url(DataUrlEncoding::Percent)?,
        };

        let mut text = self.code().to_string();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        if is_css(dest) {
            text.push_str(&format!("/*# sourceMappingURL={} */\n", url));
        } else {
            text.push_str(&format!("//# sourceMappingURL={}\n", url));
        }
        fs::write(dest, &text)?;
        GeneratedArtifact::from_text(dest, text)
    }
}
