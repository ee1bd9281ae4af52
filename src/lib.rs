//! This library verifies the sourcemaps JavaScript build tools emit.
//!
//! ## Basic Operation
//!
//! A build tool turns a set of input files into generated artifacts, each
//! with a revision 3 sourcemap attached either as a linked `.map` file or
//! as an inline `data:` URL.  This crate decodes those maps into
//! `MapDocument`s, resolves positions in both directions through a
//! `SegmentIndex`, finds the original text of sources and composes maps
//! across several build passes.  The `verify` module drives an external
//! build tool over fixtures and checks that the maps it produces are
//! accurate.
//!
//! Usage:
//!
//! ```rust
//! use sourcemap_verify::{MapDocument, SegmentIndex};
//! let input: &[_] = b"{
//!     \"version\":3,
//!     \"sources\":[\"coolstuff.js\"],
//!     \"names\":[\"x\",\"alert\"],
//!     \"mappings\":\"AAAA,GAAIA,GAAI,EACR,IAAIA,GAAK,EAAG,CACVC,MAAM\"
//! }";
//! let doc = MapDocument::from_reader(input).unwrap();
//! let token = doc.lookup_token(0, 0).unwrap(); // line-number and column
//! println!("token: {}", token);
//!
//! let index = SegmentIndex::build(&doc);
//! let pos = index.original_position_for(0, 3).unwrap();
//! assert_eq!(pos.source, "coolstuff.js");
//! assert!(index
//!     .all_generated_positions_for("coolstuff.js", pos.line, pos.column)
//!     .iter()
//!     .any(|x| x.line == 0 && x.column <= 3));
//! ```
//!
//! Columns are counted in UTF-16 code units throughout, lines and columns
//! are 0-based.
pub use crate::artifact::{Embedding, GeneratedArtifact};
pub use crate::builder::MapDocumentBuilder;
pub use crate::compose::{compose, resolve_layered, Composer, InnerMapResolver, TrackedArtifacts};
pub use crate::content::{ContentOrigin, ContentResolver};
pub use crate::decoder::{
    decode, decode_data_url, decode_data_url_payload, decode_slice, DataUrlEncoding,
};
pub use crate::detector::{
    is_sourcemap_slice, locate_sourcemap_reference, locate_sourcemap_reference_slice,
    SourceMapRef,
};
pub use crate::errors::{Error, ErrorCategory, Result};
pub use crate::index::SegmentIndex;
pub use crate::sourceview::SourceView;
pub use crate::types::{
    GeneratedPosition, MapDocument, OriginalPosition, RawToken, Token, TokenIter,
};
pub use crate::utils::{make_relative_path, normalize_path, rebase_source, resolve_source_path};

mod artifact;
mod builder;
mod compose;
mod content;
mod decoder;
mod detector;
mod encoder;
mod errors;
mod index;
mod js_identifiers;
mod jsontypes;
mod sourceview;
mod types;
mod utils;
mod vlq;
pub mod verify;

#[doc(hidden)]
pub mod internals {
    pub use super::vlq::{encode_vlq, generate_vlq_segment, parse_vlq_segment};
}
