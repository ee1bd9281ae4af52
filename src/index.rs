//! Forward and reverse lookups over the segments of one document.
use std::collections::HashMap;

use crate::types::{GeneratedPosition, MapDocument, OriginalPosition};

/// Lookup structures for a `MapDocument`.
///
/// Forward lookups go straight to the document's per-line token index.
/// Reverse lookups group every non-partial token by its original
/// `(source, line, column)` triple.
pub struct SegmentIndex<'a> {
    doc: &'a MapDocument,
    reverse: HashMap<(u32, u32, u32), Vec<GeneratedPosition>>,
}

impl<'a> SegmentIndex<'a> {
    /// Builds the index for a document.
    pub fn build(doc: &'a MapDocument) -> SegmentIndex<'a> {
        let mut reverse: HashMap<_, Vec<GeneratedPosition>> = HashMap::new();
        for raw in doc.raw_tokens().iter().filter(|raw| !raw.is_partial()) {
            reverse
                .entry((raw.src_id, raw.src_line, raw.src_col))
                .or_default()
                .push(GeneratedPosition {
                    line: raw.dst_line,
                    column: raw.dst_col,
                });
        }
        for positions in reverse.values_mut() {
            positions.sort();
            positions.dedup();
        }
        SegmentIndex { doc, reverse }
    }

    /// Returns the indexed document.
    pub fn document(&self) -> &'a MapDocument {
        self.doc
    }

    /// Resolves a generated position to its original position.
    ///
    /// This is the last segment on `line` whose column is not greater
    /// than `column`.  `None` if the line has no such segment or the
    /// segment is partial.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        self.doc.lookup_original(line, column)
    }

    /// Returns every generated position mapped from an original position.
    pub fn all_generated_positions_for(
        &self,
        source: &str,
        line: u32,
        column: u32,
    ) -> Vec<GeneratedPosition> {
        // duplicate sources are reported elsewhere, so every id counts
        let mut rv: Vec<GeneratedPosition> = self
            .doc
            .sources()
            .enumerate()
            .filter(|&(_, x)| x == source)
            .flat_map(|(src_id, _)| self.generated_positions_for_id(src_id as u32, line, column))
            .collect();
        rv.sort();
        rv.dedup();
        rv
    }

    /// Like `all_generated_positions_for` with a source index.
    pub fn generated_positions_for_id(
        &self,
        src_id: u32,
        line: u32,
        column: u32,
    ) -> Vec<GeneratedPosition> {
        self.reverse
            .get(&(src_id, line, column))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of distinct original positions in the index.
    pub fn original_position_count(&self) -> usize {
        self.reverse.len()
    }
}

#[test]
fn test_reverse_lookup_is_complete() {
    let mut builder = crate::builder::MapDocumentBuilder::new(None);
    builder.add(0, 0, 3, 7, Some("a.js"), Some("value"));
    builder.add(0, 9, 3, 7, Some("a.js"), Some("value"));
    builder.add(2, 4, 3, 7, Some("a.js"), None);
    builder.add(2, 8, 3, 8, Some("a.js"), None);
    builder.add_partial(2, 12);
    let doc = builder.into_document();
    let index = SegmentIndex::build(&doc);

    let positions = index.all_generated_positions_for("a.js", 3, 7);
    assert_eq!(
        positions,
        vec![
            GeneratedPosition { line: 0, column: 0 },
            GeneratedPosition { line: 0, column: 9 },
            GeneratedPosition { line: 2, column: 4 },
        ]
    );
    assert!(index.all_generated_positions_for("b.js", 3, 7).is_empty());
    assert_eq!(index.original_position_count(), 2);
    assert!(index.original_position_for(2, 13).is_none());
    assert!(index.original_position_for(2, 3).is_none());
    assert_eq!(index.original_position_for(0, 10).unwrap().column, 7);
}
