//! Data model of the aligner: anchors, mapping paths, gap records.

use serde::{Deserialize, Serialize};

use crate::graph::EdgeId;

/// A co-ordinate pair stating that a k-mer of the read lies at an offset on
/// an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingInstance {
    pub read_position: u32,
    pub edge_position: u32,
}

impl MappingInstance {
    pub fn new(read_position: u32, edge_position: u32) -> Self {
        MappingInstance {
            read_position,
            edge_position,
        }
    }
}

/// A candidate anchor of one read against one edge: a sorted run of k-mer
/// hits with a trusted sub-range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRange {
    pub edge: EdgeId,
    /// Hits ordered by read position.
    pub sorted_positions: Vec<MappingInstance>,
    pub first_trustable_index: usize,
    pub last_trustable_index: usize,
    /// Sort key inside a cluster.
    pub average_read_position: f64,
}

impl AnchorRange {
    pub fn new(edge: EdgeId, sorted_positions: Vec<MappingInstance>) -> Self {
        debug_assert!(!sorted_positions.is_empty());
        let last = sorted_positions.len() - 1;
        let avg = sorted_positions
            .iter()
            .map(|m| f64::from(m.read_position))
            .sum::<f64>()
            / sorted_positions.len() as f64;
        AnchorRange {
            edge,
            sorted_positions,
            first_trustable_index: 0,
            last_trustable_index: last,
            average_read_position: avg,
        }
    }

    pub fn first_trustable(&self) -> MappingInstance {
        self.sorted_positions[self.first_trustable_index]
    }

    pub fn last_trustable(&self) -> MappingInstance {
        self.sorted_positions[self.last_trustable_index]
    }

    /// True when this anchor starts at or after the end of `prev` on the
    /// read, i.e. the two can flank a gap in read order.
    pub fn can_follow(&self, prev: &AnchorRange) -> bool {
        prev.last_trustable().read_position <= self.first_trustable().read_position
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        Range { start, end }
    }
}

/// Paired read/edge intervals of one mapped stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRange {
    pub initial: Range,
    pub mapped: Range,
}

impl MappingRange {
    pub fn new(initial: Range, mapped: Range) -> Self {
        MappingRange { initial, mapped }
    }
}

/// Ordered sequence of `(edge, mapping range)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPath {
    items: Vec<(EdgeId, MappingRange)>,
}

impl MappingPath {
    pub fn new() -> Self {
        MappingPath::default()
    }

    pub fn push(&mut self, edge: EdgeId, range: MappingRange) {
        self.items.push((edge, range));
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn mapping_at(&self, i: usize) -> &MappingRange {
        &self.items[i].1
    }

    pub fn edge_at(&self, i: usize) -> EdgeId {
        self.items[i].0
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EdgeId, MappingRange)> {
        self.items.iter()
    }
}

/// Read/edge offsets at one end of a reconstructed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPosition {
    pub seq_pos: u32,
    pub edge_pos: u32,
}

/// Start/end co-ordinates of a reconstructed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRange {
    pub path_start: PathPosition,
    pub path_end: PathPosition,
}

/// A position on one edge, used when requesting a gap fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphPosition {
    pub edge: EdgeId,
    pub position: u32,
}

impl GraphPosition {
    pub fn new(edge: EdgeId, position: u32) -> Self {
        GraphPosition { edge, position }
    }
}

/// An unresolved gap between two subread walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapDescription {
    pub edge_before: EdgeId,
    pub edge_after: EdgeId,
    /// Read bases spanning the gap; empty when the flanks were trimmed to
    /// remove an overlap.
    pub gap_seq: Vec<u8>,
    pub left_offset: u32,
    pub right_offset: u32,
    /// True when the flank offsets were shifted to resolve a read overlap.
    pub overlap_trimmed: bool,
}

/// Mapping of one read: joined subread walks, their anchor hits, gap records
/// between the walks the core could not join, and per-walk read ranges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneReadMapping {
    pub subread_walks: Vec<Vec<EdgeId>>,
    pub anchor_hits: Vec<MappingPath>,
    pub gaps: Vec<GapDescription>,
    pub read_ranges: Vec<PathRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_average_and_trustable() {
        let a = AnchorRange::new(
            EdgeId(0),
            vec![
                MappingInstance::new(10, 0),
                MappingInstance::new(20, 10),
                MappingInstance::new(30, 20),
            ],
        );
        assert!((a.average_read_position - 20.0).abs() < 1e-9);
        assert_eq!(a.first_trustable().read_position, 10);
        assert_eq!(a.last_trustable().edge_position, 20);
    }

    #[test]
    fn can_follow_requires_read_order() {
        let a = AnchorRange::new(EdgeId(0), vec![MappingInstance::new(10, 0)]);
        let b = AnchorRange::new(EdgeId(1), vec![MappingInstance::new(30, 0)]);
        assert!(b.can_follow(&a));
        assert!(!a.can_follow(&b));
    }

    #[test]
    fn mapping_path_reverse() {
        let mut p = MappingPath::new();
        p.push(
            EdgeId(0),
            MappingRange::new(Range::new(0, 5), Range::new(0, 5)),
        );
        p.push(
            EdgeId(1),
            MappingRange::new(Range::new(5, 9), Range::new(0, 4)),
        );
        p.reverse();
        assert_eq!(p.edge_at(0), EdgeId(1));
        assert_eq!(p.mapping_at(1).initial.end, 5);
    }
}
