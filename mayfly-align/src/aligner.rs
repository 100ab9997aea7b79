//! Cluster processor: orders anchors along a read, fills the gaps between
//! consecutive anchors, and emits subread walks with gap records between the
//! walks that could not be joined.

use rayon::prelude::*;

use mayfly_io::read::SingleRead;

use crate::config::AlignerConfig;
use crate::filler::GapFiller;
use crate::graph::{AssemblyGraph, EdgeId};
use crate::types::{
    AnchorRange, GapDescription, GraphPosition, MappingPath, MappingRange, OneReadMapping,
    PathPosition, PathRange, Range,
};

/// External seeding boundary: delivers ranked chains of candidate anchors
/// and per-pair path-length limits.
pub trait ChainSeeder {
    /// Clusters of candidate anchors for one read, in chain order.
    fn chaining_paths(&self, read: &SingleRead) -> Vec<Vec<AnchorRange>>;

    /// Path-length limits for filling the gap between two anchors, given the
    /// flank lengths taken from the two edges. `(-1, _)` means the pair is
    /// inconsistent and the walk must be split between them.
    fn path_limits(
        &self,
        prev: &AnchorRange,
        next: &AnchorRange,
        seq_flank_len: usize,
        edge_flank_len: usize,
    ) -> (i64, i64);
}

/// Per-worker aligner: owns a gap filler, shares the graph read-only.
pub struct ReadAligner<'g, S> {
    g: &'g AssemblyGraph,
    seeder: S,
    cfg: AlignerConfig,
    filler: GapFiller<'g>,
}

impl<'g, S: ChainSeeder> ReadAligner<'g, S> {
    pub fn new(g: &'g AssemblyGraph, seeder: S, cfg: AlignerConfig) -> Self {
        let filler = GapFiller::new(g, cfg.clone());
        ReadAligner {
            g,
            seeder,
            cfg,
            filler,
        }
    }

    /// Maps one read onto the graph: joined subread walks plus gap records
    /// between the walks that could not be joined. Never fails; an
    /// unalignable read yields an empty mapping.
    pub fn align_read(&self, read: &SingleRead) -> OneReadMapping {
        let chains = self.seeder.chaining_paths(read);
        let s = read.seq.as_slice();
        let mut start_clusters: Vec<AnchorRange> = Vec::new();
        let mut end_clusters: Vec<AnchorRange> = Vec::new();
        let mut sorted_edges: Vec<Vec<EdgeId>> = Vec::new();
        let mut sorted_hits: Vec<MappingPath> = Vec::new();
        let mut block_gap_closer: Vec<bool> = Vec::new();
        for mut cluster in chains {
            self.process_cluster(
                s,
                &mut cluster,
                &mut start_clusters,
                &mut end_clusters,
                &mut sorted_edges,
                &mut sorted_hits,
                &mut block_gap_closer,
            );
        }
        let mut read_ranges: Vec<PathRange> = Vec::new();
        if sorted_edges.len() == 1 && self.cfg.gap.restore_ends {
            let hits = &sorted_hits[0];
            let mut range = PathRange {
                path_start: PathPosition {
                    seq_pos: hits.mapping_at(0).initial.start,
                    edge_pos: hits.mapping_at(0).mapped.start,
                },
                path_end: PathPosition {
                    seq_pos: hits.mapping_at(hits.len() - 1).initial.end,
                    edge_pos: hits.mapping_at(hits.len() - 1).mapped.end,
                },
            };
            let backward = self
                .filler
                .restore_ends_backward(s, &mut sorted_edges[0], &mut range);
            log::debug!("backward ends restoration: {:?}", backward);
            let forward = self
                .filler
                .restore_ends_forward(s, &mut sorted_edges[0], &mut range);
            log::debug!("forward ends restoration: {:?}", forward);
            read_ranges.push(range);
        } else {
            for hits in &sorted_hits {
                read_ranges.push(PathRange {
                    path_start: PathPosition {
                        seq_pos: hits.mapping_at(0).initial.start,
                        edge_pos: hits.mapping_at(0).mapped.start,
                    },
                    path_end: PathPosition {
                        seq_pos: hits.mapping_at(hits.len() - 1).initial.end,
                        edge_pos: hits.mapping_at(hits.len() - 1).mapped.end,
                    },
                });
            }
        }
        self.add_gap_descriptions(
            &start_clusters,
            &end_clusters,
            sorted_edges,
            sorted_hits,
            read_ranges,
            s,
            &block_gap_closer,
        )
    }

    /// Maps a batch of reads, one worker per read; output order follows the
    /// input order.
    pub fn align_reads(&self, reads: &[SingleRead]) -> Vec<OneReadMapping>
    where
        S: Sync,
    {
        reads.par_iter().map(|r| self.align_read(r)).collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn process_cluster(
        &self,
        s: &[u8],
        cluster: &mut [AnchorRange],
        start_clusters: &mut Vec<AnchorRange>,
        end_clusters: &mut Vec<AnchorRange>,
        sorted_edges: &mut Vec<Vec<EdgeId>>,
        sorted_hits: &mut Vec<MappingPath>,
        block_gap_closer: &mut Vec<bool>,
    ) {
        debug_assert!(!cluster.is_empty());
        if cluster.is_empty() {
            return;
        }
        cluster.sort_by(|a, b| {
            a.average_read_position
                .total_cmp(&b.average_read_position)
        });
        let cluster_start = cluster.first().unwrap().clone();
        let cluster_end = cluster.last().unwrap().clone();
        let mut edges: Vec<Vec<EdgeId>> = Vec::new();
        let mut hits: Vec<MappingPath> = Vec::new();
        self.fill_gaps_in_cluster(cluster, s, &mut edges, &mut hits);
        for cur_sorted in edges {
            if !cur_sorted.is_empty() {
                log::debug!("adding subread with {} edges", cur_sorted.len());
                start_clusters.push(cluster_start.clone());
                end_clusters.push(cluster_end.clone());
                sorted_edges.push(cur_sorted);
                // Gap closing is blocked inside a cluster.
                block_gap_closer.push(true);
            }
        }
        for cur_hits in hits {
            if !cur_hits.is_empty() {
                sorted_hits.push(cur_hits);
            }
        }
        if let Some(last) = block_gap_closer.last_mut() {
            *last = false;
        }
    }

    /// Walks the sorted anchors left to right, joining consecutive anchors
    /// through the gap filler and splitting the walk where a gap cannot be
    /// filled.
    fn fill_gaps_in_cluster(
        &self,
        cluster: &[AnchorRange],
        s: &[u8],
        edges: &mut Vec<Vec<EdgeId>>,
        hits: &mut Vec<MappingPath>,
    ) {
        let mut cur_sorted_hits = MappingPath::new();
        let mut cur_sorted_edges: Vec<EdgeId> = Vec::new();
        let mut prev: Option<&AnchorRange> = None;
        let mut idx = 0usize;
        while idx < cluster.len() {
            let cur = &cluster[idx];
            let cur_edge = cur.edge;
            if let Some(prev_anchor) = prev {
                let prev_edge = prev_anchor.edge;
                let start_v = self.g.edge_end(prev_edge);
                let end_v = self.g.edge_start(cur_edge);
                let cur_first = cur.first_trustable();
                let prev_last = prev_anchor.last_trustable();
                let read_gap_len =
                    f64::from(cur_first.read_position) - f64::from(prev_last.read_position);
                let stretched_graph_len = if prev_edge != cur_edge {
                    f64::from(cur_first.edge_position)
                        + self.g.k() as f64
                        + (self.g.length(prev_edge) as f64 - f64::from(prev_last.edge_position))
                            * self.cfg.path_limit_stretching
                } else {
                    (f64::from(cur_first.edge_position) - f64::from(prev_last.edge_position))
                        * self.cfg.path_limit_stretching
                };
                let straddles = start_v != end_v
                    || (start_v == end_v && read_gap_len > stretched_graph_len);
                let same_edge_needs_detour = prev_edge != cur_edge
                    || (prev_edge == cur_edge && stretched_graph_len < 0.0)
                    || (prev_edge == cur_edge
                        && stretched_graph_len > 0.0
                        && read_gap_len > stretched_graph_len);
                if straddles && same_edge_needs_detour {
                    log::debug!(
                        "traversing tangled region between {:?} and {:?}",
                        prev_edge,
                        cur_edge
                    );
                    let prev_len = self.g.length(prev_edge);
                    let prev_pos = (prev_last.edge_position as usize).min(prev_len);
                    let s_add = &self.g.edge_nucls(prev_edge)[prev_pos..prev_len];
                    let cur_pos =
                        (cur_first.edge_position as usize).min(self.g.total_len(cur_edge));
                    let e_add = &self.g.edge_nucls(cur_edge)[..cur_pos];
                    let limits =
                        self.seeder
                            .path_limits(prev_anchor, cur, s_add.len(), e_add.len());
                    if limits.0 == -1 {
                        log::debug!("failed to find path limits");
                        hits.push(std::mem::take(&mut cur_sorted_hits));
                        edges.push(std::mem::take(&mut cur_sorted_edges));
                        prev = None;
                        continue;
                    }
                    let seq_start = prev_last.read_position as usize;
                    let seq_end = cur_first.read_position as usize;
                    // A same-edge pair with negative stretch yields an
                    // inverted range; clamp it to an empty request.
                    let end_pos = if seq_end < seq_start { seq_start } else { seq_end };
                    let seq_string = &s[seq_start.min(s.len())..end_pos.min(s.len())];
                    let res = self.filler.run(
                        seq_string,
                        GraphPosition::new(prev_edge, prev_last.edge_position),
                        GraphPosition::new(cur_edge, cur_first.edge_position),
                        limits.0,
                        limits.1,
                    );
                    if res.intermediate_path.is_empty() {
                        hits.push(std::mem::take(&mut cur_sorted_hits));
                        edges.push(std::mem::take(&mut cur_sorted_edges));
                        prev = None;
                        continue;
                    }
                    cur_sorted_edges.extend_from_slice(&res.intermediate_path);
                }
            }
            let cur_first = cur.first_trustable();
            let cur_last = cur.last_trustable();
            cur_sorted_edges.push(cur_edge);
            cur_sorted_hits.push(
                cur_edge,
                MappingRange::new(
                    Range::new(cur_first.read_position, cur_last.read_position),
                    Range::new(cur_first.edge_position, cur_last.edge_position),
                ),
            );
            prev = Some(cur);
            idx += 1;
        }
        if !cur_sorted_edges.is_empty() {
            edges.push(cur_sorted_edges);
            hits.push(cur_sorted_hits);
        }
    }

    /// True when the gap between the two edges is explained by the graph
    /// topology: the facing vertices are a sink and a source.
    fn topology_gap(&self, first: EdgeId, second: EdgeId, oriented: bool) -> bool {
        let mut res = self.g.is_terminal(self.g.edge_end(first))
            && self.g.is_terminal(self.g.edge_start(second));
        if !oriented {
            res |= self.g.is_terminal(self.g.edge_start(first))
                && self.g.is_terminal(self.g.edge_end(second));
        }
        res
    }

    /// Builds a gap record between two flanking positions, shifting the flank
    /// offsets when the read co-ordinates overlap. Returns `None` when the
    /// overlap cannot be absorbed by either flank.
    #[allow(clippy::too_many_arguments)]
    fn create_gap_info_try_fix_overlap(
        &self,
        s: &[u8],
        seq_start: usize,
        seq_end: usize,
        left_edge: EdgeId,
        left_offset: u32,
        right_edge: EdgeId,
        right_offset: u32,
    ) -> Option<GapDescription> {
        let seq_end = seq_end.min(s.len());
        if seq_start <= seq_end {
            return Some(GapDescription {
                edge_before: left_edge,
                edge_after: right_edge,
                gap_seq: s[seq_start..seq_end].to_vec(),
                left_offset,
                right_offset,
                overlap_trimmed: false,
            });
        }
        let overlap = (seq_start - seq_end) as u32;
        if (right_offset + overlap) as usize <= self.g.length(right_edge) {
            Some(GapDescription {
                edge_before: left_edge,
                edge_after: right_edge,
                gap_seq: Vec::new(),
                left_offset,
                right_offset: right_offset + overlap,
                overlap_trimmed: true,
            })
        } else if left_offset >= overlap {
            Some(GapDescription {
                edge_before: left_edge,
                edge_after: right_edge,
                gap_seq: Vec::new(),
                left_offset: left_offset - overlap,
                right_offset,
                overlap_trimmed: true,
            })
        } else {
            None
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_gap_descriptions(
        &self,
        start_clusters: &[AnchorRange],
        end_clusters: &[AnchorRange],
        sorted_edges: Vec<Vec<EdgeId>>,
        sorted_hits: Vec<MappingPath>,
        read_ranges: Vec<PathRange>,
        s: &[u8],
        block_gap_closer: &[bool],
    ) -> OneReadMapping {
        let mut gaps: Vec<GapDescription> = Vec::new();
        for i in 0..sorted_edges.len().saturating_sub(1) {
            if block_gap_closer[i] {
                continue;
            }
            let j = i + 1;
            let before_gap = *sorted_edges[i].last().unwrap();
            let after_gap = sorted_edges[j][0];
            // No gap record for reverse-complement jumping.
            if before_gap != after_gap && before_gap != self.g.conjugate(after_gap) {
                if self.topology_gap(before_gap, after_gap, true)
                    && start_clusters[j].can_follow(&end_clusters[i])
                {
                    let a = &end_clusters[i];
                    let b = &start_clusters[j];
                    let seq_start = a.last_trustable().read_position as usize + self.g.k();
                    let seq_end = b.first_trustable().read_position as usize;
                    let left_offset = a.last_trustable().edge_position;
                    let right_offset = b.first_trustable().edge_position;
                    if let Some(gap) = self.create_gap_info_try_fix_overlap(
                        s,
                        seq_start,
                        seq_end,
                        a.edge,
                        left_offset,
                        b.edge,
                        right_offset,
                    ) {
                        log::debug!("adding gap between subreads {i} and {j}");
                        gaps.push(gap);
                    }
                }
            }
        }
        log::debug!("resulting subread count: {}", sorted_edges.len());
        OneReadMapping {
            subread_walks: sorted_edges,
            anchor_hits: sorted_hits,
            gaps,
            read_ranges,
        }
    }
}
