//! Open-ended reconstructor: extend a walk from a start position until the
//! read is exhausted. Used to restore the unanchored ends of a read.

use crate::config::GapClosingConfig;
use crate::distance::shw_distance_single;
use crate::graph::{AssemblyGraph, EdgeId};
use crate::types::MappingPath;

use super::{GraphState, QueueState, SearchCore, SearchTarget};

struct EndsTarget;

impl SearchTarget for EndsTarget {
    fn add_state(
        &mut self,
        core: &mut SearchCore<'_>,
        cur: &QueueState,
        e: EdgeId,
        ed: i32,
    ) -> bool {
        let mut found_path = false;
        let g = core.g;
        core.add_new_edge(GraphState::new(e, 0, g.length(e) as i32), *cur, ed);
        let remaining = core.ss_len() - cur.i;
        // The edge (plus slack) must be able to absorb the whole read tail
        // before a final semi-global alignment is worth attempting.
        if (g.length(e) + g.k()) as i32 + core.path_max_length - ed > remaining
            && core.path_max_length - ed >= 0
            && cur.i + 1 < core.ss_len()
        {
            let mut position = -1;
            let score = shw_distance_single(
                &core.ss[(cur.i + 1) as usize..],
                g.edge_nucls(e),
                core.path_max_length - ed,
                &mut position,
            );
            if score >= 0 {
                core.path_max_length = core.path_max_length.min(ed + score);
                let state =
                    QueueState::new(GraphState::new(e, 0, position + 1), core.ss_len() - 1);
                core.update(state, *cur, ed + score);
                if ed + score == core.path_max_length {
                    core.min_score = ed + score;
                    found_path = true;
                    core.end_qstate = state;
                }
            }
        }
        found_path
    }

    fn is_end_position(&self, core: &SearchCore<'_>, cur: &QueueState) -> bool {
        cur.i == core.end_qstate.i
    }
}

/// Bounded search that consumes a read tail by walking outward from a start
/// position; any edge span is acceptable once the read is exhausted.
pub struct EndsReconstructor<'g> {
    core: SearchCore<'g>,
    target: EndsTarget,
}

impl<'g> EndsReconstructor<'g> {
    pub fn new(
        g: &'g AssemblyGraph,
        cfg: &GapClosingConfig,
        ss: Vec<u8>,
        start_e: EdgeId,
        start_p: i32,
        path_max_length: i32,
    ) -> Self {
        let mut core = SearchCore::new(g, cfg, ss, start_e, start_p, path_max_length);
        // The end state stays the sentinel until a finalisation discovers it.
        let total = g.total_len(start_e) as i32;
        if total - start_p + core.path_max_length > core.ss_len() {
            let sp = start_p.clamp(0, total) as usize;
            let mut position = -1;
            let score = shw_distance_single(
                &core.ss,
                &g.edge_nucls(start_e)[sp..],
                core.path_max_length,
                &mut position,
            );
            if score != -1 {
                core.path_max_length = core.path_max_length.min(score);
                let state = QueueState::new(
                    GraphState::new(start_e, start_p, start_p + position + 1),
                    core.ss_len() - 1,
                );
                core.update(state, QueueState::SENTINEL, score);
                if score == core.path_max_length {
                    core.min_score = score;
                    core.end_qstate = state;
                }
            }
        }
        EndsReconstructor {
            core,
            target: EndsTarget,
        }
    }

    /// Runs the search; returns true when the read tail was fully consumed.
    pub fn close_gap(&mut self) -> bool {
        self.core.run(&mut self.target)
    }

    pub fn path(&self) -> Vec<EdgeId> {
        self.core.path()
    }

    pub fn mapping_path(&self) -> MappingPath {
        self.core.mapping_path()
    }

    /// Best finalised edit distance, `-1` when the tail was not consumed.
    pub fn edit_distance(&self) -> i32 {
        self.core.edit_distance()
    }

    /// End offset on the final edge of the reconstructed walk.
    pub fn path_end_position(&self) -> i32 {
        self.core.path_end_position()
    }

    pub fn seq_end_position(&self) -> i32 {
        self.core.seq_end_position()
    }
}
