//! Closed-ended gap filler: search from a start position on a start edge to
//! an end position on an end edge, restricted to a reachable-vertex set.

use rustc_hash::FxHashMap;

use crate::config::GapClosingConfig;
use crate::distance::nw_distance;
use crate::graph::{AssemblyGraph, EdgeId, VertexId};
use crate::types::MappingPath;

use super::{GraphState, QueueState, SearchCore, SearchTarget};

/// Vertices admitted into a gap search, with their graph distance from the
/// search source. An empty map leaves the search unrestricted.
pub type ReachableVertices = FxHashMap<VertexId, u32>;

struct GapTarget<'r> {
    end_e: EdgeId,
    end_p: i32,
    /// Vertices admitted into the search; empty means unrestricted.
    reachable: &'r ReachableVertices,
}

impl SearchTarget for GapTarget<'_> {
    fn add_state(
        &mut self,
        core: &mut SearchCore<'_>,
        cur: &QueueState,
        e: EdgeId,
        ed: i32,
    ) -> bool {
        let mut found_path = false;
        let g = core.g;
        let unrestricted = self.reachable.is_empty();
        if unrestricted || self.reachable.contains_key(&g.edge_end(cur.gs.e)) {
            if unrestricted || self.reachable.contains_key(&g.edge_end(e)) {
                let next = GraphState::new(e, 0, g.length(e) as i32);
                core.add_new_edge(next, *cur, ed);
            }
            if e == self.end_e && core.path_max_length - ed >= 0 && cur.i + 1 < core.ss_len() {
                let hi = self.end_p.clamp(0, g.total_len(e) as i32) as usize;
                let edge_str = &g.edge_nucls(e)[..hi];
                let score = nw_distance(
                    &core.ss[(cur.i + 1) as usize..],
                    edge_str,
                    core.path_max_length - ed,
                );
                if score != -1 {
                    core.path_max_length = core.path_max_length.min(ed + score);
                    let state =
                        QueueState::new(GraphState::new(e, 0, self.end_p), core.ss_len() - 1);
                    core.update(state, *cur, ed + score);
                    if ed + score == core.path_max_length {
                        core.min_score = ed + score;
                        found_path = true;
                    }
                }
            }
        }
        found_path
    }

    fn is_end_position(&self, core: &SearchCore<'_>, cur: &QueueState) -> bool {
        cur.i == core.end_qstate.i
            && cur.gs.e == core.end_qstate.gs.e
            && cur.gs.end_pos == core.end_qstate.gs.end_pos
    }
}

/// Bounded search for a walk between two fixed edge positions whose spelled
/// sequence is closest in edit distance to the target read substring.
pub struct GapDijkstra<'g, 'r> {
    core: SearchCore<'g>,
    target: GapTarget<'r>,
}

impl<'g, 'r> GapDijkstra<'g, 'r> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        g: &'g AssemblyGraph,
        cfg: &GapClosingConfig,
        ss: Vec<u8>,
        start_e: EdgeId,
        end_e: EdgeId,
        start_p: i32,
        end_p: i32,
        path_max_length: i32,
        reachable: &'r ReachableVertices,
    ) -> Self {
        let mut core = SearchCore::new(g, cfg, ss, start_e, start_p, path_max_length);
        core.end_qstate =
            QueueState::new(GraphState::new(end_e, 0, end_p), core.ss_len() - 1);
        if core.ss_len() == 0 && start_e == end_e && end_p == start_p {
            // Zero-length request on an empty span: immediately solved.
            let state = QueueState::new(GraphState::new(start_e, start_p, end_p), -1);
            core.update(state, QueueState::SENTINEL, 0);
            core.min_score = 0;
            core.end_qstate = state;
        } else if start_e == end_e && end_p - start_p > 0 {
            // Same-edge fast path: a single global alignment may settle it.
            let total = g.total_len(start_e) as i32;
            let lo = start_p.clamp(0, total) as usize;
            let hi = end_p.clamp(0, total) as usize;
            let edge_str = &g.edge_nucls(start_e)[lo..hi.max(lo)];
            let score = nw_distance(&core.ss, edge_str, core.path_max_length);
            if score != -1 {
                core.path_max_length = core.path_max_length.min(score);
                let state = QueueState::new(
                    GraphState::new(start_e, start_p, end_p),
                    core.ss_len() - 1,
                );
                core.update(state, QueueState::SENTINEL, score);
                if score == core.path_max_length {
                    core.min_score = score;
                    core.end_qstate = state;
                }
            }
        }
        GapDijkstra {
            core,
            target: GapTarget {
                end_e,
                end_p,
                reachable,
            },
        }
    }

    /// Runs the search; returns true when a path to the end state was found.
    pub fn close_gap(&mut self) -> bool {
        self.core.run(&mut self.target)
    }

    pub fn path(&self) -> Vec<EdgeId> {
        self.core.path()
    }

    pub fn mapping_path(&self) -> MappingPath {
        self.core.mapping_path()
    }

    /// Best finalised edit distance, `-1` when no path was found.
    pub fn edit_distance(&self) -> i32 {
        self.core.edit_distance()
    }

    pub fn path_end_position(&self) -> i32 {
        self.core.path_end_position()
    }

    pub fn seq_end_position(&self) -> i32 {
        self.core.seq_end_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn no_restriction() -> ReachableVertices {
        ReachableVertices::default()
    }

    fn wide_cfg() -> GapClosingConfig {
        GapClosingConfig {
            run_dijkstra: true,
            queue_limit: 1_000_000,
            iteration_limit: 1_000_000,
            ..GapClosingConfig::default()
        }
    }

    #[test]
    fn same_edge_literal_substring_at_budget_zero() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let e = b.add_edge(v0, v1, b"ACGTACGT");
        let g = b.build();
        let reach = no_restriction();
        let mut search =
            GapDijkstra::new(&g, &wide_cfg(), b"CGTA".to_vec(), e, e, 1, 5, 0, &reach);
        assert!(search.close_gap());
        assert_eq!(search.edit_distance(), 0);
        assert_eq!(search.path(), vec![e]);
    }

    #[test]
    fn same_edge_budget_zero_rejects_mismatch() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let e = b.add_edge(v0, v1, b"ACGTACGT");
        let g = b.build();
        let reach = no_restriction();
        let mut search =
            GapDijkstra::new(&g, &wide_cfg(), b"CTTA".to_vec(), e, e, 1, 5, 0, &reach);
        assert!(!search.close_gap());
        assert_eq!(search.edit_distance(), -1);
        assert!(search.path().is_empty());
    }

    #[test]
    fn two_edge_walk_exact() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        let g = b.build();
        let reach = no_restriction();
        // spelled walk: e1[0..2] + e2[0..2] = "AAAA"
        let mut search =
            GapDijkstra::new(&g, &wide_cfg(), b"AAAA".to_vec(), e1, e2, 0, 2, 2, &reach);
        assert!(search.close_gap());
        assert_eq!(search.edit_distance(), 0);
        assert_eq!(search.path(), vec![e1, e2]);
    }

    #[test]
    fn two_edge_walk_with_substitution() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        let g = b.build();
        let reach = no_restriction();
        // find_shortest_path keeps tightening instead of stopping on the
        // first finalised path, so the optimal score is deterministic.
        let cfg = GapClosingConfig {
            find_shortest_path: true,
            ..wide_cfg()
        };
        let mut search = GapDijkstra::new(&g, &cfg, b"ATAA".to_vec(), e1, e2, 0, 2, 2, &reach);
        assert!(search.close_gap());
        assert_eq!(search.edit_distance(), 1);
        assert_eq!(search.path(), vec![e1, e2]);
    }

    #[test]
    fn rerun_on_reported_score_is_exact() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        let g = b.build();
        let reach = no_restriction();
        let cfg = GapClosingConfig {
            find_shortest_path: true,
            ..wide_cfg()
        };
        let mut first = GapDijkstra::new(&g, &cfg, b"ATAA".to_vec(), e1, e2, 0, 2, 5, &reach);
        assert!(first.close_gap());
        let s = first.edit_distance();
        assert!(s >= 0);
        // Re-running with the reported score as the budget returns it exactly.
        let mut second = GapDijkstra::new(&g, &cfg, b"ATAA".to_vec(), e1, e2, 0, 2, s, &reach);
        assert!(second.close_gap());
        assert_eq!(second.edit_distance(), s);
    }

    #[test]
    fn empty_substring_on_empty_span() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let e = b.add_edge(v0, v1, b"ACGTACGT");
        let g = b.build();
        let reach = no_restriction();
        let mut search = GapDijkstra::new(&g, &wide_cfg(), Vec::new(), e, e, 3, 3, 5, &reach);
        assert!(search.close_gap());
        assert_eq!(search.edit_distance(), 0);
        assert_eq!(search.path(), vec![e]);
    }

    #[test]
    fn iteration_cap_reports_failure() {
        // A four-edge chain needs more pops than the cap allows.
        let mut b = GraphBuilder::new(3);
        let vs: Vec<_> = (0..5).map(|_| b.add_vertex()).collect();
        let e1 = b.add_edge(vs[0], vs[1], b"AAAAT");
        let _e2 = b.add_edge(vs[1], vs[2], b"AATAC");
        let _e3 = b.add_edge(vs[2], vs[3], b"TACAG");
        let e4 = b.add_edge(vs[3], vs[4], b"CAGTT");
        let g = b.build();
        let reach = no_restriction();
        let cfg = GapClosingConfig {
            run_dijkstra: true,
            queue_limit: 1_000_000,
            iteration_limit: 1,
            ..GapClosingConfig::default()
        };
        let mut search =
            GapDijkstra::new(&g, &cfg, b"AAAATAC".to_vec(), e1, e4, 0, 1, 3, &reach);
        assert!(!search.close_gap());
        assert_eq!(search.edit_distance(), -1);
        assert!(search.path().is_empty());
    }

    #[test]
    fn zero_queue_limit_succeeds_only_from_the_seed() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        let g = b.build();
        let reach = no_restriction();
        let cfg = GapClosingConfig {
            run_dijkstra: true,
            queue_limit: 0,
            iteration_limit: 0,
            ..GapClosingConfig::default()
        };
        // Same-edge request already settled by the constructor: succeeds.
        let mut settled =
            GapDijkstra::new(&g, &cfg, b"AA".to_vec(), e1, e1, 0, 2, 1, &reach);
        assert!(settled.close_gap());
        assert_eq!(settled.edit_distance(), 0);
        // A request that needs expansion: terminates immediately, failure.
        let mut open = GapDijkstra::new(&g, &cfg, b"AAAA".to_vec(), e1, e2, 0, 2, 2, &reach);
        assert!(!open.close_gap());
        assert_eq!(open.edit_distance(), -1);
    }

    #[test]
    fn reachability_set_prunes_expansion() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        let g = b.build();
        // v1 reachable but v2 not: the end-edge alignment still runs (it is
        // gated on the tail vertex), while expansion past e2 is cut.
        let mut reach = FxHashMap::default();
        reach.insert(v1, 0u32);
        let mut search =
            GapDijkstra::new(&g, &wide_cfg(), b"AAAA".to_vec(), e1, e2, 0, 2, 2, &reach);
        assert!(search.close_gap());
        assert_eq!(search.edit_distance(), 0);

        // Nothing reachable: the search cannot leave the start edge.
        let mut reach2 = FxHashMap::default();
        reach2.insert(v2, 0u32);
        let mut blocked =
            GapDijkstra::new(&g, &wide_cfg(), b"AAAA".to_vec(), e1, e2, 0, 2, 2, &reach2);
        assert!(!blocked.close_gap());
        assert_eq!(blocked.edit_distance(), -1);
    }
}
