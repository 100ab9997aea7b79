//! Bounded best-first search over `(edge span, read prefix)` states.
//!
//! The driver explores walks outward from a seed span so as to co-consume a
//! target read substring, bounded by a maximum edit distance that tightens as
//! finalised paths are found. Two concrete searches specialise it through
//! [`SearchTarget`]: the closed-ended gap filler ([`gap::GapDijkstra`]) and
//! the open-ended read-tail reconstructor ([`ends::EndsReconstructor`]).
//!
//! States are interned into an arena and addressed by integer handles; the
//! frontier is a keyed min-priority queue over handles, so decrease-key is a
//! remove-and-reinsert on the key. Row gating prunes frontiers that are
//! markedly worse than the best score already seen at the same read prefix.

pub mod ends;
pub mod gap;

use std::cmp::Reverse;

use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap;

use crate::config::GapClosingConfig;
use crate::distance::shw_distance;
use crate::graph::{AssemblyGraph, EdgeId};
use crate::types::{MappingPath, MappingRange, Range};

/// A contiguous span `[start_pos, end_pos)` on one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphState {
    pub e: EdgeId,
    pub start_pos: i32,
    pub end_pos: i32,
}

impl GraphState {
    pub fn new(e: EdgeId, start_pos: i32, end_pos: i32) -> Self {
        GraphState {
            e,
            start_pos,
            end_pos,
        }
    }
}

/// A search frontier node: the walk so far consumes `read[0..=i]` and sits on
/// the given edge span. `i == -1` means no read symbol has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueState {
    pub gs: GraphState,
    pub i: i32,
}

impl QueueState {
    /// Marks "no predecessor".
    pub const SENTINEL: QueueState = QueueState {
        gs: GraphState {
            e: EdgeId::INVALID,
            start_pos: -1,
            end_pos: -1,
        },
        i: -1,
    };

    pub fn new(gs: GraphState, i: i32) -> Self {
        QueueState { gs, i }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

impl Ord for QueueState {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.i, self.gs).cmp(&(other.i, other.gs))
    }
}

impl PartialOrd for QueueState {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Hooks that specialise the driver into a concrete search.
pub(crate) trait SearchTarget {
    /// Expand from `cur` through outgoing edge `e` at accumulated cost `ed`.
    /// Returns true when a finalised path to the end state was recorded.
    fn add_state(&mut self, core: &mut SearchCore<'_>, cur: &QueueState, e: EdgeId, ed: i32)
        -> bool;

    /// True when `cur` satisfies the concrete terminal condition.
    fn is_end_position(&self, core: &SearchCore<'_>, cur: &QueueState) -> bool;
}

type StateHandle = u32;
const NO_STATE: StateHandle = u32::MAX;
const UNSEEN: i32 = i32::MAX;

/// Shared state of one search instance; discarded when the search ends.
pub(crate) struct SearchCore<'g> {
    pub(crate) g: &'g AssemblyGraph,
    pub(crate) cfg: GapClosingConfig,
    /// Target read substring the walk must co-consume.
    pub(crate) ss: Vec<u8>,
    /// Upper bound on total edit distance; tightens monotonically.
    pub(crate) path_max_length: i32,
    /// Best finalised score, `-1` until a path is finalised.
    pub(crate) min_score: i32,
    /// Declared end state; sentinel until a target defines or discovers it.
    pub(crate) end_qstate: QueueState,

    arena: Vec<QueueState>,
    index: FxHashMap<QueueState, StateHandle>,
    /// Best score per interned state; `UNSEEN` until first admitted.
    visited: Vec<i32>,
    prev: Vec<StateHandle>,
    queue: PriorityQueue<StateHandle, Reverse<i32>>,
    /// Best score ever achieved per read index, for row gating.
    best_ed: Vec<i32>,

    gap_path: Vec<EdgeId>,
    mapping_path: MappingPath,

    positions_buf: Vec<i32>,
    scores_buf: Vec<i32>,
}

impl<'g> SearchCore<'g> {
    pub(crate) fn new(
        g: &'g AssemblyGraph,
        cfg: &GapClosingConfig,
        ss: Vec<u8>,
        start_e: EdgeId,
        start_p: i32,
        path_max_length: i32,
    ) -> Self {
        let best_ed = vec![path_max_length; ss.len()];
        let mut core = SearchCore {
            g,
            cfg: cfg.clone(),
            ss,
            path_max_length,
            min_score: -1,
            end_qstate: QueueState::SENTINEL,
            arena: Vec::new(),
            index: FxHashMap::default(),
            visited: Vec::new(),
            prev: Vec::new(),
            queue: PriorityQueue::new(),
            best_ed,
            gap_path: Vec::new(),
            mapping_path: MappingPath::new(),
            positions_buf: Vec::new(),
            scores_buf: Vec::new(),
        };
        let seed = GraphState::new(start_e, start_p, g.length(start_e) as i32);
        core.add_new_edge(seed, QueueState::SENTINEL, 0);
        core
    }

    fn intern(&mut self, state: QueueState) -> StateHandle {
        if let Some(&h) = self.index.get(&state) {
            return h;
        }
        let h = self.arena.len() as StateHandle;
        self.arena.push(state);
        self.visited.push(UNSEEN);
        self.prev.push(NO_STATE);
        self.index.insert(state, h);
        h
    }

    /// Row gating: a frontier at read index `i` is admitted iff it is within
    /// `penalty_interval` of the best score seen at that index.
    fn should_update_queue(&mut self, seq_ind: i32, ed: i32) -> bool {
        if seq_ind == -1 {
            return true;
        }
        debug_assert!(seq_ind >= 0 && (seq_ind as usize) < self.ss.len());
        let i = seq_ind as usize;
        if self.best_ed[i] + self.cfg.penalty_interval >= ed {
            if i != self.ss.len() - 1 {
                self.best_ed[i] = self.best_ed[i].min(ed);
            }
            true
        } else {
            false
        }
    }

    /// Records `state` reached from `prev_state` at `score`, keeping the best
    /// score and back-pointer per state and the queue consistent with them.
    pub(crate) fn update(&mut self, state: QueueState, prev_state: QueueState, score: i32) {
        let ph = if prev_state.is_sentinel() {
            NO_STATE
        } else {
            self.intern(prev_state)
        };
        let h = self.intern(state);
        if self.visited[h as usize] != UNSEEN {
            if self.visited[h as usize] >= score {
                self.queue.remove(&h);
                self.visited[h as usize] = score;
                self.prev[h as usize] = ph;
                if self.should_update_queue(state.i, score) {
                    self.queue.push(h, Reverse(score));
                }
            }
        } else if self.should_update_queue(state.i, score) {
            self.visited[h as usize] = score;
            self.prev[h as usize] = ph;
            self.queue.push(h, Reverse(score));
        }
    }

    /// Enqueues the ways the span `gs` can extend the walk of `prev_state`:
    /// an empty span passes through unchanged, a pure insertion consumes no
    /// read, and each admissible prefix cut of the remaining read pairs the
    /// span with a consumed read stretch.
    pub(crate) fn add_new_edge(&mut self, gs: GraphState, prev_state: QueueState, ed: i32) {
        let g = self.g;
        let nucls = g.edge_nucls(gs.e);
        // Spans outside the nucleotide string behave as empty.
        let lo = gs.start_pos.clamp(0, nucls.len() as i32) as usize;
        let hi = gs.end_pos.clamp(0, nucls.len() as i32) as usize;
        if lo >= hi {
            self.update(QueueState::new(gs, prev_state.i), prev_state, ed);
            return;
        }
        let edge_len = (hi - lo) as i32;
        if self.path_max_length - ed < 0 {
            return;
        }
        if self.path_max_length - ed >= edge_len {
            self.update(QueueState::new(gs, prev_state.i), prev_state, ed + edge_len);
        }
        let consumed = prev_state.i + 1;
        let remaining = self.ss.len() as i32 - consumed;
        if remaining > 0 {
            let len =
                (g.length(gs.e) as i32 - gs.start_pos + self.path_max_length).min(remaining);
            if len <= 0 {
                return;
            }
            let seq_lo = consumed as usize;
            let seq_hi = (consumed + len) as usize;
            let budget = self.path_max_length - ed;
            let mut positions = std::mem::take(&mut self.positions_buf);
            let mut scores = std::mem::take(&mut self.scores_buf);
            shw_distance(
                &self.ss[seq_lo..seq_hi],
                &nucls[lo..hi],
                budget,
                &mut positions,
                &mut scores,
            );
            for k in 0..positions.len() {
                let (p, sc) = (positions[k], scores[k]);
                if p >= 0 && sc >= 0 {
                    self.update(
                        QueueState::new(gs, prev_state.i + 1 + p),
                        prev_state,
                        ed + sc,
                    );
                }
            }
            self.positions_buf = positions;
            self.scores_buf = scores;
        }
    }

    /// The main loop: pop the minimum-score frontier until the terminal
    /// condition is met or a budget is exhausted.
    pub(crate) fn run<T: SearchTarget>(&mut self, target: &mut T) -> bool {
        let mut found_path = false;
        let mut iterations: usize = 0;
        while let Some((&h, _)) = self.queue.peek() {
            let cur_state = self.arena[h as usize];
            let ed = self.visited[h as usize];
            if self.queue.len() > self.cfg.queue_limit || iterations > self.cfg.iteration_limit {
                // Budget exhausted: fall back to the end state if it was
                // ever completed.
                if let Some(&eh) = self.index.get(&self.end_qstate) {
                    if self.visited[eh as usize] != UNSEEN {
                        found_path = true;
                        self.min_score = self.visited[eh as usize];
                    }
                }
                log::debug!(
                    "search budget exhausted: queue={} iterations={} found={}",
                    self.queue.len(),
                    iterations,
                    found_path
                );
                break;
            }
            if target.is_end_position(self, &cur_state) {
                if self.min_score < 0 && !self.end_qstate.is_sentinel() {
                    self.min_score = ed;
                }
                found_path = true;
                break;
            }
            if ed > self.path_max_length {
                break;
            }
            iterations += 1;
            self.queue.pop();
            let g = self.g;
            let end_v = g.edge_end(cur_state.gs.e);
            for e in g.outgoing_edges(end_v) {
                found_path = target.add_state(self, &cur_state, e, ed);
                if !self.cfg.find_shortest_path && found_path {
                    break;
                }
            }
            if !self.cfg.find_shortest_path && found_path {
                break;
            }
        }
        if found_path {
            self.reconstruct();
        }
        found_path
    }

    /// Walks the back-pointers from the end state to the seed, rebuilding the
    /// edge sequence (and the mapping path when requested).
    fn reconstruct(&mut self) {
        self.gap_path.clear();
        self.mapping_path.clear();
        let mut h = match self.index.get(&self.end_qstate) {
            Some(&h) if self.visited[h as usize] != UNSEEN => h,
            _ => return,
        };
        // Back-pointer chains are acyclic; bound the walk regardless.
        let mut steps = 0usize;
        while h != NO_STATE && steps <= self.arena.len() {
            let state = self.arena[h as usize];
            let ph = self.prev[h as usize];
            let prev_i = if ph == NO_STATE {
                -1
            } else {
                self.arena[ph as usize].i
            };
            self.gap_path.push(state.gs.e);
            if self.cfg.restore_mapping {
                self.mapping_path.push(
                    state.gs.e,
                    MappingRange::new(
                        Range::new(prev_i.max(0) as u32, state.i.max(0) as u32),
                        Range::new(state.gs.start_pos.max(0) as u32, state.gs.end_pos.max(0) as u32),
                    ),
                );
            }
            h = ph;
            steps += 1;
        }
        debug_assert!(steps <= self.arena.len());
        self.gap_path.reverse();
        self.mapping_path.reverse();
    }

    pub(crate) fn ss_len(&self) -> i32 {
        self.ss.len() as i32
    }

    pub(crate) fn path(&self) -> Vec<EdgeId> {
        self.gap_path.clone()
    }

    pub(crate) fn mapping_path(&self) -> MappingPath {
        self.mapping_path.clone()
    }

    pub(crate) fn edit_distance(&self) -> i32 {
        self.min_score
    }

    pub(crate) fn path_end_position(&self) -> i32 {
        self.end_qstate.gs.end_pos
    }

    pub(crate) fn seq_end_position(&self) -> i32 {
        self.end_qstate.i
    }

    #[cfg(test)]
    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }
}
