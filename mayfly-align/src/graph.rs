//! Read-only assembly-graph facade.
//!
//! The de Bruijn graph itself is built elsewhere; the aligner only needs the
//! view defined here: edge lengths, incident vertices, edge nucleotides, the
//! conjugate map and the k-mer parameter. Edges carry `length(e) + k`
//! nucleotides, where `length(e)` counts the distinct k-mer positions on the
//! edge; consecutive edges overlap by `k` symbols.

use serde::{Deserialize, Serialize};

/// Identifier of one directed edge of the assembly graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EdgeId(pub u32);

/// Identifier of one vertex of the assembly graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VertexId(pub u32);

impl EdgeId {
    /// Sentinel for "no edge"; never returned by the graph itself.
    pub const INVALID: EdgeId = EdgeId(u32::MAX);
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    start: VertexId,
    end: VertexId,
    /// `length(e) + k` nucleotides.
    nucls: Vec<u8>,
}

/// Immutable assembly graph: a directed multigraph whose edges spell
/// nucleotide strings overlapping by `k` at shared vertices.
#[derive(Debug, Clone)]
pub struct AssemblyGraph {
    k: usize,
    edges: Vec<EdgeRecord>,
    out_edges: Vec<Vec<EdgeId>>,
    in_degree: Vec<u32>,
    conjugate: Vec<EdgeId>,
}

impl AssemblyGraph {
    /// The graph's k-mer parameter.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of distinct k-mer positions on the edge.
    pub fn length(&self, e: EdgeId) -> usize {
        self.edges[e.0 as usize].nucls.len() - self.k
    }

    /// Full nucleotide span of the edge: `length(e) + k`.
    pub fn total_len(&self, e: EdgeId) -> usize {
        self.edges[e.0 as usize].nucls.len()
    }

    /// The nucleotide string of the edge, `length(e) + k` symbols.
    pub fn edge_nucls(&self, e: EdgeId) -> &[u8] {
        &self.edges[e.0 as usize].nucls
    }

    pub fn edge_start(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].start
    }

    pub fn edge_end(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].end
    }

    pub fn outgoing_edges(&self, v: VertexId) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edges[v.0 as usize].iter().copied()
    }

    pub fn outgoing_count(&self, v: VertexId) -> usize {
        self.out_edges[v.0 as usize].len()
    }

    pub fn incoming_count(&self, v: VertexId) -> usize {
        self.in_degree[v.0 as usize] as usize
    }

    /// The reverse-complement partner of the edge.
    pub fn conjugate(&self, e: EdgeId) -> EdgeId {
        self.conjugate[e.0 as usize]
    }

    /// True when the vertex is a source or a sink.
    pub fn is_terminal(&self, v: VertexId) -> bool {
        self.incoming_count(v) == 0 || self.outgoing_count(v) == 0
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.out_edges.len()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len() as u32).map(EdgeId)
    }
}

/// Incremental builder for [`AssemblyGraph`].
///
/// Unless linked explicitly, every edge is its own conjugate; self-conjugate
/// edges exist in real graphs (perfect palindromes), so the default is legal.
#[derive(Debug)]
pub struct GraphBuilder {
    k: usize,
    edges: Vec<EdgeRecord>,
    out_edges: Vec<Vec<EdgeId>>,
    in_degree: Vec<u32>,
    conjugate: Vec<EdgeId>,
}

impl GraphBuilder {
    pub fn new(k: usize) -> Self {
        GraphBuilder {
            k,
            edges: Vec::new(),
            out_edges: Vec::new(),
            in_degree: Vec::new(),
            conjugate: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self) -> VertexId {
        let v = VertexId(self.out_edges.len() as u32);
        self.out_edges.push(Vec::new());
        self.in_degree.push(0);
        v
    }

    /// Adds a directed edge spelling `nucls`; the string must be strictly
    /// longer than `k`.
    pub fn add_edge(&mut self, start: VertexId, end: VertexId, nucls: &[u8]) -> EdgeId {
        debug_assert!(
            nucls.len() > self.k,
            "edge string must exceed k ({} <= {})",
            nucls.len(),
            self.k
        );
        let e = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeRecord {
            start,
            end,
            nucls: nucls.to_vec(),
        });
        self.out_edges[start.0 as usize].push(e);
        self.in_degree[end.0 as usize] += 1;
        self.conjugate.push(e);
        e
    }

    /// Declares `a` and `b` reverse-complement partners.
    pub fn link_conjugates(&mut self, a: EdgeId, b: EdgeId) {
        self.conjugate[a.0 as usize] = b;
        self.conjugate[b.0 as usize] = a;
    }

    pub fn build(self) -> AssemblyGraph {
        AssemblyGraph {
            k: self.k,
            edges: self.edges,
            out_edges: self.out_edges,
            in_degree: self.in_degree,
            conjugate: self.conjugate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_edge_graph() -> (AssemblyGraph, EdgeId, EdgeId) {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let v2 = b.add_vertex();
        let e1 = b.add_edge(v0, v1, b"AAAAT");
        let e2 = b.add_edge(v1, v2, b"AATGG");
        (b.build(), e1, e2)
    }

    #[test]
    fn lengths_exclude_k_overlap() {
        let (g, e1, e2) = two_edge_graph();
        assert_eq!(g.k(), 3);
        assert_eq!(g.length(e1), 2);
        assert_eq!(g.total_len(e2), 5);
        assert_eq!(g.edge_nucls(e1), b"AAAAT");
    }

    #[test]
    fn adjacency_and_terminals() {
        let (g, e1, e2) = two_edge_graph();
        let v = g.edge_end(e1);
        assert_eq!(v, g.edge_start(e2));
        let out: Vec<_> = g.outgoing_edges(v).collect();
        assert_eq!(out, vec![e2]);
        assert!(g.is_terminal(g.edge_start(e1)));
        assert!(g.is_terminal(g.edge_end(e2)));
        assert!(!g.is_terminal(v));
    }

    #[test]
    fn conjugate_defaults_to_self() {
        let (g, e1, e2) = two_edge_graph();
        assert_eq!(g.conjugate(e1), e1);
        assert_eq!(g.conjugate(e2), e2);
    }

    #[test]
    fn linked_conjugates_are_symmetric() {
        let mut b = GraphBuilder::new(3);
        let v0 = b.add_vertex();
        let v1 = b.add_vertex();
        let e = b.add_edge(v0, v1, b"ACGTA");
        let rc = b.add_edge(v1, v0, b"TACGT");
        b.link_conjugates(e, rc);
        let g = b.build();
        assert_eq!(g.conjugate(e), rc);
        assert_eq!(g.conjugate(rc), e);
    }
}
