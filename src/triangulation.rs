//! Proximity Graph Builder
//!
//! Builds the Delaunay triangulation of the current node positions with the
//! Bowyer–Watson algorithm and exposes triangulation adjacency as a graph.
//! The hull is closed symbolically by a vertex at infinity, and orientation
//! and in-circle decisions use exact predicates, so thin and nearly collinear
//! point sets keep every hull edge.
//!
//! The graph is a pure function of the position set: it is rebuilt from
//! scratch whenever positions change and never patched incrementally.
//!
//! Degenerate inputs:
//! - fewer than 3 nodes: every node has an empty neighbor set
//! - coincident positions: only the lowest id is triangulated, the others
//!   stay isolated
//! - all distinct positions collinear: consecutive points along the line are
//!   linked into a chain

use crate::topology::{Node, NodeId};
use crate::Point;
use robust::{incircle, orient2d, Coord};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

/// Positions closer than this on both axes are treated as the same site
pub const COINCIDENT_EPSILON: f64 = 1e-9;

/// The single vertex at infinity closing the convex hull
const INFINITE: usize = usize::MAX;

fn coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Exact sign of the turn a -> b -> c; positive is counter-clockwise
fn orientation(a: Point, b: Point, c: Point) -> f64 {
    orient2d(coord(a), coord(b), coord(c))
}

/// A counter-clockwise triangle over site indices. A ghost triangle
/// `[u, v, INFINITE]` stands for the open half-plane left of `u -> v`,
/// outside the current hull.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
}

impl Triangle {
    /// Rotate so a vertex at infinity, if any, sits last
    fn new(a: usize, b: usize, c: usize) -> Self {
        let v = if a == INFINITE {
            [b, c, a]
        } else if b == INFINITE {
            [c, a, b]
        } else {
            [a, b, c]
        };
        Self { v }
    }

    fn is_ghost(&self) -> bool {
        self.v[2] == INFINITE
    }

    /// Strict in-circumcircle test with exact predicates. For a ghost the
    /// circle is the outer half-plane plus the open hull edge itself.
    fn circumcircle_contains(&self, p: Point, sites: &[Point]) -> bool {
        let [a, b, c] = self.v;
        if c != INFINITE {
            return incircle(coord(sites[a]), coord(sites[b]), coord(sites[c]), coord(p)) > 0.0;
        }

        let (u, w) = (sites[a], sites[b]);
        let side = orientation(u, w, p);
        if side != 0.0 {
            return side > 0.0;
        }
        let along = (p.x - u.x) * (w.x - u.x) + (p.y - u.y) * (w.y - u.y);
        along > 0.0 && along < u.distance_sq(&w)
    }

    /// Directed edges in winding order
    fn directed_edges(&self) -> [(usize, usize); 3] {
        [
            (self.v[0], self.v[1]),
            (self.v[1], self.v[2]),
            (self.v[2], self.v[0]),
        ]
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Adjacency derived from a planar Delaunay triangulation.
///
/// Neighbor sets enumerate in ascending `NodeId` order, which fixes the
/// tie-break order of every deterministic routing strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProximityGraph {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl ProximityGraph {
    /// Triangulate the given nodes and record which pairs share an edge
    pub fn build(nodes: &[Node]) -> Self {
        let mut graph = Self {
            adjacency: nodes.iter().map(|n| (n.id, BTreeSet::new())).collect(),
        };

        if nodes.len() < 3 {
            trace!(nodes = nodes.len(), "Proximity graph undefined below 3 nodes");
            return graph;
        }

        let sites = distinct_sites(nodes);
        if sites.len() < 2 {
            return graph;
        }

        let positions: Vec<Point> = sites.iter().map(|(_, p)| *p).collect();
        let Some(triangles) = bowyer_watson(&positions) else {
            for pair in collinear_chain(&sites).windows(2) {
                graph.link(pair[0], pair[1]);
            }
            trace!(nodes = nodes.len(), sites = sites.len(), "Collinear sites linked as a chain");
            return graph;
        };

        let mut real_triangles = 0usize;
        for tri in triangles.iter().filter(|t| !t.is_ghost()) {
            real_triangles += 1;
            for (i, j) in tri.directed_edges() {
                graph.link(sites[i].0, sites[j].0);
            }
        }

        trace!(
            nodes = nodes.len(),
            sites = sites.len(),
            triangles = real_triangles,
            edges = graph.edge_count(),
            "Proximity graph rebuilt"
        );
        graph
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    /// Neighbors of `id` in ascending id order. Unknown ids have none.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn neighbor_set(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.adjacency.get(&id)
    }

    pub fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .map(|set| set.contains(&b))
            .unwrap_or(false)
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.adjacency.get(&id).map(BTreeSet::len).unwrap_or(0)
    }

    /// Each undirected edge once, as (low, high), ascending
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = Vec::new();
        for (&a, set) in &self.adjacency {
            for &b in set.range(a..) {
                if a < b {
                    edges.push((a, b));
                }
            }
        }
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }
}

/// Neighbor set of one node under the triangulation of `nodes`
pub fn neighbors(nodes: &[Node], of: NodeId) -> BTreeSet<NodeId> {
    ProximityGraph::build(nodes)
        .neighbor_set(of)
        .cloned()
        .unwrap_or_default()
}

/// Nodes in ascending id order with coincident positions collapsed onto the
/// lowest id.
fn distinct_sites(nodes: &[Node]) -> Vec<(NodeId, Point)> {
    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.id);

    let mut sites: Vec<(NodeId, Point)> = Vec::with_capacity(sorted.len());
    for node in sorted {
        let duplicate = sites
            .iter()
            .any(|(_, p)| p.coincides_with(&node.position, COINCIDENT_EPSILON));
        if !duplicate {
            sites.push((node.id, node.position));
        }
    }
    sites
}

/// Incremental Delaunay triangulation over distinct sites, closed by ghost
/// triangles to a vertex at infinity. Returns `None` when every site lies
/// on one line.
fn bowyer_watson(sites: &[Point]) -> Option<Vec<Triangle>> {
    if sites.len() < 3 {
        return None;
    }

    // Seed with the first non-degenerate triple, in counter-clockwise order
    let (a, mut b) = (0, 1);
    let mut c = (2..sites.len()).find(|&k| orientation(sites[a], sites[b], sites[k]) != 0.0)?;
    if orientation(sites[a], sites[b], sites[c]) < 0.0 {
        std::mem::swap(&mut b, &mut c);
    }

    let mut triangles = vec![
        Triangle::new(a, b, c),
        Triangle::new(b, a, INFINITE),
        Triangle::new(c, b, INFINITE),
        Triangle::new(a, c, INFINITE),
    ];

    for idx in (0..sites.len()).filter(|&k| k != a && k != b && k != c) {
        let p = sites[idx];

        let (bad, good): (Vec<Triangle>, Vec<Triangle>) = triangles
            .into_iter()
            .partition(|t| t.circumcircle_contains(p, sites));
        triangles = good;

        // Cavity boundary: edges belonging to exactly one bad triangle,
        // kept in that triangle's winding direction
        let mut edge_count: HashMap<(usize, usize), usize> = HashMap::new();
        let mut boundary = Vec::new();
        for tri in &bad {
            for (u, w) in tri.directed_edges() {
                let count = edge_count.entry(ordered(u, w)).or_insert(0);
                if *count == 0 {
                    boundary.push((u, w));
                }
                *count += 1;
            }
        }

        for (u, w) in boundary {
            if edge_count.get(&ordered(u, w)) == Some(&1) {
                triangles.push(Triangle::new(u, w, idx));
            }
        }
    }

    Some(triangles)
}

/// Distinct sites ordered along their common line
fn collinear_chain(sites: &[(NodeId, Point)]) -> Vec<NodeId> {
    let Some(&(_, origin)) = sites.first() else {
        return Vec::new();
    };
    let far = sites
        .iter()
        .map(|(_, p)| *p)
        .fold(origin, |best, p| {
            if origin.distance_sq(&p) > origin.distance_sq(&best) {
                p
            } else {
                best
            }
        });
    let (dx, dy) = (far.x - origin.x, far.y - origin.y);

    let mut projected: Vec<(f64, NodeId)> = sites
        .iter()
        .map(|(id, p)| ((p.x - origin.x) * dx + (p.y - origin.y) * dy, *id))
        .collect();
    projected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    projected.into_iter().map(|(_, id)| id).collect()
}
