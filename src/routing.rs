//! Strategy Engine: local next-hop selection
//!
//! Every strategy sees only the current node, the destination, the current
//! node's proximity-graph neighbors and the edges already traversed in this
//! run. Neighbors are expected in ascending `NodeId` order; deterministic
//! strategies break ties in favour of the earliest neighbor.

use crate::topology::{Address, Node, NodeId};
use crate::{angular_deviation, normalize_signed, Point};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// Next-hop selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrategyKind {
    /// Neighbor nearest to the destination, even if farther than the current node
    #[default]
    ClosestToDestination,
    /// Shortest hop among neighbors that make strict progress
    SmallestJump,
    /// Neighbor whose bearing deviates least from the destination bearing
    AngleClosest,
    /// Tightest counter-clockwise turn away from the destination bearing
    FirstLeft,
    /// Uniform choice among neighbors whose edge is still unused
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::ClosestToDestination,
        StrategyKind::SmallestJump,
        StrategyKind::AngleClosest,
        StrategyKind::FirstLeft,
        StrategyKind::Random,
    ];

    /// Parse a strategy tag. Unrecognized tags fall back to
    /// `ClosestToDestination`.
    pub fn from_tag(tag: &str) -> Self {
        let normalized: String = tag
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "closesttodestination" | "closest" | "greedy" => StrategyKind::ClosestToDestination,
            "smallestjump" => StrategyKind::SmallestJump,
            "angleclosest" | "compass" => StrategyKind::AngleClosest,
            "firstleft" => StrategyKind::FirstLeft,
            "random" => StrategyKind::Random,
            _ => StrategyKind::ClosestToDestination,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            StrategyKind::ClosestToDestination => "closestToDestination",
            StrategyKind::SmallestJump => "smallestJump",
            StrategyKind::AngleClosest => "angleClosest",
            StrategyKind::FirstLeft => "firstLeft",
            StrategyKind::Random => "random",
        }
    }

    pub fn is_deterministic(&self) -> bool {
        !matches!(self, StrategyKind::Random)
    }
}

impl FromStr for StrategyKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl From<String> for StrategyKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        kind.tag().to_string()
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One directed hop of a route, tagged with the destination's address.
/// Endpoint positions are captured when the hop is taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: NodeId,
    pub to: NodeId,
    pub from_position: Point,
    pub to_position: Point,
    pub address: Address,
}

impl RouteSegment {
    pub fn new(from: &Node, to: &Node, address: Address) -> Self {
        Self {
            from: from.id,
            to: to.id,
            from_position: from.position,
            to_position: to.position,
            address,
        }
    }

    pub fn length(&self) -> f64 {
        self.from_position.distance(&self.to_position)
    }

    /// True if this segment joins `a` and `b` in either direction
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Choose the next hop from `current` toward `destination`.
///
/// Returns `None` when no neighbor qualifies under the strategy, which
/// always includes the case of an empty neighbor set.
pub fn select_next_hop<'a, R: Rng + ?Sized>(
    current: &Node,
    destination: &Node,
    neighbors: &'a [Node],
    traversed: &[RouteSegment],
    strategy: StrategyKind,
    rng: &mut R,
) -> Option<&'a Node> {
    if neighbors.is_empty() {
        return None;
    }

    match strategy {
        StrategyKind::ClosestToDestination => closest_to_destination(destination, neighbors),
        StrategyKind::SmallestJump => smallest_jump(current, destination, neighbors),
        StrategyKind::AngleClosest => angle_closest(current, destination, neighbors),
        StrategyKind::FirstLeft => first_left(current, destination, neighbors),
        StrategyKind::Random => random_unused(current, neighbors, traversed, rng),
    }
}

/// First element minimizing `key`; later equal keys never displace it
fn first_min_by<'a, F>(candidates: impl Iterator<Item = &'a Node>, key: F) -> Option<&'a Node>
where
    F: Fn(&Node) -> f64,
{
    let mut best: Option<(&Node, f64)> = None;
    for node in candidates {
        let k = key(node);
        match best {
            Some((_, best_k)) if k >= best_k => {}
            _ => best = Some((node, k)),
        }
    }
    best.map(|(node, _)| node)
}

fn closest_to_destination<'a>(destination: &Node, neighbors: &'a [Node]) -> Option<&'a Node> {
    first_min_by(neighbors.iter(), |n| {
        n.position.distance_sq(&destination.position)
    })
}

fn smallest_jump<'a>(current: &Node, destination: &Node, neighbors: &'a [Node]) -> Option<&'a Node> {
    let current_distance = current.position.distance_sq(&destination.position);
    let closer = neighbors
        .iter()
        .filter(|n| n.position.distance_sq(&destination.position) < current_distance);
    first_min_by(closer, |n| n.position.distance_sq(&current.position))
}

fn angle_closest<'a>(current: &Node, destination: &Node, neighbors: &'a [Node]) -> Option<&'a Node> {
    let baseline = current.position.bearing_to(&destination.position);
    first_min_by(neighbors.iter(), |n| {
        angular_deviation(current.position.bearing_to(&n.position), baseline)
    })
}

fn first_left<'a>(current: &Node, destination: &Node, neighbors: &'a [Node]) -> Option<&'a Node> {
    let baseline = current.position.bearing_to(&destination.position);
    let relative = |n: &Node| normalize_signed(current.position.bearing_to(&n.position) - baseline);

    let leftward = neighbors.iter().filter(|n| relative(*n) > 0.0);
    if let Some(node) = first_min_by(leftward, relative) {
        return Some(node);
    }

    // Nothing to the left: take the least rightward turn
    first_min_by(neighbors.iter(), |n| -relative(n))
}

fn random_unused<'a, R: Rng + ?Sized>(
    current: &Node,
    neighbors: &'a [Node],
    traversed: &[RouteSegment],
    rng: &mut R,
) -> Option<&'a Node> {
    let unused: Vec<&Node> = neighbors
        .iter()
        .filter(|n| !traversed.iter().any(|s| s.connects(current.id, n.id)))
        .collect();
    unused.choose(rng).copied()
}
