//! planar_route: greedy geometric packet routing over a planar point set
//!
//! Core library for building a Delaunay proximity graph over node positions,
//! forwarding a packet hop by hop with a pluggable local strategy, and
//! reporting path-quality statistics.

pub mod config;
pub mod logging;
pub mod routing;
pub mod session;
pub mod simulation;
pub mod stats;
pub mod topology;
pub mod triangulation;

pub use routing::StrategyKind;
pub use session::Session;
pub use simulation::{RunOutcome, RunState, Simulator};
pub use stats::RouteStats;
pub use topology::{Address, Node, NodeId, Topology};

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A point in the Euclidean plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Squared Euclidean distance (avoids the sqrt for comparisons)
    pub fn distance_sq(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Bearing of the vector self -> other, atan2 convention, in (-π, π].
    pub fn bearing_to(&self, other: &Self) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// True when both coordinates agree within `eps`
    pub fn coincides_with(&self, other: &Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Euclidean distance between two points
pub fn distance(a: &Point, b: &Point) -> f64 {
    a.distance(b)
}

/// Bearing from `a` to `b`
pub fn bearing(a: &Point, b: &Point) -> f64 {
    a.bearing_to(b)
}

/// Convert angle to range (-π, π]
pub fn normalize_signed(theta: f64) -> f64 {
    let mut result = theta % (2.0 * PI);
    if result <= -PI {
        result += 2.0 * PI;
    } else if result > PI {
        result -= 2.0 * PI;
    }
    result
}

/// Absolute angular difference between two bearings, taking the shorter arc.
/// Result lies in [0, π].
pub fn angular_deviation(a: f64, b: f64) -> f64 {
    normalize_signed(a - b).abs()
}
