//! Path-quality statistics for completed routes

use crate::routing::RouteSegment;
use serde::{Deserialize, Serialize};

/// Snapshot computed once per arrived route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    /// Number of hops (≥ 1)
    pub edge_count: usize,
    /// Sum of Euclidean hop lengths
    pub total_length: f64,
    /// Straight-line distance from the first hop's start to the last hop's end
    pub direct_distance: f64,
}

impl RouteStats {
    /// Compute statistics for a route. Returns `None` for an empty route.
    pub fn compute(route: &[RouteSegment]) -> Option<Self> {
        let first = route.first()?;
        let last = route.last()?;

        Some(Self {
            edge_count: route.len(),
            total_length: route.iter().map(RouteSegment::length).sum(),
            direct_distance: first.from_position.distance(&last.to_position),
        })
    }

    /// Path length over straight-line distance. Infinite when the endpoints coincide.
    pub fn stretch(&self) -> f64 {
        if self.direct_distance == 0.0 {
            f64::INFINITY
        } else {
            self.total_length / self.direct_distance
        }
    }
}

impl std::fmt::Display for RouteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} hops, length {:.2}, direct {:.2}, stretch {:.3}",
            self.edge_count,
            self.total_length,
            self.direct_distance,
            self.stretch()
        )
    }
}

/// Aggregate over many runs of one strategy
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    pub strategy: String,
    pub attempts: usize,
    pub arrived: usize,
    pub lost: usize,
    pub hop_limited: usize,
    pub rejected: usize,
    pub total_hops: usize,
    stretch_sum: f64,
    stretch_samples: usize,
    pub max_stretch: f64,
}

impl BatchStats {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Self::default()
        }
    }

    pub fn record_arrival(&mut self, stats: &RouteStats) {
        self.attempts += 1;
        self.arrived += 1;
        self.total_hops += stats.edge_count;
        let stretch = stats.stretch();
        if stretch.is_finite() {
            self.stretch_sum += stretch;
            self.stretch_samples += 1;
            self.max_stretch = self.max_stretch.max(stretch);
        }
    }

    pub fn record_loss(&mut self, hop_limited: bool) {
        self.attempts += 1;
        self.lost += 1;
        if hop_limited {
            self.hop_limited += 1;
        }
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    /// Fraction of started runs that arrived
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.arrived as f64 / self.attempts as f64
        }
    }

    pub fn avg_hops(&self) -> f64 {
        if self.arrived == 0 {
            0.0
        } else {
            self.total_hops as f64 / self.arrived as f64
        }
    }

    pub fn avg_stretch(&self) -> f64 {
        if self.stretch_samples == 0 {
            0.0
        } else {
            self.stretch_sum / self.stretch_samples as f64
        }
    }
}

impl std::fmt::Display for BatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== {} ===", self.strategy)?;
        writeln!(f, "Runs started:         {}", self.attempts)?;
        writeln!(f, "Arrived:              {}", self.arrived)?;
        writeln!(f, "Lost:                 {}", self.lost)?;
        writeln!(f, "  hop limit:          {}", self.hop_limited)?;
        writeln!(f, "Start rejections:     {}", self.rejected)?;
        writeln!(f, "Success rate:         {:.2}%", self.success_rate() * 100.0)?;
        writeln!(f, "Average hops:         {:.2}", self.avg_hops())?;
        writeln!(f, "Avg stretch:          {:.3}", self.avg_stretch())?;
        writeln!(f, "Max stretch:          {:.3}", self.max_stretch)?;
        Ok(())
    }
}
