//! Simulation configuration
//!
//! Loaded from JSON, with every field optional and defaulted:
//!
//! ```json
//! { "canvas": { "width": 800.0, "height": 600.0 }, "num_nodes": 60,
//!   "strategy": "smallestJump", "seed": 7 }
//! ```

use crate::routing::StrategyKind;
use crate::Point;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid canvas size {width}x{height}: both dimensions must be positive")]
    InvalidCanvas { width: f64, height: f64 },

    #[error("Invalid active fraction {0}: must lie in [0, 1]")]
    InvalidActiveFraction(f64),
}

/// Rectangular region nodes may occupy, anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
}

impl CanvasBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a position into the canvas
    pub fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
    }

    pub fn contains(&self, p: &Point) -> bool {
        (0.0..=self.width).contains(&p.x) && (0.0..=self.height).contains(&p.y)
    }
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Configuration for sessions and batch simulations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub canvas: CanvasBounds,
    /// Nodes placed by the batch simulator
    pub num_nodes: usize,
    /// Runs per strategy in a batch
    pub num_runs: usize,
    pub seed: u64,
    pub strategy: StrategyKind,
    /// Hop budget per run; `None` disables the limit for stepped runs
    pub max_hops: Option<u32>,
    /// Probability that a generated node gets an active address
    pub active_fraction: f64,
    /// Suggested pause between hops for interactive drivers. The core never sleeps.
    pub hop_delay_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasBounds::default(),
            num_nodes: 50,
            num_runs: 200,
            seed: 42,
            strategy: StrategyKind::default(),
            max_hops: Some(512),
            active_fraction: 0.4,
            hop_delay_ms: 250,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let CanvasBounds { width, height } = self.canvas;
        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidCanvas { width, height });
        }
        if !(0.0..=1.0).contains(&self.active_fraction) {
            return Err(ConfigError::InvalidActiveFraction(self.active_fraction));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clamp_into_canvas() {
        let canvas = CanvasBounds::new(100.0, 50.0);
        assert_eq!(canvas.clamp(Point::new(-5.0, 70.0)), Point::new(0.0, 50.0));
        assert_eq!(canvas.clamp(Point::new(30.0, 20.0)), Point::new(30.0, 20.0));
        assert!(canvas.contains(&canvas.clamp(Point::new(1e9, -1e9))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            SimConfig::from_json_str(r#"{ "num_nodes": 12, "strategy": "firstLeft" }"#).unwrap();
        assert_eq!(config.num_nodes, 12);
        assert_eq!(config.strategy, StrategyKind::FirstLeft);
        assert_eq!(config.canvas, CanvasBounds::default());
        assert_eq!(config.max_hops, Some(512));
    }

    #[test]
    fn test_unknown_strategy_falls_back() {
        let config = SimConfig::from_json_str(r#"{ "strategy": "zigzag" }"#).unwrap();
        assert_eq!(config.strategy, StrategyKind::ClosestToDestination);
    }

    #[test]
    fn test_rejects_degenerate_canvas() {
        let err = SimConfig::from_json_str(r#"{ "canvas": { "width": 0.0, "height": 10.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCanvas { .. }));
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let err = SimConfig::from_json_str(r#"{ "active_fraction": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidActiveFraction(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "seed": 99, "max_hops": null }}"#).unwrap();

        let config = SimConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.max_hops, None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimConfig::from_json_file("/nonexistent/planar_route.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
