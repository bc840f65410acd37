//! Session: one topology, one simulator, one random source
//!
//! This is the surface a presentation layer drives. Inbound calls mutate
//! the topology or the run; [`Session::snapshot`] returns everything needed
//! to draw the current state.

use crate::config::{CanvasBounds, SimConfig};
use crate::routing::{RouteSegment, StrategyKind};
use crate::simulation::{
    Packet, ResetNotice, RunOutcome, RunState, Simulator, StartError, StepError, StepOutcome,
};
use crate::topology::{Address, Node, NodeId, Topology, TopologyError};
use crate::triangulation::ProximityGraph;
use crate::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Everything a renderer needs, detached from the session
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub strategy: StrategyKind,
    pub state: RunState,
    pub packet: Option<Packet>,
    pub route: Vec<RouteSegment>,
    pub outcome: Option<RunOutcome>,
    /// Human-readable outcome, if the last run finished
    pub reason: Option<String>,
}

pub struct Session<R: Rng = StdRng> {
    topology: Topology,
    simulator: Simulator,
    canvas: CanvasBounds,
    rng: R,
}

impl Session<StdRng> {
    /// Session with a seeded standard RNG
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Session configured from `config`: canvas, initial strategy and seed.
    /// Interactive sessions run without a hop limit unless one is configured.
    pub fn from_config(config: &SimConfig) -> Self {
        let mut session = Self::seeded(config.seed);
        session.canvas = config.canvas;
        session.simulator.set_strategy(config.strategy);
        session.simulator.set_max_hops(config.max_hops);
        session
    }
}

impl<R: Rng> Session<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            topology: Topology::new(),
            simulator: Simulator::new(),
            canvas: CanvasBounds::default(),
            rng,
        }
    }

    pub fn with_canvas(mut self, canvas: CanvasBounds) -> Self {
        self.canvas = canvas;
        self
    }

    /// Replace the node set. Any run in progress is discarded.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self.simulator.reset();
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn canvas(&self) -> CanvasBounds {
        self.canvas
    }

    /// Place an inactive node, clamped to the canvas
    pub fn add_node(&mut self, position: Point) -> NodeId {
        self.topology.add_node(self.canvas.clamp(position))
    }

    pub fn add_node_with_address(&mut self, position: Point, address: Address) -> NodeId {
        self.topology
            .add_node_with_address(self.canvas.clamp(position), address)
    }

    pub fn cycle_node_address(&mut self, id: NodeId) -> Result<Address, TopologyError> {
        self.topology.cycle_address(id)
    }

    /// Relocate a node (clamped to the canvas). Returns a reset notice when
    /// the move cancelled the in-flight run.
    pub fn move_node(
        &mut self,
        id: NodeId,
        position: Point,
    ) -> Result<Option<ResetNotice>, TopologyError> {
        self.topology.move_node(id, self.canvas.clamp(position))?;
        Ok(self.simulator.notify_node_moved(id))
    }

    pub fn set_strategy(&mut self, strategy: StrategyKind) {
        self.simulator.set_strategy(strategy);
    }

    pub fn strategy(&self) -> StrategyKind {
        self.simulator.strategy()
    }

    pub fn set_max_hops(&mut self, max_hops: Option<u32>) {
        self.simulator.set_max_hops(max_hops);
    }

    pub fn start_simulation(&mut self) -> Result<Packet, StartError> {
        self.simulator.start(&self.topology, &mut self.rng)
    }

    pub fn advance_one_hop(&mut self) -> Result<StepOutcome, StepError> {
        self.simulator.step(&self.topology, &mut self.rng)
    }

    pub fn run_to_completion(&mut self) -> Result<RunOutcome, StepError> {
        self.simulator.run_to_completion(&self.topology, &mut self.rng)
    }

    /// Current proximity graph
    pub fn graph(&self) -> ProximityGraph {
        ProximityGraph::build(&self.topology.to_vec())
    }

    pub fn snapshot(&self) -> Snapshot {
        let outcome = self.simulator.outcome().copied();
        Snapshot {
            nodes: self.topology.to_vec(),
            edges: self.graph().edges(),
            strategy: self.simulator.strategy(),
            state: self.simulator.state(),
            packet: self.simulator.packet().copied(),
            route: self.simulator.route().to_vec(),
            reason: outcome.as_ref().map(RunOutcome::reason),
            outcome,
        }
    }
}
