//! Routing Simulator
//!
//! Drives one packet at a time from a source to a same-address destination.
//! Each call to [`Simulator::step`] is one atomic hop: rebuild the proximity
//! graph from the current positions, ask the strategy for a next hop, append
//! the edge. Scheduling steps (and any presentation delay between them) is
//! left to the caller.
//!
//! ```text
//! Idle ──start──▶ AwaitingFirstHop ──hop──▶ InTransit ──hop──▶ ...
//!                        │                      │
//!                        ├──── no next hop ─────┼──▶ Lost
//!                        ├──── reached dest ────┼──▶ Arrived
//!                        └──── node moved ──────┴──▶ Cancelled
//! ```

use crate::routing::{select_next_hop, RouteSegment, StrategyKind};
use crate::stats::RouteStats;
use crate::topology::{Address, Node, NodeId, Topology};
use crate::triangulation::ProximityGraph;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Hop limit applied by [`Simulator::run_to_completion`] when none is configured
pub const DEFAULT_MAX_HOPS: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    /// Packet assigned, no hop taken yet
    AwaitingFirstHop,
    InTransit,
    Arrived,
    Lost,
    Cancelled,
}

impl RunState {
    /// A run is in flight and accepts steps
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::AwaitingFirstHop | RunState::InTransit)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Arrived | RunState::Lost | RunState::Cancelled)
    }
}

/// Per-run packet state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub source: NodeId,
    pub current: NodeId,
    pub destination: NodeId,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Need at least 2 active nodes to start a run (found {active})")]
    InsufficientActiveNodes { active: usize },

    #[error("No other active node shares address {address} with source {source_node}")]
    NoDestinationCandidate {
        source_node: NodeId,
        address: Address,
    },

    #[error("A run is already in progress")]
    RunAlreadyActive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("No run is in progress")]
    NoActiveRun,
}

/// Why a run ended without arriving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossReason {
    /// The strategy found no valid next hop
    NoNeighbor { at: NodeId },
    /// The run used up its hop budget
    HopLimit { limit: u32 },
}

impl std::fmt::Display for LossReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LossReason::NoNeighbor { at } => write!(f, "no valid next hop at {}", at),
            LossReason::HopLimit { limit } => write!(f, "hop limit exceeded ({} hops)", limit),
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Arrived(RouteStats),
    Lost(LossReason),
    Cancelled { moved: NodeId },
}

impl RunOutcome {
    /// Human-readable reason string for presentation
    pub fn reason(&self) -> String {
        self.to_string()
    }

    pub fn stats(&self) -> Option<&RouteStats> {
        match self {
            RunOutcome::Arrived(stats) => Some(stats),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Arrived(stats) => write!(f, "Arrived: {}", stats),
            RunOutcome::Lost(reason) => write!(f, "Lost: {}", reason),
            RunOutcome::Cancelled { moved } => {
                write!(f, "Cancelled: {} moved while the route was in progress", moved)
            }
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Hopped { from: NodeId, to: NodeId },
    Arrived(RouteStats),
    Lost(LossReason),
}

/// Issued when a topology change discards an in-progress route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetNotice {
    pub moved: NodeId,
    pub discarded_hops: usize,
}

impl std::fmt::Display for ResetNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Route reset: {} moved ({} hops discarded)",
            self.moved, self.discarded_hops
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveRun {
    packet: Packet,
    /// Strategy captured at start; later selections apply to the next run
    strategy: StrategyKind,
    hops: u32,
}

/// Single-run simulator. At most one run is active at a time.
#[derive(Debug, Clone)]
pub struct Simulator {
    strategy: StrategyKind,
    max_hops: Option<u32>,
    state: RunState,
    run: Option<ActiveRun>,
    route: Vec<RouteSegment>,
    outcome: Option<RunOutcome>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::with_strategy(StrategyKind::default())
    }

    pub fn with_strategy(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            max_hops: None,
            state: RunState::Idle,
            run: None,
            route: Vec::new(),
            outcome: None,
        }
    }

    pub fn with_max_hops(mut self, max_hops: Option<u32>) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Select the strategy for the next run. An in-flight run keeps its own.
    pub fn set_strategy(&mut self, strategy: StrategyKind) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Strategy of the in-flight run, if any
    pub fn active_strategy(&self) -> Option<StrategyKind> {
        self.run.map(|r| r.strategy)
    }

    pub fn set_max_hops(&mut self, max_hops: Option<u32>) {
        self.max_hops = max_hops;
    }

    pub fn max_hops(&self) -> Option<u32> {
        self.max_hops
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn packet(&self) -> Option<&Packet> {
        self.run.as_ref().map(|r| &r.packet)
    }

    /// Accumulated route, in travel order
    pub fn route(&self) -> &[RouteSegment] {
        &self.route
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Return to Idle, discarding any route, packet and outcome
    pub fn reset(&mut self) {
        self.state = RunState::Idle;
        self.run = None;
        self.route.clear();
        self.outcome = None;
    }

    /// Start a run between two random active nodes sharing an address.
    ///
    /// The source is drawn uniformly from all active nodes, then the
    /// destination uniformly from the other active nodes with the source's
    /// address. A finished run is kept until the new run is accepted; a run
    /// still in flight rejects the request.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<Packet, StartError> {
        if self.state.is_active() {
            warn!(state = ?self.state, "Start rejected: run already active");
            return Err(StartError::RunAlreadyActive);
        }

        let active = topology.active_nodes();
        if active.len() < 2 {
            let err = StartError::InsufficientActiveNodes {
                active: active.len(),
            };
            warn!(active = active.len(), reason = %err, "Start rejected");
            return Err(err);
        }

        let Some(&source) = active.choose(rng) else {
            return Err(StartError::InsufficientActiveNodes { active: 0 });
        };

        let partners: Vec<&Node> = active
            .iter()
            .copied()
            .filter(|n| n.address == source.address && n.id != source.id)
            .collect();

        let Some(&destination) = partners.choose(rng) else {
            let err = StartError::NoDestinationCandidate {
                source_node: source.id,
                address: source.address,
            };
            warn!(source = %source.id, address = %source.address, reason = %err, "Start rejected");
            return Err(err);
        };

        self.reset();
        let packet = Packet {
            source: source.id,
            current: source.id,
            destination: destination.id,
            address: source.address,
        };
        self.run = Some(ActiveRun {
            packet,
            strategy: self.strategy,
            hops: 0,
        });
        self.state = RunState::AwaitingFirstHop;

        info!(
            source = %packet.source,
            destination = %packet.destination,
            address = %packet.address,
            strategy = %self.strategy,
            "Run started"
        );
        Ok(packet)
    }

    /// Take one hop, honouring the configured hop limit
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<StepOutcome, StepError> {
        self.step_with_limit(topology, rng, self.max_hops)
    }

    /// Step until the run reaches a terminal state.
    ///
    /// Uses the configured hop limit, or [`DEFAULT_MAX_HOPS`] when none is
    /// set, so strategies that oscillate still terminate.
    pub fn run_to_completion<R: Rng + ?Sized>(
        &mut self,
        topology: &Topology,
        rng: &mut R,
    ) -> Result<RunOutcome, StepError> {
        let limit = Some(self.max_hops.unwrap_or(DEFAULT_MAX_HOPS));
        loop {
            match self.step_with_limit(topology, rng, limit)? {
                StepOutcome::Hopped { .. } => continue,
                StepOutcome::Arrived(stats) => return Ok(RunOutcome::Arrived(stats)),
                StepOutcome::Lost(reason) => return Ok(RunOutcome::Lost(reason)),
            }
        }
    }

    fn step_with_limit<R: Rng + ?Sized>(
        &mut self,
        topology: &Topology,
        rng: &mut R,
        limit: Option<u32>,
    ) -> Result<StepOutcome, StepError> {
        let run = match self.run {
            Some(run) if self.state.is_active() => run,
            _ => return Err(StepError::NoActiveRun),
        };

        if let Some(limit) = limit {
            if run.hops >= limit {
                return Ok(self.finish_lost(LossReason::HopLimit { limit }));
            }
        }

        let packet = run.packet;
        let (Some(current), Some(destination)) =
            (topology.get(packet.current), topology.get(packet.destination))
        else {
            return Ok(self.finish_lost(LossReason::NoNeighbor { at: packet.current }));
        };

        let graph = ProximityGraph::build(&topology.to_vec());
        let neighbors: Vec<Node> = graph
            .neighbors(current.id)
            .into_iter()
            .filter_map(|id| topology.get(id).copied())
            .collect();

        let Some(next) =
            select_next_hop(current, destination, &neighbors, &self.route, run.strategy, rng)
        else {
            return Ok(self.finish_lost(LossReason::NoNeighbor { at: current.id }));
        };

        self.route
            .push(RouteSegment::new(current, next, destination.address));
        let hops = run.hops + 1;
        if let Some(active) = self.run.as_mut() {
            active.packet.current = next.id;
            active.hops = hops;
        }

        debug!(
            from = %current.id,
            to = %next.id,
            hop = hops,
            remaining = next.position.distance(&destination.position),
            "Hop"
        );

        if next.id == destination.id {
            return Ok(self.finish_arrived());
        }

        self.state = RunState::InTransit;
        Ok(StepOutcome::Hopped {
            from: current.id,
            to: next.id,
        })
    }

    fn finish_arrived(&mut self) -> StepOutcome {
        let Some(stats) = RouteStats::compute(&self.route) else {
            // An arrival always appends a segment first
            return self.finish_lost(LossReason::NoNeighbor {
                at: self.run.map(|r| r.packet.current).unwrap_or(NodeId(0)),
            });
        };

        info!(
            hops = stats.edge_count,
            total_length = stats.total_length,
            direct_distance = stats.direct_distance,
            stretch = stats.stretch(),
            "Packet arrived"
        );
        self.state = RunState::Arrived;
        self.run = None;
        self.outcome = Some(RunOutcome::Arrived(stats));
        StepOutcome::Arrived(stats)
    }

    fn finish_lost(&mut self, reason: LossReason) -> StepOutcome {
        warn!(hops = self.route.len(), reason = %reason, "Packet lost");
        self.state = RunState::Lost;
        self.run = None;
        self.outcome = Some(RunOutcome::Lost(reason));
        StepOutcome::Lost(reason)
    }

    /// Whether moving `id` would invalidate the in-flight run
    pub fn is_route_relevant(&self, id: NodeId) -> bool {
        let Some(run) = self.run.as_ref() else {
            return false;
        };
        run.packet.current == id
            || run.packet.destination == id
            || self.route.iter().any(|s| s.from == id || s.to == id)
    }

    /// React to a node relocation. Cancels the in-flight run when the node
    /// is on its route, returning the reset notice for the caller.
    pub fn notify_node_moved(&mut self, id: NodeId) -> Option<ResetNotice> {
        if !self.state.is_active() || !self.is_route_relevant(id) {
            return None;
        }

        let notice = ResetNotice {
            moved: id,
            discarded_hops: self.route.len(),
        };
        self.route.clear();
        self.run = None;
        self.state = RunState::Cancelled;
        self.outcome = Some(RunOutcome::Cancelled { moved: id });

        info!(node = %id, discarded_hops = notice.discarded_hops, "Run cancelled by topology change");
        Some(notice)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
