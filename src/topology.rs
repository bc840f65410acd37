//! Topology State: the node set owned by a session
//!
//! Nodes carry a stable identity, a planar position, and an address label
//! drawn from a small fixed palette. `Address::Grey` is the inactive
//! sentinel: grey nodes forward packets but never send or receive them.

use crate::config::CanvasBounds;
use crate::Point;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Node identifier. Assigned sequentially, never reused within a topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Address palette. Cycling walks the palette in declaration order and wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Address {
    /// Inactive sentinel
    #[default]
    Grey,
    Red,
    Blue,
    Green,
    Orange,
}

impl Address {
    pub const PALETTE: [Address; 5] = [
        Address::Grey,
        Address::Red,
        Address::Blue,
        Address::Green,
        Address::Orange,
    ];

    /// Active addresses only (everything except the sentinel)
    pub const ACTIVE: [Address; 4] = [Address::Red, Address::Blue, Address::Green, Address::Orange];

    pub fn is_active(&self) -> bool {
        *self != Address::Grey
    }

    /// Next address in the palette, wrapping back to the sentinel
    pub fn next(&self) -> Self {
        match self {
            Address::Grey => Address::Red,
            Address::Red => Address::Blue,
            Address::Blue => Address::Green,
            Address::Green => Address::Orange,
            Address::Orange => Address::Grey,
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Address::Grey => "grey",
            Address::Red => "red",
            Address::Blue => "blue",
            Address::Green => "green",
            Address::Orange => "orange",
        };
        f.write_str(name)
    }
}

/// A node in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub address: Address,
}

impl Node {
    pub fn new(id: NodeId, position: Point, address: Address) -> Self {
        Self {
            id,
            position,
            address,
        }
    }

    pub fn is_active(&self) -> bool {
        self.address.is_active()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
}

/// The node set. Iteration is always in ascending `NodeId` order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new inactive node
    pub fn add_node(&mut self, position: Point) -> NodeId {
        self.add_node_with_address(position, Address::Grey)
    }

    /// Place a new node with an explicit address
    pub fn add_node_with_address(&mut self, position: Point, address: Address) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, position, address));
        debug!(node = %id, position = %position, address = %address, "Node added");
        id
    }

    /// Advance a node's address to the next palette entry
    pub fn cycle_address(&mut self, id: NodeId) -> Result<Address, TopologyError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TopologyError::UnknownNode(id))?;
        node.address = node.address.next();
        debug!(node = %id, address = %node.address, "Node address cycled");
        Ok(node.address)
    }

    /// Relocate a node. Callers clamp the position beforehand.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), TopologyError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(TopologyError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in ascending id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Owned copy of the node list, ascending id order
    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.values().copied().collect()
    }

    /// Nodes whose address is not the inactive sentinel
    pub fn active_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.is_active()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Scatter `num_nodes` nodes uniformly over the canvas. Each node is
    /// active with probability `active_fraction`, drawing its address
    /// uniformly from the active palette.
    pub fn random<R: Rng + ?Sized>(
        num_nodes: usize,
        canvas: &CanvasBounds,
        active_fraction: f64,
        rng: &mut R,
    ) -> Self {
        let mut topology = Self::new();
        for _ in 0..num_nodes {
            let position = Point::new(
                rng.gen::<f64>() * canvas.width,
                rng.gen::<f64>() * canvas.height,
            );
            let address = if rng.gen_bool(active_fraction.clamp(0.0, 1.0)) {
                Address::ACTIVE.choose(rng).copied().unwrap_or_default()
            } else {
                Address::Grey
            };
            topology.add_node_with_address(position, address);
        }
        topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_and_stable() {
        let mut topo = Topology::new();
        let a = topo.add_node(Point::new(0.0, 0.0));
        let b = topo.add_node(Point::new(1.0, 0.0));
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));

        topo.move_node(a, Point::new(5.0, 5.0)).unwrap();
        assert_eq!(topo.get(a).unwrap().position, Point::new(5.0, 5.0));
        assert_eq!(topo.get(a).unwrap().id, a);
    }

    #[test]
    fn test_address_cycle_wraps() {
        let mut addr = Address::Grey;
        for _ in 0..Address::PALETTE.len() {
            addr = addr.next();
        }
        assert_eq!(addr, Address::Grey);
        assert!(!Address::Grey.is_active());
        assert!(Address::ACTIVE.iter().all(|a| a.is_active()));
    }

    #[test]
    fn test_cycle_address_on_node() {
        let mut topo = Topology::new();
        let id = topo.add_node(Point::origin());
        assert!(topo.active_nodes().is_empty());
        assert_eq!(topo.cycle_address(id).unwrap(), Address::Red);
        assert_eq!(topo.active_nodes().len(), 1);
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut topo = Topology::new();
        let missing = NodeId(42);
        assert_eq!(
            topo.cycle_address(missing),
            Err(TopologyError::UnknownNode(missing))
        );
        assert!(topo.move_node(missing, Point::origin()).is_err());
    }

    #[test]
    fn test_random_topology_stays_on_canvas() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let canvas = CanvasBounds::new(200.0, 100.0);
        let mut rng = StdRng::seed_from_u64(3);
        let topo = Topology::random(40, &canvas, 0.5, &mut rng);
        assert_eq!(topo.len(), 40);
        assert!(topo.nodes().all(|n| canvas.contains(&n.position)));

        let all_grey = Topology::random(10, &canvas, 0.0, &mut rng);
        assert!(all_grey.active_nodes().is_empty());
    }

    #[test]
    fn test_iteration_order_ascending() {
        let mut topo = Topology::new();
        for i in 0..5 {
            topo.add_node(Point::new(i as f64, 0.0));
        }
        let ids: Vec<u64> = topo.nodes().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
