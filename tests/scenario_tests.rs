//! End-to-end routing scenarios
//!
//! Each test drives a full session through the public interface: place
//! nodes, start a run, step it, and inspect the terminal outcome.

use planar_route::routing::{select_next_hop, StrategyKind};
use planar_route::simulation::{LossReason, RunOutcome, RunState, StartError, StepOutcome};
use planar_route::topology::{Address, NodeId};
use planar_route::triangulation::ProximityGraph;
use planar_route::{Point, Session};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Two red nodes and a grey relay forming a triangle
#[test]
fn test_triangle_arrives_in_one_hop() {
    for seed in 0..10 {
        let mut session = Session::seeded(seed);
        let a = session.add_node_with_address(Point::new(100.0, 100.0), Address::Red);
        let b = session.add_node_with_address(Point::new(300.0, 120.0), Address::Red);
        session.add_node_with_address(Point::new(200.0, 300.0), Address::Grey);
        session.set_strategy(StrategyKind::ClosestToDestination);

        let packet = session.start_simulation().unwrap();
        let mut endpoints = [packet.source, packet.destination];
        endpoints.sort();
        assert_eq!(endpoints, [a, b]);

        let step = session.advance_one_hop().unwrap();
        let StepOutcome::Arrived(stats) = step else {
            panic!("expected arrival in one hop, got {:?}", step);
        };
        assert_eq!(stats.edge_count, 1);
        assert!((stats.total_length - stats.direct_distance).abs() < 1e-9);
        assert!((stats.stretch() - 1.0).abs() < 1e-9);
        assert_eq!(session.simulator().state(), RunState::Arrived);
    }
}

/// Collinear blue endpoints with grey relays: the graph is a chain and
/// smallest-jump walks it end to end
#[test]
fn test_chain_smallest_jump_walks_every_relay() {
    let mut session = Session::seeded(3);
    let a = session.add_node_with_address(Point::new(100.0, 200.0), Address::Blue);
    let b = session.add_node_with_address(Point::new(200.0, 200.0), Address::Grey);
    let c = session.add_node_with_address(Point::new(300.0, 200.0), Address::Grey);
    let d = session.add_node_with_address(Point::new(400.0, 200.0), Address::Blue);

    assert_eq!(session.graph().edges(), vec![(a, b), (b, c), (c, d)]);

    session.set_strategy(StrategyKind::SmallestJump);
    let packet = session.start_simulation().unwrap();
    let outcome = session.run_to_completion().unwrap();
    assert_eq!(outcome.stats().map(|s| s.edge_count), Some(3));

    let route = session.simulator().route();
    let mut visited: Vec<NodeId> = vec![route[0].from];
    visited.extend(route.iter().map(|s| s.to));
    if packet.source == a {
        assert_eq!(visited, vec![a, b, c, d]);
    } else {
        assert_eq!(visited, vec![d, c, b, a]);
    }

    let dest = session.topology().get(packet.destination).unwrap().position;
    for segment in route {
        assert!(segment.to_position.distance(&dest) < segment.from_position.distance(&dest));
    }
}

/// Collinear-ish blue endpoints: 0.01 offsets make two sliver triangles,
/// every node keeps its neighbors and smallest-jump still visits each relay
#[test]
fn test_nearly_collinear_smallest_jump_walks_every_relay() {
    for seed in 0..10 {
        let mut session = Session::seeded(seed);
        let a = session.add_node_with_address(Point::new(100.0, 200.0), Address::Blue);
        let b = session.add_node_with_address(Point::new(200.0, 200.01), Address::Grey);
        let c = session.add_node_with_address(Point::new(300.0, 200.0), Address::Grey);
        let d = session.add_node_with_address(Point::new(400.0, 200.01), Address::Blue);

        let graph = session.graph();
        for node in [a, b, c, d] {
            assert!(graph.degree(node) >= 2, "{} lost its neighbors", node);
        }
        assert!(graph.are_adjacent(c, d));

        session.set_strategy(StrategyKind::SmallestJump);
        let packet = session.start_simulation().unwrap();
        let outcome = session.run_to_completion().unwrap();
        assert_eq!(outcome.stats().map(|s| s.edge_count), Some(3));

        let route = session.simulator().route();
        let mut visited: Vec<NodeId> = vec![route[0].from];
        visited.extend(route.iter().map(|s| s.to));
        if packet.source == a {
            assert_eq!(visited, vec![a, b, c, d]);
        } else {
            assert_eq!(visited, vec![d, c, b, a]);
        }

        let dest = session.topology().get(packet.destination).unwrap().position;
        for segment in route {
            assert!(segment.to_position.distance(&dest) < segment.from_position.distance(&dest));
        }
    }
}

/// Zig-zag corridor: smallest-jump still takes 3 hops even though the
/// triangulation adds diagonals
#[test]
fn test_zigzag_smallest_jump_takes_three_hops() {
    let mut session = Session::seeded(8);
    session.add_node_with_address(Point::new(100.0, 200.0), Address::Blue);
    session.add_node_with_address(Point::new(200.0, 210.0), Address::Grey);
    session.add_node_with_address(Point::new(300.0, 190.0), Address::Grey);
    session.add_node_with_address(Point::new(400.0, 200.0), Address::Blue);
    session.set_strategy(StrategyKind::SmallestJump);

    session.start_simulation().unwrap();
    let outcome = session.run_to_completion().unwrap();
    assert_eq!(outcome.stats().map(|s| s.edge_count), Some(3));
}

/// Nodes stacked on top of existing nodes are left out of the
/// triangulation, so a packet starting there cannot move
#[test]
fn test_isolated_source_is_lost_on_first_step() {
    for strategy in StrategyKind::ALL {
        let mut session = Session::seeded(21);
        session.add_node(Point::new(100.0, 100.0));
        session.add_node(Point::new(300.0, 100.0));
        session.add_node(Point::new(200.0, 250.0));
        let x = session.add_node_with_address(Point::new(100.0, 100.0), Address::Orange);
        let y = session.add_node_with_address(Point::new(300.0, 100.0), Address::Orange);

        let graph = session.graph();
        assert!(graph.neighbors(x).is_empty());
        assert!(graph.neighbors(y).is_empty());

        session.set_strategy(strategy);
        let packet = session.start_simulation().unwrap();
        let step = session.advance_one_hop().unwrap();
        assert_eq!(
            step,
            StepOutcome::Lost(LossReason::NoNeighbor { at: packet.source })
        );
        assert_eq!(session.simulator().state(), RunState::Lost);
        assert!(session.simulator().packet().is_none());
        assert!(session.simulator().route().is_empty());
    }
}

#[test]
fn test_isolated_current_has_no_next_hop() {
    let mut session = Session::seeded(2);
    session.add_node(Point::new(0.0, 0.0));
    session.add_node(Point::new(50.0, 0.0));
    session.add_node(Point::new(25.0, 40.0));
    let lonely = session.add_node(Point::new(50.0, 0.0));
    let graph = session.graph();
    let topo = session.topology();

    let current = topo.get(lonely).unwrap();
    let destination = topo.get(NodeId(0)).unwrap();
    let neighbors: Vec<_> = graph
        .neighbors(lonely)
        .into_iter()
        .filter_map(|id| topo.get(id).copied())
        .collect();
    let mut rng = StdRng::seed_from_u64(0);
    for strategy in StrategyKind::ALL {
        assert!(select_next_hop(current, destination, &neighbors, &[], strategy, &mut rng).is_none());
    }
}

/// With only two nodes there is no graph, so the first step dead-ends
#[test]
fn test_undersized_graph_degenerates_to_lost() {
    let mut session = Session::seeded(4);
    session.add_node_with_address(Point::new(10.0, 10.0), Address::Red);
    session.add_node_with_address(Point::new(90.0, 10.0), Address::Red);
    assert_eq!(session.graph().edge_count(), 0);

    session.start_simulation().unwrap();
    let outcome = session.run_to_completion().unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Lost(LossReason::NoNeighbor { .. })
    ));
}

/// Dragging a node that the packet already passed through wipes the run
#[test]
fn test_moving_route_node_cancels_run() {
    let mut session = Session::seeded(6);
    session.add_node_with_address(Point::new(100.0, 200.0), Address::Blue);
    session.add_node_with_address(Point::new(200.0, 210.0), Address::Grey);
    session.add_node_with_address(Point::new(300.0, 190.0), Address::Grey);
    session.add_node_with_address(Point::new(400.0, 200.0), Address::Blue);
    session.set_strategy(StrategyKind::SmallestJump);

    let packet = session.start_simulation().unwrap();
    let StepOutcome::Hopped { from, .. } = session.advance_one_hop().unwrap() else {
        panic!("first hop should not arrive");
    };
    assert_eq!(from, packet.source);
    assert_eq!(session.simulator().route().len(), 1);

    let notice = session
        .move_node(from, Point::new(120.0, 260.0))
        .unwrap()
        .expect("moving the source mid-route must reset");
    assert_eq!(notice.moved, from);
    assert_eq!(notice.discarded_hops, 1);
    assert!(notice.to_string().starts_with("Route reset"));

    let sim = session.simulator();
    assert_eq!(sim.state(), RunState::Cancelled);
    assert!(sim.route().is_empty());
    assert!(sim.packet().is_none());
    assert!(matches!(sim.outcome(), Some(RunOutcome::Cancelled { .. })));
    assert!(session.advance_one_hop().is_err());
}

#[test]
fn test_address_cycling_does_not_cancel() {
    let mut session = Session::seeded(6);
    let a = session.add_node_with_address(Point::new(100.0, 100.0), Address::Red);
    session.add_node_with_address(Point::new(300.0, 100.0), Address::Red);
    session.add_node(Point::new(200.0, 300.0));

    session.start_simulation().unwrap();
    session.cycle_node_address(a).unwrap();
    assert!(session.simulator().is_active());
}

#[test]
fn test_single_active_node_rejected() {
    let mut session = Session::seeded(9);
    session.add_node_with_address(Point::new(10.0, 10.0), Address::Green);
    session.add_node(Point::new(50.0, 10.0));
    session.add_node(Point::new(30.0, 40.0));

    assert_eq!(
        session.start_simulation(),
        Err(StartError::InsufficientActiveNodes { active: 1 })
    );
    assert!(session.simulator().packet().is_none());
    assert_eq!(session.simulator().state(), RunState::Idle);
}

#[test]
fn test_graph_is_rebuilt_after_move() {
    let mut session = Session::seeded(1);
    let a = session.add_node(Point::new(0.0, 0.0));
    let b = session.add_node(Point::new(100.0, 0.0));
    let c = session.add_node(Point::new(100.0, 100.0));
    let d = session.add_node(Point::new(0.0, 100.0));
    let before: ProximityGraph = session.graph();

    // Pull d inside triangle abc
    session.move_node(d, Point::new(60.0, 40.0)).unwrap();
    let after = session.graph();
    assert_ne!(before, after);
    assert_eq!(after.degree(d), 3);
    assert!(after.are_adjacent(a, d) && after.are_adjacent(b, d) && after.are_adjacent(c, d));
}
