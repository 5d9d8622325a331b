//! Unit tests for the link spring force

use forcesim_core::diagnostics::Diagnostics;
use forcesim_core::tests::test_helpers::{approx_eq, graph_data, simulation, two_node_data};
use forcesim_core::{
    ForceAccumulator, Graph, GraphData, Jitter, LinkConfig, LinkDistance, LinkForce, LinkStrength,
};
use glam::DVec2;

fn link_forces(graph: &Graph, config: &LinkConfig) -> Vec<DVec2> {
    let link = LinkForce::new(config, graph);
    let mut acc = ForceAccumulator::zeroed(graph.len());
    link.accumulate(graph, &mut acc, &mut Jitter::default(), &mut Diagnostics::new());
    acc.as_slice().to_vec()
}

fn constant(distance: f64, strength: f64) -> LinkConfig {
    LinkConfig {
        distance: LinkDistance::Constant(distance),
        strength: LinkStrength::Constant(strength),
    }
}

fn diagonal_pair() -> GraphData {
    graph_data(&[("a", 0.0, 0.0), ("b", 3.0, 4.0)], &[("a", "b")])
}

#[test]
fn test_spring_at_rest_length_applies_no_force() {
    let graph = Graph::from_data(&diagonal_pair()).unwrap();
    let forces = link_forces(&graph, &constant(5.0, 1.0));
    assert!(forces[0].length() < 1e-12);
    assert!(forces[1].length() < 1e-12);
}

#[test]
fn test_stretched_spring_pulls_together() {
    let graph = Graph::from_data(&diagonal_pair()).unwrap();
    let forces = link_forces(&graph, &constant(3.0, 1.0));

    // (l - d) / l * k = 2 / 5; half of it goes to each end
    let expected = DVec2::new(3.0, 4.0) * (2.0 / 5.0) * 0.5;
    assert!(approx_eq(forces[0].x, expected.x, 1e-12));
    assert!(approx_eq(forces[0].y, expected.y, 1e-12));
    assert!(approx_eq(forces[1].x, -expected.x, 1e-12));
}

#[test]
fn test_compressed_spring_pushes_apart() {
    let graph = Graph::from_data(&diagonal_pair()).unwrap();
    let forces = link_forces(&graph, &constant(8.0, 1.0));
    assert!(forces[0].x < 0.0 && forces[0].y < 0.0);
    assert!(forces[1].x > 0.0 && forces[1].y > 0.0);
}

#[test]
fn test_lower_degree_end_moves_more() {
    // hub has degree 3, leaf has degree 1
    let data = graph_data(
        &[("hub", 0.0, 0.0), ("leaf", 100.0, 0.0), ("x", 0.0, 50.0), ("y", 0.0, -50.0)],
        &[("hub", "leaf"), ("hub", "x"), ("hub", "y")],
    );
    let graph = Graph::from_data(&data).unwrap();
    let link = LinkForce::new(&LinkConfig::default(), &graph);
    let params = link.params(0);
    assert!(approx_eq(params.bias, 0.75, 1e-12));
    assert!(approx_eq(params.strength, 1.0, 1e-12));
    assert!(approx_eq(params.distance, 30.0 + 5.0 * (3f64.sqrt() - 1.0), 1e-12));

    let forces = link_forces(&graph, &LinkConfig::default());
    // The leaf only feels the hub link; the hub feels all three
    assert!(forces[1].x < 0.0);
}

#[test]
fn test_default_distance_for_leaf_pair() {
    let graph = Graph::from_data(&two_node_data()).unwrap();
    let link = LinkForce::new(&LinkConfig::default(), &graph);
    assert!(approx_eq(link.params(0).distance, 30.0, 1e-12));
    assert!(approx_eq(link.params(0).bias, 0.5, 1e-12));
}

#[test]
fn test_value_scaled_strength() {
    let mut data = two_node_data();
    data.links[0].value = 4.0;
    let graph = Graph::from_data(&data).unwrap();
    let config = LinkConfig {
        strength: LinkStrength::ValueScaled,
        ..LinkConfig::default()
    };
    assert!(approx_eq(LinkForce::new(&config, &graph).params(0).strength, 4.0, 1e-12));
}

#[test]
fn test_self_link_contributes_nothing() {
    let data = graph_data(&[("a", 1.0, 1.0)], &[("a", "a")]);
    let graph = Graph::from_data(&data).unwrap();
    let forces = link_forces(&graph, &LinkConfig::default());
    assert_eq!(forces[0], DVec2::ZERO);
}

#[test]
fn test_isolated_link_is_symmetric_at_every_step() {
    let mut sim = simulation(&two_node_data());
    let config = sim.config().link.clone();
    for _ in 0..120 {
        sim.tick();
        let forces = link_forces(sim.graph(), &config);
        let sum = forces[0] + forces[1];
        assert!(sum.length() <= 1e-12 * forces[0].length().max(1.0), "net link force {:?}", sum);
        assert!(approx_eq(forces[0].length(), forces[1].length(), 1e-12));
    }
}

#[test]
fn test_non_finite_endpoint_skips_link() {
    let mut graph = Graph::from_data(&two_node_data()).unwrap();
    graph.nodes[1].pos = DVec2::new(f64::NAN, 0.0);

    let link = LinkForce::new(&LinkConfig::default(), &graph);
    let mut acc = ForceAccumulator::zeroed(graph.len());
    let mut diagnostics = Diagnostics::new();
    link.accumulate(&graph, &mut acc, &mut Jitter::default(), &mut diagnostics);

    assert_eq!(acc.get(0), DVec2::ZERO);
    assert_eq!(diagnostics.len(), 1);
}
