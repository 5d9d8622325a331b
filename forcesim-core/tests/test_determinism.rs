//! Determinism and dataset tests: the same graph always lays out the same way

use forcesim_core::tests::test_helpers::{run_until_settled, simulation};
use forcesim_core::{
    analyze_graph, ConstructionError, GraphData, LinkEnd, LoadError, Phase, Simulation,
    SimulationConfig,
};
use glam::DVec2;
use std::path::PathBuf;

fn data_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("..");
    path.push("data");
    path.push(filename);
    path
}

fn broken_data_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    path.push("broken");
    path.push(filename);
    path
}

fn final_positions(data: &GraphData) -> Vec<DVec2> {
    let mut sim = simulation(data);
    run_until_settled(&mut sim, 1_000);
    sim.graph().nodes.iter().map(|n| n.pos).collect()
}

#[test]
fn test_sample_dataset_loads() {
    let data = GraphData::from_json_file(data_path("miserables_small.json")).unwrap();
    assert_eq!(data.nodes.len(), 21);
    assert!(analyze_graph(&data).is_empty());
}

#[test]
fn test_sample_dataset_is_deterministic() {
    let data = GraphData::from_json_file(data_path("miserables_small.json")).unwrap();
    let first = final_positions(&data);
    let second = final_positions(&data);
    assert_eq!(first, second, "running the same graph twice should be bit-identical");
}

#[test]
fn test_sample_dataset_settles_centered() {
    let data = GraphData::from_json_file(data_path("miserables_small.json")).unwrap();
    let config = SimulationConfig::default().for_viewport(928.0, 600.0);
    let mut sim = Simulation::new(&data, config).unwrap();
    run_until_settled(&mut sim, 1_000);

    assert_eq!(sim.phase(), Phase::Settled);
    assert!(sim.graph().nodes.iter().all(|n| n.pos.is_finite()));
    let centroid = sim.graph().centroid().unwrap();
    assert!(centroid.distance(DVec2::new(464.0, 300.0)) < 1e-6);
    assert!(sim.last_diagnostics().is_empty());
}

#[test]
fn test_unknown_target_file_is_rejected() {
    let data = GraphData::from_json_file(broken_data_path("unknown_target.json")).unwrap();
    let err = Simulation::new(&data, SimulationConfig::default()).unwrap_err();
    assert_eq!(
        err,
        ConstructionError::UnknownNode {
            index: 0,
            end: LinkEnd::Target,
            id: "c".to_string(),
        }
    );
}

#[test]
fn test_duplicate_node_file_is_rejected() {
    let data = GraphData::from_json_file(broken_data_path("duplicate_node.json")).unwrap();
    let errors = analyze_graph(&data);
    assert_eq!(errors, vec![ConstructionError::DuplicateNode("a".to_string())]);
}

#[test]
fn test_truncated_file_is_a_load_error() {
    let result = GraphData::from_json_file(broken_data_path("truncated.json"));
    assert!(matches!(result, Err(LoadError::Json(_))));
}

#[test]
fn test_missing_file_is_a_load_error() {
    let result = GraphData::from_json_file(broken_data_path("does_not_exist.json"));
    assert!(matches!(result, Err(LoadError::Io(_))));
}
