//! Engine lifecycle, cooling and end-to-end layout scenarios

use forcesim_core::tests::test_helpers::{
    approx_vec, clustered_data, graph_data, position, run_until_settled, simulation,
    three_free_nodes, two_node_data,
};
use forcesim_core::{
    invalidation, DataQualityWarning, Diagnostics, DragController, ForceAccumulator, Frame, NodeId,
    Phase, Simulation, SimulationConfig,
};
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;

fn counting_observer() -> (Rc<RefCell<usize>>, impl FnMut(&Frame<'_>)) {
    let count = Rc::new(RefCell::new(0usize));
    let seen = Rc::clone(&count);
    (count, move |_frame: &Frame<'_>| *seen.borrow_mut() += 1)
}

#[test]
fn test_first_tick_starts_running() {
    let mut sim = simulation(&two_node_data());
    assert_eq!(sim.phase(), Phase::Idle);
    assert_eq!(sim.alpha(), 1.0);
    assert_eq!(sim.tick(), Phase::Running);
    assert_eq!(sim.steps(), 1);
}

#[test]
fn test_alpha_never_increases_while_cooling() {
    let mut sim = simulation(&clustered_data());
    let mut previous = sim.alpha();
    while sim.tick() == Phase::Running {
        assert!(sim.alpha() <= previous);
        assert!((0.0..=1.0).contains(&sim.alpha()));
        previous = sim.alpha();
    }
    assert_eq!(sim.phase(), Phase::Settled);
}

#[test]
fn test_settles_in_about_300_steps() {
    let mut sim = simulation(&clustered_data());
    let ticks = run_until_settled(&mut sim, 1_000);
    assert_eq!(sim.phase(), Phase::Settled);
    assert!((295..=305).contains(&ticks), "settled after {} ticks", ticks);
    assert!(sim.alpha() <= sim.config().alpha_min);
}

#[test]
fn test_custom_iteration_count_settles_sooner() {
    let config = SimulationConfig::default().with_target_iterations(50);
    let mut sim = Simulation::new(&clustered_data(), config).unwrap();
    let ticks = run_until_settled(&mut sim, 1_000);
    assert!((48..=52).contains(&ticks), "settled after {} ticks", ticks);
}

#[test]
fn test_settled_engine_ignores_ticks() {
    let mut sim = simulation(&two_node_data());
    run_until_settled(&mut sim, 1_000);
    let steps = sim.steps();
    let before = position(&sim, "A");

    assert_eq!(sim.tick(), Phase::Settled);
    assert_eq!(sim.steps(), steps);
    assert_eq!(position(&sim, "A"), before);
}

#[test]
fn test_set_alpha_wakes_settled_engine() {
    let mut sim = simulation(&two_node_data());
    run_until_settled(&mut sim, 1_000);
    sim.set_alpha(0.5);
    assert_eq!(sim.phase(), Phase::Running);
    assert_eq!(sim.tick(), Phase::Running);
}

#[test]
fn test_centroid_converges_to_center_every_step() {
    let config = SimulationConfig::default().for_viewport(928.0, 600.0);
    let target = DVec2::new(464.0, 300.0);
    let mut sim = Simulation::new(&clustered_data(), config).unwrap();

    let mut before = sim.graph().centroid().unwrap().distance(target);
    for _ in 0..100 {
        sim.tick();
        let after = sim.graph().centroid().unwrap().distance(target);
        assert!(after < before || after < 1e-9, "centroid moved away: {} -> {}", before, after);
        before = after;
    }
}

#[test]
fn test_two_linked_nodes_settle_near_link_distance() {
    let mut sim = simulation(&two_node_data());
    run_until_settled(&mut sim, 1_000);

    let a = position(&sim, "A");
    let b = position(&sim, "B");
    let distance = a.distance(b);
    assert!((distance - 30.0).abs() < 3.0, "settled distance {}", distance);
    assert!(approx_vec((a + b) / 2.0, DVec2::ZERO, 1e-6));
}

#[test]
fn test_unlinked_nodes_repel_and_stay_centered() {
    let mut sim = simulation(&three_free_nodes());
    run_until_settled(&mut sim, 1_000);

    let ids = ["a", "b", "c"];
    for (i, first) in ids.iter().enumerate() {
        for second in &ids[i + 1..] {
            let d = position(&sim, first).distance(position(&sim, second));
            assert!(d > 10.0, "{} and {} only {} apart", first, second, d);
        }
    }
    assert!(approx_vec(sim.graph().centroid().unwrap(), DVec2::ZERO, 1e-6));
}

#[test]
fn test_observer_sees_every_applied_step() {
    let (count, observer) = counting_observer();
    let mut sim = simulation(&two_node_data()).on_tick(observer);
    for _ in 0..10 {
        sim.tick();
    }
    assert_eq!(*count.borrow(), 10);
}

#[test]
fn test_frame_reports_positions_and_links() {
    let seen: Rc<RefCell<Vec<(String, DVec2)>>> = Rc::default();
    let segments = Rc::new(RefCell::new(Vec::new()));
    let (nodes_out, links_out) = (Rc::clone(&seen), Rc::clone(&segments));

    let mut sim = simulation(&two_node_data()).on_tick(move |frame: &Frame<'_>| {
        *nodes_out.borrow_mut() = frame.nodes().map(|n| (n.id.to_string(), n.pos)).collect();
        *links_out.borrow_mut() = frame.links().collect::<Vec<_>>();
    });
    sim.tick();

    let nodes = seen.borrow();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].0, "A");
    assert_eq!(nodes[0].1, position(&sim, "A"));

    let links = segments.borrow();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].source, position(&sim, "A"));
    assert_eq!(links[0].target, position(&sim, "B"));
    assert_eq!(links[0].value, 1.0);
}

#[test]
fn test_invalidation_stops_notifications() {
    let (count, observer) = counting_observer();
    let (handle, signal) = invalidation();
    let mut sim = simulation(&two_node_data())
        .with_invalidation(signal)
        .on_tick(observer);

    for _ in 0..5 {
        sim.tick();
    }
    handle.fire();

    assert_eq!(sim.tick(), Phase::Stopped);
    assert_eq!(sim.tick(), Phase::Stopped);
    assert_eq!(*count.borrow(), 5);
    assert_eq!(sim.steps(), 5);
}

#[test]
fn test_dropped_handle_does_not_stop() {
    let (handle, signal) = invalidation();
    let mut sim = simulation(&two_node_data()).with_invalidation(signal);
    drop(handle);
    assert_eq!(sim.tick(), Phase::Running);
}

#[test]
fn test_stop_is_terminal() {
    let mut sim = simulation(&two_node_data());
    sim.tick();
    sim.stop();
    assert_eq!(sim.phase(), Phase::Stopped);

    sim.reheat(0.3);
    sim.set_alpha(1.0);
    assert_eq!(sim.tick(), Phase::Stopped);
    assert_eq!(sim.steps(), 1);
}

#[test]
fn test_stop_releases_index_and_observer() {
    let (count, observer) = counting_observer();
    let mut sim = simulation(&two_node_data()).on_tick(observer);
    sim.tick();
    assert!(!sim.index().is_empty());
    assert!(sim.has_observer());

    sim.stop();
    assert!(sim.index().is_empty());
    assert!(sim.index().excluded().is_empty());
    assert!(!sim.has_observer());
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_non_finite_alpha_is_ignored() {
    let mut sim = simulation(&two_node_data());
    sim.tick();
    let alpha = sim.alpha();

    sim.set_alpha(f64::NAN);
    assert_eq!(sim.alpha(), alpha);
    sim.set_alpha(f64::INFINITY);
    assert_eq!(sim.alpha(), alpha);

    let ticks = run_until_settled(&mut sim, 1_000);
    assert!(ticks < 1_000);
    assert_eq!(sim.phase(), Phase::Settled);
    assert!(position(&sim, "A").is_finite());
}

#[test]
fn test_non_finite_alpha_target_is_ignored() {
    let mut sim = simulation(&two_node_data());
    sim.set_alpha_target(f64::NAN);
    assert_eq!(sim.alpha_target(), 0.0);
    sim.set_alpha_target(f64::NEG_INFINITY);
    assert_eq!(sim.alpha_target(), 0.0);

    run_until_settled(&mut sim, 1_000);
    assert_eq!(sim.phase(), Phase::Settled);
    assert!(position(&sim, "B").is_finite());
}

#[test]
fn test_non_finite_force_is_clamped_to_zero() {
    let mut acc = ForceAccumulator::zeroed(3);
    acc.add(0, DVec2::new(1.0, 2.0));
    acc.add(1, DVec2::new(f64::NAN, 0.0));
    acc.add(2, DVec2::new(0.0, f64::INFINITY));

    let mut diagnostics = Diagnostics::new();
    acc.sanitize(&mut diagnostics);

    assert_eq!(acc.get(0), DVec2::new(1.0, 2.0));
    assert_eq!(acc.get(1), DVec2::ZERO);
    assert_eq!(acc.get(2), DVec2::ZERO);
    let warnings: Vec<_> = diagnostics.iter().copied().collect();
    assert_eq!(
        warnings,
        vec![
            DataQualityWarning::NonFiniteForce(NodeId(1)),
            DataQualityWarning::NonFiniteForce(NodeId(2)),
        ]
    );
}

#[test]
fn test_find_nearest_node() {
    let sim = simulation(&graph_data(&[("a", 0.0, 0.0), ("b", 10.0, 0.0)], &[]));
    assert_eq!(sim.find(DVec2::new(8.0, 1.0), None).unwrap().id(), "b");
    assert_eq!(sim.find(DVec2::new(1.0, 1.0), Some(2.0)).unwrap().id(), "a");
    assert!(sim.find(DVec2::new(5.0, 5.0), Some(2.0)).is_none());
}

#[test]
fn test_non_finite_position_is_isolated() {
    let data = graph_data(&[("a", 0.0, 0.0), ("b", 10.0, 0.0), ("c", 0.0, 10.0)], &[("a", "c")]);
    let mut sim = simulation(&data);
    let mut drag = DragController::new();
    drag.begin(&mut sim, "c", DVec2::new(f64::NAN, 0.0)).unwrap();

    sim.tick();
    sim.tick();

    let c = sim.graph().lookup("c").unwrap();
    assert!(sim
        .last_diagnostics()
        .iter()
        .any(|w| *w == DataQualityWarning::NonFinitePosition(c)));
    assert!(sim
        .last_diagnostics()
        .iter()
        .any(|w| matches!(w, DataQualityWarning::NonFiniteLink { link: 0 })));
    assert!(position(&sim, "a").is_finite());
    assert!(position(&sim, "b").is_finite());
    assert_eq!(sim.phase(), Phase::Running);
}
