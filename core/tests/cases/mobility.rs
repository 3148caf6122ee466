use crate::common::TestHarness;
use manet_core::NodeRole;

#[test]
fn test_walkers_stay_in_bounds_for_the_whole_run() {
    let harness = TestHarness::hierarchical();
    let mut sim = harness.config.build().unwrap();

    while let Some(next_us) = sim.next_event_time_us() {
        if next_us > harness.config.stop_us {
            break;
        }
        sim.step();
        for node in sim.topology.nodes() {
            if let Some(walker) = &node.walker {
                assert!(
                    walker.bounds().contains(node.position),
                    "node {} escaped its walk region at t={}us: {:?}",
                    node.id,
                    sim.time_us,
                    node.position
                );
            }
        }
    }
}

#[test]
fn test_stationary_roles_never_move() {
    let harness = TestHarness::hierarchical();
    let mut sim = harness.config.build().unwrap();

    let anchored: Vec<_> = sim
        .topology
        .nodes()
        .iter()
        .filter(|n| n.role != NodeRole::Plain)
        .map(|n| (n.id, n.position))
        .collect();

    while let Some(next_us) = sim.next_event_time_us() {
        if next_us > harness.config.stop_us {
            break;
        }
        sim.step();
    }

    for (id, position) in anchored {
        assert_eq!(sim.topology.node(id).position, position);
    }
}

#[test]
fn test_members_do_move() {
    let harness = TestHarness::hierarchical();
    let mut sim = harness.config.build().unwrap();
    let member = sim.topology.member(0, 0);
    let start = sim.topology.node(member).position;

    // One simulated second is ten mobility ticks.
    while sim.time_us < 1_000_000 && sim.step() {}

    assert_ne!(sim.topology.node(member).position, start);
}
