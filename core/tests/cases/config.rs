use crate::common::TestHarness;
use manet_core::SimError;

#[test]
fn test_degenerate_bounds_abort_setup() {
    let mut harness = TestHarness::hierarchical();
    harness.config.clusters[1].walk_half_extent_m = 0.0;
    assert!(matches!(
        harness.config.build(),
        Err(SimError::InvalidBounds { .. })
    ));
}

#[test]
fn test_inverted_session_window_aborts_setup() {
    let mut harness = TestHarness::hierarchical();
    harness.config.sessions[1].start_us = 8_000_000;
    harness.config.sessions[1].stop_us = 3_000_000;
    assert!(matches!(
        harness.config.build(),
        Err(SimError::InvalidSchedule { .. })
    ));
}

#[test]
fn test_duplicate_address_block_aborts_setup() {
    let mut harness = TestHarness::hierarchical();
    harness.config.clusters[1].addr_block = harness.config.clusters[0].addr_block;
    assert!(matches!(
        harness.config.build(),
        Err(SimError::AddressConflict { .. })
    ));
}

#[test]
fn test_bridge_address_inside_a_cluster_block_aborts_setup() {
    let mut harness = TestHarness::hierarchical();
    harness.config.bridge.addr = harness.config.clusters[0].head_addr();
    assert!(matches!(
        harness.config.build(),
        Err(SimError::AddressConflict { .. })
    ));
}

#[test]
fn test_zero_length_window_is_valid_and_silent() {
    let mut harness = TestHarness::hierarchical();
    harness.config.sessions[0].stop_us = harness.config.sessions[0].start_us;

    // The empty-window session emits nothing, so its flow never comes
    // into existence; only the bulk flow reports.
    let reports = harness.run();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].transport, manet_core::Transport::Tcp);
}
