use crate::common::TestHarness;
use manet_core::{FlowState, SessionKind, SessionSpec, Vec2};
use std::net::Ipv4Addr;

#[test]
fn test_unreachable_bridge_counts_every_packet_as_lost() {
    let mut harness = TestHarness::hierarchical();
    // Park the bridge far outside both clusters' reach.
    harness.config.bridge.position = Vec2::new(1_000.0, 0.0);

    let reports = harness.run();

    for report in &reports {
        assert_eq!(report.state, FlowState::Closed);
        assert!(report.tx_packets > 0, "generators must keep emitting");
        assert_eq!(report.rx_packets, 0, "nothing can cross the clusters");
        assert_eq!(
            report.lost_packets, report.tx_packets,
            "every send without a path must be accounted as a loss"
        );
    }
}

#[test]
fn test_intra_cluster_traffic_survives_without_the_bridge() {
    let mut harness = TestHarness::hierarchical();
    harness.config.bridge.position = Vec2::new(1_000.0, 0.0);
    // Member 0 -> member 1 inside cluster 1; the head relays when the
    // walkers drift apart.
    harness.config.sessions = vec![SessionSpec {
        source_cluster: 0,
        source_index: 0,
        dest: Ipv4Addr::new(10, 1, 0, 2),
        port: 9,
        kind: SessionKind::Cbr {
            rate_bps: 500_000,
            packet_bytes: 512,
        },
        start_us: 1_000_000,
        stop_us: 10_000_000,
    }];

    let reports = harness.run();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].lost_packets, 0);
    assert_eq!(reports[0].rx_packets, reports[0].tx_packets);
}

#[test]
fn test_unresolvable_destination_is_a_loss_not_a_crash() {
    let mut harness = TestHarness::hierarchical();
    harness.config.sessions[0].dest = Ipv4Addr::new(10, 9, 9, 9);

    let reports = harness.run();
    let cbr = harness.cbr(&reports);
    assert_eq!(cbr.rx_packets, 0);
    assert_eq!(cbr.lost_packets, cbr.tx_packets);
}
