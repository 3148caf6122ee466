use crate::common::TestHarness;
use manet_core::{FlowState, LossModel, Vec2};

fn assert_books_balance(harness: &TestHarness) {
    let reports = harness.run();
    assert!(!reports.is_empty());
    for report in &reports {
        assert_eq!(report.state, FlowState::Closed);
        assert_eq!(
            report.tx_packets,
            report.rx_packets + report.lost_packets,
            "sent must equal received plus lost for {:?}/{}",
            report.transport,
            report.port
        );
    }
}

#[test]
fn test_accounting_balances_on_a_healthy_run() {
    assert_books_balance(&TestHarness::hierarchical());
}

#[test]
fn test_accounting_balances_with_no_path() {
    let mut harness = TestHarness::hierarchical();
    harness.config.bridge.position = Vec2::new(1_000.0, 0.0);
    assert_books_balance(&harness);
}

#[test]
fn test_accounting_balances_under_stochastic_loss() {
    let mut harness = TestHarness::hierarchical();
    harness.config.loss = LossModel::DistanceRamp {
        onset_fraction: 0.0,
        max_loss: 0.5,
    };
    assert_books_balance(&harness);
}

#[test]
fn test_stochastic_loss_actually_bites() {
    let mut harness = TestHarness::hierarchical();
    harness.config.loss = LossModel::DistanceRamp {
        onset_fraction: 0.0,
        max_loss: 0.5,
    };
    let reports = harness.run();
    let cbr = harness.cbr(&reports);
    assert!(cbr.lost_packets > 0, "a 3-hop path under heavy ramp loss");
    assert!(cbr.rx_packets > 0, "but far from everything is dropped");
}
