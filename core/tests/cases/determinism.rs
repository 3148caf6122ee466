use crate::common::TestHarness;

#[test]
fn test_determinism_across_runs() {
    let seed = 12345;

    let reports1 = TestHarness::with_seed(seed).run();
    let reports2 = TestHarness::with_seed(seed).run();

    // Snapshots must match exactly, delay statistics included.
    assert_eq!(reports1, reports2, "identical seed must replay identically");
}

#[test]
fn test_determinism_with_different_seeds() {
    let h1 = TestHarness::with_seed(100);
    let h2 = TestHarness::with_seed(200);

    let reports1 = h1.run();
    let reports2 = h2.run();

    // Counts are geometry-independent in the healthy preset, but delays
    // track the walkers' positions, which track the seed.
    let d1 = h1.cbr(&reports1).mean_delay_us;
    let d2 = h2.cbr(&reports2).mean_delay_us;
    assert_ne!(d1, d2, "different seeds should move nodes differently");
}
