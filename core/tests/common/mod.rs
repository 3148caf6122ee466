use manet_core::*;

/// Shared scenario fixture. Most cases start from the canonical
/// hierarchical preset and bend one knob.
pub struct TestHarness {
    pub config: ScenarioConfig,
}

impl TestHarness {
    pub fn hierarchical() -> Self {
        init_tracing();
        Self {
            config: ScenarioConfig::hierarchical(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut harness = Self::hierarchical();
        harness.config.seed = seed;
        harness
    }

    /// Builds, runs to the configured stop time and returns the final
    /// flow snapshots.
    pub fn run(&self) -> Vec<FlowReport> {
        self.config.run().expect("scenario should build and run")
    }

    pub fn cbr<'a>(&self, reports: &'a [FlowReport]) -> &'a FlowReport {
        reports
            .iter()
            .find(|r| r.transport == Transport::Udp)
            .expect("CBR flow should exist")
    }

    pub fn bulk<'a>(&self, reports: &'a [FlowReport]) -> &'a FlowReport {
        reports
            .iter()
            .find(|r| r.transport == Transport::Tcp)
            .expect("bulk flow should exist")
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
