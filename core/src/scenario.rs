use crate::channel::{Channel, LossModel};
use crate::engine::Simulation;
use crate::error::SimError;
use crate::flow::{DelayModel, FlowReport};
use crate::mobility::{Bounds, Motion, Vec2, Walker};
use crate::topology::{AddrBlock, ClusterId, Topology};
use crate::traffic::{SessionConfig, SessionKind};
use crate::DEFAULT_MOBILITY_TICK_US;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::warn;

/// One cluster: how many members walk around a stationary-by-default
/// head, at which anchor, with which radio range and address block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub size: u32,
    pub radio_range_m: f64,
    /// Head position and center of the members' walk region.
    pub anchor: Vec2,
    pub walk_half_extent_m: f64,
    pub motion: Motion,
    pub head_motion: Motion,
    pub addr_block: AddrBlock,
}

impl ClusterSpec {
    /// Members allocate hosts 1..=size, so the head lands on size + 1.
    pub fn head_addr(&self) -> Ipv4Addr {
        self.addr_block.host(self.size + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSpec {
    pub position: Vec2,
    pub radio_range_m: f64,
    pub addr: Ipv4Addr,
    pub motion: Motion,
}

/// An application session in scenario terms: the source is named by
/// cluster and member index since node ids only exist after build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSpec {
    pub source_cluster: ClusterId,
    pub source_index: u32,
    pub dest: Ipv4Addr,
    pub port: u16,
    pub kind: SessionKind,
    pub start_us: u64,
    pub stop_us: u64,
}

/// The full scenario input: cluster layout, bridge placement, traffic
/// sessions, physics knobs, stop time and seed, as one serializable
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub clusters: Vec<ClusterSpec>,
    pub bridge: BridgeSpec,
    pub sessions: Vec<SessionSpec>,
    pub delay: DelayModel,
    pub loss: LossModel,
    pub mobility_tick_us: u64,
    pub stop_us: u64,
    pub seed: u64,
}

impl ScenarioConfig {
    /// The canonical hierarchical scenario: two clusters of five members
    /// each around stationary heads, bridged between them, with a
    /// 500 kbps CBR stream toward the cluster-2 head and a 1 MiB bulk
    /// transfer toward the cluster-1 head, both running 1s-10s.
    ///
    /// The geometry keeps every relay hop inside radio range for the
    /// whole run, so a healthy run ends with zero loss.
    pub fn hierarchical() -> Self {
        let cluster1 = ClusterSpec {
            size: 5,
            radio_range_m: 50.0,
            anchor: Vec2::new(0.0, 0.0),
            walk_half_extent_m: 30.0,
            motion: Motion::default(),
            head_motion: Motion::Stationary,
            addr_block: AddrBlock::new(1, 0),
        };
        let cluster2 = ClusterSpec {
            size: 5,
            radio_range_m: 150.0,
            anchor: Vec2::new(140.0, 0.0),
            walk_half_extent_m: 100.0,
            motion: Motion::default(),
            head_motion: Motion::Stationary,
            addr_block: AddrBlock::new(2, 0),
        };
        let bridge = BridgeSpec {
            position: Vec2::new(45.0, 0.0),
            radio_range_m: 100.0,
            addr: Ipv4Addr::new(10, 3, 0, 1),
            motion: Motion::Stationary,
        };
        let sessions = vec![
            // Cluster-1 member 0 streams CBR at the cluster-2 head.
            SessionSpec {
                source_cluster: 0,
                source_index: 0,
                dest: cluster2.head_addr(),
                port: 9,
                kind: SessionKind::Cbr {
                    rate_bps: 500_000,
                    packet_bytes: 512,
                },
                start_us: 1_000_000,
                stop_us: 10_000_000,
            },
            // Cluster-2 member 0 bulk-transfers 1 MiB at the cluster-1
            // head.
            SessionSpec {
                source_cluster: 1,
                source_index: 0,
                dest: cluster1.head_addr(),
                port: 20,
                kind: SessionKind::Bulk {
                    byte_cap: 1024 * 1024,
                    segment_bytes: 1460,
                },
                start_us: 1_000_000,
                stop_us: 10_000_000,
            },
        ];
        Self {
            clusters: vec![cluster1, cluster2],
            bridge,
            sessions,
            delay: DelayModel::default(),
            loss: LossModel::None,
            mobility_tick_us: DEFAULT_MOBILITY_TICK_US,
            stop_us: 10_000_000,
            seed: 1,
        }
    }

    /// Validates the whole configuration and constructs the simulation
    /// with its lifecycle events scheduled. Configuration errors are
    /// fatal here; nothing fails once the run is going.
    pub fn build(&self) -> Result<Simulation, SimError> {
        let mut topo = Topology::new();
        let mut heads = Vec::new();

        for spec in &self.clusters {
            let bounds = Bounds::centered(spec.anchor, spec.walk_half_extent_m)?;
            let cluster = topo.create_cluster(spec.radio_range_m, spec.addr_block)?;
            for i in 0..spec.size {
                // Line placement with 10m spacing, clamped into the walk
                // region.
                let offset = -spec.walk_half_extent_m + 10.0 * i as f64;
                let position = bounds.clamp(Vec2::new(spec.anchor.x + offset, spec.anchor.y));
                topo.add_member(cluster, position, walker_for(spec.motion, bounds))?;
            }
            let head = topo.add_member(cluster, spec.anchor, walker_for(spec.head_motion, bounds))?;
            topo.assign_head(cluster, head);
            heads.push(head);
        }

        // A walking bridge roams its own radio disc; a stationary one
        // needs no bounds at all.
        let bridge_walker = match self.bridge.motion {
            Motion::Stationary => None,
            Motion::RandomWalk(cfg) => Some(Walker::new(
                cfg,
                Bounds::centered(self.bridge.position, self.bridge.radio_range_m)?,
            )),
        };
        let bridge = topo.add_bridge(
            self.bridge.position,
            self.bridge.radio_range_m,
            self.bridge.addr,
            bridge_walker,
        )?;

        let channel = Channel { loss: self.loss };
        for &head in &heads {
            let h = topo.node(head);
            let b = topo.node(bridge);
            if !channel.reachable(h.position, h.radio_range_m, b.position, b.radio_range_m) {
                warn!(
                    head = h.id,
                    "bridge starts out of range of a cluster head; inter-cluster traffic will be lost"
                );
            }
        }

        let mut sim = Simulation::new(topo, channel, self.delay, self.mobility_tick_us, self.seed);
        for spec in &self.sessions {
            let source = sim.topology.member(spec.source_cluster, spec.source_index);
            sim.add_session(SessionConfig {
                source,
                dest: spec.dest,
                port: spec.port,
                kind: spec.kind,
                start_us: spec.start_us,
                stop_us: spec.stop_us,
            })?;
        }
        Ok(sim)
    }

    /// Builds and runs to the configured stop time in one go.
    pub fn run(&self) -> Result<Vec<FlowReport>, SimError> {
        self.build()?.run_until(self.stop_us)
    }
}

fn walker_for(motion: Motion, bounds: Bounds) -> Option<Walker> {
    match motion {
        Motion::Stationary => None,
        Motion::RandomWalk(cfg) => Some(Walker::new(cfg, bounds)),
    }
}
