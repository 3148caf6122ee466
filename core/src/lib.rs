pub mod channel;
pub mod engine;
pub mod error;
pub mod flow;
pub mod mobility;
pub mod scenario;
pub mod topology;
pub mod traffic;

pub use channel::{effective_range, Channel, LossModel};
pub use engine::{Event, EventKind, Simulation};
pub use error::SimError;
pub use flow::{DelayModel, FlowKey, FlowReport, FlowState};
pub use mobility::{Bounds, Motion, RandomWalk, Vec2};
pub use scenario::{BridgeSpec, ClusterSpec, ScenarioConfig, SessionSpec};
pub use topology::{AddrBlock, ClusterId, NodeId, NodeRole, Topology};
pub use traffic::{SessionConfig, SessionId, SessionKind, Transport};

/// High-precision timing constants (in Microseconds)
pub const DEFAULT_MOBILITY_TICK_US: u64 = 100_000; // 100ms
pub const BULK_RETRY_US: u64 = 50_000; // 50ms
