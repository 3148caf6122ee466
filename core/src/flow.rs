use crate::channel::{effective_range, Channel};
use crate::topology::{NodeId, Topology};
use crate::traffic::{SessionConfig, Transport};
use hdrhistogram::Histogram;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use tracing::{debug, trace};

/// Per-hop transit delay: a fixed term plus a distance-proportional term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayModel {
    pub fixed_us: u64,
    pub per_meter_us: f64,
}

impl Default for DelayModel {
    fn default() -> Self {
        Self {
            fixed_us: 500,
            per_meter_us: 1.0,
        }
    }
}

impl DelayModel {
    pub fn hop_delay_us(&self, distance_m: f64) -> u64 {
        self.fixed_us + (distance_m * self.per_meter_us).ceil() as u64
    }
}

/// A flow is a 5-tuple-ish application stream. One per session in
/// practice, but keyed independently so the tracker stands on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub source: NodeId,
    pub dest: Ipv4Addr,
    pub transport: Transport,
    pub port: u16,
}

impl FlowKey {
    pub fn for_session(config: &SessionConfig) -> Self {
        Self {
            source: config.source,
            dest: config.dest,
            transport: config.transport(),
            port: config.port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Active,
    Closed,
}

pub struct FlowStats {
    pub state: FlowState,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub in_flight: u64,
    delay_sum_us: u64,
    delay_hist: Histogram<u64>,
    first_tx_us: Option<u64>,
    last_rx_us: Option<u64>,
}

impl FlowStats {
    fn new() -> Self {
        Self {
            state: FlowState::Active,
            tx_packets: 0,
            rx_packets: 0,
            lost_packets: 0,
            tx_bytes: 0,
            rx_bytes: 0,
            in_flight: 0,
            delay_sum_us: 0,
            delay_hist: Histogram::new(3).unwrap(),
            first_tx_us: None,
            last_rx_us: None,
        }
    }
}

/// Immutable per-flow snapshot handed to the results sink at teardown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub source: NodeId,
    pub dest: Ipv4Addr,
    pub transport: Transport,
    pub port: u16,
    pub state: FlowState,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub mean_delay_us: f64,
    pub p99_delay_us: u64,
    pub throughput_bps: f64,
}

/// Accumulates per-flow counters; flows are created on the first packet
/// of a new key and only ever transition `Active -> Closed`.
#[derive(Default)]
pub struct FlowMonitor {
    flows: Vec<(FlowKey, FlowStats)>,
    index: HashMap<FlowKey, usize>,
}

impl FlowMonitor {
    fn entry(&mut self, key: FlowKey) -> &mut FlowStats {
        let idx = *self.index.entry(key).or_insert_with(|| {
            self.flows.push((key, FlowStats::new()));
            self.flows.len() - 1
        });
        &mut self.flows[idx].1
    }

    fn on_sent(&mut self, key: FlowKey, bytes: u32, now_us: u64) {
        let stats = self.entry(key);
        if stats.state == FlowState::Closed {
            return;
        }
        stats.tx_packets += 1;
        stats.tx_bytes += bytes as u64;
        stats.first_tx_us.get_or_insert(now_us);
    }

    fn on_launched(&mut self, key: FlowKey) {
        self.entry(key).in_flight += 1;
    }

    fn on_lost(&mut self, key: FlowKey) {
        self.entry(key).lost_packets += 1;
    }

    pub fn on_delivered(&mut self, key: FlowKey, bytes: u32, sent_us: u64, now_us: u64) {
        let stats = self.entry(key);
        if stats.state == FlowState::Closed {
            return;
        }
        let delay_us = now_us.saturating_sub(sent_us);
        stats.rx_packets += 1;
        stats.rx_bytes += bytes as u64;
        stats.in_flight = stats.in_flight.saturating_sub(1);
        stats.delay_sum_us += delay_us;
        let _ = stats.delay_hist.record(delay_us.max(1));
        stats.last_rx_us = Some(now_us);
    }

    /// A packet that was still in the air when the run ended counts as a
    /// loss; nothing leaves the queue unaccounted.
    pub fn on_dropped_in_flight(&mut self, key: FlowKey) {
        let stats = self.entry(key);
        stats.lost_packets += 1;
        stats.in_flight = stats.in_flight.saturating_sub(1);
    }

    /// Closes the flow once its generator is done and nothing is in
    /// flight. No-op otherwise.
    pub fn try_close(&mut self, key: &FlowKey) {
        if let Some(&idx) = self.index.get(key) {
            let stats = &mut self.flows[idx].1;
            if stats.in_flight == 0 && stats.state == FlowState::Active {
                stats.state = FlowState::Closed;
                debug!(source = key.source, port = key.port, "flow closed");
            }
        }
    }

    pub fn close_all(&mut self) {
        for (_, stats) in &mut self.flows {
            stats.state = FlowState::Closed;
        }
    }

    pub fn reports(&self) -> Vec<FlowReport> {
        self.flows
            .iter()
            .map(|(key, stats)| {
                let mean_delay_us = if stats.rx_packets > 0 {
                    stats.delay_sum_us as f64 / stats.rx_packets as f64
                } else {
                    0.0
                };
                let p99_delay_us = if stats.rx_packets > 0 {
                    stats.delay_hist.value_at_quantile(0.99)
                } else {
                    0
                };
                let throughput_bps = match (stats.first_tx_us, stats.last_rx_us) {
                    (Some(first), Some(last)) if last > first => {
                        stats.rx_bytes as f64 * 8.0 / ((last - first) as f64 / 1_000_000.0)
                    }
                    _ => 0.0,
                };
                FlowReport {
                    source: key.source,
                    dest: key.dest,
                    transport: key.transport,
                    port: key.port,
                    state: stats.state,
                    tx_packets: stats.tx_packets,
                    rx_packets: stats.rx_packets,
                    lost_packets: stats.lost_packets,
                    tx_bytes: stats.tx_bytes,
                    rx_bytes: stats.rx_bytes,
                    mean_delay_us,
                    p99_delay_us,
                    throughput_bps,
                }
            })
            .collect()
    }
}

pub enum SendOutcome {
    Delivered { at_us: u64 },
    Lost,
}

/// Builds the relay chain for a packet from the node roles: direct within
/// a cluster (or via the head when the endpoints drifted apart), and
/// source -> head -> bridge -> head -> destination across clusters.
/// Returns None when any hop is out of range.
pub fn relay_path(
    topo: &Topology,
    channel: &Channel,
    from: NodeId,
    to: NodeId,
) -> Option<Vec<NodeId>> {
    if from == to {
        return Some(vec![from]);
    }
    let a = topo.node(from);
    let b = topo.node(to);
    if channel.reachable(a.position, a.radio_range_m, b.position, b.radio_range_m) {
        return Some(vec![from, to]);
    }

    let mut chain = vec![from];
    match (a.cluster, b.cluster) {
        (Some(ca), Some(cb)) if ca == cb => {
            chain.push(topo.head_of(ca)?);
        }
        (ca, cb) => {
            if let Some(ca) = ca {
                chain.push(topo.head_of(ca)?);
            }
            chain.push(topo.bridge()?);
            if let Some(cb) = cb {
                chain.push(topo.head_of(cb)?);
            }
        }
    }
    chain.push(to);
    chain.dedup();
    verify_hops(topo, channel, &chain)
}

fn verify_hops(topo: &Topology, channel: &Channel, chain: &[NodeId]) -> Option<Vec<NodeId>> {
    for hop in chain.windows(2) {
        let a = topo.node(hop[0]);
        let b = topo.node(hop[1]);
        if !channel.reachable(a.position, a.radio_range_m, b.position, b.radio_range_m) {
            return None;
        }
    }
    Some(chain.to_vec())
}

/// Routes packets over the connectivity graph and keeps the per-flow
/// books. Runtime delivery failures are recorded as losses, never
/// surfaced as errors.
pub struct DeliveryTracker {
    pub delay: DelayModel,
    pub monitor: FlowMonitor,
}

impl DeliveryTracker {
    pub fn new(delay: DelayModel) -> Self {
        Self {
            delay,
            monitor: FlowMonitor::default(),
        }
    }

    /// Attempts delivery at `now_us`. On success the caller schedules the
    /// matching packet-deliver event at the returned time.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &mut self,
        topo: &Topology,
        channel: &Channel,
        rng: &mut StdRng,
        key: FlowKey,
        bytes: u32,
        from: NodeId,
        to_addr: Ipv4Addr,
        now_us: u64,
    ) -> SendOutcome {
        self.monitor.on_sent(key, bytes, now_us);

        let Some(to) = topo.resolve(to_addr) else {
            debug!(%to_addr, from, "destination address resolves to no node; packet lost");
            self.monitor.on_lost(key);
            return SendOutcome::Lost;
        };
        let Some(path) = relay_path(topo, channel, from, to) else {
            debug!(from, to, now_us, "no reachable path; packet lost");
            self.monitor.on_lost(key);
            return SendOutcome::Lost;
        };

        let mut delay_us = 0;
        for hop in path.windows(2) {
            let a = topo.node(hop[0]);
            let b = topo.node(hop[1]);
            let distance_m = a.position.distance(b.position);
            let range_m = effective_range(a.radio_range_m, b.radio_range_m);
            if channel.loss.dropped(distance_m, range_m, rng) {
                debug!(from = a.id, to = b.id, now_us, "packet dropped on hop");
                self.monitor.on_lost(key);
                return SendOutcome::Lost;
            }
            delay_us += self.delay.hop_delay_us(distance_m);
        }

        trace!(from, to, hops = path.len() - 1, delay_us, "packet en route");
        self.monitor.on_launched(key);
        SendOutcome::Delivered {
            at_us: now_us + delay_us,
        }
    }
}
