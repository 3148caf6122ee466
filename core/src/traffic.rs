use crate::error::SimError;
use crate::topology::NodeId;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub type SessionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Udp,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    pub bytes: u32,
}

/// What a session emits: a steady packet stream or a byte-capped bulk
/// transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SessionKind {
    /// Fixed-size packet every `packet_bits / rate_bps`; UDP.
    Cbr { rate_bps: u64, packet_bytes: u32 },
    /// Maximum-size segments, one in flight at a time, until the byte
    /// cap is reached; TCP.
    Bulk { byte_cap: u64, segment_bytes: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub source: NodeId,
    pub dest: Ipv4Addr,
    pub port: u16,
    pub kind: SessionKind,
    pub start_us: u64,
    pub stop_us: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.start_us > self.stop_us {
            return Err(SimError::InvalidSchedule {
                time_us: self.stop_us,
                reference_us: self.start_us,
            });
        }
        Ok(())
    }

    pub fn transport(&self) -> Transport {
        match self.kind {
            SessionKind::Cbr { .. } => Transport::Udp,
            SessionKind::Bulk { .. } => Transport::Tcp,
        }
    }

    /// Active window is `[start, stop)`; nothing is emitted outside it.
    pub fn window_contains(&self, now_us: u64) -> bool {
        now_us >= self.start_us && now_us < self.stop_us
    }

    /// Spacing between CBR emissions. None for ack-clocked bulk traffic.
    pub fn send_interval_us(&self) -> Option<u64> {
        match self.kind {
            SessionKind::Cbr {
                rate_bps,
                packet_bytes,
            } if rate_bps > 0 => Some(packet_bytes as u64 * 8 * 1_000_000 / rate_bps),
            _ => None,
        }
    }
}

/// The generator capability both session kinds implement.
pub trait TrafficSource {
    fn next_packet(&mut self, now_us: u64) -> Option<Packet>;
}

pub struct CbrSource {
    pub packet_bytes: u32,
}

impl TrafficSource for CbrSource {
    fn next_packet(&mut self, _now_us: u64) -> Option<Packet> {
        if self.packet_bytes == 0 {
            return None;
        }
        Some(Packet {
            bytes: self.packet_bytes,
        })
    }
}

pub struct BulkSource {
    pub remaining: u64,
    pub segment_bytes: u32,
}

impl TrafficSource for BulkSource {
    fn next_packet(&mut self, _now_us: u64) -> Option<Packet> {
        if self.remaining == 0 || self.segment_bytes == 0 {
            return None;
        }
        // The final segment truncates so cumulative bytes hit the cap
        // exactly.
        let bytes = self.remaining.min(self.segment_bytes as u64) as u32;
        self.remaining -= bytes as u64;
        Some(Packet { bytes })
    }
}

/// A configured application session bound to its generator state.
pub struct Session {
    pub config: SessionConfig,
    pub source: Box<dyn TrafficSource>,
    pub finished: bool,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, SimError> {
        config.validate()?;
        let source: Box<dyn TrafficSource> = match config.kind {
            SessionKind::Cbr { packet_bytes, .. } => Box::new(CbrSource { packet_bytes }),
            SessionKind::Bulk {
                byte_cap,
                segment_bytes,
            } => Box::new(BulkSource {
                remaining: byte_cap,
                segment_bytes,
            }),
        };
        Ok(Self {
            config,
            source,
            finished: false,
        })
    }
}
