use crate::channel::Channel;
use crate::error::SimError;
use crate::flow::{DelayModel, DeliveryTracker, FlowKey, FlowReport, SendOutcome};
use crate::topology::Topology;
use crate::traffic::{Session, SessionConfig, SessionId, SessionKind};
use crate::BULK_RETRY_US;
use rand::prelude::*;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum EventKind {
    MobilityTick,
    AppStart {
        session: SessionId,
    },
    AppStop {
        session: SessionId,
    },
    PacketSend {
        session: SessionId,
    },
    PacketDeliver {
        session: SessionId,
        key: FlowKey,
        bytes: u32,
        sent_us: u64,
    },
    Stop,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub time_us: u64,
    pub seq: u64,
    pub kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time_us == other.time_us && self.seq == other.seq
    }
}
impl Eq for Event {}
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Event {
    // Time first; the insertion sequence breaks ties so same-time events
    // dispatch in FIFO order.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time_us
            .cmp(&other.time_us)
            .then(self.seq.cmp(&other.seq))
    }
}

/// The simulation kernel: a simulated clock, the event queue, and the
/// subsystems events are dispatched to. Single-threaded; every handler
/// completes before the next event fires.
pub struct Simulation {
    pub time_us: u64,
    pub topology: Topology,
    pub channel: Channel,
    pub tracker: DeliveryTracker,
    events: BinaryHeap<Reverse<Event>>,
    sessions: Vec<Session>,
    mobility_tick_us: u64,
    next_seq: u64,
    rng: StdRng,
}

impl Simulation {
    pub fn new(
        topology: Topology,
        channel: Channel,
        delay: DelayModel,
        mobility_tick_us: u64,
        seed: u64,
    ) -> Self {
        let mut sim = Self {
            time_us: 0,
            topology,
            channel,
            tracker: DeliveryTracker::new(delay),
            events: BinaryHeap::new(),
            sessions: Vec::new(),
            mobility_tick_us,
            next_seq: 0,
            rng: StdRng::seed_from_u64(seed),
        };
        if mobility_tick_us > 0 {
            sim.push(mobility_tick_us, EventKind::MobilityTick);
        }
        sim
    }

    /// Registers a session and schedules its start/stop lifecycle.
    /// Fails fast on an inverted window or a start in the past.
    pub fn add_session(&mut self, config: SessionConfig) -> Result<SessionId, SimError> {
        let session = Session::new(config)?;
        let id = self.sessions.len() as SessionId;
        let (start_us, stop_us) = (session.config.start_us, session.config.stop_us);
        self.sessions.push(session);
        self.schedule(start_us, EventKind::AppStart { session: id })?;
        self.schedule(stop_us, EventKind::AppStop { session: id })?;
        Ok(id)
    }

    /// Inserts an event at an absolute time. Scheduling into the past is
    /// an `InvalidSchedule` error.
    pub fn schedule(&mut self, time_us: u64, kind: EventKind) -> Result<(), SimError> {
        if time_us < self.time_us {
            return Err(SimError::InvalidSchedule {
                time_us,
                reference_us: self.time_us,
            });
        }
        self.push(time_us, kind);
        Ok(())
    }

    fn push(&mut self, time_us: u64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(Event { time_us, seq, kind }));
    }

    fn push_in(&mut self, delay_us: u64, kind: EventKind) {
        self.push(self.time_us + delay_us, kind);
    }

    pub fn next_event_time_us(&self) -> Option<u64> {
        self.events.peek().map(|Reverse(e)| e.time_us)
    }

    /// Pops and dispatches the earliest event, advancing the clock to its
    /// timestamp. Returns false once the queue is empty.
    pub fn step(&mut self) -> bool {
        if let Some(Reverse(event)) = self.events.pop() {
            self.time_us = event.time_us;
            self.dispatch(event);
            return true;
        }
        false
    }

    /// Drives the clock to `stop_us`: every event due on or before the
    /// stop time fires in order, then remaining events are discarded
    /// (in-flight packets counting as losses), all flows close, and the
    /// final per-flow snapshots are returned.
    pub fn run_until(&mut self, stop_us: u64) -> Result<Vec<FlowReport>, SimError> {
        if stop_us < self.time_us {
            return Err(SimError::InvalidSchedule {
                time_us: stop_us,
                reference_us: self.time_us,
            });
        }
        info!(stop_us, nodes = self.topology.nodes().len(), "run starting");
        self.push(stop_us, EventKind::Stop);

        while let Some(next_us) = self.next_event_time_us() {
            if next_us > stop_us {
                break;
            }
            self.step();
        }
        self.time_us = stop_us;
        Ok(self.finalize())
    }

    fn finalize(&mut self) -> Vec<FlowReport> {
        let mut discarded = 0u64;
        while let Some(Reverse(event)) = self.events.pop() {
            discarded += 1;
            if let EventKind::PacketDeliver { key, .. } = event.kind {
                self.tracker.monitor.on_dropped_in_flight(key);
            }
        }
        self.tracker.monitor.close_all();
        let reports = self.tracker.monitor.reports();
        info!(
            time_us = self.time_us,
            discarded,
            flows = reports.len(),
            "run complete"
        );
        reports
    }

    fn dispatch(&mut self, event: Event) {
        match event.kind {
            EventKind::MobilityTick => self.on_mobility_tick(),
            EventKind::AppStart { session } => self.on_app_start(session),
            EventKind::AppStop { session } => self.on_app_stop(session),
            EventKind::PacketSend { session } => self.on_packet_send(session),
            EventKind::PacketDeliver {
                session,
                key,
                bytes,
                sent_us,
            } => self.on_packet_deliver(session, key, bytes, sent_us),
            EventKind::Stop => debug!(time_us = self.time_us, "stop event reached"),
        }
    }

    fn on_mobility_tick(&mut self) {
        let dt_us = self.mobility_tick_us;
        for node in self.topology.nodes_mut() {
            if let Some(walker) = node.walker.as_mut() {
                node.position = walker.advance(node.position, dt_us, &mut self.rng);
            }
        }
        self.push_in(dt_us, EventKind::MobilityTick);
    }

    fn on_app_start(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get(session_id as usize) else {
            return;
        };
        info!(
            session = session_id,
            source = session.config.source,
            dest = %session.config.dest,
            "application session started"
        );
        self.push_in(
            0,
            EventKind::PacketSend {
                session: session_id,
            },
        );
    }

    fn on_app_stop(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get_mut(session_id as usize) else {
            return;
        };
        session.finished = true;
        let key = FlowKey::for_session(&session.config);
        info!(session = session_id, "application session stopped");
        self.tracker.monitor.try_close(&key);
    }

    fn on_packet_send(&mut self, session_id: SessionId) {
        let now_us = self.time_us;
        let Some(session) = self.sessions.get_mut(session_id as usize) else {
            return;
        };
        // Out-of-window sends are silent no-ops; a stopped session's
        // leftover events dissolve here.
        if session.finished || !session.config.window_contains(now_us) {
            return;
        }
        let packet = session.source.next_packet(now_us);
        let config = session.config.clone();
        if packet.is_none() {
            session.finished = true;
        }

        let key = FlowKey::for_session(&config);
        let Some(packet) = packet else {
            // Byte cap reached: the generator is done.
            self.tracker.monitor.try_close(&key);
            return;
        };

        debug!(
            session = session_id,
            from = config.source,
            dest = %config.dest,
            bytes = packet.bytes,
            "sending packet"
        );
        let outcome = self.tracker.send(
            &self.topology,
            &self.channel,
            &mut self.rng,
            key,
            packet.bytes,
            config.source,
            config.dest,
            now_us,
        );
        match outcome {
            SendOutcome::Delivered { at_us } => {
                self.push(
                    at_us,
                    EventKind::PacketDeliver {
                        session: session_id,
                        key,
                        bytes: packet.bytes,
                        sent_us: now_us,
                    },
                );
            }
            SendOutcome::Lost => {
                if matches!(config.kind, SessionKind::Bulk { .. }) {
                    // The ack clock has nothing to tick on; re-arm it.
                    self.push_in(
                        BULK_RETRY_US,
                        EventKind::PacketSend {
                            session: session_id,
                        },
                    );
                }
            }
        }
        if let Some(interval_us) = config.send_interval_us() {
            self.push_in(
                interval_us,
                EventKind::PacketSend {
                    session: session_id,
                },
            );
        }
    }

    fn on_packet_deliver(&mut self, session_id: SessionId, key: FlowKey, bytes: u32, sent_us: u64) {
        let now_us = self.time_us;
        self.tracker.monitor.on_delivered(key, bytes, sent_us, now_us);

        let (finished, ack_clocked, in_window) = match self.sessions.get(session_id as usize) {
            Some(s) => (
                s.finished,
                matches!(s.config.kind, SessionKind::Bulk { .. }),
                s.config.window_contains(now_us),
            ),
            None => return,
        };
        if finished {
            self.tracker.monitor.try_close(&key);
        } else if ack_clocked && in_window {
            // One segment in flight at a time: delivery clocks the next.
            self.push_in(
                0,
                EventKind::PacketSend {
                    session: session_id,
                },
            );
        }
    }
}
