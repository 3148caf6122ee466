use crate::mobility::Vec2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Range two nodes can actually bridge: the smaller of their radii, so
/// reachability stays symmetric across clusters with different ranges.
pub fn effective_range(a_range_m: f64, b_range_m: f64) -> f64 {
    a_range_m.min(b_range_m)
}

/// Stochastic per-hop drop model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LossModel {
    None,
    /// Drop probability ramps linearly from zero at `onset_fraction` of
    /// the effective range up to `max_loss` at the range edge.
    DistanceRamp { onset_fraction: f64, max_loss: f64 },
}

impl Default for LossModel {
    fn default() -> Self {
        LossModel::None
    }
}

impl LossModel {
    pub fn dropped(&self, distance_m: f64, range_m: f64, rng: &mut StdRng) -> bool {
        match *self {
            LossModel::None => false,
            LossModel::DistanceRamp {
                onset_fraction,
                max_loss,
            } => {
                let onset = range_m * onset_fraction.clamp(0.0, 1.0);
                if distance_m <= onset || range_m <= onset {
                    return false;
                }
                let ramp = ((distance_m - onset) / (range_m - onset)).clamp(0.0, 1.0);
                rng.gen_bool((ramp * max_loss).clamp(0.0, 1.0))
            }
        }
    }
}

/// Shared wireless medium: a disc-range reachability predicate plus an
/// optional loss model applied per relay hop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Channel {
    pub loss: LossModel,
}

impl Channel {
    pub fn reachable(&self, a: Vec2, a_range_m: f64, b: Vec2, b_range_m: f64) -> bool {
        a.distance(b) <= effective_range(a_range_m, b_range_m)
    }
}
