use crate::error::SimError;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Position or velocity in meters / meters-per-second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Rectangular walk region. Validated at construction: a walker can rely
/// on `min < max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: Vec2,
    max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Result<Self, SimError> {
        if min.x >= max.x || min.y >= max.y {
            return Err(SimError::InvalidBounds {
                min_x: min.x,
                max_x: max.x,
                min_y: min.y,
                max_y: max.y,
            });
        }
        Ok(Self { min, max })
    }

    pub fn centered(center: Vec2, half_extent: f64) -> Result<Self, SimError> {
        Self::new(
            Vec2::new(center.x - half_extent, center.y - half_extent),
            Vec2::new(center.x + half_extent, center.y + half_extent),
        )
    }

    pub fn min(&self) -> Vec2 {
        self.min
    }

    pub fn max(&self) -> Vec2 {
        self.max
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }
}

/// Parameters of the bounded random walk: pick a heading and a speed,
/// keep going until the walk timer runs out or the boundary is hit,
/// then pick again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalk {
    pub speed_min_mps: f64,
    pub speed_max_mps: f64,
    pub walk_us: u64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            speed_min_mps: 2.0,
            speed_max_mps: 4.0,
            walk_us: 1_000_000,
        }
    }
}

/// Motion model attached to a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    Stationary,
    RandomWalk(RandomWalk),
}

impl Default for Motion {
    fn default() -> Self {
        Motion::RandomWalk(RandomWalk::default())
    }
}

/// Kinematic state of a walking node. Stationary nodes carry no walker.
#[derive(Debug, Clone)]
pub struct Walker {
    cfg: RandomWalk,
    bounds: Bounds,
    velocity: Vec2,
    walk_left_us: u64,
}

impl Walker {
    pub fn new(cfg: RandomWalk, bounds: Bounds) -> Self {
        Self {
            cfg,
            bounds,
            velocity: Vec2::ZERO,
            // Zero forces a heading pick on the first tick.
            walk_left_us: 0,
        }
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Advance one tick: position moves by `velocity * dt`. Hitting the
    /// boundary clamps the position onto it and re-picks heading and
    /// speed immediately.
    pub fn advance(&mut self, position: Vec2, dt_us: u64, rng: &mut StdRng) -> Vec2 {
        if self.walk_left_us == 0 {
            self.pick(rng);
        }

        let dt_s = dt_us as f64 / 1_000_000.0;
        let next = Vec2::new(
            position.x + self.velocity.x * dt_s,
            position.y + self.velocity.y * dt_s,
        );

        if self.bounds.contains(next) {
            self.walk_left_us = self.walk_left_us.saturating_sub(dt_us);
            next
        } else {
            self.pick(rng);
            self.bounds.clamp(next)
        }
    }

    fn pick(&mut self, rng: &mut StdRng) {
        let heading = rng.gen_range(0.0..TAU);
        let speed = rng.gen_range(self.cfg.speed_min_mps..=self.cfg.speed_max_mps);
        self.velocity = Vec2::new(speed * heading.cos(), speed * heading.sin());
        self.walk_left_us = self.cfg.walk_us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_bounds_rejected() {
        let err = Bounds::new(Vec2::new(10.0, 0.0), Vec2::new(10.0, 5.0));
        assert!(matches!(err, Err(SimError::InvalidBounds { .. })));

        let err = Bounds::centered(Vec2::ZERO, 0.0);
        assert!(matches!(err, Err(SimError::InvalidBounds { .. })));

        let err = Bounds::centered(Vec2::ZERO, -3.0);
        assert!(matches!(err, Err(SimError::InvalidBounds { .. })));
    }

    #[test]
    fn test_walker_stays_in_bounds() {
        let bounds = Bounds::centered(Vec2::ZERO, 20.0).unwrap();
        let mut walker = Walker::new(RandomWalk::default(), bounds);
        let mut rng = StdRng::seed_from_u64(7);

        let mut position = Vec2::ZERO;
        // 10 simulated minutes of 100ms ticks.
        for _ in 0..6000 {
            position = walker.advance(position, 100_000, &mut rng);
            assert!(bounds.contains(position), "escaped to {position:?}");
        }
    }

    #[test]
    fn test_walker_actually_moves() {
        let bounds = Bounds::centered(Vec2::ZERO, 100.0).unwrap();
        let mut walker = Walker::new(RandomWalk::default(), bounds);
        let mut rng = StdRng::seed_from_u64(7);

        let start = Vec2::ZERO;
        let mut position = start;
        for _ in 0..10 {
            position = walker.advance(position, 100_000, &mut rng);
        }
        assert!(start.distance(position) > 0.0);
    }

    #[test]
    fn test_walker_is_deterministic() {
        let bounds = Bounds::centered(Vec2::ZERO, 20.0).unwrap();

        let run = |seed: u64| {
            let mut walker = Walker::new(RandomWalk::default(), bounds);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut position = Vec2::ZERO;
            for _ in 0..1000 {
                position = walker.advance(position, 100_000, &mut rng);
            }
            position
        };

        assert_eq!(run(42), run(42));
    }
}
