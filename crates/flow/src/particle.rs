//! Particles and their bounded trail history.

use crate::config::ParticleConfig;
use flowfield_core::{DVec2, Srgb, Viewport, Xorshift64};
use std::collections::VecDeque;

/// One trail sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: DVec2,
    /// Simulation clock at creation, in milliseconds.
    pub born_ms: f64,
}

/// Time-ordered positions, oldest first, at most `capacity` long.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailBuffer {
    points: VecDeque<TrailPoint>,
    capacity: usize,
}

impl TrailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a sample, evicting from the front once over capacity.
    pub fn push(&mut self, position: DVec2, now_ms: f64) {
        self.points.push_back(TrailPoint {
            position,
            born_ms: now_ms,
        });
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Drops samples older than `max_age_ms` at `now_ms`.
    pub fn evict_older_than(&mut self, now_ms: f64, max_age_ms: f64) {
        while let Some(front) = self.points.front() {
            if now_ms - front.born_ms > max_age_ms {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Changes capacity, trimming the oldest samples if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.points.len() > capacity {
            self.points.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter()
    }

    pub fn oldest(&self) -> Option<&TrailPoint> {
        self.points.front()
    }
}

/// A particle advected through the field.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub speed: f64,
    /// Remaining life in (0, 1]; the particle respawns once it reaches 0.
    pub life: f64,
    /// Ticks since (re)spawn.
    pub age: u64,
    pub color: Srgb,
    pub trail: TrailBuffer,
}

impl Particle {
    /// A particle at a random position in `viewport`.
    pub fn spawn(config: &ParticleConfig, viewport: &Viewport, rng: &mut Xorshift64) -> Self {
        let position = random_position(viewport, rng);
        let (speed_lo, speed_hi) = config.speed_range;
        let (life_lo, life_hi) = config.life_range;
        Self {
            position,
            speed: rng.next_range(speed_lo, speed_hi),
            life: rng.next_range(life_lo, life_hi),
            age: 0,
            color: Srgb::random_bright(rng),
            trail: TrailBuffer::new(config.trail_length),
        }
    }

    /// A particle scattered around `center` with the burst speed and life ranges.
    pub fn burst(config: &ParticleConfig, center: DVec2, rng: &mut Xorshift64) -> Self {
        let j = config.burst_jitter;
        let offset = DVec2::new(rng.next_range(-j, j), rng.next_range(-j, j));
        let (speed_lo, speed_hi) = config.burst_speed_range;
        let (life_lo, life_hi) = config.burst_life_range;
        Self {
            position: center + offset,
            speed: rng.next_range(speed_lo, speed_hi),
            life: rng.next_range(life_lo, life_hi),
            age: 0,
            color: Srgb::random_bright(rng),
            trail: TrailBuffer::new(config.trail_length),
        }
    }

    /// Resets in place: new position, color, speed, and life; age 0; empty trail.
    pub fn respawn(&mut self, config: &ParticleConfig, viewport: &Viewport, rng: &mut Xorshift64) {
        let (speed_lo, speed_hi) = config.speed_range;
        let (life_lo, life_hi) = config.life_range;
        self.position = random_position(viewport, rng);
        self.color = Srgb::random_bright(rng);
        self.life = rng.next_range(life_lo, life_hi);
        self.speed = rng.next_range(speed_lo, speed_hi);
        self.age = 0;
        self.trail.clear();
    }

    /// Moves to a random position and forgets the trail, keeping other attributes.
    pub fn relocate(&mut self, viewport: &Viewport, rng: &mut Xorshift64) {
        self.position = random_position(viewport, rng);
        self.trail.clear();
    }
}

/// A uniformly random point inside `viewport`.
pub fn random_position(viewport: &Viewport, rng: &mut Xorshift64) -> DVec2 {
    DVec2::new(
        rng.next_range(0.0, viewport.width()),
        rng.next_range(0.0, viewport.height()),
    )
}
