//! Bounded-population particle simulator.
//!
//! Each tick advects every particle through a velocity function, guards
//! against unstable steps, culls particles that left the viewport, updates
//! trails, ages particles, and then restores the population: the pool is
//! trimmed to the ceiling and replenished to the target. At every tick
//! boundary the pool size lies in `[target, ceiling]`, and equals the
//! target unless a burst added extra particles.

use crate::config::{ParticleConfig, REFERENCE_FRAME_MS};
use crate::particle::Particle;
use flowfield_core::vector::remap;
use flowfield_core::{DVec2, Srgb, Viewport, Xorshift64};

/// Trail segments at least this long are not drawn.
pub const MAX_SEGMENT_LENGTH: f64 = 50.0;
/// Stroke width of the oldest trail segment.
pub const MIN_STROKE_WIDTH: f64 = 1.5;
/// Stroke width approached by the newest trail segment.
pub const MAX_STROKE_WIDTH: f64 = 4.5;

/// Style of one trail segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStyle {
    pub color: Srgb,
    pub width: f64,
}

/// Receives trail segments from [`ParticleSystem::draw`].
pub trait SegmentSink {
    fn segment(&mut self, from: DVec2, to: DVec2, style: &SegmentStyle);
}

impl<F> SegmentSink for F
where
    F: FnMut(DVec2, DVec2, &SegmentStyle),
{
    fn segment(&mut self, from: DVec2, to: DVec2, style: &SegmentStyle) {
        self(from, to, style)
    }
}

/// Counters from the most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub relocated: usize,
    pub culled: usize,
    pub respawned: usize,
    pub trimmed: usize,
    pub spawned: usize,
}

/// The particle pool and its clock.
pub struct ParticleSystem {
    config: ParticleConfig,
    viewport: Viewport,
    particles: Vec<Particle>,
    clock_ms: f64,
    last_tick: TickStats,
}

impl ParticleSystem {
    /// A pool of `config.count` freshly spawned particles.
    pub fn new(config: ParticleConfig, viewport: Viewport, rng: &mut Xorshift64) -> Self {
        let mut system = Self {
            config,
            viewport,
            particles: Vec::new(),
            clock_ms: 0.0,
            last_tick: TickStats::default(),
        };
        system.reset(rng);
        system
    }

    /// Replaces every particle with a fresh one.
    pub fn reset(&mut self, rng: &mut Xorshift64) {
        self.particles.clear();
        self.replenish(rng);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Simulation clock in milliseconds.
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    pub fn last_tick(&self) -> TickStats {
        self.last_tick
    }

    /// Applies a new configuration. Trails are trimmed to the new length;
    /// the population adjusts on the next tick.
    pub fn set_config(&mut self, config: ParticleConfig) {
        for p in &mut self.particles {
            p.trail.set_capacity(config.trail_length);
        }
        self.config = config;
    }

    /// Advances the simulation by `delta_ms`.
    ///
    /// `velocity` is queried once per particle at its current position. A
    /// negative or non-finite delta advances nothing but still runs
    /// population maintenance.
    pub fn tick<F>(&mut self, delta_ms: f64, velocity: F, rng: &mut Xorshift64)
    where
        F: Fn(DVec2) -> DVec2,
    {
        let delta_ms = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms
        } else {
            0.0
        };
        self.clock_ms += delta_ms;
        let now = self.clock_ms;
        let time_step = delta_ms / REFERENCE_FRAME_MS;

        let cfg = &self.config;
        let viewport = &self.viewport;
        let mut stats = TickStats::default();

        self.particles.retain_mut(|p| {
            let step = velocity(p.position) * p.speed * cfg.step_scale * time_step;
            let next = p.position + step;
            if step.x.abs() > cfg.max_delta || step.y.abs() > cfg.max_delta || !next.is_finite()
            {
                p.relocate(viewport, rng);
                stats.relocated += 1;
            } else {
                p.position = next;
            }

            if !viewport.contains_with_margin(p.position, cfg.cull_margin) {
                stats.culled += 1;
                return false;
            }

            if p.position.is_finite() {
                p.trail.push(p.position, now);
            }
            p.trail.evict_older_than(now, cfg.trail_max_age_ms);

            p.age += 1;
            p.life -= cfg.life_decay * time_step;
            if p.life <= 0.0 {
                p.respawn(cfg, viewport, rng);
                stats.respawned += 1;
            }
            true
        });

        stats.trimmed = self.trim_to(self.config.ceiling());
        stats.spawned = self.replenish(rng);
        self.last_tick = stats;
    }

    /// Adds `count` particles around `center`.
    ///
    /// If the pool then exceeds the ceiling, the oldest particles are
    /// dropped until it holds twice the target.
    pub fn spawn_burst(&mut self, center: DVec2, count: usize, rng: &mut Xorshift64) {
        for _ in 0..count {
            let p = Particle::burst(&self.config, center, rng);
            self.particles.push(p);
        }
        if self.particles.len() > self.config.ceiling() {
            let keep = 2 * self.config.count.max(1);
            self.trim_to(keep);
        }
        tracing::debug!(count, pool = self.particles.len(), "burst spawned");
    }

    /// Emits one segment per drawable pair of adjacent trail samples.
    ///
    /// A pair is drawable when both points are finite and their distance
    /// is in `(0, MAX_SEGMENT_LENGTH)`. Width grows from
    /// [`MIN_STROKE_WIDTH`] toward [`MAX_STROKE_WIDTH`] along the trail.
    pub fn draw<S: SegmentSink + ?Sized>(&self, sink: &mut S) {
        for p in &self.particles {
            let len = p.trail.len();
            if len < 2 {
                continue;
            }
            let mut prev: Option<DVec2> = None;
            for (i, point) in p.trail.iter().enumerate() {
                let curr = point.position;
                if let Some(from) = prev {
                    if from.is_finite() && curr.is_finite() {
                        let distance = from.distance(curr);
                        if distance > 0.0 && distance < MAX_SEGMENT_LENGTH {
                            let width = remap(
                                i as f64,
                                0.0,
                                len as f64,
                                MIN_STROKE_WIDTH,
                                MAX_STROKE_WIDTH,
                            );
                            sink.segment(from, curr, &SegmentStyle { color: p.color, width });
                        }
                    }
                }
                prev = Some(curr);
            }
        }
    }

    /// Drops the oldest particles until at most `limit` remain.
    fn trim_to(&mut self, limit: usize) -> usize {
        let excess = self.particles.len().saturating_sub(limit);
        if excess > 0 {
            self.particles.drain(..excess);
        }
        excess
    }

    /// Spawns particles until the pool reaches the target.
    fn replenish(&mut self, rng: &mut Xorshift64) -> usize {
        let missing = self.config.count.saturating_sub(self.particles.len());
        for _ in 0..missing {
            let p = Particle::spawn(&self.config, &self.viewport, rng);
            self.particles.push(p);
        }
        missing
    }
}
