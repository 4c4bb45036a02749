//! Boids flocking simulation, the demo behind the canvas toy.
//!
//! Every tick each boid steers by three local rules (alignment, cohesion,
//! separation) against the rest of the flock. All-pairs distance checks, so
//! O(N²) per tick, which is fine at demo sizes (~100 boids).

use rand::RngExt;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// A 2D vector used for position, velocity, and acceleration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Unit-length copy, zero stays zero
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 { *self / len } else { Self::ZERO }
    }

    /// Copy with length clamped to `max`
    pub fn clamped(&self, max: f64) -> Self {
        let len = self.length();
        if len > max { *self / len * max } else { *self }
    }

    pub fn distance(&self, other: &Vec2) -> f64 {
        (*self - *other).length()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }
}

impl std::ops::Div<f64> for Vec2 {
    type Output = Self;

    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

/// A single simulated agent
#[derive(Debug, Clone)]
pub struct Boid {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
}

impl Boid {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Tuning for the flock, force weights are independent per rule
pub struct FlockSettings {
    /// How many boids to spawn
    pub boid_count: usize,
    /// How far a boid can see neighbors for alignment and cohesion
    pub vision_radius: f64,
    /// Neighbors closer than this push the boid away
    pub separation_radius: f64,
    /// Hard cap on speed per tick
    pub max_speed: f64,
    pub alignment_weight: f64,
    pub cohesion_weight: f64,
    pub separation_weight: f64,
}

impl Default for FlockSettings {
    fn default() -> Self {
        Self {
            boid_count: 100,
            vision_radius: 50.0,
            separation_radius: 20.0,
            max_speed: 4.0,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            separation_weight: 1.5,
        }
    }
}

/// The whole flock plus the bounds it lives in. The RNG is constructed by the
/// caller and handed in, so runs with the same seed are reproducible.
pub struct Flock {
    boids: Vec<Boid>,
    settings: FlockSettings,
    width: f64,
    height: f64,
    rng: ChaCha20Rng,
}

impl Flock {
    pub fn new(width: f64, height: f64, settings: FlockSettings, mut rng: ChaCha20Rng) -> Self {
        let boids = Self::spawn(width, height, &settings, &mut rng);

        Self {
            boids,
            settings,
            width,
            height,
            rng,
        }
    }

    fn spawn(
        width: f64,
        height: f64,
        settings: &FlockSettings,
        rng: &mut ChaCha20Rng,
    ) -> Vec<Boid> {
        (0..settings.boid_count)
            .map(|_| {
                let position = Vec2::new(
                    rng.random_range(0.0..width),
                    rng.random_range(0.0..height),
                );
                let velocity = Vec2::new(
                    rng.random_range(-settings.max_speed..settings.max_speed),
                    rng.random_range(-settings.max_speed..settings.max_speed),
                );
                Boid::new(position, velocity.clamped(settings.max_speed))
            })
            .collect()
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Advance the simulation one tick
    pub fn step(&mut self) {
        let accelerations = self
            .boids
            .iter()
            .enumerate()
            .map(|(i, boid)| self.steering(i, boid))
            .collect::<Vec<_>>();

        for (boid, acceleration) in self.boids.iter_mut().zip(accelerations) {
            boid.acceleration += acceleration;
            boid.velocity += boid.acceleration;
            boid.velocity = boid.velocity.clamped(self.settings.max_speed);
            boid.position += boid.velocity;
            boid.acceleration = Vec2::ZERO;
            Self::wrap(&mut boid.position, self.width, self.height);
        }
    }

    /// The combined steering force for one boid: each rule's vector is
    /// normalized to unit length, then scaled by its own weight
    fn steering(&self, index: usize, boid: &Boid) -> Vec2 {
        let mut heading_sum = Vec2::ZERO;
        let mut position_sum = Vec2::ZERO;
        let mut repulsion = Vec2::ZERO;
        let mut neighbors = 0;

        for (j, other) in self.boids.iter().enumerate() {
            if j == index {
                continue;
            }

            let dist = boid.position.distance(&other.position);
            if dist >= self.settings.vision_radius {
                continue;
            }

            heading_sum += other.velocity;
            position_sum += other.position;
            neighbors += 1;

            if dist < self.settings.separation_radius && dist > 0.0 {
                repulsion += (boid.position - other.position).normalized() / dist;
            }
        }

        if neighbors == 0 {
            return Vec2::ZERO;
        }

        let alignment = heading_sum.normalized() * self.settings.alignment_weight;
        let cohesion = (position_sum / neighbors as f64 - boid.position).normalized()
            * self.settings.cohesion_weight;
        let separation = repulsion.normalized() * self.settings.separation_weight;

        alignment + cohesion + separation
    }

    /// Toroidal wrap, leaving an axis untouched while it stays in bounds
    fn wrap(position: &mut Vec2, width: f64, height: f64) {
        if position.x < 0.0 {
            position.x += width;
        } else if position.x > width {
            position.x -= width;
        }

        if position.y < 0.0 {
            position.y += height;
        } else if position.y > height {
            position.y -= height;
        }
    }

    /// Change the canvas bounds, respawning the whole flock
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.boids = Self::spawn(width, height, &self.settings, &mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mk_flock(count: usize) -> Flock {
        let settings = FlockSettings {
            boid_count: count,
            ..Default::default()
        };
        Flock::new(800.0, 600.0, settings, ChaCha20Rng::seed_from_u64(7))
    }

    fn assert_in_bounds(flock: &Flock) {
        let (width, height) = flock.bounds();
        for (i, boid) in flock.boids().iter().enumerate() {
            assert!(
                (0.0..=width).contains(&boid.position.x)
                    && (0.0..=height).contains(&boid.position.y),
                "boid {i} escaped to {:?}",
                boid.position
            );
        }
    }

    #[test]
    fn test_vec2_normalized() {
        let v = Vec2::new(3.0, 4.0);
        assert!((v.normalized().length() - 1.0).abs() < 1e-9);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn test_vec2_clamped() {
        let v = Vec2::new(30.0, 40.0);
        assert!((v.clamped(5.0).length() - 5.0).abs() < 1e-9);

        let slow = Vec2::new(1.0, 0.0);
        assert_eq!(slow.clamped(5.0), slow);
    }

    #[test]
    fn test_spawn_count_and_bounds() {
        let flock = mk_flock(50);
        assert_eq!(flock.boids().len(), 50);
        assert_in_bounds(&flock);
    }

    #[test]
    fn test_step_keeps_boids_in_bounds() {
        let mut flock = mk_flock(100);
        for _ in 0..10 {
            flock.step();
            assert_in_bounds(&flock);
        }
    }

    #[test]
    fn test_step_moves_boids() {
        let mut flock = mk_flock(10);
        let before = flock
            .boids()
            .iter()
            .map(|b| b.position)
            .collect::<Vec<_>>();

        flock.step();

        let moved = flock
            .boids()
            .iter()
            .zip(before)
            .any(|(boid, old)| boid.position != old);
        assert!(moved);
    }

    #[test]
    fn test_speed_stays_clamped() {
        let mut flock = mk_flock(100);
        for _ in 0..5 {
            flock.step();
        }
        let max = FlockSettings::default().max_speed;
        for boid in flock.boids() {
            assert!(boid.velocity.length() <= max + 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = mk_flock(30);
        let mut b = mk_flock(30);

        for _ in 0..5 {
            a.step();
            b.step();
        }

        for (left, right) in a.boids().iter().zip(b.boids()) {
            assert_eq!(left.position, right.position);
            assert_eq!(left.velocity, right.velocity);
        }
    }

    #[test]
    fn test_resize_respawns() {
        let mut flock = mk_flock(20);
        flock.resize(100.0, 100.0);

        assert_eq!(flock.boids().len(), 20);
        assert_in_bounds(&flock);
    }
}
