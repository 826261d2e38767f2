//! Particle field state and per-frame update phases

use glam::{Vec3, Vec4};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Axis-aligned box the particles reflect off
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl FieldBounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube centered on the origin with the given half extent
    pub fn cube(half_extent: f32) -> Self {
        Self {
            min: Vec3::splat(-half_extent),
            max: Vec3::splat(half_extent),
        }
    }

    /// Check that a point lies inside the box (walls inclusive)
    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }

    fn validate(&self) -> Result<(), FieldError> {
        for (axis, name) in ['x', 'y', 'z'].into_iter().enumerate() {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(FieldError::DegenerateBounds {
                    axis: name,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(())
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self::cube(1.0)
    }
}

/// Field construction parameters and force-law tunables
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldConfig {
    pub num_particles: usize,
    /// Uniform particle mass, folded into the force law
    pub mass: f32,
    pub bounds: FieldBounds,
    /// Damping multiplier applied to velocity and acceleration each step
    pub friction: f32,
    /// Constant force bias added to every particle
    pub gravity: Vec3,
    /// Magnitude of the pairwise gravitational constant
    pub grav_const: f32,
    /// Cap on the magnitude of a single pairwise force
    pub max_force: f32,
    /// Squared-distance floor below which a neighbor pair is skipped
    pub min_dist_sq: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            num_particles: 100,
            mass: 1.0,
            bounds: FieldBounds::default(),
            friction: 0.5,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            grav_const: 0.01,
            max_force: 0.1,
            min_dist_sq: 1e-6,
        }
    }
}

impl FieldConfig {
    fn validate(&self) -> Result<(), FieldError> {
        if self.num_particles == 0 {
            return Err(FieldError::EmptyField);
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(FieldError::InvalidMass(self.mass));
        }
        self.bounds.validate()
    }
}

/// A fixed population of particles inside a reflecting box
///
/// Positions are homogeneous points with w held at 1.0 so the buffer can be
/// handed to a renderer as-is. The field exclusively owns its arrays; the
/// population never changes after construction.
#[derive(Debug, Clone)]
pub struct ParticleField {
    config: FieldConfig,
    positions: Vec<Vec4>,
    velocities: Vec<Vec3>,
    accelerations: Vec<Vec3>,
}

impl ParticleField {
    /// Create a field with positions drawn uniformly inside the bounds
    pub fn new(config: FieldConfig) -> Result<Self, FieldError> {
        Self::with_rng(config, &mut rand::thread_rng())
    }

    /// Create a field using the given random source (deterministic seeding)
    pub fn with_rng<R: Rng + ?Sized>(config: FieldConfig, rng: &mut R) -> Result<Self, FieldError> {
        config.validate()?;

        let b = config.bounds;
        let mut positions = Vec::with_capacity(config.num_particles);
        for _ in 0..config.num_particles {
            positions.push(Vec4::new(
                rng.gen_range(b.min.x..b.max.x),
                rng.gen_range(b.min.y..b.max.y),
                rng.gen_range(b.min.z..b.max.z),
                1.0,
            ));
        }

        tracing::debug!(
            "seeded particle field: {} particles, bounds {:?}..{:?}",
            config.num_particles,
            b.min,
            b.max
        );

        Ok(Self {
            positions,
            velocities: vec![Vec3::ZERO; config.num_particles],
            accelerations: vec![Vec3::ZERO; config.num_particles],
            config,
        })
    }

    /// Indices of all particles within `kernel_radius` of particle `idx`
    ///
    /// Plain O(n) scan per query; the field sizes this is used at do not
    /// warrant a spatial index.
    pub fn neighbors_within(&self, kernel_radius: f32, idx: usize) -> Vec<usize> {
        let p = self.positions[idx].truncate();
        self.positions
            .iter()
            .enumerate()
            .filter(|(j, q)| *j != idx && q.truncate().distance(p) <= kernel_radius)
            .map(|(j, _)| j)
            .collect()
    }

    /// Phase 1: recompute every particle's acceleration
    ///
    /// Each particle starts from the gravity bias, then accumulates an
    /// inverse-square force from every neighbor inside the kernel:
    /// repulsive in the close-range band (squared distance up to a third of
    /// the kernel radius), attractive beyond it. `max_force` is an upper
    /// bound on the signed magnitude, so only the attractive branch is
    /// capped. Coincident pairs under the squared-distance floor are
    /// skipped. Mass is folded into the force law, so the stored
    /// acceleration is numerically the force sum.
    pub fn update_accelerations(&mut self, kernel_radius: f32) {
        let mass_sq = self.config.mass * self.config.mass;
        for i in 0..self.positions.len() {
            let p_i = self.positions[i].truncate();
            let mut force = self.config.gravity;
            for j in self.neighbors_within(kernel_radius, i) {
                let d = self.positions[j].truncate() - p_i;
                let dist_sq = d.dot(d);
                if dist_sq < self.config.min_dist_sq {
                    continue;
                }
                let g = if dist_sq > kernel_radius / 3.0 {
                    self.config.grav_const
                } else {
                    -self.config.grav_const
                };
                let force_mag = (g * mass_sq / dist_sq).min(self.config.max_force);
                force += force_mag * d.normalize();
            }
            self.accelerations[i] = force;
        }
    }

    /// Phase 2: integrate velocities with uniform damping
    ///
    /// `v = friction * v + friction * a * dt`
    pub fn update_velocities(&mut self, dt: f32) {
        let friction = self.config.friction;
        for (v, a) in self.velocities.iter_mut().zip(&self.accelerations) {
            *v = friction * *v + friction * *a * dt;
        }
    }

    /// Phase 3: Euler position step, reflecting each particle off the walls
    /// before moving to the next
    pub fn update_positions(&mut self, dt: f32) {
        for i in 0..self.positions.len() {
            let p = self.positions[i].truncate() + self.velocities[i] * dt;
            self.positions[i] = p.extend(1.0);
            self.reflect_at_walls(i);
        }
    }

    /// Run one full frame: accelerations, velocities, positions
    pub fn step(&mut self, kernel_radius: f32, dt: f32) {
        self.update_accelerations(kernel_radius);
        self.update_velocities(dt);
        self.update_positions(dt);
    }

    /// Per-axis elastic reflection: clamp to the wall and negate that
    /// axis's velocity component
    fn reflect_at_walls(&mut self, idx: usize) {
        let bounds = self.config.bounds;
        let mut p = self.positions[idx].truncate();
        let v = &mut self.velocities[idx];
        for axis in 0..3 {
            if p[axis] < bounds.min[axis] {
                p[axis] = bounds.min[axis];
                v[axis] = -v[axis];
            } else if p[axis] > bounds.max[axis] {
                p[axis] = bounds.max[axis];
                v[axis] = -v[axis];
            }
        }
        self.positions[idx] = p.extend(1.0);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Homogeneous particle positions, refreshed by `update_positions`
    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn accelerations(&self) -> &[Vec3] {
        &self.accelerations
    }

    /// Position buffer as raw bytes for device upload
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

/// Field construction errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FieldError {
    #[error("field must contain at least one particle")]
    EmptyField,
    #[error("degenerate {axis} range: [{min}, {max}]")]
    DegenerateBounds { axis: char, min: f32, max: f32 },
    #[error("particle mass must be positive and finite, got {0}")]
    InvalidMass(f32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn seeded_field(config: FieldConfig) -> ParticleField {
        let mut rng = SmallRng::seed_from_u64(42);
        ParticleField::with_rng(config, &mut rng).unwrap()
    }

    fn still_config(n: usize) -> FieldConfig {
        // No gravity: particles only move if a pairwise force acts
        FieldConfig {
            num_particles: n,
            gravity: Vec3::ZERO,
            ..FieldConfig::default()
        }
    }

    #[test]
    fn test_construction_seeds_inside_bounds() {
        let field = seeded_field(FieldConfig::default());
        assert_eq!(field.len(), 100);
        for p in field.positions() {
            assert!(field.config().bounds.contains(p.truncate()));
            assert_eq!(p.w, 1.0);
        }
        for v in field.velocities() {
            assert_eq!(*v, Vec3::ZERO);
        }
        for a in field.accelerations() {
            assert_eq!(*a, Vec3::ZERO);
        }
    }

    #[test]
    fn test_empty_population_rejected() {
        let config = FieldConfig {
            num_particles: 0,
            ..FieldConfig::default()
        };
        assert!(matches!(
            ParticleField::new(config),
            Err(FieldError::EmptyField)
        ));
    }

    #[test]
    fn test_zero_width_bounds_rejected() {
        let config = FieldConfig {
            bounds: FieldBounds::new(Vec3::new(1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
            ..FieldConfig::default()
        };
        assert!(matches!(
            ParticleField::new(config),
            Err(FieldError::DegenerateBounds { axis: 'x', .. })
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = FieldConfig {
            bounds: FieldBounds::new(Vec3::new(-1.0, 2.0, -1.0), Vec3::new(1.0, -2.0, 1.0)),
            ..FieldConfig::default()
        };
        assert!(matches!(
            ParticleField::new(config),
            Err(FieldError::DegenerateBounds { axis: 'y', .. })
        ));
    }

    #[test]
    fn test_nonpositive_mass_rejected() {
        let config = FieldConfig {
            mass: 0.0,
            ..FieldConfig::default()
        };
        assert!(matches!(
            ParticleField::new(config),
            Err(FieldError::InvalidMass(_))
        ));
    }

    #[test]
    fn test_neighbor_symmetry() {
        let field = seeded_field(FieldConfig {
            num_particles: 40,
            ..FieldConfig::default()
        });
        let radius = 0.8;
        for i in 0..field.len() {
            for &j in &field.neighbors_within(radius, i) {
                assert!(
                    field.neighbors_within(radius, j).contains(&i),
                    "particle {i} sees {j} but not the reverse"
                );
            }
        }
    }

    #[test]
    fn test_neighbors_exclude_self() {
        let field = seeded_field(FieldConfig::default());
        for i in 0..field.len() {
            assert!(!field.neighbors_within(10.0, i).contains(&i));
        }
    }

    #[test]
    fn test_lone_particle_accelerates_at_gravity() {
        let mut field = seeded_field(FieldConfig {
            num_particles: 1,
            ..FieldConfig::default()
        });
        field.update_accelerations(0.5);
        assert_eq!(field.accelerations()[0], Vec3::new(0.0, -10.0, 0.0));
    }

    #[test]
    fn test_close_pair_repels() {
        let mut field = seeded_field(still_config(2));
        // Pair along x, well inside the close-range band of the kernel
        field.positions[0] = Vec4::new(-0.05, 0.0, 0.0, 1.0);
        field.positions[1] = Vec4::new(0.05, 0.0, 0.0, 1.0);

        field.update_accelerations(1.0);
        assert!(field.accelerations()[0].x < 0.0);
        assert!(field.accelerations()[1].x > 0.0);
    }

    #[test]
    fn test_distant_pair_attracts() {
        let mut field = seeded_field(still_config(2));
        // Squared distance 0.64 exceeds kernel_radius / 3 for radius 1.0,
        // still within the kernel itself
        field.positions[0] = Vec4::new(-0.4, 0.0, 0.0, 1.0);
        field.positions[1] = Vec4::new(0.4, 0.0, 0.0, 1.0);

        field.update_accelerations(1.0);
        assert!(field.accelerations()[0].x > 0.0);
        assert!(field.accelerations()[1].x < 0.0);
    }

    #[test]
    fn test_attractive_force_is_capped() {
        let mut field = seeded_field(FieldConfig {
            mass: 2.0,
            ..still_config(2)
        });
        // dist_sq = 0.119: above kernel_radius/3 (attractive) and small
        // enough that the raw inverse-square term exceeds max_force
        field.positions[0] = Vec4::new(-0.1725, 0.0, 0.0, 1.0);
        field.positions[1] = Vec4::new(0.1725, 0.0, 0.0, 1.0);

        field.update_accelerations(0.35);
        let max_force = field.config().max_force;
        assert_relative_eq!(field.accelerations()[0].x, max_force, epsilon = 1e-6);
        assert_relative_eq!(field.accelerations()[1].x, -max_force, epsilon = 1e-6);
    }

    #[test]
    fn test_coincident_pair_is_skipped() {
        let mut field = seeded_field(still_config(2));
        field.positions[0] = Vec4::new(0.1, 0.2, 0.3, 1.0);
        field.positions[1] = Vec4::new(0.1, 0.2, 0.3, 1.0);

        field.update_accelerations(1.0);
        for a in field.accelerations() {
            assert_eq!(*a, Vec3::ZERO);
            assert!(a.is_finite());
        }
    }

    #[test]
    fn test_velocity_damping() {
        let mut field = seeded_field(FieldConfig {
            num_particles: 1,
            ..FieldConfig::default()
        });
        field.velocities[0] = Vec3::new(2.0, 0.0, 0.0);
        field.accelerations[0] = Vec3::new(0.0, 4.0, 0.0);

        field.update_velocities(0.5);
        // v = 0.5*v + 0.5*a*dt
        assert_relative_eq!(field.velocities()[0].x, 1.0);
        assert_relative_eq!(field.velocities()[0].y, 1.0);
        assert_relative_eq!(field.velocities()[0].z, 0.0);
    }

    #[test]
    fn test_euler_position_step() {
        let mut field = seeded_field(still_config(1));
        field.positions[0] = Vec4::new(0.0, 0.0, 0.0, 1.0);
        field.velocities[0] = Vec3::new(1.0, -2.0, 0.5);

        field.update_positions(0.1);
        let p = field.positions()[0];
        assert_relative_eq!(p.x, 0.1);
        assert_relative_eq!(p.y, -0.2);
        assert_relative_eq!(p.z, 0.05);
        assert_eq!(p.w, 1.0);
    }

    #[test]
    fn test_wall_reflection_clamps_and_negates() {
        let mut field = seeded_field(still_config(1));
        field.positions[0] = Vec4::new(0.95, 0.0, 0.0, 1.0);
        field.velocities[0] = Vec3::new(1.0, 0.0, 0.0);

        field.update_positions(0.1);
        assert_relative_eq!(field.positions()[0].x, 1.0);
        assert_relative_eq!(field.velocities()[0].x, -1.0);
    }

    #[test]
    fn test_particle_resting_on_wall_stays_put() {
        let mut field = seeded_field(still_config(1));
        field.positions[0] = Vec4::new(-1.0, 0.0, 0.0, 1.0);
        field.velocities[0] = Vec3::ZERO;

        for _ in 0..50 {
            field.update_positions(0.1);
            assert_eq!(field.positions()[0], Vec4::new(-1.0, 0.0, 0.0, 1.0));
            assert_eq!(field.velocities()[0], Vec3::ZERO);
        }
    }

    #[test]
    fn test_positions_stay_bounded_over_many_steps() {
        let mut field = seeded_field(FieldConfig {
            num_particles: 30,
            ..FieldConfig::default()
        });
        let bounds = field.config().bounds;
        for _ in 0..200 {
            field.step(0.5, 0.05);
            for p in field.positions() {
                assert!(bounds.contains(p.truncate()), "escaped: {p:?}");
                assert!(p.is_finite());
                assert_eq!(p.w, 1.0);
            }
        }
    }

    #[test]
    fn test_position_bytes_layout() {
        let mut field = seeded_field(still_config(1));
        field.positions[0] = Vec4::new(1.0, 2.0, 3.0, 1.0);
        let bytes = field.position_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], 1.0f32.to_le_bytes().as_slice());
    }
}
