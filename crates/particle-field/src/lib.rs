//! Bounded particle field simulation
//!
//! A fixed population of particles inside an axis-aligned box, driven by
//! pairwise attraction/repulsion within a kernel radius, damped Euler
//! integration, and elastic wall reflection. The driver owns the frame
//! cadence and calls the three phases in order each tick:
//! accelerations, then velocities, then positions.
//!
//! The field only mutates its own arrays; rendering the `positions` buffer
//! is the caller's concern.

mod field;

pub use field::{FieldBounds, FieldConfig, FieldError, ParticleField};
