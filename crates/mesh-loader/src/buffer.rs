//! Flat float views over point and normal buffers
//!
//! The rendering side consumes tightly packed `f32` data; these casts avoid
//! copying on the way to the device upload.

use glam::{Vec3, Vec4};

/// View a homogeneous point buffer as packed floats (4 per point)
pub fn points_f32(points: &[Vec4]) -> &[f32] {
    bytemuck::cast_slice(points)
}

/// View a normal buffer as packed floats (3 per normal)
pub fn normals_f32(normals: &[Vec3]) -> &[f32] {
    bytemuck::cast_slice(normals)
}
