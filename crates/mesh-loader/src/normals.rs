//! Flat normal estimation for triangle vertex buffers

use glam::{Vec3, Vec4};

use crate::MeshError;

/// Normal of a single triangle
///
/// Uses the operand order `cross(p2 - p0, p1 - p0)`; callers depend on the
/// resulting sign, so the order is contractual. Degenerate (zero-area)
/// triangles yield the zero vector.
pub fn triangle_normal(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    let n = (p2 - p0).cross(p1 - p0);
    let len = n.length();
    if len > 0.0 { n / len } else { Vec3::ZERO }
}

/// Estimate one flat normal per vertex of a triangle buffer
///
/// The input is a flat buffer where every consecutive triple forms a
/// triangle; its length must be a multiple of 3. Each triangle's normal is
/// emitted three times, one per vertex, so the output length equals the
/// input length. Normals are not averaged across triangles that share a
/// vertex position.
pub fn estimate_normals(triangle_verts: &[Vec4]) -> Result<Vec<Vec3>, MeshError> {
    if triangle_verts.len() % 3 != 0 {
        return Err(MeshError::InvalidLength(triangle_verts.len()));
    }

    let mut normals = Vec::with_capacity(triangle_verts.len());
    for tri in triangle_verts.chunks_exact(3) {
        let n = triangle_normal(tri[0].truncate(), tri[1].truncate(), tri[2].truncate());
        normals.push(n);
        normals.push(n);
        normals.push(n);
    }
    Ok(normals)
}
