//! Wavefront OBJ loading for triangle rendering
//!
//! This crate turns OBJ text into flat buffers ready for a renderer:
//! - ObjMesh: vertices, triangulated faces, texture coordinates, raw normals
//! - Triangle extraction: faces dereferenced into a flat vertex list
//! - Normal estimation: one flat normal per triangle, duplicated per vertex
//!
//! Uploading the buffers to a graphics device is the caller's concern.

mod buffer;
mod normals;
mod obj;

pub use buffer::{normals_f32, points_f32};
pub use normals::{estimate_normals, triangle_normal};
pub use obj::{ObjMesh, load_obj, parse_obj, triangle_vertices};

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("line {line}: malformed directive: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("face index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: i64, vertex_count: usize },
    #[error("triangle buffer length {0} is not a multiple of 3")]
    InvalidLength(usize),
}
