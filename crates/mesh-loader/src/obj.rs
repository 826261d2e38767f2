//! Wavefront OBJ text parsing

use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::MeshError;

/// Geometry parsed from an OBJ file
///
/// Faces are fan-triangulated at parse time, so `faces` always holds
/// triangles with zero-based indices into `vertices`. Texture coordinates
/// and raw `vn` normals are kept in file order; they are not index-linked
/// to the vertex list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    /// Homogeneous points (x, y, z, 1.0) in file order
    pub vertices: Vec<Vec4>,
    /// Triangles as zero-based index triples into `vertices`
    pub faces: Vec<[u32; 3]>,
    /// `vt` pairs in file order
    pub texcoords: Vec<Vec2>,
    /// `vn` vectors in file order (normals are re-derived geometrically,
    /// these are retained as parsed)
    pub normals: Vec<Vec3>,
}

impl ObjMesh {
    /// Number of triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }
}

/// Load an OBJ file from disk
pub fn load_obj(path: impl AsRef<Path>) -> Result<ObjMesh, MeshError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| MeshError::Io(e.to_string()))?;
    let mesh = parse_obj(&text)?;
    tracing::debug!(
        "loaded OBJ '{}': {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Parse OBJ text into an `ObjMesh`
///
/// Recognizes `v`, `f`, `vt`, and `vn` lines (tag match is
/// case-insensitive); every other directive is ignored. Face lines are
/// fan-triangulated around their first vertex reference and converted from
/// 1-based to 0-based indexing. The parse is atomic: any malformed line or
/// out-of-range face index fails the whole parse, no partial mesh.
pub fn parse_obj(text: &str) -> Result<ObjMesh, MeshError> {
    let mut vertices: Vec<Vec4> = Vec::new();
    let mut texcoords: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    // Raw 1-based file indices, validated against the vertex count once the
    // whole file has been read (vertices may legally follow the faces that
    // reference them).
    let mut raw_faces: Vec<[i64; 3]> = Vec::new();

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[0].to_ascii_lowercase().as_str() {
            "v" => {
                let v = parse_floats::<3>(&fields[1..], line_no)?;
                vertices.push(Vec4::new(v[0], v[1], v[2], 1.0));
            }
            "vt" => {
                let t = parse_floats::<2>(&fields[1..], line_no)?;
                texcoords.push(Vec2::new(t[0], t[1]));
            }
            "vn" => {
                let n = parse_floats::<3>(&fields[1..], line_no)?;
                normals.push(Vec3::new(n[0], n[1], n[2]));
            }
            "f" => {
                let refs = parse_face_refs(&fields[1..], line_no)?;
                // Fan triangulation anchored at the first reference
                for i in 1..refs.len() - 1 {
                    raw_faces.push([refs[0], refs[i], refs[i + 1]]);
                }
            }
            // Comments, materials, groups, smoothing flags: ignored
            _ => {}
        }
    }

    let mut faces = Vec::with_capacity(raw_faces.len());
    for raw in &raw_faces {
        let mut tri = [0u32; 3];
        for (slot, &file_idx) in tri.iter_mut().zip(raw.iter()) {
            let idx = file_idx - 1;
            if idx < 0 || idx as usize >= vertices.len() {
                return Err(MeshError::IndexOutOfRange {
                    index: idx,
                    vertex_count: vertices.len(),
                });
            }
            *slot = idx as u32;
        }
        faces.push(tri);
    }

    Ok(ObjMesh {
        vertices,
        faces,
        texcoords,
        normals,
    })
}

/// Dereference faces into a flat triangle vertex buffer
///
/// Every consecutive triple of the result forms one triangle, in face
/// order; the length is always 3x the triangle count.
pub fn triangle_vertices(mesh: &ObjMesh) -> Result<Vec<Vec4>, MeshError> {
    let mut points = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        for &idx in face {
            let p = mesh
                .vertices
                .get(idx as usize)
                .ok_or(MeshError::IndexOutOfRange {
                    index: idx as i64,
                    vertex_count: mesh.vertices.len(),
                })?;
            points.push(*p);
        }
    }
    Ok(points)
}

/// Parse the first N whitespace fields as floats, ignoring any extras
fn parse_floats<const N: usize>(fields: &[&str], line_no: usize) -> Result<[f32; N], MeshError> {
    if fields.len() < N {
        return Err(MeshError::MalformedLine {
            line: line_no,
            reason: format!("expected {} numeric fields, found {}", N, fields.len()),
        });
    }
    let mut out = [0.0f32; N];
    for (slot, field) in out.iter_mut().zip(fields.iter()) {
        *slot = field.parse().map_err(|_| MeshError::MalformedLine {
            line: line_no,
            reason: format!("invalid numeric field '{field}'"),
        })?;
    }
    Ok(out)
}

/// Parse face references of the form `v`, `v/vt`, `v/vt/vn`, or `v//vn`,
/// keeping only the vertex index of each
fn parse_face_refs(fields: &[&str], line_no: usize) -> Result<Vec<i64>, MeshError> {
    if fields.len() < 3 {
        return Err(MeshError::MalformedLine {
            line: line_no,
            reason: format!("face needs at least 3 vertex references, found {}", fields.len()),
        });
    }
    let mut refs = Vec::with_capacity(fields.len());
    for field in fields {
        let vertex_part = field.split('/').next().unwrap_or("");
        let idx: i64 = vertex_part.parse().map_err(|_| MeshError::MalformedLine {
            line: line_no,
            reason: format!("invalid face reference '{field}'"),
        })?;
        refs.push(idx);
    }
    Ok(refs)
}
