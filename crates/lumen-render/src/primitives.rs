//! Vertex layout and procedural meshes

use bytemuck::{Pod, Zeroable};
use lumen_import::ImportedMesh;

/// A vertex with position, normal, UV and tangent frame
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,   // position
        1 => Float32x3,   // normal
        2 => Float32x2,   // uv
        3 => Float32x3,   // tangent
        4 => Float32x3,   // bitangent
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// A mesh with vertices and indices
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Interleave an imported submesh. Missing UVs become zero.
    pub fn from_imported(mesh: &ImportedMesh) -> Self {
        let vertices = (0..mesh.positions.len())
            .map(|i| Vertex {
                position: mesh.positions[i],
                normal: mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                tangent: mesh.tangents.get(i).copied().unwrap_or([1.0, 0.0, 0.0]),
                bitangent: mesh.bitangents.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
            })
            .collect();
        Self {
            vertices,
            indices: mesh.indices.clone(),
        }
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Create an axis-aligned cube of edge length `size` centered on the origin
pub fn create_box_mesh(size: f32) -> Mesh {
    let h = size / 2.0;

    let corners = [
        [-h, -h, -h], // 0: back-bottom-left
        [h, -h, -h],  // 1: back-bottom-right
        [h, h, -h],   // 2: back-top-right
        [-h, h, -h],  // 3: back-top-left
        [-h, -h, h],  // 4: front-bottom-left
        [h, -h, h],   // 5: front-bottom-right
        [h, h, h],    // 6: front-top-right
        [-h, h, h],   // 7: front-top-left
    ];

    // Per face: corner indices in CCW order seen from outside, then the normal
    let faces: [([usize; 4], [f32; 3]); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
        ([5, 1, 2, 6], [1.0, 0.0, 0.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([3, 7, 6, 2], [0.0, 1.0, 0.0]),
    ];
    let face_uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    for (quad, normal) in faces {
        for (k, &corner) in quad.iter().enumerate() {
            positions.push(corners[corner]);
            normals.push(normal);
            uvs.push(face_uvs[k]);
        }
    }

    let indices: Vec<u32> = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base, base + 2, base + 3]
        })
        .collect();

    let (tangents, bitangents) =
        lumen_import::compute_tangents(&positions, &normals, &uvs, &indices);

    let vertices = (0..positions.len())
        .map(|i| Vertex {
            position: positions[i],
            normal: normals[i],
            uv: uvs[i],
            tangent: tangents[i],
            bitangent: bitangents[i],
        })
        .collect();

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn box_has_24_vertices_and_12_triangles() {
        let mesh = create_box_mesh(1.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
    }

    #[test]
    fn box_winding_is_ccw_from_outside() {
        let mesh = create_box_mesh(2.0);
        for tri in mesh.indices.chunks_exact(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
            let face_normal = (b - a).cross(c - a).normalize();
            let normal = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(normal) > 0.99, "triangle {:?} faces inward", tri);
        }
    }

    #[test]
    fn vertex_stride_matches_attributes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 14 * 4);
        assert_eq!(Vertex::desc().attributes.len(), 5);
    }
}
