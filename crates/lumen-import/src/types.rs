//! Import result types

use std::path::PathBuf;

/// Result of importing a file
#[derive(Debug, Default)]
pub struct ImportResult {
    /// File stem of the source
    pub name: String,
    /// Extracted submeshes
    pub meshes: Vec<ImportedMesh>,
    /// Images embedded in the source file
    pub textures: Vec<ImportedTexture>,
    /// Extracted materials
    pub materials: Vec<ImportedMaterial>,
}

impl ImportResult {
    /// Compute the combined bounding box across all meshes
    pub fn bounds(&self) -> Option<MeshBounds> {
        self.meshes
            .iter()
            .filter_map(|m| m.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Recenter on the origin and scale uniformly so the largest extent spans [-1, 1]
    pub fn normalize(&mut self) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        let center = bounds.center();
        let extent = bounds.size().into_iter().fold(0.0_f32, f32::max);
        if extent <= f32::EPSILON {
            return;
        }
        let scale = 2.0 / extent;
        for mesh in &mut self.meshes {
            for p in &mut mesh.positions {
                for i in 0..3 {
                    p[i] = (p[i] - center[i]) * scale;
                }
            }
        }
    }

    /// Material for a submesh, if it references one
    pub fn material_for(&self, mesh: &ImportedMesh) -> Option<&ImportedMaterial> {
        mesh.material_index.and_then(|i| self.materials.get(i))
    }
}

/// Axis-aligned bounding box computed from vertex positions
#[derive(Debug, Clone, Copy)]
pub struct MeshBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshBounds {
    /// Compute bounds from a set of vertex positions
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        let (first, rest) = positions.split_first()?;
        let mut min = *first;
        let mut max = *first;
        for p in rest {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some(Self { min, max })
    }

    /// Size along each axis
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.max[0] + self.min[0]) * 0.5,
            (self.max[1] + self.min[1]) * 0.5,
            (self.max[2] + self.min[2]) * 0.5,
        ]
    }

    /// Merge with another bounds to get the union
    pub fn union(&self, other: &MeshBounds) -> MeshBounds {
        MeshBounds {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }
}

impl std::fmt::Display for MeshBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.size();
        write!(
            f,
            "{:.2} x {:.2} x {:.2} (min [{:.2}, {:.2}, {:.2}], max [{:.2}, {:.2}, {:.2}])",
            s[0], s[1], s[2],
            self.min[0], self.min[1], self.min[2],
            self.max[0], self.max[1], self.max[2],
        )
    }
}

/// An imported submesh. All per-vertex arrays have the same length as `positions`.
#[derive(Debug, Clone)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Empty when the source has no texture coordinates
    pub uvs: Vec<[f32; 2]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub material_index: Option<usize>,
}

impl ImportedMesh {
    /// Compute the axis-aligned bounding box of this mesh's vertices
    pub fn bounds(&self) -> Option<MeshBounds> {
        MeshBounds::from_positions(&self.positions)
    }

    pub fn has_texture_coords(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// Fill in normals and tangent frames that the source file left out
    pub(crate) fn complete_attributes(&mut self) {
        if self.normals.len() != self.positions.len() {
            self.normals = crate::compute_normals(&self.positions, &self.indices);
        }
        if self.uvs.len() != self.positions.len() {
            self.uvs.clear();
        }
        let (tangents, bitangents) =
            crate::compute_tangents(&self.positions, &self.normals, &self.uvs, &self.indices);
        self.tangents = tangents;
        self.bitangents = bitangents;
    }
}

/// An image decoded from inside a model file, always RGBA8
#[derive(Debug, Clone)]
pub struct ImportedTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Where a material's texture lives
#[derive(Debug, Clone, PartialEq)]
pub enum TextureRef {
    /// An image file on disk, resolved relative to the model
    File(PathBuf),
    /// Index into `ImportResult::textures`
    Embedded(usize),
}

/// Flat Blinn-Phong material
#[derive(Debug, Clone)]
pub struct ImportedMaterial {
    pub name: String,
    pub kd: [f32; 3],
    pub ks: [f32; 3],
    pub shininess: f32,
    /// 1.0 is fully opaque
    pub transparency: f32,
    pub diffuse_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kd: [1.0; 3],
            ks: [0.0; 3],
            shininess: 1.0,
            transparency: 1.0,
            diffuse_texture: None,
            normal_texture: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(positions: Vec<[f32; 3]>) -> ImportedMesh {
        ImportedMesh {
            name: "m".into(),
            positions,
            normals: vec![],
            uvs: vec![],
            tangents: vec![],
            bitangents: vec![],
            indices: vec![],
            material_index: None,
        }
    }

    #[test]
    fn bounds_union_across_meshes() {
        let result = ImportResult {
            meshes: vec![
                mesh(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]),
                mesh(vec![[-2.0, 0.5, 0.0]]),
            ],
            ..Default::default()
        };
        let b = result.bounds().unwrap();
        assert_eq!(b.min, [-2.0, 0.0, 0.0]);
        assert_eq!(b.max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn normalize_fits_unit_cube() {
        let mut result = ImportResult {
            meshes: vec![mesh(vec![[10.0, 10.0, 10.0], [14.0, 12.0, 10.0]])],
            ..Default::default()
        };
        result.normalize();
        let b = result.bounds().unwrap();
        assert!((b.min[0] + 1.0).abs() < 1e-6);
        assert!((b.max[0] - 1.0).abs() < 1e-6);
        assert!((b.max[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(mesh(vec![]).bounds().is_none());
    }
}
