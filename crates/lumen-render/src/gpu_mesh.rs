//! GPU meshes: vertex/index buffers, material uniforms, and texture bindings
//! for one drawable submesh

use crate::pipeline::MeshUniforms;
use crate::primitives::Mesh;
use crate::texture_cache::{GpuTexture, TextureCache, TextureKind};
use glam::{Mat4, Vec3};
use lumen_import::{ImportResult, ImportedMaterial};
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Offset of an attached character from the camera it follows
pub const DEFAULT_CHARACTER_OFFSET: Vec3 = Vec3::new(0.0, -3.5, 0.0);

/// Textures bound for one mesh
pub struct MeshTextures {
    pub albedo: Arc<GpuTexture>,
    pub normal_map: Option<Arc<GpuTexture>>,
}

/// A single GPU-resident mesh with its material data
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub material: ImportedMaterial,
    pub model: Mat4,
    pub has_texture_coords: bool,
    /// Skipped by the main pass while looking through the fly camera
    pub hidden_in_first_person: bool,
    textures: MeshTextures,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        mesh: &Mesh,
        material: ImportedMaterial,
        has_texture_coords: bool,
        textures: MeshTextures,
        default_normal: &GpuTexture,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut uniforms = mesh_uniforms(&material, Mat4::IDENTITY, has_texture_coords);
        uniforms.has_normal_map = textures.normal_map.is_some() as u32;
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Mesh Uniforms", name)),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let normal = textures.normal_map.as_deref().unwrap_or(default_normal);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures.albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&textures.albedo.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&normal.sampler),
                },
            ],
            label: Some(&format!("{} Mesh Bind Group", name)),
        });

        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            material,
            model: Mat4::IDENTITY,
            has_texture_coords,
            hidden_in_first_person: false,
            textures,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn has_normal_map(&self) -> bool {
        self.textures.normal_map.is_some()
    }

    pub fn uniforms(&self) -> MeshUniforms {
        let mut uniforms = mesh_uniforms(&self.material, self.model, self.has_texture_coords);
        uniforms.has_normal_map = self.has_normal_map() as u32;
        uniforms
    }

    /// Upload the current model matrix and material
    pub fn write_uniforms(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms()]));
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Issue the indexed draw. Pipeline and bind groups are set by the caller.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.model = Mat4::from_translation(offset) * self.model;
    }

    /// Place the mesh relative to a camera, turned to face its heading
    pub fn attach_to_camera(&mut self, position: Vec3, forward: Vec3, offset: Vec3) {
        self.model = attached_transform(position, forward, offset);
    }
}

fn mesh_uniforms(material: &ImportedMaterial, model: Mat4, has_texture_coords: bool) -> MeshUniforms {
    MeshUniforms {
        model: model.to_cols_array_2d(),
        normal_matrix: MeshUniforms::normal_matrix(model).to_cols_array_2d(),
        kd: [material.kd[0], material.kd[1], material.kd[2], 1.0],
        ks: [material.ks[0], material.ks[1], material.ks[2], 1.0],
        shininess: material.shininess,
        transparency: material.transparency,
        has_tex_coords: has_texture_coords as u32,
        has_normal_map: 0,
    }
}

/// Model matrix of something carried by a camera: yawed to the camera's
/// heading, then pushed out by `offset` in that rotated frame
pub fn attached_transform(position: Vec3, forward: Vec3, offset: Vec3) -> Mat4 {
    let yaw = forward.x.atan2(forward.z);
    Mat4::from_translation(position) * Mat4::from_rotation_y(yaw) * Mat4::from_translation(offset)
}

/// Upload every submesh of an import. Textured meshes take their material's
/// albedo, or the cache's fallback albedo when it names none.
pub fn upload_all(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    import: &ImportResult,
    textures: &mut TextureCache,
) -> Vec<GpuMesh> {
    import
        .meshes
        .iter()
        .map(|imported| {
            let material = import.material_for(imported).cloned().unwrap_or_default();
            let has_texture_coords = imported.has_texture_coords();

            let mesh_textures = if has_texture_coords {
                let albedo = material
                    .diffuse_texture
                    .as_ref()
                    .and_then(|r| textures.resolve(device, queue, r, import, TextureKind::Color))
                    .unwrap_or_else(|| textures.fallback_albedo.clone());
                let normal_map = material
                    .normal_texture
                    .as_ref()
                    .and_then(|r| textures.resolve(device, queue, r, import, TextureKind::Linear));
                MeshTextures { albedo, normal_map }
            } else {
                MeshTextures {
                    albedo: textures.default_white.clone(),
                    normal_map: None,
                }
            };

            let name = format!("{}/{}", import.name, imported.name);
            let default_normal = textures.default_normal.clone();
            GpuMesh::new(
                device,
                layout,
                &name,
                &Mesh::from_imported(imported),
                material,
                has_texture_coords,
                mesh_textures,
                &default_normal,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn attached_mesh_sits_below_camera() {
        let m = attached_transform(Vec3::new(1.0, 2.0, 3.0), Vec3::Z, DEFAULT_CHARACTER_OFFSET);
        assert!(close(m.transform_point3(Vec3::ZERO), Vec3::new(1.0, -1.5, 3.0)));
    }

    #[test]
    fn attached_mesh_turns_with_heading() {
        let m = attached_transform(Vec3::ZERO, Vec3::X, Vec3::new(0.0, 0.0, 1.0));
        assert!(close(m.transform_point3(Vec3::ZERO), Vec3::X));
    }

    #[test]
    fn uniforms_carry_material() {
        let material = ImportedMaterial {
            kd: [0.5, 0.25, 1.0],
            shininess: 32.0,
            ..Default::default()
        };
        let u = mesh_uniforms(&material, Mat4::IDENTITY, false);
        assert_eq!(u.kd, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(u.shininess, 32.0);
        assert_eq!(u.has_tex_coords, 0);
    }
}
