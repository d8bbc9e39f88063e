//! Shadow-casting lights
//!
//! A light is posed like a camera and owns a depth-only render target. Each
//! frame it renders the scene's depth from its own point of view and keeps
//! the light-space transform used to produce it, so the main pass can
//! compare fragment depths against the stored map.

use crate::camera::CameraPose;
use crate::context::create_depth_texture;
use crate::gpu_mesh::GpuMesh;
use crate::shadow::{ShadowDrawUniforms, ShadowPipeline};
use glam::{Mat4, Vec3, Vec4};

/// Depth target a light renders its shadow map into
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub resolution: u32,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let (texture, view) = create_depth_texture(device, resolution, resolution, "Light Shadow Map");
        Self {
            texture,
            view,
            resolution: resolution.max(1),
        }
    }
}

pub struct ShadowCastingLight {
    pub pose: CameraPose,
    /// RGB plus an unused alpha
    pub color: Vec4,
    /// Projection x light view x scene model from the last shadow pass
    pub light_space_transform: Mat4,
    shadow_map: Option<ShadowMap>,
}

impl ShadowCastingLight {
    /// CPU-side light; its shadow map is allocated on first use
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            pose: CameraPose::new(position),
            color,
            light_space_transform: Mat4::IDENTITY,
            shadow_map: None,
        }
    }

    /// Light with its `resolution x resolution` depth target allocated
    pub fn create(device: &wgpu::Device, position: Vec3, color: Vec4, resolution: u32) -> Self {
        let mut light = Self::new(position, color);
        light.shadow_map = Some(ShadowMap::new(device, resolution));
        light
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.pose.view_matrix()
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    /// Allocate the depth target if it is missing or has the wrong size
    pub fn ensure_shadow_map(&mut self, device: &wgpu::Device, resolution: u32) -> &ShadowMap {
        if self
            .shadow_map
            .as_ref()
            .is_some_and(|map| map.resolution != resolution.max(1))
        {
            self.shadow_map = None;
        }
        self.shadow_map.get_or_insert_with(|| ShadowMap::new(device, resolution))
    }

    /// UI list text: each channel cut to five characters
    pub fn label(&self) -> String {
        let channel = |v: f32| {
            let mut text = format!("{:.6}", v);
            text.truncate(5);
            text
        };
        format!(
            "|R {} |G {} |B {}",
            channel(self.color.x),
            channel(self.color.y),
            channel(self.color.z)
        )
    }

    /// Record this light's depth pass into `encoder`.
    ///
    /// Updates `light_space_transform`, clears the depth target to far, and
    /// draws every mesh with its own model matrix composed onto the
    /// light-space transform.
    #[allow(clippy::too_many_arguments)]
    pub fn render_shadow_map(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &ShadowPipeline,
        projection: Mat4,
        scene_model: Mat4,
        meshes: &[&GpuMesh],
        resolution: u32,
    ) {
        debug_assert!(
            self.shadow_map.is_some(),
            "shadow map rendered before its target was allocated"
        );
        self.light_space_transform =
            compute_light_space_transform(projection, self.view_matrix(), scene_model);
        let light_space = self.light_space_transform;

        let bind_groups: Vec<wgpu::BindGroup> = meshes
            .iter()
            .map(|mesh| pipeline.draw_bind_group(device, ShadowDrawUniforms::new(light_space, mesh.model)))
            .collect();

        let shadow_map = self.ensure_shadow_map(device, resolution);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Light Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let size = shadow_map.resolution as f32;
        pass.set_viewport(0.0, 0.0, size, size, 0.0, 1.0);
        pass.set_pipeline(&pipeline.pipeline);
        for (mesh, bind_group) in meshes.iter().zip(&bind_groups) {
            pass.set_bind_group(0, bind_group, &[]);
            mesh.draw(&mut pass);
        }
    }
}

/// `projection x view x scene_model`
pub fn compute_light_space_transform(projection: Mat4, light_view: Mat4, scene_model: Mat4) -> Mat4 {
    projection * light_view * scene_model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{perspective, START_LOOK_AT};
    use crate::gpu_mesh::MeshTextures;
    use crate::headless::HeadlessContext;
    use crate::pipeline::ScenePipeline;
    use crate::primitives::create_box_mesh;
    use crate::shadow::ShadowPipeline;
    use crate::texture_cache::TextureCache;
    use lumen_import::ImportedMaterial;

    fn headless() -> Option<HeadlessContext> {
        match pollster::block_on(HeadlessContext::new(32, 32)) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("no GPU adapter available, skipping: {}", e);
                None
            }
        }
    }

    #[test]
    fn new_light_faces_default_direction() {
        let light = ShadowCastingLight::new(Vec3::new(6.0, 3.0, -10.0), Vec4::ONE);
        assert_eq!(light.pose.forward, START_LOOK_AT.normalize());
        assert_eq!(light.pose.up, Vec3::Y);
        assert!(light.shadow_map().is_none());
    }

    #[test]
    fn label_truncates_channels() {
        let light = ShadowCastingLight::new(Vec3::ZERO, Vec4::new(1.0, 0.5, 0.123456, 1.0));
        assert_eq!(light.label(), "|R 1.000 |G 0.500 |B 0.123");
    }

    #[test]
    fn create_allocates_square_depth_target() {
        let Some(ctx) = headless() else {
            return;
        };
        let light = ShadowCastingLight::create(&ctx.device, Vec3::new(6.0, 3.0, -10.0), Vec4::ONE, 64);
        let map = light.shadow_map().expect("allocated on create");
        assert_eq!(map.resolution, 64);
        assert_eq!((map.texture.width(), map.texture.height()), (64, 64));
        assert_eq!(map.texture.format(), wgpu::TextureFormat::Depth32Float);
        assert_eq!(light.position(), Vec3::new(6.0, 3.0, -10.0));
    }

    #[test]
    fn ensure_shadow_map_reallocates_only_on_resize() {
        let Some(ctx) = headless() else {
            return;
        };
        let mut light = ShadowCastingLight::new(Vec3::ZERO, Vec4::ONE);
        assert_eq!(light.ensure_shadow_map(&ctx.device, 64).resolution, 64);
        assert_eq!(light.ensure_shadow_map(&ctx.device, 64).resolution, 64);
        let map = light.ensure_shadow_map(&ctx.device, 128);
        assert_eq!((map.resolution, map.texture.width()), (128, 128));
    }

    #[test]
    fn repeated_shadow_renders_store_same_transform() {
        let Some(ctx) = headless() else {
            return;
        };
        let scene_pipeline = ScenePipeline::new(&ctx.device, ctx.format);
        let shadow_pipeline = ShadowPipeline::new(&ctx.device);
        let textures = TextureCache::new(&ctx.device, &ctx.queue);
        let mut floor = GpuMesh::new(
            &ctx.device,
            &scene_pipeline.mesh_bind_group_layout,
            "floor",
            &create_box_mesh(4.0),
            ImportedMaterial::default(),
            false,
            MeshTextures {
                albedo: textures.default_white.clone(),
                normal_map: None,
            },
            &textures.default_normal,
        );
        floor.translate(Vec3::new(0.0, 0.0, 8.0));
        let meshes = [&floor];

        let mut light = ShadowCastingLight::create(&ctx.device, Vec3::new(6.0, 3.0, -10.0), Vec4::ONE, 64);
        let projection = perspective(16.0 / 9.0);
        let render = |light: &mut ShadowCastingLight| {
            let mut encoder = ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            light.render_shadow_map(&ctx.device, &mut encoder, &shadow_pipeline, projection, Mat4::IDENTITY, &meshes, 64);
            ctx.queue.submit(std::iter::once(encoder.finish()));
            light.light_space_transform
        };

        let first = render(&mut light);
        let second = render(&mut light);
        assert_eq!(first, second);
        assert_eq!(
            first,
            compute_light_space_transform(projection, light.view_matrix(), Mat4::IDENTITY)
        );
    }

    #[test]
    fn light_space_maps_point_ahead_into_clip_volume() {
        let light = ShadowCastingLight::new(Vec3::ZERO, Vec4::ONE);
        let m = compute_light_space_transform(perspective(1.0), light.view_matrix(), Mat4::IDENTITY);
        let clip = m * Vec4::new(0.0, 0.0, 10.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
