//! Light manager: the ordered light list, the selection cursor, the packed
//! GPU light buffer, and the shadow pass over every light.
//!
//! Binary layout of the packed buffer (group 2, binding 0 of the scene
//! pipeline):
//!
//! ```text
//! offset 0   i32 count
//! offset 4   12 bytes padding
//! offset 16  count x { vec4 position; vec4 color; mat4 light_space }  (96 bytes each)
//! ```

use crate::context::create_depth_texture;
use crate::frame::{FrameEncoder, PassTarget, Viewport};
use crate::gpu_mesh::GpuMesh;
use crate::light::ShadowCastingLight;
use crate::shadow::ShadowPipeline;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

/// Lights beyond this index are still shadow-rendered but not shaded
pub const MAX_SHADED_LIGHTS: usize = 10;
/// First binding of the shadow map range in the light bind group
pub const SHADOW_MAP_BASE_BINDING: u32 = 2;
pub const DEFAULT_SHADOW_RESOLUTION: u32 = 1024;

pub const LIGHT_HEADER_SIZE: usize = 16;
pub const LIGHT_RECORD_SIZE: usize = 96;

pub const DEFAULT_LIGHT_POSITION: Vec3 = Vec3::new(6.0, 3.0, -10.0);
pub const DEFAULT_LIGHT_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.0);
/// Where "Add Light" places a new light
pub const NEW_LIGHT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 3.0);
pub const NEW_LIGHT_COLOR: Vec4 = Vec4::ONE;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct LightBufferHeader {
    count: i32,
    _pad: [i32; 3],
}

/// One light as the shading stage sees it
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub light_space: [[f32; 4]; 4],
}

impl LightRecord {
    pub fn from_light(light: &ShadowCastingLight) -> Self {
        Self {
            position: light.position().extend(1.0).to_array(),
            color: light.color.to_array(),
            light_space: light.light_space_transform.to_cols_array_2d(),
        }
    }
}

/// CPU copy of the packed light buffer
#[derive(Debug, Clone, Default)]
pub struct PackedLightBuffer {
    bytes: Vec<u8>,
}

impl PackedLightBuffer {
    pub fn pack(lights: &[ShadowCastingLight]) -> Self {
        let header = LightBufferHeader {
            count: lights.len() as i32,
            _pad: [0; 3],
        };
        let mut bytes = Vec::with_capacity(LIGHT_HEADER_SIZE + lights.len() * LIGHT_RECORD_SIZE);
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        for light in lights {
            bytes.extend_from_slice(bytemuck::bytes_of(&LightRecord::from_light(light)));
        }
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Light count stored in the header
    pub fn count(&self) -> i32 {
        self.bytes
            .get(..4)
            .map_or(0, |b| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn record(&self, index: usize) -> Option<LightRecord> {
        let start = LIGHT_HEADER_SIZE + index * LIGHT_RECORD_SIZE;
        self.bytes
            .get(start..start + LIGHT_RECORD_SIZE)
            .map(bytemuck::pod_read_unaligned)
    }
}

/// Comparison sampler plus a 1x1 depth texture bound to unused shadow slots
pub struct ShadowSamplingResources {
    pub sampler: wgpu::Sampler,
    pub fallback_texture: wgpu::Texture,
    pub fallback_view: wgpu::TextureView,
}

impl ShadowSamplingResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let (fallback_texture, fallback_view) =
            create_depth_texture(device, 1, 1, "Unused Shadow Slot");
        Self {
            sampler,
            fallback_texture,
            fallback_view,
        }
    }
}

struct LightGpuState {
    buffer: wgpu::Buffer,
    len: usize,
    bind_group: wgpu::BindGroup,
}

pub struct LightManager {
    lights: Vec<ShadowCastingLight>,
    selected: usize,
    shadow_resolution: u32,
    packed: PackedLightBuffer,
    gpu: Option<LightGpuState>,
    /// Shadow map views changed since the bind group was built
    bindings_dirty: bool,
    warned_over_limit: bool,
    /// Bumped every time the light bind group is recreated
    bind_group_generation: u64,
}

impl LightManager {
    /// Manager over `lights`; an empty list gets the default light
    pub fn new(lights: Vec<ShadowCastingLight>, shadow_resolution: u32) -> Self {
        let mut lights = lights;
        if lights.is_empty() {
            lights.push(ShadowCastingLight::new(DEFAULT_LIGHT_POSITION, DEFAULT_LIGHT_COLOR));
        }
        let packed = PackedLightBuffer::pack(&lights);
        Self {
            lights,
            selected: 0,
            shadow_resolution: shadow_resolution.max(1),
            packed,
            gpu: None,
            bindings_dirty: true,
            warned_over_limit: false,
            bind_group_generation: 0,
        }
    }

    pub fn with_default_light(shadow_resolution: u32) -> Self {
        Self::new(Vec::new(), shadow_resolution)
    }

    /// Append a light and select it
    pub fn add_light(&mut self, position: Vec3, color: Vec4) {
        self.lights.push(ShadowCastingLight::new(position, color));
        self.selected = self.lights.len() - 1;
        self.bindings_dirty = true;
    }

    /// Remove the selected light and reset the selection to 0. Refused when
    /// only one light remains.
    pub fn remove_selected(&mut self) -> bool {
        if self.lights.len() <= 1 {
            return false;
        }
        self.lights.remove(self.selected);
        self.selected = 0;
        self.bindings_dirty = true;
        true
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.lights.len() - 1);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_light(&self) -> &ShadowCastingLight {
        &self.lights[self.selected]
    }

    pub fn selected_light_mut(&mut self) -> &mut ShadowCastingLight {
        &mut self.lights[self.selected]
    }

    pub fn lights(&self) -> &[ShadowCastingLight] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [ShadowCastingLight] {
        &mut self.lights
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.shadow_resolution
    }

    pub fn set_shadow_resolution(&mut self, resolution: u32) {
        let resolution = resolution.max(1);
        if resolution != self.shadow_resolution {
            self.shadow_resolution = resolution;
            self.bindings_dirty = true;
        }
    }

    /// The last packed buffer
    pub fn packed(&self) -> &PackedLightBuffer {
        &self.packed
    }

    /// One `vec4` position per light, for the marker pass
    pub fn marker_vertices(&self) -> Vec<[f32; 4]> {
        self.lights
            .iter()
            .map(|light| light.position().extend(1.0).to_array())
            .collect()
    }

    /// Bind group for group 2 of the scene pipeline, once built
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }

    pub fn bind_group_generation(&self) -> u64 {
        self.bind_group_generation
    }

    fn prepare_shadow_maps(&mut self, device: &wgpu::Device) {
        for light in &mut self.lights {
            light.ensure_shadow_map(device, self.shadow_resolution);
        }
    }

    /// Render every light's shadow map in index order.
    ///
    /// The frame's tracked target and viewport are restored afterward and
    /// the surface is flagged for a clear.
    pub fn render_all_shadow_maps(
        &mut self,
        device: &wgpu::Device,
        frame: &mut FrameEncoder,
        pipeline: &ShadowPipeline,
        projection: Mat4,
        scene_model: Mat4,
        meshes: &[&GpuMesh],
    ) {
        let saved = frame.state();
        self.prepare_shadow_maps(device);

        let resolution = self.shadow_resolution;
        for (i, light) in self.lights.iter_mut().enumerate() {
            frame.set_target(PassTarget::ShadowMap(i), Viewport::full(resolution, resolution));
            light.render_shadow_map(
                device,
                frame.encoder(),
                pipeline,
                projection,
                scene_model,
                meshes,
                resolution,
            );
        }

        frame.set_state(saved);
        frame.request_surface_clear();
    }

    /// Repack the light list and upload it, reallocating the GPU buffer and
    /// rebuilding the bind group when the byte length changes.
    pub fn rebuild_shading_buffer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampling: &ShadowSamplingResources,
    ) {
        if self.lights.len() > MAX_SHADED_LIGHTS && !self.warned_over_limit {
            log::warn!(
                "{} lights exceed the shading limit of {}; extra lights are not shaded",
                self.lights.len(),
                MAX_SHADED_LIGHTS
            );
            self.warned_over_limit = true;
        }

        self.prepare_shadow_maps(device);
        self.packed = PackedLightBuffer::pack(&self.lights);
        let len = self.packed.len();

        if let Some(gpu) = self.gpu.as_ref().filter(|gpu| gpu.len == len) {
            if !self.bindings_dirty {
                queue.write_buffer(&gpu.buffer, 0, self.packed.as_bytes());
                return;
            }
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Packed Light Buffer"),
            contents: self.packed.as_bytes(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let shadow_views: Vec<&wgpu::TextureView> = (0..MAX_SHADED_LIGHTS)
            .map(|i| {
                self.lights
                    .get(i)
                    .and_then(|light| light.shadow_map())
                    .map_or(&sampling.fallback_view, |map| &map.view)
            })
            .collect();

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampling.sampler),
            },
        ];
        entries.extend(shadow_views.iter().enumerate().map(|(i, view)| wgpu::BindGroupEntry {
            binding: SHADOW_MAP_BASE_BINDING + i as u32,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &entries,
            label: Some("Light Bind Group"),
        });

        log::debug!("Light buffer reallocated: {} lights, {} bytes", self.lights.len(), len);
        self.gpu = Some(LightGpuState {
            buffer,
            len,
            bind_group,
        });
        self.bindings_dirty = false;
        self.bind_group_generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PassState;
    use crate::headless::HeadlessContext;

    #[test]
    fn record_layout_is_96_bytes() {
        assert_eq!(std::mem::size_of::<LightRecord>(), LIGHT_RECORD_SIZE);
        assert_eq!(std::mem::size_of::<LightBufferHeader>(), LIGHT_HEADER_SIZE);
    }

    #[test]
    fn packed_length_tracks_light_count() {
        for n in 1..=12 {
            let lights: Vec<_> = (0..n)
                .map(|i| ShadowCastingLight::new(Vec3::splat(i as f32), Vec4::ONE))
                .collect();
            let packed = PackedLightBuffer::pack(&lights);
            assert_eq!(packed.len(), LIGHT_HEADER_SIZE + n * LIGHT_RECORD_SIZE);
            assert_eq!(packed.count(), n as i32);
        }
    }

    #[test]
    fn record_carries_position_with_unit_w() {
        let packed = PackedLightBuffer::pack(&[ShadowCastingLight::new(
            Vec3::new(6.0, 3.0, -10.0),
            Vec4::new(0.2, 0.4, 0.6, 0.0),
        )]);
        let record = packed.record(0).expect("one record");
        assert_eq!(record.position, [6.0, 3.0, -10.0, 1.0]);
        assert_eq!(record.color, [0.2, 0.4, 0.6, 0.0]);
        assert!(packed.record(1).is_none());
    }

    #[test]
    fn removing_last_light_is_refused() {
        let mut manager = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        assert!(!manager.remove_selected());
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.selected(), 0);
    }

    #[test]
    fn adding_selects_new_light() {
        let mut manager = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        for n in 2..6 {
            manager.add_light(NEW_LIGHT_POSITION, NEW_LIGHT_COLOR);
            assert_eq!(manager.len(), n);
            assert_eq!(manager.selected(), n - 1);
        }
    }

    #[test]
    fn select_clamps_to_last_light() {
        let mut manager = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        manager.add_light(NEW_LIGHT_POSITION, NEW_LIGHT_COLOR);
        manager.select(7);
        assert_eq!(manager.selected(), 1);
    }

    #[test]
    fn add_recolor_remove_scenario() {
        let mut manager = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        assert_eq!(manager.selected_light().position(), DEFAULT_LIGHT_POSITION);

        manager.add_light(Vec3::new(0.0, 0.0, 3.0), Vec4::ONE);
        assert_eq!((manager.len(), manager.selected()), (2, 1));

        manager.selected_light_mut().color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let packed = PackedLightBuffer::pack(manager.lights());
        assert_eq!(packed.record(1).map(|r| r.color), Some([1.0, 0.0, 0.0, 1.0]));

        manager.select(0);
        assert!(manager.remove_selected());
        assert_eq!((manager.len(), manager.selected()), (1, 0));
        assert_eq!(manager.selected_light().color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn marker_vertices_follow_lights() {
        let mut manager = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        manager.add_light(Vec3::new(1.0, 2.0, 3.0), Vec4::ONE);
        assert_eq!(
            manager.marker_vertices(),
            vec![[6.0, 3.0, -10.0, 1.0], [1.0, 2.0, 3.0, 1.0]]
        );
    }

    #[test]
    fn shadow_pass_restores_frame_state() {
        let Ok(ctx) = pollster::block_on(HeadlessContext::new(64, 32)) else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        let pipeline = ShadowPipeline::new(&ctx.device);
        let mut manager = LightManager::with_default_light(32);
        manager.add_light(NEW_LIGHT_POSITION, NEW_LIGHT_COLOR);

        let target = ctx.target();
        let mut frame = FrameEncoder::new(&ctx.device, &target);
        let custom = PassState {
            viewport: Viewport {
                x: 4.0,
                y: 2.0,
                width: 20.0,
                height: 10.0,
            },
            target: PassTarget::Surface,
        };
        frame.set_state(custom);

        let projection = crate::camera::perspective(2.0);
        manager.render_all_shadow_maps(&ctx.device, &mut frame, &pipeline, projection, Mat4::IDENTITY, &[]);

        assert_eq!(frame.state(), custom);
        assert!(frame.surface_clear_pending());
        assert!(manager.lights().iter().all(|l| l.shadow_map().is_some()));
        assert_ne!(manager.lights()[0].light_space_transform, Mat4::IDENTITY);
        ctx.queue.submit(std::iter::once(frame.finish(&target)));
    }

    #[test]
    fn shadow_resolution_change_reallocates_maps_and_bindings() {
        let Ok(ctx) = pollster::block_on(HeadlessContext::new(64, 32)) else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };
        let shadow_pipeline = ShadowPipeline::new(&ctx.device);
        let scene_pipeline = crate::pipeline::ScenePipeline::new(&ctx.device, ctx.format);
        let sampling = ShadowSamplingResources::new(&ctx.device);
        let mut manager = LightManager::with_default_light(64);
        manager.add_light(NEW_LIGHT_POSITION, NEW_LIGHT_COLOR);

        let render = |manager: &mut LightManager| {
            let target = ctx.target();
            let mut frame = FrameEncoder::new(&ctx.device, &target);
            let projection = crate::camera::perspective(2.0);
            manager.render_all_shadow_maps(&ctx.device, &mut frame, &shadow_pipeline, projection, Mat4::IDENTITY, &[]);
            manager.rebuild_shading_buffer(&ctx.device, &ctx.queue, &scene_pipeline.light_bind_group_layout, &sampling);
            ctx.queue.submit(std::iter::once(frame.finish(&target)));
        };

        render(&mut manager);
        let first = manager.bind_group_generation();
        assert!(manager.lights().iter().all(|l| l.shadow_map().map(|m| m.resolution) == Some(64)));

        render(&mut manager);
        assert_eq!(manager.bind_group_generation(), first);

        manager.set_shadow_resolution(128);
        render(&mut manager);
        assert!(manager.bind_group_generation() > first);
        for light in manager.lights() {
            let map = light.shadow_map().expect("allocated by the shadow pass");
            assert_eq!(map.resolution, 128);
            assert_eq!(map.texture.width(), 128);
            assert_eq!(map.texture.height(), 128);
        }
    }
}
