//! Per-frame orchestration: shadow pass, shading-data refresh, main pass,
//! then minimap, light markers, skybox, cube and curve overlays.

use crate::camera::{minimap_orthographic, CameraRig, FrameView};
use crate::context::{with_validation, RenderError};
use crate::cube_pipeline::{CubePipeline, CubeSettings};
use crate::frame::{FrameEncoder, FrameTarget, PassTarget, Viewport};
use crate::gpu_mesh::GpuMesh;
use crate::light_manager::{LightManager, ShadowSamplingResources};
use crate::minimap::Minimap;
use crate::overlay_pipeline::OverlayPipeline;
use crate::pipeline::{ScenePipeline, ViewBinding};
use crate::scene::{RendererConfig, Scene, SceneState};
use crate::shadow::ShadowPipeline;
use crate::skybox_pipeline::SkyboxPipeline;
use crate::texture_cache::GpuTexture;
use glam::Mat4;
use lumen_core::{BezierCurve, DEFAULT_SAMPLE_STEP};

/// Read-only state one frame is rendered from
pub struct FrameInputs<'a> {
    pub scene: &'a Scene,
    pub state: &'a SceneState,
    pub config: &'a RendererConfig,
    pub rig: &'a CameraRig,
}

/// Owns every pipeline and per-view binding used to draw a frame
pub struct FrameRenderer {
    scene_pipeline: ScenePipeline,
    shadow_pipeline: ShadowPipeline,
    sampling: ShadowSamplingResources,
    main_view: ViewBinding,
    minimap_view: ViewBinding,
    minimap: Minimap,
    skybox: SkyboxPipeline,
    cube: CubePipeline,
    overlay: OverlayPipeline,
}

impl FrameRenderer {
    /// Build all pipelines. Shader or layout errors are captured and
    /// returned instead of reaching the uncaptured error handler.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        cubemap: &GpuTexture,
    ) -> Result<Self, RenderError> {
        let renderer = with_validation(device, || {
            let scene_pipeline = ScenePipeline::new(device, format);
            let main_view = ViewBinding::new(device, &scene_pipeline.view_bind_group_layout, "Main");
            let minimap_view = ViewBinding::new(device, &scene_pipeline.view_bind_group_layout, "Minimap");
            Self {
                shadow_pipeline: ShadowPipeline::new(device),
                sampling: ShadowSamplingResources::new(device),
                minimap: Minimap::new(device, format, width, height),
                skybox: SkyboxPipeline::new(device, format, cubemap),
                cube: CubePipeline::new(device, format, cubemap),
                overlay: OverlayPipeline::new(device, format),
                main_view,
                minimap_view,
                scene_pipeline,
            }
        })?;
        log::info!("Frame renderer ready ({:?}, {}x{})", format, width, height);
        Ok(renderer)
    }

    /// Bind group layout for mesh uploads
    pub fn mesh_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.scene_pipeline.mesh_bind_group_layout
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.minimap.resize(device, width, height);
    }

    /// Advance the decorative cube by `ticks` fixed steps
    pub fn advance_cube(&mut self, ticks: u32, settings: &CubeSettings) {
        self.cube.advance(ticks, settings);
    }

    pub fn cube_angle(&self) -> f32 {
        self.cube.angle()
    }

    /// Resample the curve overlay
    pub fn resample_curve(&mut self, device: &wgpu::Device, curve: &BezierCurve) {
        self.overlay.resample_curve(device, curve, DEFAULT_SAMPLE_STEP);
    }

    /// Record and submit one frame. Returns the view the frame was drawn from.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &FrameTarget<'_>,
        lights: &mut LightManager,
        inputs: FrameInputs<'_>,
    ) -> FrameView {
        let FrameInputs {
            scene,
            state,
            config,
            rig,
        } = inputs;
        let aspect = target.aspect_ratio();
        let frame_view = rig.frame_view(
            state.camera_mode,
            aspect,
            state.minimap.ortho_height,
            &lights.selected_light().pose,
        );
        let view_proj = frame_view.view_projection();

        scene.write_uniforms(queue);
        let mut frame = FrameEncoder::new(device, target);

        // Shadow pass over every mesh, visibility flags ignored
        let casters = scene.shadow_casters();
        lights.render_all_shadow_maps(
            device,
            &mut frame,
            &self.shadow_pipeline,
            frame_view.projection,
            Mat4::IDENTITY,
            &casters,
        );

        lights.rebuild_shading_buffer(
            device,
            queue,
            &self.scene_pipeline.light_bind_group_layout,
            &self.sampling,
        );
        let Some(light_bind_group) = lights.bind_group() else {
            log::warn!("Light bind group missing; frame skipped");
            queue.submit(std::iter::once(frame.finish(target)));
            return frame_view;
        };

        self.main_view
            .write(queue, &config.view_uniforms(view_proj, frame_view.pose.position));
        self.skybox.update(queue, frame_view.view, frame_view.projection);
        self.cube
            .update(queue, view_proj, frame_view.pose.position, &state.cube);
        self.overlay.update(queue, view_proj, &frame_view.pose);

        {
            let mut pass = frame.begin_surface_pass(target, "Main Pass");
            if state.render_main_scene {
                draw_meshes(
                    &mut pass,
                    &self.scene_pipeline,
                    &self.main_view,
                    light_bind_group,
                    scene.visible_meshes(state.camera_mode),
                );
            }
        }

        if state.show_minimap {
            let minimap_pose = rig.minimap_pose();
            let projection = minimap_orthographic(state.minimap.ortho_height, self.minimap.target.aspect_ratio());
            self.minimap_view.write(
                queue,
                &config.view_uniforms(projection * minimap_pose.view_matrix(), minimap_pose.position),
            );
            self.minimap
                .update(queue, &state.minimap, rig.fly.view_matrix(), view_proj);
            self.render_minimap(&mut frame, scene, light_bind_group);
        }

        {
            let mut pass = frame.begin_surface_pass(target, "Overlay Pass");
            if state.show_minimap {
                self.minimap.draw(&mut pass);
            }
            if state.draw_light_markers {
                self.overlay.draw_markers(device, &mut pass, lights);
            }
            self.skybox.draw(&mut pass);
            if state.draw_cube {
                self.cube.draw(&mut pass);
            }
            if state.draw_curve {
                self.overlay.draw_curve(&mut pass);
            }
        }

        queue.submit(std::iter::once(frame.finish(target)));
        frame_view
    }

    /// Top-down scene into the offscreen minimap target. The tracked frame
    /// target is restored afterward.
    fn render_minimap(&self, frame: &mut FrameEncoder, scene: &Scene, light_bind_group: &wgpu::BindGroup) {
        let saved = frame.state();
        let minimap_target = &self.minimap.target;
        let viewport = Viewport::full(minimap_target.width, minimap_target.height);
        frame.set_target(PassTarget::Minimap, viewport);
        {
            let mut pass = frame.encoder().begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Minimap Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &minimap_target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &minimap_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            viewport.apply(&mut pass);
            draw_meshes(
                &mut pass,
                &self.scene_pipeline,
                &self.minimap_view,
                light_bind_group,
                scene.visible_meshes(crate::camera::CameraMode::Minimap),
            );
        }
        frame.set_state(saved);
    }
}

fn draw_meshes<'m>(
    pass: &mut wgpu::RenderPass<'_>,
    pipeline: &ScenePipeline,
    view: &ViewBinding,
    light_bind_group: &wgpu::BindGroup,
    meshes: impl Iterator<Item = &'m GpuMesh>,
) {
    pass.set_pipeline(&pipeline.pipeline);
    pass.set_bind_group(0, &view.bind_group, &[]);
    pass.set_bind_group(2, light_bind_group, &[]);
    for mesh in meshes {
        pass.set_bind_group(1, mesh.bind_group(), &[]);
        mesh.draw(pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMode;
    use crate::headless::HeadlessContext;
    use crate::light_manager::NEW_LIGHT_POSITION;
    use crate::texture_cache::load_cubemap;
    use glam::Vec4;

    fn headless() -> Option<HeadlessContext> {
        match pollster::block_on(HeadlessContext::new(64, 48)) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("no GPU adapter available, skipping: {}", e);
                None
            }
        }
    }

    #[test]
    fn renders_empty_scene_with_every_pass() {
        let Some(ctx) = headless() else {
            return;
        };
        let faces = crate::texture_cache::cubemap_face_paths(std::path::Path::new("missing-skybox"), "png");
        let cubemap = load_cubemap(&ctx.device, &ctx.queue, &faces);
        let mut renderer = FrameRenderer::new(&ctx.device, ctx.format, ctx.width, ctx.height, &cubemap)
            .expect("pipelines build");

        let mut lights = LightManager::with_default_light(64);
        lights.add_light(NEW_LIGHT_POSITION, Vec4::ONE);
        let scene = Scene::new();
        let state = SceneState::default();
        renderer.resample_curve(&ctx.device, &state.curve);
        let config = RendererConfig::default();
        let rig = CameraRig::default();

        let target = ctx.target();
        let view = renderer.render(
            &ctx.device,
            &ctx.queue,
            &target,
            &mut lights,
            FrameInputs {
                scene: &scene,
                state: &state,
                config: &config,
                rig: &rig,
            },
        );
        assert_eq!(view.mode, CameraMode::Fly);
        assert!(lights.bind_group().is_some());
        assert_eq!(lights.packed().count(), 2);

        let pixels = pollster::block_on(ctx.read_pixels()).expect("readback");
        assert_eq!(pixels.len(), (ctx.width * ctx.height * 4) as usize);
    }

    #[test]
    fn cube_advances_per_tick() {
        let Some(ctx) = headless() else {
            return;
        };
        let faces = crate::texture_cache::cubemap_face_paths(std::path::Path::new("missing-skybox"), "png");
        let cubemap = load_cubemap(&ctx.device, &ctx.queue, &faces);
        let mut renderer = FrameRenderer::new(&ctx.device, ctx.format, ctx.width, ctx.height, &cubemap)
            .expect("pipelines build");
        renderer.advance_cube(4, &CubeSettings::default());
        assert!((renderer.cube_angle() - 2.0).abs() < 1e-5);
    }
}
