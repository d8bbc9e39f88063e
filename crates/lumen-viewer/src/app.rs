//! Viewer application implementing winit's `ApplicationHandler`
//!
//! Owns the window, the GPU state, the egui overlay and all UI-editable
//! scene state. One redraw runs the control panel, advances cameras and
//! animation, renders the frame, then paints the panel on top.

use crate::config::ViewerConfig;
use crate::input::InputState;
use crate::panels::{control_panel, ControlPanelView};
use anyhow::{Context, Result};
use glam::Vec2;
use lumen_core::GameClock;
use lumen_import::{import_meshes, ImportOptions};
use lumen_render::{
    cubemap_face_paths, load_cubemap, upload_all, CameraMode, CameraRig, FlyController, FrameInputs,
    FrameRenderer, FrameTarget, LightManager, RenderContext, RendererConfig, Scene, SceneState,
    ShadowCastingLight, TextureCache,
};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

/// Fixed simulation step in seconds
const FIXED_TIMESTEP: f64 = 0.016;

/// Everything that needs a live device
struct GpuState {
    context: RenderContext,
    renderer: FrameRenderer,
    scene: Scene,
    /// Held so shared mesh textures outlive the upload
    _textures: TextureCache,
}

pub struct LumenApp {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,

    egui_ctx: egui::Context,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,

    input: InputState,
    clock: GameClock,
    state: SceneState,
    renderer_config: RendererConfig,
    rig: CameraRig,
    /// Movement of the selected light in light camera mode
    light_controller: FlyController,
    lights: LightManager,
    startup_error: Option<anyhow::Error>,
}

impl LumenApp {
    pub fn new(config: ViewerConfig) -> Self {
        let lights = config
            .initial_lights()
            .into_iter()
            .map(|(position, color)| ShadowCastingLight::new(position, color))
            .collect();
        let lights = LightManager::new(lights, config.shadow_resolution);
        let state = config.scene_state();
        let renderer_config = config.renderer_config();

        Self {
            config,
            window: None,
            gpu: None,
            egui_ctx: egui::Context::default(),
            egui_winit: None,
            egui_renderer: None,
            input: InputState::new(),
            clock: GameClock::with_fixed_timestep_secs(FIXED_TIMESTEP),
            state,
            renderer_config,
            rig: CameraRig::default(),
            light_controller: FlyController::default(),
            lights,
            startup_error: None,
        }
    }

    /// The error that stopped startup, if any
    pub fn take_startup_error(&mut self) -> Option<anyhow::Error> {
        self.startup_error.take()
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        let window_attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );
        if window_config.fullscreen {
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let context = pollster::block_on(RenderContext::new(window.clone()))
            .context("Failed to initialize GPU")?;
        let device = &context.device;
        let queue = &context.queue;

        let mut textures = TextureCache::new(device, queue);
        if let Some(path) = &self.config.fallback_albedo {
            textures.set_fallback_albedo(device, queue, &self.config.resource_path(path));
        }

        let skybox_dir = self.config.resource_path(&self.config.skybox.directory);
        let cubemap = load_cubemap(
            device,
            queue,
            &cubemap_face_paths(&skybox_dir, &self.config.skybox.extension),
        );

        let renderer = FrameRenderer::new(
            device,
            context.config.format,
            context.config.width,
            context.config.height,
            &cubemap,
        )
        .context("Failed to build render pipelines")?;

        let options = ImportOptions {
            normalize: self.config.normalize_scene,
        };
        let scene_path = self.config.resource_path(&self.config.scene);
        let import = import_meshes(&scene_path, options)
            .with_context(|| format!("Failed to load scene mesh {}", scene_path.display()))?;
        let mut scene = Scene::new();
        scene.add_meshes(upload_all(
            device,
            queue,
            renderer.mesh_bind_group_layout(),
            &import,
            &mut textures,
        ));

        if let Some(character) = &self.config.character {
            let path = self.config.resource_path(character);
            match import_meshes(&path, ImportOptions::default()) {
                Ok(import) => {
                    let range = scene.add_meshes(upload_all(
                        device,
                        queue,
                        renderer.mesh_bind_group_layout(),
                        &import,
                        &mut textures,
                    ));
                    scene.set_character(range);
                }
                Err(e) => log::warn!("Character mesh not loaded: {}", e),
            }
        }
        log::info!("Scene ready: {} meshes, {} textures", scene.len(), textures.len());

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, context.config.format, None, 1, false);

        self.window = Some(window);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        self.gpu = Some(GpuState {
            context,
            renderer,
            scene,
            _textures: textures,
        });
        Ok(())
    }

    /// Run the control panel for this frame
    fn run_ui(&mut self) -> Option<egui::FullOutput> {
        let window = self.window.clone()?;
        let egui_winit = self.egui_winit.as_mut()?;
        let raw_input = egui_winit.take_egui_input(&window);

        let state = &mut self.state;
        let config = &mut self.renderer_config;
        let rig = &mut self.rig;
        let lights = &mut self.lights;
        let frame_time = self.clock.delta_time;

        let mut full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Window::new("Window")
                .default_width(320.0)
                .show(ctx, |ui| {
                    control_panel(
                        ui,
                        ControlPanelView {
                            state: &mut *state,
                            config: &mut *config,
                            rig: &mut *rig,
                            lights: &mut *lights,
                            frame_time,
                        },
                    );
                });
        });

        egui_winit.handle_platform_output(&window, std::mem::take(&mut full_output.platform_output));
        Some(full_output)
    }

    /// Advance cameras, animation and the fixed-step clock
    fn update(&mut self) -> u32 {
        self.clock.tick();
        let steps = self.clock.take_fixed_steps();

        let input = self.input.take_fly_input();
        match self.state.camera_mode {
            CameraMode::Light => {
                let pose = &mut self.lights.selected_light_mut().pose;
                self.light_controller.apply(pose, &input);
            }
            _ => self.rig.update_fly(&input),
        }

        self.state
            .animate_curve_light(&mut self.lights, self.clock.total_time as f32);
        steps
    }

    fn redraw(&mut self) {
        let ui_output = self.run_ui();
        let steps = self.update();

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.scene
            .attach_character(&self.rig.fly, self.state.character_offset);
        gpu.renderer.advance_cube(steps, &self.state.cube);
        if self.state.take_curve_redraw() {
            gpu.renderer.resample_curve(&gpu.context.device, &self.state.curve);
        }

        let output = match gpu.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated; reconfiguring");
                gpu.context.reconfigure();
                return;
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let target = FrameTarget {
            color: &view,
            depth: &gpu.context.depth_view,
            width: gpu.context.config.width,
            height: gpu.context.config.height,
        };
        gpu.renderer.render(
            &gpu.context.device,
            &gpu.context.queue,
            &target,
            &mut self.lights,
            FrameInputs {
                scene: &gpu.scene,
                state: &self.state,
                config: &self.renderer_config,
                rig: &self.rig,
            },
        );

        if let Some(full_output) = ui_output {
            self.paint_ui(full_output, &view);
        }
        output.present();
    }

    fn paint_ui(&mut self, full_output: egui::FullOutput, target_view: &wgpu::TextureView) {
        let (Some(gpu), Some(egui_renderer)) = (self.gpu.as_ref(), self.egui_renderer.as_mut()) else {
            return;
        };
        let context = &gpu.context;

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [context.config.width, context.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui Encoder"),
            });
        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(&context.device, &context.queue, *id, image_delta);
        }
        egui_renderer.update_buffers(
            &context.device,
            &context.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyM => self.state.show_minimap = !self.state.show_minimap,
            KeyCode::KeyV => self.state.camera_mode = self.state.camera_mode.toggled_view(),
            KeyCode::Digit1 => self.state.camera_mode = CameraMode::Fly,
            KeyCode::Digit2 => self.state.camera_mode = CameraMode::ThirdPerson,
            KeyCode::Digit3 => self.state.camera_mode = CameraMode::Minimap,
            KeyCode::Digit4 => self.state.camera_mode = CameraMode::Light,
            KeyCode::F11 => {
                if let Some(window) = &self.window {
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                    } else {
                        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                    }
                }
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for LumenApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.startup_error.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            log::error!("Startup failed: {:#}", e);
            self.startup_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let consumed = match (&mut self.egui_winit, &self.window) {
            (Some(egui_winit), Some(window)) => egui_winit.on_window_event(window, &event).consumed,
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.context.resize(new_size);
                    gpu.renderer
                        .resize(&gpu.context.device, new_size.width, new_size.height);
                }
            }

            WindowEvent::Focused(false) => self.input.clear(),

            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed if !consumed => {
                        if !event.repeat {
                            self.handle_key(event_loop, key);
                        }
                        self.input.process_key_down(key);
                    }
                    ElementState::Pressed => {}
                    ElementState::Released => self.input.process_key_up(key),
                }
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    if !consumed && !self.egui_ctx.wants_pointer_input() {
                        self.input.set_look_button(true);
                    }
                }
                ElementState::Released => self.input.set_look_button(false),
            },

            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .process_cursor_move(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
