//! UI-editable scene state and the flat list of draw items

use crate::camera::{CameraMode, CameraPose};
use crate::cube_pipeline::CubeSettings;
use crate::gpu_mesh::{GpuMesh, DEFAULT_CHARACTER_OFFSET};
use crate::light_manager::LightManager;
use crate::minimap::MinimapSettings;
use crate::pipeline::{ShadowMode, ViewUniforms};
use glam::{Mat4, Vec3};
use lumen_core::BezierCurve;
use std::ops::Range;

/// Shading switches the control panel edits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    pub shadow_mode: ShadowMode,
    pcf_sample_count: u32,
    /// Shade untextured meshes with their material color instead of white
    pub use_material: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadow_mode: ShadowMode::Hard,
            pcf_sample_count: 4,
            use_material: true,
        }
    }
}

impl RendererConfig {
    pub const PCF_SAMPLE_RANGE: std::ops::RangeInclusive<u32> = 1..=64;

    pub fn new(shadow_mode: ShadowMode, pcf_sample_count: u32, use_material: bool) -> Self {
        let mut config = Self {
            shadow_mode,
            use_material,
            ..Default::default()
        };
        config.set_pcf_sample_count(pcf_sample_count);
        config
    }

    pub fn pcf_sample_count(&self) -> u32 {
        self.pcf_sample_count
    }

    pub fn set_pcf_sample_count(&mut self, count: u32) {
        self.pcf_sample_count = count.clamp(*Self::PCF_SAMPLE_RANGE.start(), *Self::PCF_SAMPLE_RANGE.end());
    }

    pub fn view_uniforms(&self, view_proj: Mat4, camera_pos: Vec3) -> ViewUniforms {
        ViewUniforms::new(
            view_proj,
            camera_pos,
            self.shadow_mode,
            self.pcf_sample_count,
            self.use_material,
        )
    }
}

/// Toggles and parameters shared between the control panel and the frame
#[derive(Debug, Clone)]
pub struct SceneState {
    pub camera_mode: CameraMode,
    pub show_minimap: bool,
    pub render_main_scene: bool,
    pub draw_light_markers: bool,
    pub draw_cube: bool,
    pub draw_curve: bool,
    /// Move light 0 along the curve
    pub bezier_light: bool,
    pub curve: BezierCurve,
    pub minimap: MinimapSettings,
    pub cube: CubeSettings,
    pub character_offset: Vec3,
    curve_dirty: bool,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            camera_mode: CameraMode::Fly,
            show_minimap: true,
            render_main_scene: true,
            draw_light_markers: true,
            draw_cube: true,
            draw_curve: true,
            bezier_light: true,
            curve: BezierCurve::default(),
            minimap: MinimapSettings::default(),
            cube: CubeSettings::default(),
            character_offset: DEFAULT_CHARACTER_OFFSET,
            curve_dirty: true,
        }
    }
}

impl SceneState {
    /// Default state following `curve`; the overlay is sampled on the first frame
    pub fn with_curve(curve: BezierCurve) -> Self {
        Self {
            curve,
            ..Self::default()
        }
    }

    /// Resample the curve overlay on the next frame
    pub fn request_curve_redraw(&mut self) {
        self.curve_dirty = true;
    }

    pub fn take_curve_redraw(&mut self) -> bool {
        std::mem::take(&mut self.curve_dirty)
    }

    /// Place light 0 on the curve for `time` seconds. No-op unless
    /// `bezier_light` is set.
    pub fn animate_curve_light(&self, lights: &mut LightManager, time: f32) {
        if !self.bezier_light {
            return;
        }
        let position = self.curve.point_at(BezierCurve::oscillation_parameter(time));
        if let Some(light) = lights.lights_mut().first_mut() {
            light.set_position(position);
        }
    }
}

/// Flat list of draw items
#[derive(Default)]
pub struct Scene {
    meshes: Vec<GpuMesh>,
    character: Option<Range<usize>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append meshes and return their index range
    pub fn add_meshes(&mut self, meshes: Vec<GpuMesh>) -> Range<usize> {
        let start = self.meshes.len();
        self.meshes.extend(meshes);
        start..self.meshes.len()
    }

    /// Mark `range` as the character that rides along with the fly camera
    pub fn set_character(&mut self, range: Range<usize>) {
        let range = range.start.min(self.meshes.len())..range.end.min(self.meshes.len());
        for mesh in &mut self.meshes[range.clone()] {
            mesh.hidden_in_first_person = true;
        }
        self.character = Some(range);
    }

    pub fn has_character(&self) -> bool {
        self.character.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Move the character meshes under the fly camera
    pub fn attach_character(&mut self, fly: &CameraPose, offset: Vec3) {
        if let Some(range) = self.character.clone() {
            for mesh in &mut self.meshes[range] {
                mesh.attach_to_camera(fly.position, fly.forward, offset);
            }
        }
    }

    pub fn meshes(&self) -> &[GpuMesh] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Every mesh, for the shadow pass
    pub fn shadow_casters(&self) -> Vec<&GpuMesh> {
        self.meshes.iter().collect()
    }

    /// Meshes the color passes draw for `mode`
    pub fn visible_meshes(&self, mode: CameraMode) -> impl Iterator<Item = &GpuMesh> {
        self.meshes.iter().filter(move |mesh| is_visible(mesh.hidden_in_first_person, mode))
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue) {
        for mesh in &self.meshes {
            mesh.write_uniforms(queue);
        }
    }
}

/// Hidden-in-first-person meshes are only skipped while flying
pub fn is_visible(hidden_in_first_person: bool, mode: CameraMode) -> bool {
    !(hidden_in_first_person && mode == CameraMode::Fly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_manager::DEFAULT_SHADOW_RESOLUTION;
    use glam::Vec4;

    #[test]
    fn pcf_sample_count_is_clamped() {
        let mut config = RendererConfig::default();
        config.set_pcf_sample_count(0);
        assert_eq!(config.pcf_sample_count(), 1);
        config.set_pcf_sample_count(500);
        assert_eq!(config.pcf_sample_count(), 64);
        assert_eq!(RendererConfig::new(ShadowMode::Pcf, 9, false).pcf_sample_count(), 9);
    }

    #[test]
    fn view_uniforms_carry_shadow_settings() {
        let config = RendererConfig::new(ShadowMode::Pcf, 16, false);
        let u = config.view_uniforms(Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!((u.shadow_mode, u.sample_count, u.use_material), (2, 16, 0));
        assert_eq!(u.camera_pos, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn character_hidden_only_in_fly_mode() {
        assert!(!is_visible(true, CameraMode::Fly));
        for mode in [CameraMode::ThirdPerson, CameraMode::Minimap, CameraMode::Light] {
            assert!(is_visible(true, mode));
        }
        assert!(is_visible(false, CameraMode::Fly));
    }

    #[test]
    fn curve_light_follows_oscillation() {
        let state = SceneState::default();
        let mut lights = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        lights.add_light(Vec3::ZERO, Vec4::ONE);

        state.animate_curve_light(&mut lights, 0.0);
        assert_eq!(lights.lights()[0].position(), state.curve.point_at(0.5));
        assert_eq!(lights.lights()[1].position(), Vec3::ZERO);
    }

    #[test]
    fn curve_light_disabled_leaves_light() {
        let state = SceneState {
            bezier_light: false,
            ..Default::default()
        };
        let mut lights = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        state.animate_curve_light(&mut lights, 3.0);
        assert_eq!(lights.lights()[0].position(), crate::light_manager::DEFAULT_LIGHT_POSITION);
    }

    #[test]
    fn curve_redraw_is_taken_once() {
        let mut state = SceneState::default();
        assert!(state.take_curve_redraw());
        assert!(!state.take_curve_redraw());
        state.request_curve_redraw();
        assert!(state.take_curve_redraw());
    }

    #[test]
    fn custom_curve_is_sampled_on_first_frame() {
        let curve = BezierCurve::new([Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        let mut state = SceneState::with_curve(curve);
        assert_eq!(state.curve.control_points, curve.control_points);
        assert!(state.bezier_light);
        assert!(state.take_curve_redraw());
    }

    #[test]
    fn empty_scene_has_no_character() {
        let mut scene = Scene::new();
        scene.set_character(0..3);
        assert!(!scene.has_character());
        assert!(scene.is_empty());
        assert!(scene.meshes().is_empty());
    }
}
