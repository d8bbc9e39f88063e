//! Viewer configuration: an optional TOML file with CLI overrides on top
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock scene.

use glam::{Vec3, Vec4};
use lumen_core::{BezierCurve, LumenError, Result};
use lumen_render::{RendererConfig, SceneState, ShadowMode, DEFAULT_SHADOW_RESOLUTION};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MAX_SHADOW_RESOLUTION: u32 = 8192;

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fullscreen: false,
            title: default_title(),
        }
    }
}

fn default_width() -> u32 {
    1600
}
fn default_height() -> u32 {
    900
}
fn default_title() -> String {
    "Lumen".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkyboxConfig {
    /// Directory holding `px`, `nx`, `py`, `ny`, `pz`, `nz` images
    #[serde(default = "default_skybox_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_skybox_ext")]
    pub extension: String,
}

impl Default for SkyboxConfig {
    fn default() -> Self {
        Self {
            directory: default_skybox_dir(),
            extension: default_skybox_ext(),
        }
    }
}

fn default_skybox_dir() -> PathBuf {
    PathBuf::from("textures")
}
fn default_skybox_ext() -> String {
    "png".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowModeSetting {
    None,
    #[default]
    Hard,
    Pcf,
}

impl From<ShadowModeSetting> for ShadowMode {
    fn from(setting: ShadowModeSetting) -> Self {
        match setting {
            ShadowModeSetting::None => ShadowMode::None,
            ShadowModeSetting::Hard => ShadowMode::Hard,
            ShadowModeSetting::Pcf => ShadowMode::Pcf,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererSettings {
    #[serde(default)]
    pub shadow_mode: ShadowModeSetting,
    #[serde(default = "default_pcf_samples")]
    pub pcf_samples: u32,
    #[serde(default = "default_true")]
    pub use_material: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            shadow_mode: ShadowModeSetting::default(),
            pcf_samples: default_pcf_samples(),
            use_material: true,
        }
    }
}

fn default_pcf_samples() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LightConfig {
    pub position: [f32; 3],
    #[serde(default = "default_light_color")]
    pub color: [f32; 4],
}

fn default_light_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 0.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub window: WindowConfig,
    /// Root that relative asset paths resolve against
    #[serde(default = "default_resources")]
    pub resources: PathBuf,
    #[serde(default = "default_scene")]
    pub scene: PathBuf,
    /// Mesh attached to the fly camera
    #[serde(default = "default_character")]
    pub character: Option<PathBuf>,
    /// Albedo for textured meshes whose material names no texture
    #[serde(default = "default_fallback_albedo")]
    pub fallback_albedo: Option<PathBuf>,
    /// Fit the scene into the unit cube on load
    #[serde(default)]
    pub normalize_scene: bool,
    #[serde(default)]
    pub skybox: SkyboxConfig,
    #[serde(default = "default_shadow_resolution")]
    pub shadow_resolution: u32,
    /// Startup lights; empty means the single default light
    #[serde(default)]
    pub lights: Vec<LightConfig>,
    #[serde(default)]
    pub curve: Option<[[f32; 3]; 4]>,
    #[serde(default)]
    pub renderer: RendererSettings,
}

fn default_resources() -> PathBuf {
    PathBuf::from("resources")
}
fn default_scene() -> PathBuf {
    PathBuf::from("scene2.obj")
}
fn default_character() -> Option<PathBuf> {
    Some(PathBuf::from("character.obj"))
}
fn default_fallback_albedo() -> Option<PathBuf> {
    Some(PathBuf::from("brickwall.jpg"))
}
fn default_shadow_resolution() -> u32 {
    DEFAULT_SHADOW_RESOLUTION
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            resources: default_resources(),
            scene: default_scene(),
            character: default_character(),
            fallback_albedo: default_fallback_albedo(),
            normalize_scene: false,
            skybox: SkyboxConfig::default(),
            shadow_resolution: default_shadow_resolution(),
            lights: Vec::new(),
            curve: None,
            renderer: RendererSettings::default(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub scene: Option<PathBuf>,
    pub resources: Option<PathBuf>,
    pub shadow_resolution: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fullscreen: bool,
}

impl ViewerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: ViewerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// File values when `path` is given, defaults otherwise; then `overrides`
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(scene) = &overrides.scene {
            self.scene = scene.clone();
        }
        if let Some(resources) = &overrides.resources {
            self.resources = resources.clone();
        }
        if let Some(resolution) = overrides.shadow_resolution {
            self.shadow_resolution = resolution;
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        self.window.fullscreen |= overrides.fullscreen;
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(LumenError::InvalidConfig(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        if !(1..=MAX_SHADOW_RESOLUTION).contains(&self.shadow_resolution) {
            return Err(LumenError::InvalidConfig(format!(
                "shadow_resolution {} outside 1..={}",
                self.shadow_resolution, MAX_SHADOW_RESOLUTION
            )));
        }
        if !RendererConfig::PCF_SAMPLE_RANGE.contains(&self.renderer.pcf_samples) {
            return Err(LumenError::InvalidConfig(format!(
                "pcf_samples {} outside 1..=64",
                self.renderer.pcf_samples
            )));
        }
        Ok(())
    }

    /// `relative` under the resource root; absolute paths pass through
    pub fn resource_path(&self, relative: &Path) -> PathBuf {
        self.resources.join(relative)
    }

    pub fn initial_lights(&self) -> Vec<(Vec3, Vec4)> {
        self.lights
            .iter()
            .map(|light| (Vec3::from_array(light.position), Vec4::from_array(light.color)))
            .collect()
    }

    pub fn curve(&self) -> BezierCurve {
        self.curve
            .map(|points| BezierCurve::new(points.map(Vec3::from_array)))
            .unwrap_or_default()
    }

    /// Startup scene toggles with the configured curve
    pub fn scene_state(&self) -> SceneState {
        SceneState::with_curve(self.curve())
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig::new(
            self.renderer.shadow_mode.into(),
            self.renderer.pcf_samples,
            self.renderer.use_material,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!((config.window.width, config.window.height), (1600, 900));
        assert_eq!(config.scene, PathBuf::from("scene2.obj"));
        assert_eq!(config.shadow_resolution, DEFAULT_SHADOW_RESOLUTION);
        assert!(config.lights.is_empty());
        assert_eq!(config.curve(), BezierCurve::default());
        assert_eq!(config.renderer_config(), RendererConfig::default());
    }

    #[test]
    fn parses_full_file() {
        let config = ViewerConfig::from_toml_str(
            r#"
            resources = "assets"
            scene = "models/room.gltf"
            character = "models/hero.obj"
            shadow_resolution = 2048
            curve = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]

            [window]
            width = 800
            height = 600
            fullscreen = true

            [skybox]
            directory = "sky"
            extension = "jpg"

            [renderer]
            shadow_mode = "pcf"
            pcf_samples = 9
            use_material = false

            [[lights]]
            position = [6.0, 3.0, -10.0]

            [[lights]]
            position = [0.0, 5.0, 0.0]
            color = [1.0, 0.0, 0.0, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.resource_path(&config.scene), PathBuf::from("assets/models/room.gltf"));
        assert_eq!(config.shadow_resolution, 2048);
        assert!(config.window.fullscreen);
        assert_eq!(config.skybox.extension, "jpg");
        assert_eq!(config.renderer_config().shadow_mode, ShadowMode::Pcf);
        assert_eq!(config.renderer_config().pcf_sample_count(), 9);

        let lights = config.initial_lights();
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[0].1, Vec4::new(1.0, 1.0, 1.0, 0.0));
        assert_eq!(lights[1].1, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(config.curve().point_at(1.0), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn scene_state_takes_configured_curve() {
        let config = ViewerConfig::from_toml_str(
            "curve = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]",
        )
        .unwrap();
        let mut state = config.scene_state();
        assert_eq!(state.curve, config.curve());
        assert!(state.show_minimap);
        assert!(state.take_curve_redraw());
        assert!(!state.take_curve_redraw());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = ViewerConfig::from_toml_str("shadow_resolution = 512\n[window]\nwidth = 640").unwrap();
        config.apply_overrides(&ConfigOverrides {
            scene: Some(PathBuf::from("other.obj")),
            shadow_resolution: Some(256),
            height: Some(480),
            fullscreen: true,
            ..Default::default()
        });
        assert_eq!(config.scene, PathBuf::from("other.obj"));
        assert_eq!(config.shadow_resolution, 256);
        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert!(config.window.fullscreen);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ViewerConfig::from_toml_str("shadow_resolution = 0").unwrap_err();
        assert!(matches!(err, LumenError::InvalidConfig(_)));
        let err = ViewerConfig::from_toml_str("[renderer]\npcf_samples = 100").unwrap_err();
        assert!(matches!(err, LumenError::InvalidConfig(_)));
        let err = ViewerConfig::from_toml_str("[renderer]\nshadow_mode = \"soft\"").unwrap_err();
        assert!(matches!(err, LumenError::TomlParseError(_)));
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("lumen_viewer_{}.toml", std::process::id()));
        std::fs::write(&path, "scene = \"cube.obj\"").unwrap();
        let config = ViewerConfig::resolve(Some(&path), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.scene, PathBuf::from("cube.obj"));
        let _ = std::fs::remove_file(&path);

        let missing = ViewerConfig::load(Path::new("no/such/config.toml")).unwrap_err();
        assert!(matches!(missing, LumenError::IoError(_)));
    }
}
