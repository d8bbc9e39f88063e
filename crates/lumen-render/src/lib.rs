//! Lumen Render - wgpu shadow-mapped multi-light renderer
//!
//! Every light owns a depth-only shadow map rendered from its own pose. The
//! light manager packs the light list into a storage buffer that the main
//! Blinn-Phong pass reads alongside one comparison-sampled shadow map per
//! light. Auxiliary passes draw a top-down minimap, light markers, a cubemap
//! skybox, a reflective cube and a Bezier curve overlay.

pub mod camera;
mod context;
pub mod cube_pipeline;
mod frame;
mod frame_renderer;
mod gpu_mesh;
mod headless;
mod light;
pub mod light_manager;
pub mod minimap;
pub mod overlay_pipeline;
mod pipeline;
mod primitives;
mod scene;
pub mod shadow;
pub mod skybox_pipeline;
mod texture_cache;

pub use camera::{
    CameraMode, CameraPose, CameraRig, FlyController, FlyInput, FrameView, ThirdPersonSettings,
};
pub use context::{install_error_logger, with_validation, RenderContext, RenderError};
pub use cube_pipeline::{CubePipeline, CubeSettings};
pub use frame::{FrameEncoder, FrameTarget, PassState, PassTarget, Viewport};
pub use frame_renderer::{FrameInputs, FrameRenderer};
pub use gpu_mesh::{upload_all, GpuMesh, MeshTextures, DEFAULT_CHARACTER_OFFSET};
pub use headless::HeadlessContext;
pub use light::{compute_light_space_transform, ShadowCastingLight, ShadowMap};
pub use light_manager::{
    LightManager, LightRecord, PackedLightBuffer, DEFAULT_SHADOW_RESOLUTION, MAX_SHADED_LIGHTS,
    NEW_LIGHT_COLOR, NEW_LIGHT_POSITION,
};
pub use minimap::{MinimapAnchor, MinimapSettings};
pub use pipeline::{MeshUniforms, ScenePipeline, ShadowMode, ViewBinding, ViewUniforms};
pub use primitives::{create_box_mesh, Mesh, Vertex};
pub use scene::{RendererConfig, Scene, SceneState};
pub use texture_cache::{cubemap_face_paths, load_cubemap, GpuTexture, TextureCache, TextureKind};

#[cfg(test)]
mod tests {
    #[test]
    fn scene_shader_wgsl_parses() {
        let source = include_str!("scene_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("scene_shader.wgsl failed to parse");
    }

    #[test]
    fn shadow_shader_wgsl_parses() {
        let source = include_str!("shadow_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("shadow_shader.wgsl failed to parse");
    }

    #[test]
    fn skybox_shader_wgsl_parses() {
        let source = include_str!("skybox_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("skybox_shader.wgsl failed to parse");
    }

    #[test]
    fn cube_shader_wgsl_parses() {
        let source = include_str!("cube_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("cube_shader.wgsl failed to parse");
    }

    #[test]
    fn overlay_shader_wgsl_parses() {
        let source = include_str!("overlay_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("overlay_shader.wgsl failed to parse");
    }

    #[test]
    fn minimap_shader_wgsl_parses() {
        let source = include_str!("minimap_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("minimap_shader.wgsl failed to parse");
    }

    #[test]
    fn scene_shader_validates() {
        let module = naga::front::wgsl::parse_str(include_str!("scene_shader.wgsl"))
            .expect("scene_shader.wgsl failed to parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .expect("scene_shader.wgsl failed validation");
    }
}
