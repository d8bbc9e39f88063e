//! GPU texture cache: uploads mesh textures, loads the skybox cubemap,
//! and provides default fallbacks.
//!
//! Textures are handed out as `Arc<GpuTexture>` so many meshes can share
//! one upload; the GPU memory is released when the last handle drops.

use crate::context::RenderError;
use lumen_import::{ImportResult, TextureRef};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// A GPU-resident texture with its view and sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// How texel values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// sRGB-encoded color (albedo)
    Color,
    /// Linear data (normal maps)
    Linear,
}

impl TextureKind {
    fn format(self) -> wgpu::TextureFormat {
        match self {
            TextureKind::Color => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureKind::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Cubemap face order expected by `load_cubemap`: +X, -X, +Y, -Y, +Z, -Z
pub const CUBEMAP_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

const NEUTRAL_SKY: [u8; 4] = [128, 128, 128, 255];

/// Cache of GPU textures, keyed by source, with built-in defaults
pub struct TextureCache {
    textures: HashMap<String, Arc<GpuTexture>>,
    /// 1x1 white texture
    pub default_white: Arc<GpuTexture>,
    /// 1x1 flat normal map (0.5, 0.5, 1.0) = straight out of the surface
    pub default_normal: Arc<GpuTexture>,
    /// Albedo used for textured meshes whose material names no image
    pub fallback_albedo: Arc<GpuTexture>,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_white = Arc::new(Self::create_1x1(
            device,
            queue,
            [255, 255, 255, 255],
            "Default White",
            TextureKind::Color,
        ));
        let default_normal = Arc::new(Self::create_1x1(
            device,
            queue,
            [128, 128, 255, 255],
            "Default Normal",
            TextureKind::Linear,
        ));

        Self {
            textures: HashMap::new(),
            fallback_albedo: default_white.clone(),
            default_white,
            default_normal,
        }
    }

    /// Load the albedo used for textured meshes without their own image.
    /// On failure the white default stays in place.
    pub fn set_fallback_albedo(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) {
        match self.load_file(device, queue, path, TextureKind::Color) {
            Ok(texture) => self.fallback_albedo = texture,
            Err(e) => log::warn!("{}", e),
        }
    }

    fn create_1x1(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        label: &str,
        kind: TextureKind,
    ) -> GpuTexture {
        Self::create_2d(device, queue, label, 1, 1, &color, kind)
    }

    fn create_2d(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
        kind: TextureKind,
    ) -> GpuTexture {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: kind.format(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            ..Default::default()
        });

        GpuTexture {
            texture,
            view,
            sampler,
        }
    }

    /// Load a texture from an image file on disk, reusing a cached upload
    pub fn load_file(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        kind: TextureKind,
    ) -> Result<Arc<GpuTexture>, RenderError> {
        let key = format!("{}#{:?}", path.display(), kind);
        if let Some(texture) = self.textures.get(&key) {
            return Ok(texture.clone());
        }

        let rgba = image::open(path)
            .map_err(|e| RenderError::TextureLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        let texture = Arc::new(Self::create_2d(
            device,
            queue,
            &path.display().to_string(),
            width,
            height,
            &rgba,
            kind,
        ));
        self.textures.insert(key, texture.clone());
        Ok(texture)
    }

    /// Resolve a material texture reference, logging and returning `None`
    /// when it cannot be loaded.
    pub fn resolve(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        reference: &TextureRef,
        source: &ImportResult,
        kind: TextureKind,
    ) -> Option<Arc<GpuTexture>> {
        match reference {
            TextureRef::File(path) => match self.load_file(device, queue, path, kind) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            },
            TextureRef::Embedded(index) => {
                let key = format!("{}#image{}#{:?}", source.name, index, kind);
                if let Some(texture) = self.textures.get(&key) {
                    return Some(texture.clone());
                }
                let Some(image) = source.textures.get(*index) else {
                    log::warn!("{}: material references missing image {}", source.name, index);
                    return None;
                };
                let texture = Arc::new(Self::create_2d(
                    device,
                    queue,
                    &image.name,
                    image.width,
                    image.height,
                    &image.data,
                    kind,
                ));
                self.textures.insert(key, texture.clone());
                Some(texture)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

/// Paths of the six skybox faces inside `dir`, named px/nx/py/ny/pz/nz with `extension`
pub fn cubemap_face_paths(dir: &Path, extension: &str) -> [PathBuf; 6] {
    CUBEMAP_FACES.map(|face| dir.join(format!("{}.{}", face, extension)))
}

/// Assemble six decoded faces into one buffer of equal-sized layers.
///
/// Missing faces, or faces whose size differs from the first decoded one,
/// are filled with a neutral color.
fn assemble_cube_faces(faces: Vec<Option<image::RgbaImage>>) -> (u32, Vec<u8>) {
    let size = faces
        .iter()
        .flatten()
        .map(|img| img.width())
        .next()
        .unwrap_or(1);
    let layer_len = (size * size * 4) as usize;
    let mut data = Vec::with_capacity(layer_len * 6);
    for face in faces {
        match face {
            Some(img) if img.width() == size && img.height() == size => {
                data.extend_from_slice(img.as_raw());
            }
            _ => {
                data.extend(std::iter::repeat(NEUTRAL_SKY).take(layer_len / 4).flatten());
            }
        }
    }
    (size, data)
}

/// Load a cubemap from six face images. Faces that fail to load are logged
/// and replaced with a neutral color so the skybox still renders.
pub fn load_cubemap(device: &wgpu::Device, queue: &wgpu::Queue, faces: &[PathBuf; 6]) -> GpuTexture {
    let decoded = faces
        .iter()
        .map(|path| match image::open(path) {
            Ok(img) => {
                let img = img.to_rgba8();
                if img.width() != img.height() {
                    log::warn!("Cubemap face {} is not square, ignoring it", path.display());
                    return None;
                }
                Some(img)
            }
            Err(e) => {
                log::warn!("Cubemap texture failed to load at path: {} ({})", path.display(), e);
                None
            }
        })
        .collect();
    let (size, data) = assemble_cube_faces(decoded);

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Skybox Cubemap"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &data,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Skybox Cubemap View"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Skybox Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        sampler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_paths_follow_axis_order() {
        let paths = cubemap_face_paths(Path::new("sky"), "png");
        assert_eq!(paths[0], Path::new("sky").join("px.png"));
        assert_eq!(paths[3], Path::new("sky").join("ny.png"));
        assert_eq!(paths[5], Path::new("sky").join("nz.png"));
    }

    #[test]
    fn missing_faces_become_neutral_layers() {
        let red = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let faces = vec![None, Some(red), None, None, None, None];
        let (size, data) = assemble_cube_faces(faces);
        assert_eq!(size, 2);
        assert_eq!(data.len(), 2 * 2 * 4 * 6);
        assert_eq!(&data[0..4], &NEUTRAL_SKY);
        assert_eq!(&data[16..20], &[255, 0, 0, 255]);
    }

    #[test]
    fn mismatched_face_size_is_replaced() {
        let big = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255]));
        let small = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]));
        let faces = vec![Some(big), Some(small), None, None, None, None];
        let (size, data) = assemble_cube_faces(faces);
        assert_eq!(size, 4);
        let layer = 4 * 4 * 4;
        assert_eq!(&data[layer..layer + 4], &NEUTRAL_SKY);
    }

    #[test]
    fn all_faces_missing_yields_1x1() {
        let (size, data) = assemble_cube_faces(vec![None, None, None, None, None, None]);
        assert_eq!(size, 1);
        assert_eq!(data.len(), 24);
    }
}
