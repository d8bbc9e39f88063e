//! Minimap: the scene rendered top-down into an offscreen target, then
//! composited onto the frame as a textured quad.

use crate::context::{create_color_target, create_depth_texture};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use wgpu::util::DeviceExt;

/// Where the quad corners live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinimapAnchor {
    /// Corners are in fly-camera view space and follow that camera
    #[default]
    CameraRelative,
    /// Corners are normalized device coordinates
    ScreenRelative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapSettings {
    /// Orthographic half-height of the top-down view
    pub ortho_height: f32,
    /// Lower-left corner of the quad
    pub origin: Vec3,
    pub height: f32,
    /// Width / height of the quad
    pub aspect: f32,
    pub anchor: MinimapAnchor,
}

impl Default for MinimapSettings {
    fn default() -> Self {
        Self {
            ortho_height: crate::camera::DEFAULT_MINIMAP_ORTHO_HEIGHT,
            origin: Vec3::new(1.0, 0.5, -1.0),
            height: 0.5,
            aspect: 16.0 / 9.0,
            anchor: MinimapAnchor::CameraRelative,
        }
    }
}

impl MinimapSettings {
    pub const ORTHO_HEIGHT_RANGE: std::ops::RangeInclusive<f32> = 1.0..=80.0;

    pub fn width(&self) -> f32 {
        self.height * self.aspect
    }

    /// Counter-clockwise from the lower-left corner
    pub fn corners(&self) -> [Vec3; 4] {
        let (o, w, h) = (self.origin, self.width(), self.height);
        [
            o,
            o + Vec3::new(w, 0.0, 0.0),
            o + Vec3::new(w, h, 0.0),
            o + Vec3::new(0.0, h, 0.0),
        ]
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 4],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 3, 0, 2];

/// Texture coordinates per corner; v runs top to bottom
const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

/// Quad vertices for the current settings. Camera-relative corners are
/// moved into world space with the inverse of `fly_view`.
pub fn quad_vertices(settings: &MinimapSettings, fly_view: Mat4) -> [QuadVertex; 4] {
    let to_world = match settings.anchor {
        MinimapAnchor::CameraRelative => fly_view.inverse(),
        MinimapAnchor::ScreenRelative => Mat4::IDENTITY,
    };
    let corners = settings.corners();
    std::array::from_fn(|i| {
        let corner = match settings.anchor {
            MinimapAnchor::CameraRelative => corners[i].extend(1.0),
            MinimapAnchor::ScreenRelative => Vec4::new(corners[i].x, corners[i].y, 0.0, 1.0),
        };
        QuadVertex {
            position: (to_world * corner).to_array(),
            uv: QUAD_UVS[i],
        }
    })
}

/// Transform the quad is drawn with
pub fn quad_transform(settings: &MinimapSettings, frame_view_proj: Mat4) -> Mat4 {
    match settings.anchor {
        MinimapAnchor::CameraRelative => frame_view_proj,
        MinimapAnchor::ScreenRelative => Mat4::IDENTITY,
    }
}

/// Offscreen color + depth target the top-down view renders into
pub struct MinimapTarget {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl MinimapTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let (color_texture, color_view) = create_color_target(
            device,
            format,
            width,
            height,
            wgpu::TextureUsages::TEXTURE_BINDING,
            "Minimap Color Texture",
        );
        let (depth_texture, depth_view) = create_depth_texture(device, width, height, "Minimap Depth Texture");
        Self {
            color_texture,
            color_view,
            depth_texture,
            depth_view,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct QuadUniforms {
    transform: [[f32; 4]; 4],
}

/// Offscreen target plus the quad pipeline that composites it
pub struct Minimap {
    pub target: MinimapTarget,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    format: wgpu::TextureFormat,
}

impl Minimap {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Minimap Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("minimap_shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("Minimap Bind Group Layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Minimap Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Minimap Quad Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_quad"),
                buffers: &[QuadVertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_quad"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Minimap Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Minimap Uniform Buffer"),
            contents: bytemuck::cast_slice(&[QuadUniforms {
                transform: Mat4::IDENTITY.to_cols_array_2d(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Minimap Quad Vertices"),
            contents: bytemuck::cast_slice(&quad_vertices(&MinimapSettings::default(), Mat4::IDENTITY)),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Minimap Quad Indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let target = MinimapTarget::new(device, format, width, height);
        let bind_group = Self::create_bind_group(device, &bind_group_layout, &uniform_buffer, &target, &sampler);

        Self {
            target,
            pipeline,
            bind_group_layout,
            sampler,
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            bind_group,
            format,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        target: &MinimapTarget,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&target.color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("Minimap Bind Group"),
        })
    }

    /// Reallocate the offscreen target to match the surface
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (width.max(1), height.max(1)) == (self.target.width, self.target.height) {
            return;
        }
        self.target = MinimapTarget::new(device, self.format, width, height);
        self.bind_group = Self::create_bind_group(
            device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.target,
            &self.sampler,
        );
    }

    /// Upload the quad for this frame
    pub fn update(&self, queue: &wgpu::Queue, settings: &MinimapSettings, fly_view: Mat4, frame_view_proj: Mat4) {
        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&quad_vertices(settings, fly_view)),
        );
        let uniforms = QuadUniforms {
            transform: quad_transform(settings, frame_view_proj).to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Composite the minimap quad
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;

    fn close(a: [f32; 4], b: Vec4) -> bool {
        (Vec4::from_array(a) - b).length() < 1e-4
    }

    #[test]
    fn default_corners_sit_up_and_right() {
        let settings = MinimapSettings::default();
        let w = 0.5 * 16.0 / 9.0;
        let c = settings.corners();
        assert_eq!(c[0], Vec3::new(1.0, 0.5, -1.0));
        assert!((c[2] - Vec3::new(1.0 + w, 1.0, -1.0)).length() < 1e-6);
        assert_eq!(c[3], Vec3::new(1.0, 1.0, -1.0));
    }

    #[test]
    fn camera_relative_quad_returns_to_view_space() {
        let settings = MinimapSettings::default();
        let pose = CameraPose::new(Vec3::new(3.0, 1.0, -2.0));
        let view = pose.view_matrix();
        let quad = quad_vertices(&settings, view);
        for (vertex, corner) in quad.iter().zip(settings.corners()) {
            let back = view * Vec4::from_array(vertex.position);
            assert!(close(back.to_array(), corner.extend(1.0)));
        }
    }

    #[test]
    fn screen_relative_quad_is_flat_ndc() {
        let settings = MinimapSettings {
            anchor: MinimapAnchor::ScreenRelative,
            origin: Vec3::new(0.5, 0.5, 0.0),
            ..Default::default()
        };
        let quad = quad_vertices(&settings, Mat4::from_translation(Vec3::ONE));
        assert_eq!(quad[0].position, [0.5, 0.5, 0.0, 1.0]);
        assert_eq!(quad_transform(&settings, Mat4::from_scale(Vec3::splat(3.0))), Mat4::IDENTITY);
    }

    #[test]
    fn quad_indices_cover_two_triangles() {
        assert_eq!(QUAD_INDICES, [0, 1, 2, 3, 0, 2]);
        let quad = quad_vertices(&MinimapSettings::default(), Mat4::IDENTITY);
        assert_eq!(quad[0].uv, [0.0, 1.0]);
        assert_eq!(quad[2].uv, [1.0, 0.0]);
    }
}
