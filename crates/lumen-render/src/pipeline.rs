//! Main shading pipeline: Blinn-Phong with per-light shadow maps

use crate::light_manager::{MAX_SHADED_LIGHTS, SHADOW_MAP_BASE_BINDING};
use crate::primitives::Vertex;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

/// How shadow maps are sampled in the main pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowMode {
    None,
    #[default]
    Hard,
    Pcf,
}

impl ShadowMode {
    pub const ALL: [ShadowMode; 3] = [ShadowMode::None, ShadowMode::Hard, ShadowMode::Pcf];

    pub fn as_u32(self) -> u32 {
        match self {
            ShadowMode::None => 0,
            ShadowMode::Hard => 1,
            ShadowMode::Pcf => 2,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ShadowMode::None),
            1 => Some(ShadowMode::Hard),
            2 => Some(ShadowMode::Pcf),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShadowMode::None => "No shadows",
            ShadowMode::Hard => "Hard shadows",
            ShadowMode::Pcf => "PCF",
        }
    }
}

/// Per-view uniforms (bind group 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub shadow_mode: u32,
    pub sample_count: u32,
    pub use_material: u32,
    pub _pad: u32,
}

impl ViewUniforms {
    pub fn new(
        view_proj: Mat4,
        camera_pos: Vec3,
        shadow_mode: ShadowMode,
        sample_count: u32,
        use_material: bool,
    ) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).to_array(),
            shadow_mode: shadow_mode.as_u32(),
            sample_count,
            use_material: use_material as u32,
            _pad: 0,
        }
    }
}

impl Default for ViewUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Vec3::ZERO, ShadowMode::Hard, 4, true)
    }
}

/// Per-mesh uniforms (bind group 1, binding 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub kd: [f32; 4],
    pub ks: [f32; 4],
    pub shininess: f32,
    pub transparency: f32,
    pub has_tex_coords: u32,
    pub has_normal_map: u32,
}

impl MeshUniforms {
    pub fn normal_matrix(model: Mat4) -> Mat4 {
        let inverse = model.inverse();
        if inverse.is_finite() {
            inverse.transpose()
        } else {
            Mat4::IDENTITY
        }
    }
}

/// A uniform buffer plus the group-0 bind group that exposes it
pub struct ViewBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ViewBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} View Uniforms", label)),
            contents: bytemuck::cast_slice(&[ViewUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(&format!("{} View Bind Group", label)),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &ViewUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// The main scene pipeline and its bind group layouts
pub struct ScenePipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub view_bind_group_layout: wgpu::BindGroupLayout,
    pub mesh_bind_group_layout: wgpu::BindGroupLayout,
    pub light_bind_group_layout: wgpu::BindGroupLayout,
}

impl ScenePipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene_shader.wgsl").into()),
        });

        // Bind group 0: view uniforms
        let view_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("View Bind Group Layout"),
            });

        // Bind group 1: mesh uniforms + albedo and normal maps
        let mesh_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    texture_entry(1),
                    sampler_entry(2),
                    texture_entry(3),
                    sampler_entry(4),
                ],
                label: Some("Mesh Bind Group Layout"),
            });

        // Bind group 2: packed light records, comparison sampler, one shadow map per light
        let mut light_entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ];
        light_entries.extend((0..MAX_SHADED_LIGHTS as u32).map(|i| wgpu::BindGroupLayoutEntry {
            binding: SHADOW_MAP_BASE_BINDING + i,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let light_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &light_entries,
                label: Some("Light Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[
                &view_bind_group_layout,
                &mesh_bind_group_layout,
                &light_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            view_bind_group_layout,
            mesh_bind_group_layout,
            light_bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<ViewUniforms>(), 96);
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 176);
    }

    #[test]
    fn shadow_mode_codes_round_trip() {
        for mode in ShadowMode::ALL {
            assert_eq!(ShadowMode::from_u32(mode.as_u32()), Some(mode));
        }
        assert_eq!(ShadowMode::from_u32(3), None);
    }

    #[test]
    fn normal_matrix_of_singular_model_is_identity() {
        let flat = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(MeshUniforms::normal_matrix(flat), Mat4::IDENTITY);
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = MeshUniforms::normal_matrix(model);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
    }
}
