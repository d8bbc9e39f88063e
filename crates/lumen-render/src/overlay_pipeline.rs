//! Debug overlays drawn over the shaded scene: one camera-facing square per
//! light, and the Bezier curve as a line strip.

use crate::camera::CameraPose;
use crate::light_manager::LightManager;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use lumen_core::BezierCurve;
use wgpu::util::DeviceExt;

/// Half the edge length of a light marker, world units
pub const MARKER_HALF_SIZE: f32 = 0.15;
pub const CURVE_COLOR: [f32; 4] = [1.0, 0.85, 0.2, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct OverlayUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub curve_color: [f32; 4],
}

impl OverlayUniforms {
    pub fn new(view_proj: Mat4, pose: &CameraPose) -> Self {
        let right = pose.right();
        let up = right.cross(pose.forward).normalize_or(pose.up);
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_right: right.extend(MARKER_HALF_SIZE).to_array(),
            camera_up: up.extend(0.0).to_array(),
            curve_color: CURVE_COLOR,
        }
    }
}

/// Per-light marker instance
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl MarkerInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Marker instances for every light, in light order
pub fn marker_instances(lights: &LightManager) -> Vec<MarkerInstance> {
    lights
        .marker_vertices()
        .into_iter()
        .zip(lights.lights())
        .map(|(position, light)| MarkerInstance {
            position,
            color: light.color.to_array(),
        })
        .collect()
}

const CURVE_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];

fn curve_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &CURVE_ATTRIBS,
    }
}

/// Sampled curve points as line-strip vertices
pub fn curve_vertices(curve: &BezierCurve, step: f32) -> Vec<[f32; 4]> {
    curve
        .sample(step)
        .into_iter()
        .map(|p| p.extend(1.0).to_array())
        .collect()
}

pub struct OverlayPipeline {
    pub marker_pipeline: wgpu::RenderPipeline,
    pub curve_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    curve_buffer: Option<wgpu::Buffer>,
    curve_vertex_count: u32,
}

impl OverlayPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("overlay_shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Overlay Bind Group Layout"),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str,
                     entry_point: &str,
                     buffers: &[wgpu::VertexBufferLayout<'_>],
                     topology: wgpu::PrimitiveTopology,
                     depth_write_enabled: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_overlay"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let marker_pipeline = build(
            "Light Marker Pipeline",
            "vs_marker",
            &[MarkerInstance::desc()],
            wgpu::PrimitiveTopology::TriangleList,
            true,
        );
        let curve_pipeline = build(
            "Curve Line Pipeline",
            "vs_curve",
            &[curve_vertex_layout()],
            wgpu::PrimitiveTopology::LineStrip,
            false,
        );

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Overlay Uniform Buffer"),
            contents: bytemuck::cast_slice(&[OverlayUniforms::new(Mat4::IDENTITY, &CameraPose::default())]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("Overlay Bind Group"),
        });

        Self {
            marker_pipeline,
            curve_pipeline,
            uniform_buffer,
            bind_group,
            curve_buffer: None,
            curve_vertex_count: 0,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, view_proj: Mat4, pose: &CameraPose) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::cast_slice(&[OverlayUniforms::new(view_proj, pose)]),
        );
    }

    /// Replace the curve line strip with a fresh sampling
    pub fn resample_curve(&mut self, device: &wgpu::Device, curve: &BezierCurve, step: f32) {
        let vertices = curve_vertices(curve, step);
        self.curve_vertex_count = vertices.len() as u32;
        self.curve_buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Curve Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
    }

    pub fn curve_vertex_count(&self) -> u32 {
        self.curve_vertex_count
    }

    pub fn draw_markers(&self, device: &wgpu::Device, pass: &mut wgpu::RenderPass<'_>, lights: &LightManager) {
        let instances = marker_instances(lights);
        if instances.is_empty() {
            return;
        }
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Marker Instances"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });
        pass.set_pipeline(&self.marker_pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, instance_buffer.slice(..));
        pass.draw(0..6, 0..instances.len() as u32);
    }

    pub fn draw_curve(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(buffer) = &self.curve_buffer else {
            return;
        };
        pass.set_pipeline(&self.curve_pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..self.curve_vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_manager::DEFAULT_SHADOW_RESOLUTION;
    use glam::{Vec3, Vec4};
    use lumen_core::DEFAULT_SAMPLE_STEP;

    #[test]
    fn markers_carry_light_colors() {
        let mut lights = LightManager::with_default_light(DEFAULT_SHADOW_RESOLUTION);
        lights.add_light(Vec3::new(1.0, 2.0, 3.0), Vec4::new(1.0, 0.0, 0.0, 1.0));
        let markers = marker_instances(&lights);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(markers[1].color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn curve_strip_spans_endpoints() {
        let curve = BezierCurve::default();
        let vertices = curve_vertices(&curve, DEFAULT_SAMPLE_STEP);
        assert_eq!(vertices.len(), 51);
        assert_eq!(vertices[0], [40.0, 40.0, 40.0, 1.0]);
        assert_eq!(vertices[50], [70.0, 40.0, -40.0, 1.0]);
    }

    #[test]
    fn overlay_axes_are_screen_aligned() {
        let pose = CameraPose::default();
        let u = OverlayUniforms::new(Mat4::IDENTITY, &pose);
        assert_eq!(u.camera_right[3], MARKER_HALF_SIZE);
        let up = Vec3::new(u.camera_up[0], u.camera_up[1], u.camera_up[2]);
        assert!((up - Vec3::Y).length() < 1e-5);
    }
}
