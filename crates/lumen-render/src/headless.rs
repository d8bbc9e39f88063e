//! Offscreen device and frame target for tests and image capture

use crate::context::{create_color_target, create_depth_texture, request_device, RenderError};
use crate::frame::FrameTarget;

/// A device without a window, rendering into its own color + depth pair
pub struct HeadlessContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl HeadlessContext {
    pub async fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let (_, device, queue) = request_device(&instance, None, "Lumen Headless Device").await?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let (width, height) = (width.max(1), height.max(1));
        let (color_texture, color_view) = create_color_target(
            &device,
            format,
            width,
            height,
            wgpu::TextureUsages::COPY_SRC,
            "Headless Color Texture",
        );
        let (depth_texture, depth_view) = create_depth_texture(&device, width, height, "Headless Depth Texture");

        Ok(Self {
            device,
            queue,
            format,
            width,
            height,
            color_texture,
            color_view,
            _depth_texture: depth_texture,
            depth_view,
        })
    }

    pub fn target(&self) -> FrameTarget<'_> {
        FrameTarget {
            color: &self.color_view,
            depth: &self.depth_view,
            width: self.width,
            height: self.height,
        }
    }

    /// Copy the color target back as tightly packed RGBA8 rows
    pub async fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        let row_bytes = self.width * 4;
        let padded_row_bytes = padded_row_size(row_bytes);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Readback Buffer"),
            size: u64::from(padded_row_bytes) * u64::from(self.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            self.color_texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(self.height),
                },
            },
            self.color_texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?;

        let pixels = {
            let mapped = slice.get_mapped_range();
            strip_row_padding(&mapped, row_bytes, padded_row_bytes)
        };
        staging.unmap();
        Ok(pixels)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

fn padded_row_size(row_bytes: u32) -> u32 {
    row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

fn strip_row_padding(data: &[u8], row_bytes: u32, padded_row_bytes: u32) -> Vec<u8> {
    data.chunks(padded_row_bytes as usize)
        .flat_map(|row| &row[..row_bytes as usize])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_row_size(64 * 4), 256);
        assert_eq!(padded_row_size(65 * 4), 512);
    }

    #[test]
    fn padding_is_removed_per_row() {
        let mut data = vec![1u8; 8];
        data.extend([0u8; 248]);
        data.extend([2u8; 8]);
        data.extend([0u8; 248]);
        let pixels = strip_row_padding(&data, 8, 256);
        assert_eq!(pixels, [[1u8; 8], [2u8; 8]].concat());
    }
}
