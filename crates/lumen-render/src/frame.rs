//! Per-frame command recording with explicit pass-target bookkeeping.
//!
//! wgpu has no global "bound framebuffer" or viewport. `FrameEncoder`
//! tracks the equivalent state so passes that temporarily redirect
//! rendering (shadow maps, the minimap) can save and restore it.

/// Color and depth attachments a frame is rendered into
pub struct FrameTarget<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl FrameTarget<'_> {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Viewport covering a whole `width x height` attachment
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(self.x, self.y, self.width, self.height, 0.0, 1.0);
    }
}

/// What subsequent passes draw into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Surface,
    ShadowMap(usize),
    Minimap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassState {
    pub viewport: Viewport,
    pub target: PassTarget,
}

impl PassState {
    pub fn surface(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::full(width, height),
            target: PassTarget::Surface,
        }
    }
}

/// Command encoder for one frame plus the tracked pass state
pub struct FrameEncoder {
    encoder: wgpu::CommandEncoder,
    state: PassState,
    surface_clear_pending: bool,
    clear_color: wgpu::Color,
}

impl FrameEncoder {
    pub fn new(device: &wgpu::Device, target: &FrameTarget<'_>) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        Self {
            encoder,
            state: PassState::surface(target.width, target.height),
            surface_clear_pending: true,
            clear_color: wgpu::Color::BLACK,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn set_state(&mut self, state: PassState) {
        self.state = state;
    }

    pub fn set_target(&mut self, target: PassTarget, viewport: Viewport) {
        self.state = PassState { viewport, target };
    }

    pub fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    /// The next surface pass clears color to black and depth to far
    pub fn request_surface_clear(&mut self) {
        self.surface_clear_pending = true;
    }

    pub fn surface_clear_pending(&self) -> bool {
        self.surface_clear_pending
    }

    /// Begin a pass on the frame's color + depth attachments.
    ///
    /// Loads the existing contents unless a clear was requested.
    pub fn begin_surface_pass<'a>(
        &'a mut self,
        target: &FrameTarget<'a>,
        label: &str,
    ) -> wgpu::RenderPass<'a> {
        debug_assert_eq!(self.state.target, PassTarget::Surface);
        let clear = std::mem::take(&mut self.surface_clear_pending);
        let (color_load, depth_load) = if clear {
            (wgpu::LoadOp::Clear(self.clear_color), wgpu::LoadOp::Clear(1.0))
        } else {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        };
        let viewport = self.state.viewport;
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        viewport.apply(&mut pass);
        pass
    }

    /// Finish recording. A clear still pending is flushed so the surface
    /// never shows stale contents.
    pub fn finish(mut self, target: &FrameTarget<'_>) -> wgpu::CommandBuffer {
        if self.surface_clear_pending {
            let _ = self.begin_surface_pass(target, "Clear Pass");
        }
        self.encoder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_never_collapses_to_zero() {
        let v = Viewport::full(0, 0);
        assert_eq!((v.width, v.height), (1.0, 1.0));
    }

    #[test]
    fn surface_state_targets_surface() {
        let s = PassState::surface(1600, 900);
        assert_eq!(s.target, PassTarget::Surface);
        assert_eq!(s.viewport, Viewport::full(1600, 900));
    }
}
