/*
MIT License

Copyright (c) 2021, 2022, 2024, 2025 Vincent Hiribarren

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

use std::sync::Arc;

use anyhow::anyhow;
use log::debug;
use winit::window::Window;

use crate::gl::Dimensions;

enum DrawTarget {
    Texture(wgpu::Texture),
    Surface(wgpu::Surface<'static>),
}

impl DrawTarget {
    fn new_texture_target(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self::Texture(Self::create_texture(device, width, height))
    }
    fn configure(&mut self, device: &wgpu::Device, surface_config: &wgpu::SurfaceConfiguration) {
        match self {
            Self::Texture(texture) => {
                *texture =
                    Self::create_texture(device, surface_config.width, surface_config.height);
            }
            Self::Surface(surface) => {
                surface.configure(device, surface_config);
            }
        }
    }
    fn create_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[wgpu::TextureFormat::Rgba8UnormSrgb],
        })
    }
}

/// Prefers an sRGB format, like the default WebGL framebuffer.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> anyhow::Result<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| f.is_srgb())
        .or_else(|| formats.first())
        .copied()
        .ok_or_else(|| anyhow!("surface is not compatible with the adapter"))
}

/// Device, queue and the canvas being drawn to: a window surface, or an
/// offscreen texture when running headless.
pub struct DrawContext {
    draw_target: DrawTarget,
    pub window: Option<Arc<Window>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
}

impl DrawContext {
    // winit reports a zero size for a window that is not mapped yet, so the
    // canvas size can be forced with `dimensions`.
    pub async fn new(
        window: Option<Arc<Window>>,
        dimensions: Option<Dimensions>,
    ) -> anyhow::Result<Self> {
        let Dimensions { width, height } = dimensions.unwrap_or_else(|| {
            window.as_ref().map_or(
                crate::config::LaunchConfig::DEFAULT_CANVAS_SIZE,
                |w| Dimensions {
                    width: w.inner_size().width.max(1),
                    height: w.inner_size().height.max(1),
                },
            )
        });
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = window
            .as_ref()
            .map(|w| instance.create_surface(Arc::clone(w)))
            .transpose()?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: surface.as_ref(),
            })
            .await
            .ok_or_else(|| anyhow!("Could not create WebGPU adapter"))?;
        debug!("{:?}", adapter.get_info());
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device Descriptor"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;
        let surface_format = match &surface {
            None => wgpu::TextureFormat::Rgba8UnormSrgb,
            Some(s) => pick_surface_format(&s.get_capabilities(&adapter).formats)?,
        };
        let mut draw_target = surface.map_or_else(
            || DrawTarget::new_texture_target(&device, width, height),
            DrawTarget::Surface,
        );
        let surface_config = wgpu::SurfaceConfiguration {
            desired_maximum_frame_latency: 2,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            view_formats: vec![],
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            present_mode: wgpu::PresentMode::Fifo,
        };
        draw_target.configure(&device, &surface_config);

        Ok(Self {
            draw_target,
            window,
            device,
            queue,
            surface_config,
        })
    }

    #[must_use]
    pub fn surface_dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.surface_config.width,
            height: self.surface_config.height,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.draw_target
            .configure(&self.device, &self.surface_config);
    }

    /// Records one render pass on the canvas. `clear_color` set to `None`
    /// keeps what the canvas already holds.
    pub fn render_scene<C>(&self, clear_color: Option<wgpu::Color>, callback: C) -> anyhow::Result<()>
    where
        C: FnOnce(&mut wgpu::RenderPass<'_>),
    {
        let surface_texture = if let DrawTarget::Surface(surface) = &self.draw_target {
            Some(surface.get_current_texture()?)
        } else {
            None
        };
        let view = match (&self.draw_target, &surface_texture) {
            (DrawTarget::Texture(texture), _) => {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
            }
            (DrawTarget::Surface(_), Some(surface_texture)) => surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (DrawTarget::Surface(_), None) => return Err(anyhow!("Surface has no current texture")),
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Command Encoder"),
            });
        let load_op = clear_color.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render pass"),
                timestamp_writes: None,
                occlusion_query_set: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: load_op,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
            });
            callback(&mut render_pass);
        }
        let command_buffers = std::iter::once(encoder.finish());
        self.queue.submit(command_buffers);
        if let Some(s) = surface_texture {
            s.present();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_surface_format_is_preferred() {
        let format = pick_surface_format(&[
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ])
        .unwrap();
        assert_eq!(format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(
            pick_surface_format(&[wgpu::TextureFormat::Rgba16Float]).unwrap(),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn surface_without_formats_is_an_error() {
        let err = pick_surface_format(&[]).unwrap_err();
        assert_eq!(err.to_string(), "surface is not compatible with the adapter");
    }
}
