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

use log::{error, info};
use pollster::FutureExt;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::LaunchConfig;
use crate::draw_context::DrawContext;
use crate::gl::native::WgpuContext;
use crate::launcher::run_load_sequence;

const WINDOW_TITLE: &str = "Colored Triangle";

struct TriangleWindow {
    config: LaunchConfig,
    window: Option<Arc<Window>>,
    context: Option<WgpuContext>,
}

impl TriangleWindow {
    fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            window: None,
            context: None,
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let size = self.config.canvas_size;
        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(size.width, size.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let draw_context = DrawContext::new(Some(Arc::clone(&window)), Some(size)).block_on()?;
        let sequence = run_load_sequence(WgpuContext::new(draw_context), &self.config);
        let (context, _) = sequence.into_parts();
        self.context = Some(context);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for TriangleWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.open(event_loop) {
            error!("Could not acquire a graphics context: {err:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Closing window");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(context) = &mut self.context {
                    context
                        .draw_context_mut()
                        .resize(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(Err(err)) = self.context.as_ref().map(WgpuContext::redraw) {
                    error!("Redraw failed: {err}");
                }
            }
            _ => {}
        }
    }
}

pub fn init_event_loop(config: LaunchConfig) {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            error!("Could not create the event loop: {err}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);
    if let Err(err) = event_loop.run_app(&mut TriangleWindow::new(config)) {
        error!("Event loop failed: {err}");
    }
}
