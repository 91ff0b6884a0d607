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

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use pollster::FutureExt;
use wgpu::util::DeviceExt;

use super::{
    AttribType, BackendError, BufferUsage, ClearColor, Dimensions, DrawMode, GraphicsContext,
    VertexAttribLayout, Viewport,
};
use crate::draw_context::DrawContext;
use crate::shader::ShaderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(u32);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u32);

struct ShaderObject {
    kind: ShaderKind,
    source: String,
    module: Option<naga::Module>,
    info_log: String,
}

struct LinkedProgram {
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
    attributes: Vec<(String, u32)>,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
    info_log: String,
}

#[derive(Default)]
struct AttribState {
    enabled: bool,
    pointer: Option<(VertexAttribLayout, BufferId)>,
}

/// A draw that can be issued again when the window asks for its content.
struct RecordedFrame {
    pipeline: wgpu::RenderPipeline,
    vertex_buffers: Vec<(Arc<wgpu::Buffer>, u64)>,
    viewport: Viewport,
    vertices: Range<u32>,
    clear: wgpu::Color,
}

fn shader_stage(kind: ShaderKind) -> naga::ShaderStage {
    match kind {
        ShaderKind::Vertex => naga::ShaderStage::Vertex,
        ShaderKind::Fragment => naga::ShaderStage::Fragment,
    }
}

fn compile_glsl(kind: ShaderKind, source: &str) -> Result<naga::Module, String> {
    let options = naga::front::glsl::Options::from(shader_stage(kind));
    let module = naga::front::glsl::Frontend::default()
        .parse(&options, source)
        .map_err(|errors| errors.to_string())?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| err.to_string())?;
    Ok(module)
}

fn entry_point_name(module: &naga::Module, stage: naga::ShaderStage) -> Option<String> {
    module
        .entry_points
        .iter()
        .find(|entry_point| entry_point.stage == stage)
        .map(|entry_point| entry_point.name.clone())
}

fn vertex_inputs(module: &naga::Module) -> Vec<(String, u32)> {
    module
        .entry_points
        .iter()
        .filter(|entry_point| entry_point.stage == naga::ShaderStage::Vertex)
        .flat_map(|entry_point| &entry_point.function.arguments)
        .filter_map(|argument| match (&argument.name, &argument.binding) {
            (Some(name), Some(naga::Binding::Location { location, .. })) => {
                Some((name.clone(), *location))
            }
            _ => None,
        })
        .collect()
}

fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
    }
}

fn vertex_format(layout: &VertexAttribLayout) -> Option<wgpu::VertexFormat> {
    match (layout.attrib_type, layout.components) {
        (AttribType::Float, 1) => Some(wgpu::VertexFormat::Float32),
        (AttribType::Float, 2) => Some(wgpu::VertexFormat::Float32x2),
        (AttribType::Float, 3) => Some(wgpu::VertexFormat::Float32x3),
        (AttribType::Float, 4) => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn wgpu_color(color: ClearColor) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.r),
        g: f64::from(color.g),
        b: f64::from(color.b),
        a: f64::from(color.a),
    }
}

/// Runs the GL-style call sequence on a wgpu device.
///
/// GLSL is compiled with naga at `compile_shader` time, linking creates the
/// wgpu shader modules, and the render pipeline is only assembled at draw
/// time from the bound state. Clears are folded into the next draw pass.
pub struct WgpuContext {
    draw_context: DrawContext,
    shaders: IndexMap<ShaderId, ShaderObject>,
    programs: IndexMap<ProgramId, ProgramObject>,
    // Buffers have no storage until their first upload.
    buffers: IndexMap<BufferId, Option<Arc<wgpu::Buffer>>>,
    next_id: u32,
    array_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    attribs: BTreeMap<u32, AttribState>,
    viewport: Option<Viewport>,
    clear_color: ClearColor,
    pending_clear: Option<wgpu::Color>,
    last_frame: Option<RecordedFrame>,
}

impl WgpuContext {
    #[must_use]
    pub fn new(draw_context: DrawContext) -> Self {
        Self {
            draw_context,
            shaders: IndexMap::new(),
            programs: IndexMap::new(),
            buffers: IndexMap::new(),
            next_id: 0,
            array_buffer: None,
            current_program: None,
            attribs: BTreeMap::new(),
            viewport: None,
            clear_color: ClearColor {
                r: 0.,
                g: 0.,
                b: 0.,
                a: 0.,
            },
            pending_clear: None,
            last_frame: None,
        }
    }

    #[must_use]
    pub fn draw_context(&self) -> &DrawContext {
        &self.draw_context
    }

    pub fn draw_context_mut(&mut self) -> &mut DrawContext {
        &mut self.draw_context
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn with_validation<T>(&self, action: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        let device = &self.draw_context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = action(device);
        match device.pop_error_scope().block_on() {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn attached_module(
        &self,
        program: &ProgramObject,
        kind: ShaderKind,
    ) -> Result<&naga::Module, String> {
        let mut attached = program
            .attached
            .iter()
            .filter_map(|id| self.shaders.get(id))
            .filter(|shader| shader.kind == kind);
        let shader = attached
            .next()
            .ok_or_else(|| format!("no {kind} shader attached"))?;
        if attached.next().is_some() {
            return Err(format!("more than one {kind} shader attached"));
        }
        shader
            .module
            .as_ref()
            .ok_or_else(|| format!("{kind} shader is not compiled"))
    }

    fn try_link(&self, program: &ProgramObject) -> Result<LinkedProgram, String> {
        let vertex_module = self.attached_module(program, ShaderKind::Vertex)?;
        let fragment_module = self.attached_module(program, ShaderKind::Fragment)?;
        let vertex_entry = entry_point_name(vertex_module, naga::ShaderStage::Vertex)
            .ok_or("vertex shader has no entry point")?;
        let fragment_entry = entry_point_name(fragment_module, naga::ShaderStage::Fragment)
            .ok_or("fragment shader has no entry point")?;
        let attributes = vertex_inputs(vertex_module);
        let (vertex, fragment) = self.with_validation(|device| {
            let create = |label, module: &naga::Module| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Naga(Cow::Owned(module.clone())),
                })
            };
            (
                create("Vertex Shader", vertex_module),
                create("Fragment Shader", fragment_module),
            )
        })?;
        Ok(LinkedProgram {
            vertex,
            vertex_entry,
            fragment,
            fragment_entry,
            attributes,
        })
    }

    fn build_frame(&self, mode: DrawMode, vertices: Range<u32>) -> Result<RecordedFrame, BackendError> {
        let linked = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .and_then(|program| program.linked.as_ref())
            .ok_or(BackendError::NoProgram)?;

        let mut attributes = Vec::new();
        let mut strides = Vec::new();
        let mut vertex_buffers = Vec::new();
        for (location, state) in self.attribs.iter().filter(|(_, state)| state.enabled) {
            let (layout, buffer_id) = state
                .pointer
                .ok_or(BackendError::MissingAttribPointer(*location))?;
            let format = vertex_format(&layout).ok_or_else(|| {
                BackendError::Device(format!("unsupported attribute layout {layout:?}"))
            })?;
            let buffer = self
                .buffers
                .get(&buffer_id)
                .and_then(Option::as_ref)
                .ok_or(BackendError::NoBoundBuffer)?;
            attributes.push([wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location: *location,
            }]);
            strides.push(wgpu::BufferAddress::from(layout.effective_stride()));
            vertex_buffers.push((Arc::clone(buffer), u64::from(layout.offset)));
        }
        let layouts: Vec<wgpu::VertexBufferLayout> = attributes
            .iter()
            .zip(&strides)
            .map(|(attributes, stride)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let format = self.draw_context.surface_config.format;
        let pipeline = self
            .with_validation(|device| {
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Program Layout"),
                        bind_group_layouts: &[],
                        push_constant_ranges: &[],
                    });
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Program Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &linked.vertex,
                        entry_point: Some(linked.vertex_entry.as_str()),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        buffers: &layouts,
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &linked.fragment,
                        entry_point: Some(linked.fragment_entry.as_str()),
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: topology(mode),
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
            .map_err(BackendError::Device)?;

        let canvas = self.draw_context.surface_dimensions();
        Ok(RecordedFrame {
            pipeline,
            vertex_buffers,
            viewport: self.viewport.unwrap_or(Viewport {
                x: 0,
                y: 0,
                width: canvas.width,
                height: canvas.height,
            }),
            vertices,
            clear: self.pending_clear.unwrap_or(wgpu::Color::TRANSPARENT),
        })
    }

    fn render_frame(&self, frame: &RecordedFrame, clear: Option<wgpu::Color>) -> Result<(), BackendError> {
        let canvas = self.draw_context.surface_dimensions();
        // GL viewports start at the bottom left corner, wgpu ones at the top left.
        let x = frame.viewport.x.max(0).unsigned_abs().min(canvas.width);
        let bottom = frame.viewport.y.max(0).unsigned_abs().min(canvas.height);
        let width = frame.viewport.width.min(canvas.width - x);
        let height = frame.viewport.height.min(canvas.height - bottom);
        let top = canvas.height - bottom - height;
        #[allow(clippy::cast_precision_loss)]
        let rendered = self.with_validation(|_| {
            self.draw_context.render_scene(clear, |pass| {
                if width > 0 && height > 0 {
                    pass.set_viewport(x as f32, top as f32, width as f32, height as f32, 0., 1.);
                }
                pass.set_pipeline(&frame.pipeline);
                for (slot, (buffer, offset)) in (0u32..).zip(&frame.vertex_buffers) {
                    pass.set_vertex_buffer(slot, buffer.slice(*offset..));
                }
                pass.draw(frame.vertices.clone(), 0..1);
            })
        });
        match rendered {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(BackendError::Device(format!("{err:#}"))),
            Err(err) => Err(BackendError::Device(err)),
        }
    }

    /// Issues the last draw again, for a window whose content was lost.
    pub fn redraw(&self) -> Result<(), BackendError> {
        match &self.last_frame {
            Some(frame) => self.render_frame(frame, Some(frame.clear)),
            None => Ok(()),
        }
    }
}

impl GraphicsContext for WgpuContext {
    type Shader = ShaderId;
    type Program = ProgramId;
    type Buffer = BufferId;

    fn create_shader(&mut self, kind: ShaderKind) -> Result<ShaderId, BackendError> {
        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            ShaderObject {
                kind,
                source: String::new(),
                module: None,
                info_log: String::new(),
            },
        );
        Ok(id)
    }

    fn shader_source(&mut self, shader: &ShaderId, source: &str) {
        if let Some(object) = self.shaders.get_mut(shader) {
            source.clone_into(&mut object.source);
        }
    }

    fn compile_shader(&mut self, shader: &ShaderId) {
        let Some(object) = self.shaders.get_mut(shader) else {
            warn!("compile_shader called on unknown shader {shader:?}");
            return;
        };
        match compile_glsl(object.kind, &object.source) {
            Ok(module) => {
                object.module = Some(module);
                object.info_log.clear();
            }
            Err(log) => {
                object.module = None;
                object.info_log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: &ShaderId) -> bool {
        self.shaders
            .get(shader)
            .is_some_and(|object| object.module.is_some())
    }

    fn shader_info_log(&self, shader: &ShaderId) -> Option<String> {
        self.shaders
            .get(shader)
            .map(|object| object.info_log.clone())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.shift_remove(&shader);
    }

    fn create_program(&mut self) -> Result<ProgramId, BackendError> {
        let id = ProgramId(self.next_id());
        self.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn attach_shader(&mut self, program: &ProgramId, shader: &ShaderId) {
        if let Some(object) = self.programs.get_mut(program) {
            object.attached.push(*shader);
        }
    }

    fn link_program(&mut self, program: &ProgramId) {
        let Some(object) = self.programs.get(program) else {
            warn!("link_program called on unknown program {program:?}");
            return;
        };
        let result = self.try_link(object);
        if let Some(object) = self.programs.get_mut(program) {
            match result {
                Ok(linked) => {
                    debug!("Program {program:?} exposes attributes {:?}", linked.attributes);
                    object.linked = Some(linked);
                    object.info_log.clear();
                }
                Err(log) => {
                    object.linked = None;
                    object.info_log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: &ProgramId) -> bool {
        self.programs
            .get(program)
            .is_some_and(|object| object.linked.is_some())
    }

    fn program_info_log(&self, program: &ProgramId) -> Option<String> {
        self.programs
            .get(program)
            .map(|object| object.info_log.clone())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.shift_remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn attrib_location(&self, program: &ProgramId, name: &str) -> i32 {
        self.programs
            .get(program)
            .and_then(|object| object.linked.as_ref())
            .and_then(|linked| {
                linked
                    .attributes
                    .iter()
                    .find(|(attribute, _)| attribute == name)
            })
            .and_then(|(_, location)| i32::try_from(*location).ok())
            .unwrap_or(-1)
    }

    fn create_buffer(&mut self) -> Result<BufferId, BackendError> {
        let id = BufferId(self.next_id());
        self.buffers.insert(id, None);
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        // A recorded frame may still hold the storage for redraws.
        self.buffers.shift_remove(&buffer);
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
    }

    fn bind_array_buffer(&mut self, buffer: Option<&BufferId>) {
        self.array_buffer = buffer.copied();
    }

    fn array_buffer_data(&mut self, data: &[u8], usage: BufferUsage) -> Result<(), BackendError> {
        let id = self.array_buffer.ok_or(BackendError::NoBoundBuffer)?;
        if !self.buffers.contains_key(&id) {
            return Err(BackendError::NoBoundBuffer);
        }
        debug!("Uploading {} bytes to {id:?} ({usage:?})", data.len());
        let buffer = self
            .draw_context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Array Buffer"),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        self.buffers.insert(id, Some(Arc::new(buffer)));
        Ok(())
    }

    fn drawing_buffer_size(&self) -> Dimensions {
        self.draw_context.surface_dimensions()
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn clear_color_buffer(&mut self) {
        self.pending_clear = Some(wgpu_color(self.clear_color));
    }

    fn use_program(&mut self, program: Option<&ProgramId>) {
        self.current_program = program.copied();
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.attribs.entry(location).or_default().enabled = true;
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: VertexAttribLayout) {
        match self.array_buffer {
            Some(buffer) => {
                self.attribs.entry(location).or_default().pointer = Some((layout, buffer));
            }
            None => warn!("vertex_attrib_pointer({location}) without a bound array buffer"),
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) -> Result<(), BackendError> {
        let (Ok(start), Ok(len)) = (u32::try_from(first), u32::try_from(count)) else {
            return Err(BackendError::InvalidRange { first, count });
        };
        let end = start
            .checked_add(len)
            .ok_or(BackendError::InvalidRange { first, count })?;
        let frame = self.build_frame(mode, start..end)?;
        self.render_frame(&frame, self.pending_clear)?;
        self.pending_clear = None;
        self.last_frame = Some(frame);
        Ok(())
    }
}
