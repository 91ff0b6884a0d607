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

use std::collections::{BTreeMap, BTreeSet};

use super::{
    BackendError, BufferUsage, ClearColor, Dimensions, DrawMode, GraphicsContext,
    VertexAttribLayout, Viewport,
};
use crate::shader::ShaderKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader(ShaderKind),
    ShaderSource { shader: u32, text: String },
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram,
    AttachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    DeleteProgram(u32),
    CreateBuffer,
    DeleteBuffer(u32),
    BindArrayBuffer(Option<u32>),
    BufferData { bytes: Vec<u8>, usage: BufferUsage },
    Viewport(Viewport),
    ClearColor(ClearColor),
    Clear,
    UseProgram(Option<u32>),
    EnableAttrib(u32),
    AttribPointer(u32, VertexAttribLayout),
    DrawArrays { mode: DrawMode, first: i32, count: i32 },
}

/// Context double that only records what the renderer asks for.
#[derive(Debug)]
pub struct RecordingContext {
    pub calls: Vec<Call>,
    pub size: Dimensions,
    pub failing_shader: Option<ShaderKind>,
    pub failing_link: bool,
    pub failing_upload: bool,
    pub failing_draw: bool,
    pub attributes: Vec<&'static str>,
    pub live_shaders: BTreeSet<u32>,
    pub live_programs: BTreeSet<u32>,
    pub live_buffers: BTreeSet<u32>,
    pub(crate) shader_kinds: BTreeMap<u32, ShaderKind>,
    pub(crate) next_id: u32,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            size: Dimensions {
                width: 300,
                height: 150,
            },
            failing_shader: None,
            failing_link: false,
            failing_upload: false,
            failing_draw: false,
            attributes: vec!["a_position"],
            live_shaders: BTreeSet::new(),
            live_programs: BTreeSet::new(),
            live_buffers: BTreeSet::new(),
            shader_kinds: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl RecordingContext {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn draw_calls(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::DrawArrays { .. }))
            .collect()
    }

    pub fn uploaded_floats(&self) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::BufferData { bytes, .. } => Some(
                    bytes
                        .chunks_exact(4)
                        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn kind_of(&self, shader: u32) -> Option<ShaderKind> {
        self.shader_kinds.get(&shader).copied()
    }
}

impl GraphicsContext for RecordingContext {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;

    fn create_shader(&mut self, kind: ShaderKind) -> Result<u32, BackendError> {
        self.calls.push(Call::CreateShader(kind));
        let id = self.next_id();
        self.shader_kinds.insert(id, kind);
        self.live_shaders.insert(id);
        Ok(id)
    }
    fn shader_source(&mut self, shader: &u32, source: &str) {
        self.calls.push(Call::ShaderSource {
            shader: *shader,
            text: source.to_owned(),
        });
    }
    fn compile_shader(&mut self, shader: &u32) {
        self.calls.push(Call::CompileShader(*shader));
    }
    fn shader_compile_status(&self, shader: &u32) -> bool {
        self.failing_shader.is_none() || self.failing_shader != self.kind_of(*shader)
    }
    fn shader_info_log(&self, shader: &u32) -> Option<String> {
        Some(format!("ERROR: 0:1: shader {shader} is broken"))
    }
    fn delete_shader(&mut self, shader: u32) {
        self.calls.push(Call::DeleteShader(shader));
        self.live_shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Result<u32, BackendError> {
        self.calls.push(Call::CreateProgram);
        let id = self.next_id();
        self.live_programs.insert(id);
        Ok(id)
    }
    fn attach_shader(&mut self, program: &u32, shader: &u32) {
        self.calls.push(Call::AttachShader {
            program: *program,
            shader: *shader,
        });
    }
    fn link_program(&mut self, program: &u32) {
        self.calls.push(Call::LinkProgram(*program));
    }
    fn program_link_status(&self, _program: &u32) -> bool {
        !self.failing_link
    }
    fn program_info_log(&self, _program: &u32) -> Option<String> {
        Some("varyings do not match".to_owned())
    }
    fn delete_program(&mut self, program: u32) {
        self.calls.push(Call::DeleteProgram(program));
        self.live_programs.remove(&program);
    }
    fn attrib_location(&self, _program: &u32, name: &str) -> i32 {
        self.attributes
            .iter()
            .position(|attribute| *attribute == name)
            .map_or(-1, |location| location as i32)
    }

    fn create_buffer(&mut self) -> Result<u32, BackendError> {
        self.calls.push(Call::CreateBuffer);
        let id = self.next_id();
        self.live_buffers.insert(id);
        Ok(id)
    }
    fn delete_buffer(&mut self, buffer: u32) {
        self.calls.push(Call::DeleteBuffer(buffer));
        self.live_buffers.remove(&buffer);
    }
    fn bind_array_buffer(&mut self, buffer: Option<&u32>) {
        self.calls.push(Call::BindArrayBuffer(buffer.copied()));
    }
    fn array_buffer_data(&mut self, data: &[u8], usage: BufferUsage) -> Result<(), BackendError> {
        self.calls.push(Call::BufferData {
            bytes: data.to_vec(),
            usage,
        });
        if self.failing_upload {
            return Err(BackendError::Device("out of memory".to_owned()));
        }
        Ok(())
    }

    fn drawing_buffer_size(&self) -> Dimensions {
        self.size
    }
    fn viewport(&mut self, viewport: Viewport) {
        self.calls.push(Call::Viewport(viewport));
    }
    fn clear_color(&mut self, color: ClearColor) {
        self.calls.push(Call::ClearColor(color));
    }
    fn clear_color_buffer(&mut self) {
        self.calls.push(Call::Clear);
    }

    fn use_program(&mut self, program: Option<&u32>) {
        self.calls.push(Call::UseProgram(program.copied()));
    }
    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(Call::EnableAttrib(location));
    }
    fn vertex_attrib_pointer(&mut self, location: u32, layout: VertexAttribLayout) {
        self.calls.push(Call::AttribPointer(location, layout));
    }
    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) -> Result<(), BackendError> {
        if self.failing_draw {
            return Err(BackendError::Device("device lost".to_owned()));
        }
        self.calls.push(Call::DrawArrays { mode, first, count });
        Ok(())
    }
}
