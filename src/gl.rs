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

//! The graphics context the renderer talks to.
//!
//! The trait mirrors the subset of the WebGL 1 API needed to put a shaded
//! primitive on screen. `webgl` forwards it to the browser, `native` runs the
//! same sequence on a wgpu device.

use crate::shader::ShaderKind;

#[cfg(target_arch = "wasm32")]
pub mod webgl;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;
#[cfg(test)]
pub(crate) mod recording;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Triangles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Uploaded once, drawn many times.
    StaticDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    Float,
}

impl AttribType {
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            AttribType::Float => 4,
        }
    }
}

/// How the bound array buffer feeds one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribLayout {
    pub components: u32,
    pub attrib_type: AttribType,
    pub normalized: bool,
    /// Zero means tightly packed.
    pub stride: u32,
    pub offset: u32,
}

impl VertexAttribLayout {
    #[must_use]
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.components * self.attrib_type.size()
        } else {
            self.stride
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const OPAQUE_BLACK: ClearColor = ClearColor {
        r: 0.,
        g: 0.,
        b: 0.,
        a: 1.,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not create {0} object")]
    ObjectCreation(&'static str),
    #[error("no buffer bound to the array buffer target")]
    NoBoundBuffer,
    #[error("no program in use")]
    NoProgram,
    #[error("attribute {0} is enabled but has no pointer")]
    MissingAttribPointer(u32),
    #[error("invalid draw range {first}..+{count}")]
    InvalidRange { first: i32, count: i32 },
    #[error("{0}")]
    Device(String),
}

pub trait GraphicsContext {
    type Shader;
    type Program;
    type Buffer;

    fn create_shader(&mut self, kind: ShaderKind) -> Result<Self::Shader, BackendError>;
    fn shader_source(&mut self, shader: &Self::Shader, source: &str);
    fn compile_shader(&mut self, shader: &Self::Shader);
    fn shader_compile_status(&self, shader: &Self::Shader) -> bool;
    fn shader_info_log(&self, shader: &Self::Shader) -> Option<String>;
    fn delete_shader(&mut self, shader: Self::Shader);

    fn create_program(&mut self) -> Result<Self::Program, BackendError>;
    fn attach_shader(&mut self, program: &Self::Program, shader: &Self::Shader);
    fn link_program(&mut self, program: &Self::Program);
    fn program_link_status(&self, program: &Self::Program) -> bool;
    fn program_info_log(&self, program: &Self::Program) -> Option<String>;
    fn delete_program(&mut self, program: Self::Program);
    /// Negative when the program has no active attribute with this name.
    fn attrib_location(&self, program: &Self::Program, name: &str) -> i32;

    fn create_buffer(&mut self) -> Result<Self::Buffer, BackendError>;
    fn delete_buffer(&mut self, buffer: Self::Buffer);
    fn bind_array_buffer(&mut self, buffer: Option<&Self::Buffer>);
    fn array_buffer_data(&mut self, data: &[u8], usage: BufferUsage)
    -> Result<(), BackendError>;

    fn drawing_buffer_size(&self) -> Dimensions;
    fn viewport(&mut self, viewport: Viewport);
    fn clear_color(&mut self, color: ClearColor);
    fn clear_color_buffer(&mut self);

    fn use_program(&mut self, program: Option<&Self::Program>);
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn vertex_attrib_pointer(&mut self, location: u32, layout: VertexAttribLayout);
    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) -> Result<(), BackendError>;
}
