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

use web_sys::{WebGlBuffer, WebGlProgram, WebGlRenderingContext as GL, WebGlShader};

use super::{
    AttribType, BackendError, BufferUsage, ClearColor, Dimensions, DrawMode, GraphicsContext,
    VertexAttribLayout, Viewport,
};
use crate::shader::ShaderKind;

fn draw_mode(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Triangles => GL::TRIANGLES,
    }
}

fn buffer_usage(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => GL::STATIC_DRAW,
    }
}

fn attrib_type(attrib_type: AttribType) -> u32 {
    match attrib_type {
        AttribType::Float => GL::FLOAT,
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl GraphicsContext for GL {
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;

    fn create_shader(&mut self, kind: ShaderKind) -> Result<WebGlShader, BackendError> {
        let shader_type = match kind {
            ShaderKind::Vertex => GL::VERTEX_SHADER,
            ShaderKind::Fragment => GL::FRAGMENT_SHADER,
        };
        GL::create_shader(self, shader_type).ok_or(BackendError::ObjectCreation("shader"))
    }

    fn shader_source(&mut self, shader: &WebGlShader, source: &str) {
        GL::shader_source(self, shader, source);
    }

    fn compile_shader(&mut self, shader: &WebGlShader) {
        GL::compile_shader(self, shader);
    }

    fn shader_compile_status(&self, shader: &WebGlShader) -> bool {
        self.get_shader_parameter(shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        self.get_shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: WebGlShader) {
        GL::delete_shader(self, Some(&shader));
    }

    fn create_program(&mut self) -> Result<WebGlProgram, BackendError> {
        GL::create_program(self).ok_or(BackendError::ObjectCreation("program"))
    }

    fn attach_shader(&mut self, program: &WebGlProgram, shader: &WebGlShader) {
        GL::attach_shader(self, program, shader);
    }

    fn link_program(&mut self, program: &WebGlProgram) {
        GL::link_program(self, program);
    }

    fn program_link_status(&self, program: &WebGlProgram) -> bool {
        self.get_program_parameter(program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        self.get_program_info_log(program)
    }

    fn delete_program(&mut self, program: WebGlProgram) {
        GL::delete_program(self, Some(&program));
    }

    fn attrib_location(&self, program: &WebGlProgram, name: &str) -> i32 {
        self.get_attrib_location(program, name)
    }

    fn create_buffer(&mut self) -> Result<WebGlBuffer, BackendError> {
        GL::create_buffer(self).ok_or(BackendError::ObjectCreation("buffer"))
    }

    fn delete_buffer(&mut self, buffer: WebGlBuffer) {
        GL::delete_buffer(self, Some(&buffer));
    }

    fn bind_array_buffer(&mut self, buffer: Option<&WebGlBuffer>) {
        self.bind_buffer(GL::ARRAY_BUFFER, buffer);
    }

    fn array_buffer_data(&mut self, data: &[u8], usage: BufferUsage) -> Result<(), BackendError> {
        self.buffer_data_with_u8_array(GL::ARRAY_BUFFER, data, buffer_usage(usage));
        Ok(())
    }

    fn drawing_buffer_size(&self) -> Dimensions {
        Dimensions {
            width: u32::try_from(self.drawing_buffer_width()).unwrap_or_default(),
            height: u32::try_from(self.drawing_buffer_height()).unwrap_or_default(),
        }
    }

    fn viewport(&mut self, viewport: Viewport) {
        GL::viewport(
            self,
            viewport.x,
            viewport.y,
            to_i32(viewport.width),
            to_i32(viewport.height),
        );
    }

    fn clear_color(&mut self, color: ClearColor) {
        GL::clear_color(self, color.r, color.g, color.b, color.a);
    }

    fn clear_color_buffer(&mut self) {
        self.clear(GL::COLOR_BUFFER_BIT);
    }

    fn use_program(&mut self, program: Option<&WebGlProgram>) {
        GL::use_program(self, program);
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        GL::enable_vertex_attrib_array(self, location);
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: VertexAttribLayout) {
        self.vertex_attrib_pointer_with_i32(
            location,
            to_i32(layout.components),
            attrib_type(layout.attrib_type),
            layout.normalized,
            to_i32(layout.stride),
            to_i32(layout.offset),
        );
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) -> Result<(), BackendError> {
        if first < 0 || count < 0 {
            return Err(BackendError::InvalidRange { first, count });
        }
        GL::draw_arrays(self, draw_mode(mode), first, count);
        Ok(())
    }
}
