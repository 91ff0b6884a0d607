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

use log::{debug, info};

use crate::gl::{
    AttribType, BackendError, BufferUsage, ClearColor, Dimensions, DrawMode, GraphicsContext,
    VertexAttribLayout, Viewport,
};
use crate::shader::{ShaderKind, ShaderSource, ShaderSources};

pub const POSITION_ATTRIBUTE: &str = "a_position";

#[rustfmt::skip]
pub const TRIANGLE_POSITIONS: &[[f32; 2]] = &[
    [0., 0.],
    [0., 0.5],
    [0.7, 0.],
];

#[derive(Debug, Clone, PartialEq)]
pub struct TriangleScene {
    pub attribute_name: &'static str,
    pub positions: &'static [[f32; 2]],
    pub clear_color: ClearColor,
    pub draw_mode: DrawMode,
}

impl Default for TriangleScene {
    fn default() -> Self {
        Self {
            attribute_name: POSITION_ATTRIBUTE,
            positions: TRIANGLE_POSITIONS,
            clear_color: ClearColor::OPAQUE_BLACK,
            draw_mode: DrawMode::Triangles,
        }
    }
}

impl TriangleScene {
    /// Two tightly packed floats per vertex.
    pub const POSITION_LAYOUT: VertexAttribLayout = VertexAttribLayout {
        components: 2,
        attrib_type: AttribType::Float,
        normalized: false,
        stride: 0,
        offset: 0,
    };

    pub fn vertex_count(&self) -> Result<i32, BackendError> {
        i32::try_from(self.positions.len()).map_err(|_| BackendError::InvalidRange {
            first: 0,
            count: i32::MAX,
        })
    }
}

/// Parameters of the single draw call issued by [`start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: DrawMode,
    pub first: i32,
    pub count: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{kind} shader failed to compile: {log}")]
    Compile { kind: ShaderKind, log: String },
    #[error("program failed to link: {log}")]
    Link { log: String },
    #[error("attribute {0} is not an active attribute of the program")]
    MissingAttribute(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn compile_shader<C: GraphicsContext>(
    context: &mut C,
    source: &ShaderSource,
) -> Result<C::Shader, RenderError> {
    let kind = source.kind();
    let shader = context.create_shader(kind)?;
    context.shader_source(&shader, source.text());
    context.compile_shader(&shader);
    if context.shader_compile_status(&shader) {
        debug!("Compiled {kind} shader");
        return Ok(shader);
    }
    let log = context
        .shader_info_log(&shader)
        .unwrap_or_else(|| String::from("Unknown error compiling shader"));
    context.delete_shader(shader);
    Err(RenderError::Compile { kind, log })
}

/// Consumes both shaders: they are released whether linking succeeds or not.
fn link_program<C: GraphicsContext>(
    context: &mut C,
    vertex_shader: C::Shader,
    fragment_shader: C::Shader,
) -> Result<C::Program, RenderError> {
    let program = match context.create_program() {
        Ok(program) => program,
        Err(err) => {
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);
            return Err(err.into());
        }
    };
    context.attach_shader(&program, &vertex_shader);
    context.attach_shader(&program, &fragment_shader);
    context.link_program(&program);
    let linked = context.program_link_status(&program);
    context.delete_shader(vertex_shader);
    context.delete_shader(fragment_shader);
    if linked {
        debug!("Linked program");
        return Ok(program);
    }
    let log = context
        .program_info_log(&program)
        .unwrap_or_else(|| String::from("Unknown error linking program"));
    context.delete_program(program);
    Err(RenderError::Link { log })
}

/// Compiles and links both sources, uploads the triangle and draws it once.
///
/// Every failure is terminal for this attempt; objects created before the
/// failure are released, and nothing is drawn.
pub fn start<C: GraphicsContext>(
    context: &mut C,
    sources: &ShaderSources,
    scene: &TriangleScene,
) -> Result<DrawCall, RenderError> {
    let vertex_shader = compile_shader(context, &sources.vertex)?;
    let fragment_shader = match compile_shader(context, &sources.fragment) {
        Ok(shader) => shader,
        Err(err) => {
            context.delete_shader(vertex_shader);
            return Err(err);
        }
    };
    let program = link_program(context, vertex_shader, fragment_shader)?;

    let Ok(location) = u32::try_from(context.attrib_location(&program, scene.attribute_name))
    else {
        context.delete_program(program);
        return Err(RenderError::MissingAttribute(scene.attribute_name));
    };
    debug!("Attribute {} bound at location {location}", scene.attribute_name);

    let buffer = match context.create_buffer() {
        Ok(buffer) => buffer,
        Err(err) => {
            context.delete_program(program);
            return Err(err.into());
        }
    };
    match draw_scene(context, &program, &buffer, location, scene) {
        Ok(draw_call) => Ok(draw_call),
        Err(err) => {
            context.delete_buffer(buffer);
            context.delete_program(program);
            Err(err.into())
        }
    }
}

fn draw_scene<C: GraphicsContext>(
    context: &mut C,
    program: &C::Program,
    buffer: &C::Buffer,
    location: u32,
    scene: &TriangleScene,
) -> Result<DrawCall, BackendError> {
    let count = scene.vertex_count()?;
    context.bind_array_buffer(Some(buffer));
    context.array_buffer_data(bytemuck::cast_slice(scene.positions), BufferUsage::StaticDraw)?;

    let Dimensions { width, height } = context.drawing_buffer_size();
    context.viewport(Viewport {
        x: 0,
        y: 0,
        width,
        height,
    });
    context.clear_color(scene.clear_color);
    context.clear_color_buffer();

    context.use_program(Some(program));
    context.enable_vertex_attrib_array(location);
    context.bind_array_buffer(Some(buffer));
    context.vertex_attrib_pointer(location, TriangleScene::POSITION_LAYOUT);

    let draw_call = DrawCall {
        mode: scene.draw_mode,
        first: 0,
        count,
    };
    context.draw_arrays(draw_call.mode, draw_call.first, draw_call.count)?;
    info!(
        "Drew {} vertices as {:?} on a {width}x{height} canvas",
        draw_call.count, draw_call.mode
    );
    Ok(draw_call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{Call, RecordingContext};

    fn sources() -> ShaderSources {
        ShaderSources {
            vertex: ShaderSource::new(ShaderKind::Vertex, "attribute vec2 a_position;"),
            fragment: ShaderSource::new(ShaderKind::Fragment, "void main() {}"),
        }
    }

    #[test]
    fn valid_sources_draw_one_triangle() {
        let mut context = RecordingContext::default();
        let draw_call = start(&mut context, &sources(), &TriangleScene::default()).unwrap();
        assert_eq!(
            draw_call,
            DrawCall {
                mode: DrawMode::Triangles,
                first: 0,
                count: 3
            }
        );
        assert_eq!(
            context.draw_calls(),
            vec![&Call::DrawArrays {
                mode: DrawMode::Triangles,
                first: 0,
                count: 3
            }]
        );
        let uploaded_sources: Vec<_> = context
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::ShaderSource { shader, text } => Some((*shader, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploaded_sources,
            vec![
                (1, "attribute vec2 a_position;"),
                (2, "void main() {}")
            ]
        );
        assert_eq!(context.calls[0], Call::CreateShader(ShaderKind::Vertex));
        assert!(context.calls.contains(&Call::CreateShader(ShaderKind::Fragment)));
    }

    #[test]
    fn uploads_exactly_the_six_positions() {
        let mut context = RecordingContext::default();
        start(&mut context, &sources(), &TriangleScene::default()).unwrap();
        assert_eq!(context.uploaded_floats(), vec![0., 0., 0., 0.5, 0.7, 0.]);
        assert!(context.calls.iter().any(|call| matches!(
            call,
            Call::BufferData {
                usage: BufferUsage::StaticDraw,
                ..
            }
        )));
    }

    #[test]
    fn state_is_configured_before_drawing() {
        let mut context = RecordingContext::default();
        start(&mut context, &sources(), &TriangleScene::default()).unwrap();
        let tail = &context.calls[context.calls.len() - 8..];
        assert_eq!(
            tail,
            &[
                Call::Viewport(Viewport {
                    x: 0,
                    y: 0,
                    width: 300,
                    height: 150
                }),
                Call::ClearColor(ClearColor::OPAQUE_BLACK),
                Call::Clear,
                Call::UseProgram(Some(3)),
                Call::EnableAttrib(0),
                Call::BindArrayBuffer(Some(4)),
                Call::AttribPointer(
                    0,
                    VertexAttribLayout {
                        components: 2,
                        attrib_type: AttribType::Float,
                        normalized: false,
                        stride: 0,
                        offset: 0,
                    }
                ),
                Call::DrawArrays {
                    mode: DrawMode::Triangles,
                    first: 0,
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn vertex_compile_failure_releases_shader_and_skips_draw() {
        let mut context = RecordingContext {
            failing_shader: Some(ShaderKind::Vertex),
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Compile {
                kind: ShaderKind::Vertex,
                ..
            }
        ));
        assert!(context.draw_calls().is_empty());
        assert!(context.calls.contains(&Call::DeleteShader(1)));
        assert!(context.live_shaders.is_empty());
        assert!(!context.calls.contains(&Call::CreateProgram));
    }

    #[test]
    fn fragment_compile_failure_releases_both_shaders() {
        let mut context = RecordingContext {
            failing_shader: Some(ShaderKind::Fragment),
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: ERROR: 0:1: shader 2 is broken"
        );
        assert!(context.live_shaders.is_empty());
        assert!(context.draw_calls().is_empty());
    }

    #[test]
    fn link_failure_releases_program() {
        let mut context = RecordingContext {
            failing_link: true,
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert!(matches!(err, RenderError::Link { .. }));
        assert!(context.live_programs.is_empty());
        assert!(context.live_shaders.is_empty());
        assert!(context.draw_calls().is_empty());
    }

    #[test]
    fn missing_attribute_aborts() {
        let mut context = RecordingContext {
            attributes: vec!["a_color"],
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert!(matches!(err, RenderError::MissingAttribute("a_position")));
        assert!(context.live_programs.is_empty());
        assert!(context.draw_calls().is_empty());
    }

    #[test]
    fn upload_failure_releases_program_and_buffer() {
        let mut context = RecordingContext {
            failing_upload: true,
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert!(matches!(err, RenderError::Backend(BackendError::Device(_))));
        assert!(context.live_programs.is_empty());
        assert!(context.live_buffers.is_empty());
        assert!(context.live_shaders.is_empty());
        assert!(context.draw_calls().is_empty());
    }

    #[test]
    fn draw_failure_releases_program_and_buffer() {
        let mut context = RecordingContext {
            failing_draw: true,
            ..Default::default()
        };
        let err = start(&mut context, &sources(), &TriangleScene::default()).unwrap_err();
        assert_eq!(err.to_string(), "device lost");
        assert!(context.calls.contains(&Call::DeleteBuffer(4)));
        assert!(context.calls.contains(&Call::DeleteProgram(3)));
        assert!(context.live_programs.is_empty());
        assert!(context.live_buffers.is_empty());
    }

    #[test]
    fn successful_draw_keeps_program_and_buffer() {
        let mut context = RecordingContext::default();
        start(&mut context, &sources(), &TriangleScene::default()).unwrap();
        assert_eq!(context.live_programs.len(), 1);
        assert_eq!(context.live_buffers.len(), 1);
    }

    #[test]
    fn draw_count_follows_positions() {
        static TWO_TRIANGLES: &[[f32; 2]] = &[[0., 0.], [1., 0.], [0., 1.], [1., 1.], [1., 0.], [0., 1.]];
        let scene = TriangleScene {
            positions: TWO_TRIANGLES,
            ..TriangleScene::default()
        };
        let mut context = RecordingContext::default();
        let draw_call = start(&mut context, &sources(), &scene).unwrap();
        assert_eq!(draw_call.count, 6);
        assert_eq!(context.uploaded_floats().len(), 12);
    }

    #[test]
    fn cold_restart_gives_identical_draw() {
        let mut first_context = RecordingContext::default();
        let mut second_context = RecordingContext::default();
        let scene = TriangleScene::default();
        let first = start(&mut first_context, &sources(), &scene).unwrap();
        let second = start(&mut second_context, &sources(), &scene).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_context.calls, second_context.calls);
    }
}
