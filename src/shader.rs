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

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 2] = [ShaderKind::Vertex, ShaderKind::Fragment];
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderKind::Vertex => f.write_str("vertex"),
            ShaderKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// GLSL source text of a single shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    kind: ShaderKind,
    text: String,
}

impl ShaderSource {
    pub fn new(kind: ShaderKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
    #[must_use]
    pub fn kind(&self) -> ShaderKind {
        self.kind
    }
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Both stages, ready to be compiled and linked together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

impl ShaderSources {
    #[must_use]
    pub fn get(&self, kind: ShaderKind) -> &ShaderSource {
        match kind {
            ShaderKind::Vertex => &self.vertex,
            ShaderKind::Fragment => &self.fragment,
        }
    }
}
