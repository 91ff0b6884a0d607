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

use std::path::PathBuf;

use log::warn;
use web_time::Duration;

use crate::gl::Dimensions;

pub const VERTEX_SHADER_URL: &str = "ColoredTriangle.vert";
pub const FRAGMENT_SHADER_URL: &str = "ColoredTriangle.frag";

pub const ENV_HEADLESS: &str = "HEADLESS";
pub const ENV_ASSETS_DIR: &str = "ASSETS_DIR";
pub const ENV_FETCH_TIMEOUT_MS: &str = "FETCH_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub vertex_url: String,
    pub fragment_url: String,
    /// Root the shader urls resolve against on native targets.
    pub assets_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub headless: bool,
    pub canvas_size: Dimensions,
}

impl LaunchConfig {
    pub const DEFAULT_ASSETS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/native");
    pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
    // Size of a canvas element without width/height attributes.
    pub const DEFAULT_CANVAS_SIZE: Dimensions = Dimensions {
        width: 300,
        height: 150,
    };

    /// Applies environment overrides on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.headless = lookup(ENV_HEADLESS).is_some();
        if let Some(dir) = lookup(ENV_ASSETS_DIR) {
            config.assets_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_FETCH_TIMEOUT_MS) {
            match value.parse::<u64>() {
                Ok(millis) => config.fetch_timeout = Duration::from_millis(millis),
                Err(err) => warn!("Ignoring {ENV_FETCH_TIMEOUT_MS}={value}: {err}"),
            }
        }
        config
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            vertex_url: VERTEX_SHADER_URL.to_owned(),
            fragment_url: FRAGMENT_SHADER_URL.to_owned(),
            assets_dir: PathBuf::from(Self::DEFAULT_ASSETS_DIR),
            fetch_timeout: Self::DEFAULT_FETCH_TIMEOUT,
            headless: false,
            canvas_size: Self::DEFAULT_CANVAS_SIZE,
        }
    }
}
