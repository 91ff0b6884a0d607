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

//! Browser side: canvas bootstrap, `fetch` based shader loading and the
//! wasm entry point.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;
use log::{error, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{HtmlCanvasElement, Response, WebGlRenderingContext};

use crate::config::LaunchConfig;
use crate::fetch::{FetchOutcome, ResourceFetcher, load_shader_file, outcome_for_status};
use crate::gate::LoadEvent;
use crate::gl::Dimensions;
use crate::loader::LoadSequence;
use crate::renderer::TriangleScene;
use crate::shader::ShaderKind;

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Fetches urls relative to the page with the browser `fetch` API.
pub struct WebFetcher {
    window: web_sys::Window,
}

impl WebFetcher {
    #[must_use]
    pub fn new(window: web_sys::Window) -> Self {
        Self { window }
    }
}

impl ResourceFetcher for WebFetcher {
    async fn fetch_text(&self, url: &str) -> FetchOutcome {
        let response = match JsFuture::from(self.window.fetch_with_str(url)).await {
            Ok(response) => response,
            Err(err) => return FetchOutcome::TransportError(describe(&err)),
        };
        let Ok(response) = response.dyn_into::<Response>() else {
            return FetchOutcome::TransportError("fetch did not resolve to a Response".to_owned());
        };
        if let Some(failed) =
            outcome_for_status(response.status(), response.ok(), &response.status_text())
        {
            return failed;
        }
        let body = match response.text() {
            Ok(body) => body,
            Err(err) => return FetchOutcome::TransportError(describe(&err)),
        };
        match JsFuture::from(body).await {
            Ok(text) => text.as_string().map_or_else(
                || FetchOutcome::TransportError("response body is not text".to_owned()),
                |text| FetchOutcome::Success { text },
            ),
            Err(err) => FetchOutcome::TransportError(describe(&err)),
        }
    }
}

fn create_canvas_context(
    window: &web_sys::Window,
    size: Dimensions,
) -> anyhow::Result<WebGlRenderingContext> {
    let document = window
        .document()
        .ok_or_else(|| anyhow!("window has no document"))?;
    let canvas = document
        .create_element("canvas")
        .map_err(|err| anyhow!(describe(&err)))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| anyhow!("created element is not a canvas"))?;
    canvas.set_width(size.width);
    canvas.set_height(size.height);
    let body = document
        .body()
        .ok_or_else(|| anyhow!("document has no body"))?;
    body.append_child(&canvas)
        .map_err(|err| anyhow!(describe(&err)))?;
    canvas
        .get_context("webgl")
        .map_err(|err| anyhow!(describe(&err)))?
        .ok_or_else(|| anyhow!("WebGL is not supported by this browser"))?
        .dyn_into::<WebGlRenderingContext>()
        .map_err(|_| anyhow!("context is not a WebGlRenderingContext"))
}

pub fn launch(config: &LaunchConfig) {
    let Some(window) = web_sys::window() else {
        error!("No global window, not running in a browser");
        return;
    };
    let context = match create_canvas_context(&window, config.canvas_size) {
        Ok(context) => context,
        Err(err) => {
            error!("Could not acquire a WebGL context: {err:#}");
            return;
        }
    };
    let sequence = Rc::new(RefCell::new(LoadSequence::new(
        context,
        TriangleScene::default(),
    )));
    let fetcher = Rc::new(WebFetcher::new(window.clone()));
    for (url, kind) in [
        (config.vertex_url.clone(), ShaderKind::Vertex),
        (config.fragment_url.clone(), ShaderKind::Fragment),
    ] {
        let sequence = Rc::clone(&sequence);
        let fetcher = Rc::clone(&fetcher);
        spawn_local(async move {
            let completion = load_shader_file(fetcher.as_ref(), &url, kind).await;
            sequence.borrow_mut().deliver(LoadEvent::Fetched(completion));
        });
    }
    let on_timeout = Closure::once_into_js(move || {
        sequence.borrow_mut().deliver(LoadEvent::TimedOut);
    });
    let timeout_ms = i32::try_from(config.fetch_timeout.as_millis()).unwrap_or(i32::MAX);
    if let Err(err) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(on_timeout.unchecked_ref(), timeout_ms)
    {
        warn!("Could not arm the shader fetch timeout: {}", describe(&err));
    }
}

#[wasm_bindgen(start)]
pub fn run() {
    crate::launch_app();
}
