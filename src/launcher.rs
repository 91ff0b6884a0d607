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

use log::info;

use crate::config::LaunchConfig;

const GLOBAL_LOG_FILTER: log::LevelFilter = log::LevelFilter::Info;

/// Entry point shared by the native binary and the wasm module.
pub fn launch_app() {
    init_log();
    info!("Init app");
    #[cfg(target_arch = "wasm32")]
    crate::web::launch(&LaunchConfig::default());
    #[cfg(not(target_arch = "wasm32"))]
    {
        let config = LaunchConfig::from_env();
        if config.headless {
            info!("Running in headless mode");
            init_headless(&config);
        } else {
            crate::window::init_event_loop(config);
        }
    }
}

fn init_log() {
    let mut builder = fern::Dispatch::new();
    let level_formatter;
    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        level_formatter = |level| level;
        builder = builder.chain(fern::Output::call(console_log::log));
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use fern::colors::{Color, ColoredLevelConfig};
        let colors = ColoredLevelConfig::new()
            .info(Color::Blue)
            .debug(Color::Green);
        level_formatter = move |level| colors.color(level);
        builder = builder.chain(std::io::stdout());
    }
    let applied = builder
        .level(GLOBAL_LOG_FILTER)
        .level_for(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}:{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                level_formatter(record.level()),
                record.target(),
                record.line().unwrap_or_default(),
                message
            ));
        })
        .apply();
    if let Err(err) = applied {
        eprintln!("Logger already initialized: {err}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use native::{init_headless, run_load_sequence};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::sync::mpsc;
    use std::thread;

    use log::{error, info};
    use pollster::FutureExt;
    use web_time::Instant;

    use crate::config::LaunchConfig;
    use crate::draw_context::DrawContext;
    use crate::fetch::{FileFetcher, load_shader_file};
    use crate::gate::LoadEvent;
    use crate::gl::GraphicsContext;
    use crate::gl::native::WgpuContext;
    use crate::loader::LoadSequence;
    use crate::renderer::TriangleScene;
    use crate::shader::ShaderKind;

    /// Fetches both shaders on their own threads and feeds the completions to
    /// a new load sequence until it finishes or the fetch deadline expires.
    pub(crate) fn run_load_sequence<C: GraphicsContext>(
        context: C,
        config: &LaunchConfig,
    ) -> LoadSequence<C> {
        let fetcher = FileFetcher::new(&config.assets_dir);
        let (sender, receiver) = mpsc::channel();
        for (url, kind) in [
            (config.vertex_url.clone(), ShaderKind::Vertex),
            (config.fragment_url.clone(), ShaderKind::Fragment),
        ] {
            let fetcher = fetcher.clone();
            let sender = sender.clone();
            thread::spawn(move || {
                let completion = load_shader_file(&fetcher, &url, kind).block_on();
                // Nobody listens anymore once the sequence has finished.
                let _ = sender.send(LoadEvent::Fetched(completion));
            });
        }
        drop(sender);

        let mut sequence = LoadSequence::new(context, TriangleScene::default());
        let deadline = Instant::now() + config.fetch_timeout;
        while !sequence.is_finished() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = receiver.recv_timeout(remaining).unwrap_or(LoadEvent::TimedOut);
            sequence.deliver(event);
        }
        sequence
    }

    pub(crate) fn init_headless(config: &LaunchConfig) {
        let draw_context = match DrawContext::new(None, Some(config.canvas_size)).block_on() {
            Ok(draw_context) => draw_context,
            Err(err) => {
                error!("Could not acquire a graphics context: {err:#}");
                return;
            }
        };
        let sequence = run_load_sequence(WgpuContext::new(draw_context), config);
        if let (_, Some(Ok(draw_call))) = sequence.into_parts() {
            info!("Headless run finished with {draw_call:?}");
        }
    }

    #[cfg(test)]
    mod tests {
        use std::path::PathBuf;

        use super::*;
        use crate::fetch::{FetchError, FetchErrorStatus};
        use crate::gate::LoadError;
        use crate::gl::recording::RecordingContext;
        use crate::loader::InitError;

        fn config_with_assets(assets_dir: PathBuf) -> LaunchConfig {
            LaunchConfig {
                assets_dir,
                ..LaunchConfig::default()
            }
        }

        #[test]
        fn bundled_shaders_draw_once() {
            let config = LaunchConfig::default();
            let sequence = run_load_sequence(RecordingContext::default(), &config);
            let (context, outcome) = sequence.into_parts();
            assert!(matches!(outcome, Some(Ok(_))));
            assert_eq!(context.draw_calls().len(), 1);
        }

        #[test]
        fn missing_assets_report_fetch_error() {
            let config = config_with_assets(PathBuf::from("/nonexistent/colored-triangle"));
            let sequence = run_load_sequence(RecordingContext::default(), &config);
            let (context, outcome) = sequence.into_parts();
            let Some(Err(InitError::Load(LoadError::Fetch(FetchError { url, status })))) = &outcome
            else {
                panic!("expected a fetch error, got {outcome:?}");
            };
            assert!(url == "ColoredTriangle.vert" || url == "ColoredTriangle.frag");
            assert_eq!(*status, FetchErrorStatus::NotFound);
            assert!(context.draw_calls().is_empty());
        }
    }
}
