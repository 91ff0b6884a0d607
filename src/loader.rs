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

use log::{debug, error, info};
use web_time::Instant;

use crate::gate::{GateStatus, LoadError, LoadEvent, ReadinessGate};
use crate::gl::GraphicsContext;
use crate::renderer::{self, DrawCall, RenderError, TriangleScene};

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("shader loading failed: {0}")]
    Load(#[from] LoadError),
    #[error("renderer initialization failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug)]
pub enum Progress<'a> {
    Waiting,
    Finished(&'a Result<DrawCall, InitError>),
}

/// Feeds fetch completions to the readiness gate and runs the renderer
/// initializer the one time the gate opens.
pub struct LoadSequence<C: GraphicsContext> {
    gate: ReadinessGate,
    context: C,
    scene: TriangleScene,
    started_at: Instant,
    outcome: Option<Result<DrawCall, InitError>>,
}

impl<C: GraphicsContext> LoadSequence<C> {
    pub fn new(context: C, scene: TriangleScene) -> Self {
        Self {
            gate: ReadinessGate::new(),
            context,
            scene,
            started_at: Instant::now(),
            outcome: None,
        }
    }

    pub fn deliver(&mut self, event: LoadEvent) -> Progress<'_> {
        if self.outcome.is_some() {
            debug!("Load sequence already finished, dropping {event:?}");
            return self.progress();
        }
        match self.gate.handle(event) {
            GateStatus::Pending | GateStatus::Closed => {}
            GateStatus::Ready(sources) => {
                info!("Shader sources ready after {:?}", self.started_at.elapsed());
                let result = renderer::start(&mut self.context, &sources, &self.scene)
                    .map_err(InitError::from);
                if let Err(err) = &result {
                    error!("{err}");
                }
                self.outcome = Some(result);
            }
            GateStatus::Failed(err) => {
                let err = InitError::from(err);
                error!("{err}");
                self.outcome = Some(Err(err));
            }
        }
        self.progress()
    }

    #[must_use]
    pub fn progress(&self) -> Progress<'_> {
        self.outcome
            .as_ref()
            .map_or(Progress::Waiting, Progress::Finished)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_parts(self) -> (C, Option<Result<DrawCall, InitError>>) {
        (self.context, self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchCompletion, FetchOutcome, FetchRequest, FetchStatus};
    use crate::gl::recording::RecordingContext;
    use crate::shader::ShaderKind;

    fn success(kind: ShaderKind) -> LoadEvent {
        let mut request = FetchRequest::new(format!("ColoredTriangle.{kind}"), kind);
        request.settle(FetchStatus::Success);
        LoadEvent::Fetched(FetchCompletion {
            request,
            outcome: FetchOutcome::Success {
                text: format!("{kind} source"),
            },
        })
    }

    fn not_found(kind: ShaderKind) -> LoadEvent {
        let mut request = FetchRequest::new(format!("ColoredTriangle.{kind}"), kind);
        request.settle(FetchStatus::FailedNotFound);
        LoadEvent::Fetched(FetchCompletion {
            request,
            outcome: FetchOutcome::NotFound,
        })
    }

    fn sequence() -> LoadSequence<RecordingContext> {
        LoadSequence::new(RecordingContext::default(), TriangleScene::default())
    }

    #[test]
    fn initializer_fires_once_for_every_ordering() {
        let orderings = [
            vec![success(ShaderKind::Vertex), success(ShaderKind::Fragment)],
            vec![success(ShaderKind::Fragment), success(ShaderKind::Vertex)],
            vec![
                success(ShaderKind::Vertex),
                success(ShaderKind::Vertex),
                success(ShaderKind::Fragment),
                success(ShaderKind::Fragment),
            ],
        ];
        for events in orderings {
            let mut sequence = sequence();
            let last = events.len() - 1;
            let mut finished_at = None;
            for (index, event) in events.into_iter().enumerate() {
                if matches!(sequence.deliver(event), Progress::Finished(_)) && finished_at.is_none() {
                    finished_at = Some(index);
                }
            }
            assert!(finished_at.is_some_and(|index| index <= last));
            let (context, outcome) = sequence.into_parts();
            assert_eq!(context.draw_calls().len(), 1);
            assert!(matches!(outcome, Some(Ok(_))));
        }
    }

    #[test]
    fn fires_on_second_distinct_completion() {
        let mut sequence = sequence();
        assert!(matches!(
            sequence.deliver(success(ShaderKind::Fragment)),
            Progress::Waiting
        ));
        assert!(matches!(
            sequence.deliver(success(ShaderKind::Vertex)),
            Progress::Finished(Ok(_))
        ));
    }

    #[test]
    fn missing_completion_never_draws_until_timeout() {
        let mut sequence = sequence();
        sequence.deliver(success(ShaderKind::Vertex));
        assert!(!sequence.is_finished());
        assert!(sequence.context_mut().draw_calls().is_empty());
        assert!(matches!(
            sequence.deliver(LoadEvent::TimedOut),
            Progress::Finished(Err(InitError::Load(LoadError::Timeout { .. })))
        ));
        sequence.deliver(success(ShaderKind::Fragment));
        let (context, _) = sequence.into_parts();
        assert!(context.draw_calls().is_empty());
    }

    #[test]
    fn fetch_failure_finishes_without_drawing() {
        let mut sequence = sequence();
        assert!(matches!(
            sequence.deliver(not_found(ShaderKind::Vertex)),
            Progress::Finished(Err(InitError::Load(LoadError::Fetch(_))))
        ));
        sequence.deliver(success(ShaderKind::Fragment));
        sequence.deliver(success(ShaderKind::Vertex));
        let (context, _) = sequence.into_parts();
        assert!(context.calls.is_empty());
    }

    #[test]
    fn render_failure_is_reported() {
        let context = RecordingContext {
            failing_link: true,
            ..Default::default()
        };
        let mut sequence = LoadSequence::new(context, TriangleScene::default());
        sequence.deliver(success(ShaderKind::Vertex));
        assert!(matches!(
            sequence.deliver(success(ShaderKind::Fragment)),
            Progress::Finished(Err(InitError::Render(RenderError::Link { .. })))
        ));
    }
}
