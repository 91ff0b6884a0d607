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

//! Tracks the arrival of both shader stages and reports readiness once.

use log::{debug, warn};

use crate::fetch::{FetchCompletion, FetchError};
use crate::shader::{ShaderKind, ShaderSource, ShaderSources};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Fetched(FetchCompletion),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("timed out waiting for shader sources: {missing:?}")]
    Timeout { missing: Vec<ShaderKind> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AwaitingBoth,
    AwaitingOne,
    Ready,
    Failed,
}

impl GateState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, GateState::Ready | GateState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Pending,
    Ready(ShaderSources),
    Failed(LoadError),
    /// The gate already reported `Ready` or `Failed`.
    Closed,
}

#[derive(Debug, Default)]
struct SourceSlots {
    vertex: Option<ShaderSource>,
    fragment: Option<ShaderSource>,
}

impl SourceSlots {
    fn slot_mut(&mut self, kind: ShaderKind) -> &mut Option<ShaderSource> {
        match kind {
            ShaderKind::Vertex => &mut self.vertex,
            ShaderKind::Fragment => &mut self.fragment,
        }
    }
    fn missing(&self) -> Vec<ShaderKind> {
        ShaderKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                ShaderKind::Vertex => self.vertex.is_none(),
                ShaderKind::Fragment => self.fragment.is_none(),
            })
            .collect()
    }
}

#[derive(Debug)]
pub struct ReadinessGate {
    slots: SourceSlots,
    state: GateState,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SourceSlots::default(),
            state: GateState::AwaitingBoth,
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn handle(&mut self, event: LoadEvent) -> GateStatus {
        match event {
            LoadEvent::Fetched(completion) => match completion.into_result() {
                Ok(source) => self.on_source_loaded(source),
                Err(err) => self.on_fetch_failed(err),
            },
            LoadEvent::TimedOut => self.on_timeout(),
        }
    }

    pub fn on_source_loaded(&mut self, source: ShaderSource) -> GateStatus {
        if self.state.is_terminal() {
            debug!("Ignoring {} shader, gate is closed", source.kind());
            return GateStatus::Closed;
        }
        let kind = source.kind();
        if self.slots.slot_mut(kind).replace(source).is_some() {
            warn!("Replacing previously loaded {kind} shader");
        }
        let status = match (&self.slots.vertex, &self.slots.fragment) {
            (Some(vertex), Some(fragment)) => {
                self.state = GateState::Ready;
                GateStatus::Ready(ShaderSources {
                    vertex: vertex.clone(),
                    fragment: fragment.clone(),
                })
            }
            _ => {
                self.state = GateState::AwaitingOne;
                GateStatus::Pending
            }
        };
        debug!("Loaded {kind} shader, gate is now {:?}", self.state);
        status
    }

    pub fn on_fetch_failed(&mut self, err: FetchError) -> GateStatus {
        if self.state.is_terminal() {
            debug!("Ignoring failure of {}, gate is closed", err.url);
            return GateStatus::Closed;
        }
        self.state = GateState::Failed;
        GateStatus::Failed(LoadError::Fetch(err))
    }

    pub fn on_timeout(&mut self) -> GateStatus {
        if self.state.is_terminal() {
            return GateStatus::Closed;
        }
        self.state = GateState::Failed;
        GateStatus::Failed(LoadError::Timeout {
            missing: self.slots.missing(),
        })
    }
}
