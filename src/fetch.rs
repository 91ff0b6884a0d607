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
use std::future::Future;

use log::{debug, warn};

use crate::shader::{ShaderKind, ShaderSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Pending,
    Success,
    FailedNotFound,
    FailedOther,
}

impl FetchStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchStatus::Pending)
    }
}

/// Raw result of a transport, before it is attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { text: String },
    NotFound,
    TransportError(String),
}

impl FetchOutcome {
    fn status(&self) -> FetchStatus {
        match self {
            FetchOutcome::Success { .. } => FetchStatus::Success,
            FetchOutcome::NotFound => FetchStatus::FailedNotFound,
            FetchOutcome::TransportError(_) => FetchStatus::FailedOther,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub kind: ShaderKind,
    status: FetchStatus,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, kind: ShaderKind) -> Self {
        Self {
            url: url.into(),
            kind,
            status: FetchStatus::Pending,
        }
    }

    #[must_use]
    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// Records the first definitive status. Returns false if the request had
    /// already settled, in which case nothing changes.
    pub fn settle(&mut self, status: FetchStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorStatus {
    NotFound,
    Other(String),
}

impl fmt::Display for FetchErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorStatus::NotFound => f.write_str("not found"),
            FetchErrorStatus::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not fetch {url}: {status}")]
pub struct FetchError {
    pub url: String,
    pub status: FetchErrorStatus,
}

/// A settled request, as delivered to the readiness gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCompletion {
    pub request: FetchRequest,
    pub outcome: FetchOutcome,
}

impl FetchCompletion {
    pub fn into_result(self) -> Result<ShaderSource, FetchError> {
        let FetchCompletion { request, outcome } = self;
        match outcome {
            FetchOutcome::Success { text } => Ok(ShaderSource::new(request.kind, text)),
            FetchOutcome::NotFound => Err(FetchError {
                url: request.url,
                status: FetchErrorStatus::NotFound,
            }),
            FetchOutcome::TransportError(reason) => Err(FetchError {
                url: request.url,
                status: FetchErrorStatus::Other(reason),
            }),
        }
    }
}

const HTTP_NOT_FOUND: u16 = 404;

/// Maps an HTTP response status to a failed outcome. `None` means the body
/// should be read as the shader text.
#[must_use]
pub fn outcome_for_status(status: u16, ok: bool, status_text: &str) -> Option<FetchOutcome> {
    if status == HTTP_NOT_FOUND {
        return Some(FetchOutcome::NotFound);
    }
    if ok {
        return None;
    }
    let reason = if status_text.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status} {status_text}")
    };
    Some(FetchOutcome::TransportError(reason))
}

pub trait ResourceFetcher {
    fn fetch_text(&self, url: &str) -> impl Future<Output = FetchOutcome>;
}

pub async fn load_shader_file<F: ResourceFetcher>(
    fetcher: &F,
    url: &str,
    kind: ShaderKind,
) -> FetchCompletion {
    let mut request = FetchRequest::new(url, kind);
    debug!("Fetching {kind} shader from {url}");
    let outcome = fetcher.fetch_text(url).await;
    request.settle(outcome.status());
    match &outcome {
        FetchOutcome::Success { text } => {
            debug!("Fetched {kind} shader {url} ({} bytes)", text.len());
        }
        FetchOutcome::NotFound => warn!("Shader {url} not found"),
        FetchOutcome::TransportError(reason) => warn!("Fetching shader {url} failed: {reason}"),
    }
    FetchCompletion { request, outcome }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileFetcher;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::io;
    use std::path::PathBuf;

    use super::{FetchOutcome, ResourceFetcher};

    /// Resolves urls against a local directory, which plays the role of the
    /// page origin.
    #[derive(Debug, Clone)]
    pub struct FileFetcher {
        root: PathBuf,
    }

    impl FileFetcher {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }
    }

    impl ResourceFetcher for FileFetcher {
        async fn fetch_text(&self, url: &str) -> FetchOutcome {
            let path = self.root.join(url.trim_start_matches('/'));
            match std::fs::read_to_string(&path) {
                Ok(text) => FetchOutcome::Success { text },
                Err(err) if err.kind() == io::ErrorKind::NotFound => FetchOutcome::NotFound,
                Err(err) => FetchOutcome::TransportError(format!("{}: {err}", path.display())),
            }
        }
    }
}
