//! Server-sent-event accumulator for streamed chat completions.
//!
//! Bytes go in as they arrive; the accumulator splits them into `data:` lines,
//! appends every content delta and tracks how the stream ended.

use crate::domain::error::{AppError, Result};
use crate::domain::model_response::{InvocationMode, RawModelResponse};
use crate::domain::operation::OperationRef;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Reading,
    /// `[DONE]` arrived, or the body ended after a finish reason.
    Completed,
    /// The body ended with no terminal event.
    TruncatedEnd,
    ConnectionError,
}

#[derive(Debug)]
pub struct StreamAccumulator {
    state: StreamState,
    pending: Vec<u8>,
    content: String,
    finish_reason: Option<String>,
    error: Option<String>,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self {
            state: StreamState::Reading,
            pending: Vec::with_capacity(512),
            content: String::new(),
            finish_reason: None,
            error: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_done(&self) -> bool {
        self.state != StreamState::Reading
    }

    /// Feeds raw body bytes. Lines may be split across chunks, and so may
    /// multi-byte characters, so only complete lines are decoded.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.is_done() {
            return;
        }
        self.pending.extend_from_slice(chunk);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
            if self.is_done() {
                self.pending.clear();
                return;
            }
        }
    }

    /// Records a transport failure in the middle of the body.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.state == StreamState::Reading {
            self.state = StreamState::ConnectionError;
            self.error = Some(error.into());
        }
    }

    /// Called once the body is exhausted.
    pub fn finish(&mut self) -> StreamState {
        if self.state == StreamState::Reading && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.handle_line(&String::from_utf8_lossy(&line));
        }
        if self.state == StreamState::Reading {
            self.state = if self.finish_reason.is_some() {
                StreamState::Completed
            } else {
                StreamState::TruncatedEnd
            };
        }
        self.state
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();
        if data == "[DONE]" {
            self.state = StreamState::Completed;
            return;
        }

        let event: Value = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unparseable stream event");
                return;
            }
        };

        if let Some(error) = event.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            self.fail(format!("Stream error event: {}", message));
            return;
        }

        let choice = &event["choices"][0];
        if let Some(delta) = choice["delta"]["content"].as_str() {
            self.content.push_str(delta);
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            self.finish_reason = Some(reason.to_string());
        }
    }

    /// Converts the accumulated stream into a response. A non-empty partial
    /// buffer always survives as a truncated response.
    pub fn into_response(mut self, operation: OperationRef) -> Result<RawModelResponse> {
        let state = self.finish();
        if state == StreamState::ConnectionError && self.content.trim().is_empty() {
            return Err(AppError::TransportError(
                self.error
                    .unwrap_or_else(|| "Stream closed before any content".to_string()),
            ));
        }

        let response = RawModelResponse::new(operation, self.content, InvocationMode::Streaming)
            .with_finish_reason(self.finish_reason);
        if state == StreamState::Completed {
            Ok(response)
        } else {
            tracing::warn!(
                operation = %response.operation,
                state = ?state,
                error = self.error.as_deref().unwrap_or(""),
                bytes = response.text.len(),
                "stream ended abnormally, keeping partial content"
            );
            Ok(response.mark_truncated())
        }
    }
}
