// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

/// Captures formatted log output so tests can assert on it.
///
/// Install [`subscriber()`][Self::subscriber] with `tracing::subscriber::set_default()` to capture
/// the events emitted on the current thread, at every level.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates a capture with no output yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured log output.
    #[must_use]
    pub fn output(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).to_string()
    }

    /// Asserts that the captured log output contains `expected`.
    ///
    /// # Panics
    ///
    /// Panics if it does not.
    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(
            output.contains(expected),
            "log output does not contain '{expected}', got:\n{output}"
        );
    }

    /// A subscriber that writes every event to this capture.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_filter(LevelFilter::TRACE);

        tracing_subscriber::registry().with(layer)
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Appends to the buffer of a [`LogCapture`].
#[derive(Debug)]
pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn capture_records_trace_events() {
        let capture = LogCapture::new();

        tracing::subscriber::with_default(capture.subscriber(), || {
            tracing::event!(Level::TRACE, message = "segment discarded", bytes = 16);
        });

        capture.assert_contains("segment discarded");
        capture.assert_contains("bytes=16");
    }
}
