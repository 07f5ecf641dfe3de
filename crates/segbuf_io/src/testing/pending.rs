// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::future;

use segbuf::Buffer;

use super::FakeError;
use crate::{AsyncRawSink, AsyncRawSource};

/// An [`AsyncRawSource`] and [`AsyncRawSink`] whose operations never complete.
///
/// As a source, it first produces an optional prefix and then suspends forever. Records
/// whether it was closed abruptly, which is how a pending operation gets abandoned.
///
/// Intended for testing cancellation and aborts.
#[derive(Debug, Default)]
pub struct Pending {
    prefix: Option<Buffer>,
    closed_abruptly: bool,
}

impl Pending {
    /// Creates an instance whose every operation suspends forever.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that produces `prefix` and then suspends forever.
    #[must_use]
    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            prefix: Some(Buffer::copied_from_slice(prefix)),
            closed_abruptly: false,
        }
    }

    /// Whether `close_abruptly()` has been called.
    #[must_use]
    pub fn is_closed_abruptly(&self) -> bool {
        self.closed_abruptly
    }
}

impl AsyncRawSource for Pending {
    type Error = FakeError;

    #[cfg_attr(test, mutants::skip)] // Never completes, pointless to mutate.
    async fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, FakeError> {
        if let Some(prefix) = self.prefix.as_mut().filter(|prefix| !prefix.is_empty()) {
            return Ok(prefix.read_at_most_to_buffer(sink, byte_count));
        }

        future::pending().await
    }

    #[cfg_attr(test, mutants::skip)] // Never completes, pointless to mutate.
    async fn close(&mut self) -> Result<(), FakeError> {
        future::pending().await
    }

    fn close_abruptly(&mut self) {
        self.closed_abruptly = true;
    }
}

impl AsyncRawSink for Pending {
    type Error = FakeError;

    #[cfg_attr(test, mutants::skip)] // Never completes, pointless to mutate.
    async fn write(&mut self, _source: &mut Buffer, _byte_count: usize) -> Result<(), FakeError> {
        future::pending().await
    }

    #[cfg_attr(test, mutants::skip)] // Never completes, pointless to mutate.
    async fn flush(&mut self) -> Result<(), FakeError> {
        future::pending().await
    }

    #[cfg_attr(test, mutants::skip)] // Never completes, pointless to mutate.
    async fn close(&mut self) -> Result<(), FakeError> {
        future::pending().await
    }

    fn close_abruptly(&mut self) {
        self.closed_abruptly = true;
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::pin::pin;
    use std::task::{Context, Poll, Waker};

    use super::*;

    #[test]
    fn prefix_then_pending() {
        let mut source = Pending::with_prefix(b"abc");
        let mut sink = Buffer::new();
        let mut cx = Context::from_waker(Waker::noop());

        for expected in [2, 1] {
            let read = pin!(AsyncRawSource::read_at_most_to(&mut source, &mut sink, 2));
            assert!(matches!(read.poll(&mut cx), Poll::Ready(Ok(count)) if count == expected));
        }

        {
            let read = pin!(AsyncRawSource::read_at_most_to(&mut source, &mut sink, 2));
            assert!(read.poll(&mut cx).is_pending());
        }

        assert_eq!(sink.read_byte_array(), b"abc");
    }

    #[test]
    fn write_never_completes() {
        let mut sink = Pending::new();
        let mut source = Buffer::copied_from_slice(b"abc");
        let mut cx = Context::from_waker(Waker::noop());

        {
            let write = pin!(sink.write(&mut source, 3));
            assert!(write.poll(&mut cx).is_pending());
        }

        AsyncRawSink::close_abruptly(&mut sink);
        assert!(sink.is_closed_abruptly());
    }
}
