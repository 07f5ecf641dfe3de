// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::future;

use segbuf::{Buffer, ErrorKind};

use super::FakeError;
use crate::AsyncRawSink;

/// An [`AsyncRawSink`] that collects everything written to it in memory.
///
/// Every operation completes immediately, except for the graceful close of a sink created via
/// [`with_pending_close()`][Self::with_pending_close]. For test and example purposes only.
///
/// # Example
///
/// ```
/// # testing_aids::execute_or_terminate_process(|| futures::executor::block_on(async {
/// use segbuf_io::AsyncSink;
/// use segbuf_io::testing::FakeAsyncSink;
///
/// let mut sink = AsyncSink::new(FakeAsyncSink::new());
///
/// sink.buffer_mut().write_slice(b"hello");
/// sink.flush().await.unwrap();
///
/// assert_eq!(sink.get_ref().written(), b"hello");
/// assert_eq!(sink.get_ref().flushes(), 1);
/// # }));
/// ```
#[derive(Debug, Default)]
pub struct FakeAsyncSink {
    written: Vec<u8>,
    writes: usize,
    flushes: usize,
    fail_writes: bool,
    close_never_completes: bool,
    closed: bool,
    closed_abruptly: bool,
}

impl FakeAsyncSink {
    /// Creates a sink that accepts all writes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink whose every write fails with an injected error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Creates a sink that accepts writes and flushes but whose graceful close never
    /// completes.
    #[must_use]
    pub fn with_pending_close() -> Self {
        Self {
            close_never_completes: true,
            ..Self::default()
        }
    }

    /// All bytes written so far.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// The number of write calls so far, including failed ones.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// The number of flush calls so far.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Whether [`close()`][AsyncRawSink::close] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether [`close_abruptly()`][AsyncRawSink::close_abruptly] has been called.
    #[must_use]
    pub fn is_closed_abruptly(&self) -> bool {
        self.closed_abruptly
    }

    fn check_open(&self) -> Result<(), FakeError> {
        if self.closed || self.closed_abruptly {
            return Err(segbuf::Error::from(ErrorKind::Closed).into());
        }

        Ok(())
    }
}

impl AsyncRawSink for FakeAsyncSink {
    type Error = FakeError;

    async fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), FakeError> {
        self.writes += 1;
        self.check_open()?;

        if self.fail_writes {
            return Err(FakeError::injected("write"));
        }

        self.written.extend(source.read_byte_array_exact(byte_count)?);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), FakeError> {
        self.check_open()?;
        self.flushes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FakeError> {
        if self.close_never_completes {
            return future::pending().await;
        }

        self.closed = true;
        Ok(())
    }

    fn close_abruptly(&mut self) {
        self.closed_abruptly = true;
    }
}
