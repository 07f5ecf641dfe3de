// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use segbuf::{Buffer, ErrorKind};

use super::FakeError;
use crate::AsyncRawSource;

/// An [`AsyncRawSource`] that reads from an in-memory byte sequence.
///
/// Every read completes immediately. For test and example purposes only.
///
/// # Example
///
/// ```
/// # testing_aids::execute_or_terminate_process(|| futures::executor::block_on(async {
/// use segbuf_io::AsyncSource;
/// use segbuf_io::testing::FakeAsyncSource;
///
/// let mut source = AsyncSource::new(FakeAsyncSource::new(b"hello"));
///
/// source.require(5).await.unwrap();
/// assert_eq!(source.buffer_mut().read_byte_array(), b"hello");
/// # }));
/// ```
#[derive(Debug)]
pub struct FakeAsyncSource {
    contents: Buffer,
    max_read_size: Option<NonZero<usize>>,
    fail_after: Option<usize>,
    delivered: usize,
    reads: usize,
    closed: bool,
    closed_abruptly: bool,
}

impl FakeAsyncSource {
    /// Starts building a new `FakeAsyncSource`.
    pub fn builder() -> FakeAsyncSourceBuilder {
        FakeAsyncSourceBuilder::default()
    }

    /// Creates a source that produces `contents`, then reports the end of the stream.
    #[must_use]
    pub fn new(contents: &[u8]) -> Self {
        Self::builder().contents(contents).build()
    }

    /// The number of read calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// The number of bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.contents.len()
    }

    /// Whether [`close()`][AsyncRawSource::close] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether [`close_abruptly()`][AsyncRawSource::close_abruptly] has been called.
    #[must_use]
    pub fn is_closed_abruptly(&self) -> bool {
        self.closed_abruptly
    }
}

impl AsyncRawSource for FakeAsyncSource {
    type Error = FakeError;

    #[cfg_attr(test, mutants::skip)] // Mutations easily lead to infinite loops.
    async fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, FakeError> {
        self.reads += 1;

        if self.closed || self.closed_abruptly {
            return Err(segbuf::Error::from(ErrorKind::Closed).into());
        }

        let mut count = byte_count
            .min(self.contents.len())
            .min(self.max_read_size.map_or(usize::MAX, NonZero::get));

        if let Some(fail_after) = self.fail_after {
            if self.delivered >= fail_after {
                return Err(FakeError::injected("read"));
            }

            count = count.min(fail_after - self.delivered);
        }

        let read = self.contents.read_at_most_to_buffer(sink, count);
        self.delivered += read;
        Ok(read)
    }

    async fn close(&mut self) -> Result<(), FakeError> {
        self.closed = true;
        Ok(())
    }

    fn close_abruptly(&mut self) {
        self.closed_abruptly = true;
    }
}

/// Creates an instance of [`FakeAsyncSource`].
///
/// Access through [`FakeAsyncSource::builder()`].
#[derive(Debug, Default)]
#[must_use]
pub struct FakeAsyncSourceBuilder {
    contents: Vec<u8>,
    max_read_size: Option<NonZero<usize>>,
    fail_after: Option<usize>,
}

impl FakeAsyncSourceBuilder {
    /// The bytes to produce. Defaults to none.
    pub fn contents(mut self, contents: &[u8]) -> Self {
        self.contents = contents.to_vec();
        self
    }

    /// Restricts a single read to at most `max_read_size` bytes. Defaults to no limit.
    pub fn max_read_size(mut self, max_read_size: NonZero<usize>) -> Self {
        self.max_read_size = Some(max_read_size);
        self
    }

    /// Makes every read fail with an injected error once `byte_count` bytes have been
    /// produced. Defaults to never failing.
    pub fn fail_after(mut self, byte_count: usize) -> Self {
        self.fail_after = Some(byte_count);
        self
    }

    /// Builds the source with the provided configuration.
    #[must_use]
    pub fn build(self) -> FakeAsyncSource {
        FakeAsyncSource {
            contents: Buffer::copied_from_slice(&self.contents),
            max_read_size: self.max_read_size,
            fail_after: self.fail_after,
            delivered: 0,
            reads: 0,
            closed: false,
            closed_abruptly: false,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use new_zealand::nz;
    use testing_aids::async_test;

    use super::*;

    #[test]
    fn reads_in_limited_chunks() {
        async_test(async || {
            let mut source = FakeAsyncSource::builder()
                .contents(b"Hello, world!")
                .max_read_size(nz!(5))
                .build();
            let mut sink = Buffer::new();

            assert_eq!(source.read_at_most_to(&mut sink, 100).await.unwrap(), 5);
            assert_eq!(source.read_at_most_to(&mut sink, 2).await.unwrap(), 2);
            assert_eq!(source.read_at_most_to(&mut sink, 100).await.unwrap(), 5);
            assert_eq!(source.read_at_most_to(&mut sink, 100).await.unwrap(), 1);
            assert_eq!(source.read_at_most_to(&mut sink, 100).await.unwrap(), 0);

            assert_eq!(source.reads(), 5);
            assert_eq!(sink.read_byte_array(), b"Hello, world!");
        });
    }

    #[test]
    fn fails_after_configured_bytes() {
        async_test(async || {
            let mut source = FakeAsyncSource::builder().contents(b"abcdef").fail_after(4).build();
            let mut sink = Buffer::new();

            assert_eq!(source.read_at_most_to(&mut sink, 100).await.unwrap(), 4);
            let error = source.read_at_most_to(&mut sink, 100).await.unwrap_err();

            assert!(error.is_injected());
            assert_eq!(sink.len(), 4);
            assert_eq!(source.remaining(), 2);
        });
    }

    #[test]
    fn reads_after_close_fail() {
        async_test(async || {
            let mut source = FakeAsyncSource::new(b"abc");
            source.close_abruptly();

            let error = source.read_at_most_to(&mut Buffer::new(), 1).await.unwrap_err();

            assert_eq!(error.segbuf_kind(), Some(ErrorKind::Closed));
            assert!(source.is_closed_abruptly());
            assert!(!source.is_closed());
        });
    }
}
