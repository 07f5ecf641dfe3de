// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conditions that an [`AsyncSource`][crate::AsyncSource] can wait for.
//!
//! Any `Fn(&Buffer, bool) -> bool` is a predicate. The functions in this module build the
//! common ones.
//!
//! ```
//! use segbuf::Buffer;
//! use segbuf_io::AwaitPredicate;
//! use segbuf_io::predicate::{contains_byte, data_available};
//!
//! let buffer = Buffer::copied_from_slice(b"line\n");
//!
//! assert!(data_available(5).test(&buffer, false));
//! assert!(contains_byte(b'\n').test(&buffer, false));
//!
//! let custom = |buffer: &Buffer, _exhausted: bool| buffer.first_slice().starts_with(b"li");
//! assert!(custom.test(&buffer, false));
//! ```

use segbuf::{Buffer, ByteString};

/// A pure condition over the bytes currently buffered and whether the source is exhausted.
///
/// Returns `true` when the condition of the caller can be satisfied from the buffered bytes
/// alone, with no further I/O.
pub trait AwaitPredicate {
    /// Evaluates the condition against `buffer`.
    ///
    /// `exhausted` is `true` once the source has reported the end of the stream, after which no
    /// more bytes will ever be appended.
    fn test(&self, buffer: &Buffer, exhausted: bool) -> bool;

    /// Evaluates the condition against `buffer`, given that an earlier evaluation returned
    /// `false` when the buffer held only its first `tested_len` bytes.
    ///
    /// [`AsyncSource::await_until()`][crate::AsyncSource::await_until] calls this after every
    /// read, as reads only ever append. Predicates that search the buffer override it to skip
    /// the part they have already searched. The result must be the same as that of
    /// [`test()`][Self::test].
    #[expect(unused_variables, reason = "only predicates that search the buffer need the tested length")]
    fn test_appended(&self, buffer: &Buffer, exhausted: bool, tested_len: usize) -> bool {
        self.test(buffer, exhausted)
    }
}

impl<F> AwaitPredicate for F
where
    F: Fn(&Buffer, bool) -> bool,
{
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn test(&self, buffer: &Buffer, exhausted: bool) -> bool {
        self(buffer, exhausted)
    }
}

/// Satisfied once at least `byte_count` bytes are buffered.
#[must_use]
pub fn data_available(byte_count: usize) -> impl AwaitPredicate + Send + Sync + Copy {
    move |buffer: &Buffer, _exhausted: bool| buffer.len() >= byte_count
}

/// Satisfied once `byte` is buffered.
#[must_use]
pub fn contains_byte(byte: u8) -> impl AwaitPredicate + Send + Sync + Copy {
    ContainsByte(byte)
}

#[derive(Clone, Copy, Debug)]
struct ContainsByte(u8);

impl AwaitPredicate for ContainsByte {
    fn test(&self, buffer: &Buffer, exhausted: bool) -> bool {
        self.test_appended(buffer, exhausted, 0)
    }

    fn test_appended(&self, buffer: &Buffer, _exhausted: bool, tested_len: usize) -> bool {
        matches!(buffer.index_of(self.0, tested_len.min(buffer.len())), Ok(Some(_)))
    }
}

/// Satisfied once `pattern` is buffered as a contiguous run of bytes.
///
/// An empty pattern is satisfied immediately.
#[must_use]
pub fn contains_bytes(pattern: impl Into<ByteString>) -> impl AwaitPredicate + Send + Sync + Clone {
    ContainsBytes(pattern.into())
}

#[derive(Clone, Debug)]
struct ContainsBytes(ByteString);

impl AwaitPredicate for ContainsBytes {
    fn test(&self, buffer: &Buffer, exhausted: bool) -> bool {
        self.test_appended(buffer, exhausted, 0)
    }

    fn test_appended(&self, buffer: &Buffer, _exhausted: bool, tested_len: usize) -> bool {
        let pattern = self.0.as_slice();

        // A match may have started in the last bytes of the earlier search.
        let start = tested_len
            .saturating_sub(pattern.len().saturating_sub(1))
            .min(buffer.len());

        matches!(buffer.index_of_bytes(pattern, start), Ok(Some(_)))
    }
}

/// Satisfied once the source has reached the end of the stream.
#[must_use]
pub fn exhausted() -> impl AwaitPredicate + Send + Sync + Copy {
    |_buffer: &Buffer, exhausted: bool| exhausted
}
