// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use segbuf::Buffer;

/// Produces bytes asynchronously, appending them to a [`Buffer`].
///
/// This is the contract through which sockets, pipes and other asynchronous byte producers
/// feed an [`AsyncSource`][crate::AsyncSource].
///
/// # Ownership
///
/// The methods on this trait take `&mut self`, so only one operation can be in flight at a
/// time on a given source.
///
/// # Cancellation
///
/// A pending [`read_at_most_to()`][Self::read_at_most_to] may be dropped at its suspension
/// point at any time. Once [`close_abruptly()`][Self::close_abruptly] has been called, reads
/// are expected to fail fast instead of waiting for data that will never arrive.
///
/// # Thread safety
///
/// This trait requires `Send` from any returned futures.
#[trait_variant::make(Send)]
pub trait AsyncRawSource: Debug {
    /// Type used to signal errors by the implementation of this trait.
    type Error: std::error::Error + From<segbuf::Error> + Send + Sync + 'static;

    /// Appends at most `byte_count` bytes to `sink`.
    ///
    /// Returns the number of bytes appended. Zero with a non-zero `byte_count` means the end of
    /// the stream has been reached. Bytes already in `sink` are left untouched.
    async fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error>;

    /// Shuts the source down in an orderly fashion and releases its resources.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Forcibly releases the resources of the source without suspending.
    ///
    /// Best effort. Used to unblock or abandon a pending read during cancellation.
    fn close_abruptly(&mut self);
}

/// Consumes bytes asynchronously, taking them from a [`Buffer`].
///
/// This is the contract through which sockets, pipes and other asynchronous byte consumers are
/// fed by an [`AsyncSink`][crate::AsyncSink].
///
/// # Thread safety
///
/// This trait requires `Send` from any returned futures.
#[trait_variant::make(Send)]
pub trait AsyncRawSink: Debug {
    /// Type used to signal errors by the implementation of this trait.
    type Error: std::error::Error + From<segbuf::Error> + Send + Sync + 'static;

    /// Removes exactly `byte_count` bytes from the front of `source` and consumes them.
    ///
    /// Implementations are expected to fail if `source` holds fewer than `byte_count` bytes.
    async fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), Self::Error>;

    /// Pushes any bytes held by the sink towards their final destination.
    async fn flush(&mut self) -> Result<(), Self::Error>;

    /// Flushes and then releases the resources held by the sink.
    async fn close(&mut self) -> Result<(), Self::Error>;

    /// Forcibly releases the resources of the sink without suspending. Unflushed bytes may be
    /// lost.
    fn close_abruptly(&mut self);
}

/// An in-memory source. Reads drain the buffer and never suspend.
impl AsyncRawSource for Buffer {
    type Error = segbuf::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    async fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error> {
        Ok(self.read_at_most_to_buffer(sink, byte_count))
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn close_abruptly(&mut self) {}
}

/// An in-memory sink. Writes append to the buffer and never suspend.
impl AsyncRawSink for Buffer {
    type Error = segbuf::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    async fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), Self::Error> {
        self.write_from(source, byte_count)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn close_abruptly(&mut self) {}
}
