// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use num_traits::ToBytes;

use crate::{Buffer, ByteOrder, ByteString, Error, RawSink, SegmentPool};

/// Writes values to a [`RawSink`], staging them in an internal [`Buffer`].
///
/// Writes are handed to the sink whenever a segment of the buffer fills up. The partially
/// filled tail segment is held back until [`emit()`][Self::emit], [`flush()`][Self::flush] or
/// [`close()`][Self::close] is called.
///
/// After [`close()`][Self::close], every operation fails with
/// [`ErrorKind::Closed`][crate::ErrorKind::Closed].
///
/// # Example
///
/// ```
/// use segbuf::{Buffer, BufferedSink, ByteOrder};
///
/// let mut raw = Buffer::new();
/// let mut sink = BufferedSink::new(&mut raw);
///
/// sink.write_num(42_u16, ByteOrder::BigEndian).unwrap();
/// sink.write_slice(b"hi").unwrap();
/// sink.close().unwrap();
///
/// assert_eq!(raw.read_byte_array(), [0x00, 0x2A, b'h', b'i']);
/// ```
#[derive(Debug)]
pub struct BufferedSink<S: RawSink> {
    sink: S,
    buffer: Buffer,
    closed: bool,
}

impl<S: RawSink> BufferedSink<S> {
    /// Wraps `sink`, staging bytes in segments from the global pool.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_pool(sink, SegmentPool::global())
    }

    /// Wraps `sink`, staging bytes in segments from `pool`.
    #[must_use]
    pub fn with_pool(sink: S, pool: SegmentPool) -> Self {
        Self {
            sink,
            buffer: Buffer::with_pool(pool),
            closed: false,
        }
    }

    /// The bytes written but not yet handed to the sink.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable access to the bytes not yet handed to the sink.
    ///
    /// Bytes appended here are only handed to the sink by the next emit or flush.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// The wrapped sink.
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Whether [`close()`][Self::close] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Writes a slice of bytes.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn write_slice(&mut self, bytes: &[u8]) -> Result<(), S::Error> {
        self.check_open()?;
        self.buffer.write_slice(bytes);
        self.emit_complete_segments()
    }

    /// Writes a `u8`.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn write_byte(&mut self, value: u8) -> Result<(), S::Error> {
        self.write_slice(&[value])
    }

    /// Writes a number of type `T` in the given byte order.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn write_num<T: ToBytes>(&mut self, value: T, order: ByteOrder) -> Result<(), S::Error> {
        self.check_open()?;
        self.buffer.write_num(value, order);
        self.emit_complete_segments()
    }

    /// Writes the contents of a byte string.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn write_byte_string(&mut self, value: &ByteString) -> Result<(), S::Error> {
        self.write_slice(value.as_slice())
    }

    /// Moves `byte_count` bytes from the front of `source` into this sink.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if
    /// `source` holds fewer than `byte_count` bytes. Also fails if the sink fails or if this
    /// has been closed.
    pub fn write_from(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), S::Error> {
        self.check_open()?;
        self.buffer.write_from(source, byte_count)?;
        self.emit_complete_segments()
    }

    /// Hands all segments except a partially filled tail to the sink.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn emit_complete_segments(&mut self) -> Result<(), S::Error> {
        self.check_open()?;

        let count = self.buffer.complete_segment_byte_count();
        if count > 0 {
            self.sink.write(&mut self.buffer, count)?;
        }

        Ok(())
    }

    /// Hands all buffered bytes to the sink without flushing it.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn emit(&mut self) -> Result<(), S::Error> {
        self.check_open()?;

        let count = self.buffer.len();
        if count > 0 {
            self.sink.write(&mut self.buffer, count)?;
        }

        Ok(())
    }

    /// Hands all buffered bytes to the sink and flushes it.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails or if this has been closed.
    pub fn flush(&mut self) -> Result<(), S::Error> {
        self.emit()?;
        self.sink.flush()
    }

    /// Hands all buffered bytes to the sink and closes it. Closing again does nothing.
    ///
    /// The sink is closed even if handing over the buffered bytes fails.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. This is closed regardless.
    pub fn close(&mut self) -> Result<(), S::Error> {
        if self.closed {
            return Ok(());
        }

        let emitted = self.emit();
        self.closed = true;
        self.buffer.clear();
        let closed = self.sink.close();

        emitted.and(closed)
    }

    fn check_open(&self) -> Result<(), S::Error> {
        if self.closed {
            return Err(Error::closed().into());
        }

        Ok(())
    }
}

impl<S: RawSink> RawSink for BufferedSink<S> {
    type Error = S::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), Self::Error> {
        self.write_from(source, byte_count)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flush()
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn close(&mut self) -> Result<(), Self::Error> {
        self.close()
    }
}
