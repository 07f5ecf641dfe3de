// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use num_traits::FromBytes;

use crate::constants::SEGMENT_SIZE;
use crate::{Buffer, ByteOrder, ByteString, Error, RawSource, SegmentPool};

/// Reads values from a [`RawSource`], pulling bytes into an internal [`Buffer`] on demand.
///
/// Reads that need more bytes than are buffered fetch them from the source in chunks of
/// [`SEGMENT_SIZE`] bytes. Reading beyond the end of the stream fails with
/// [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData], converted to the
/// error type of the source.
///
/// After [`close()`][Self::close], every operation fails with
/// [`ErrorKind::Closed`][crate::ErrorKind::Closed].
///
/// # Example
///
/// ```
/// use segbuf::{Buffer, BufferedSource, ByteOrder};
///
/// let mut raw = Buffer::copied_from_slice(&[0x00, 0x2A, b'h', b'i']);
/// let mut source = BufferedSource::new(&mut raw);
///
/// assert_eq!(source.read_num::<u16>(ByteOrder::BigEndian).unwrap(), 42);
/// assert_eq!(source.read_byte_string_exact(2).unwrap().as_slice(), b"hi");
/// assert!(source.exhausted().unwrap());
/// ```
///
/// [`SEGMENT_SIZE`]: crate::SEGMENT_SIZE
#[derive(Debug)]
pub struct BufferedSource<S: RawSource> {
    source: S,
    buffer: Buffer,
    closed: bool,
}

impl<S: RawSource> BufferedSource<S> {
    /// Wraps `source`, buffering its bytes in segments from the global pool.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_pool(source, SegmentPool::global())
    }

    /// Wraps `source`, buffering its bytes in segments from `pool`.
    #[must_use]
    pub fn with_pool(source: S, pool: SegmentPool) -> Self {
        Self {
            source,
            buffer: Buffer::with_pool(pool),
            closed: false,
        }
    }

    /// The bytes read from the source but not yet consumed.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable access to the bytes read from the source but not yet consumed.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// The wrapped source.
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Whether [`close()`][Self::close] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether there are no more bytes, neither buffered nor in the source.
    ///
    /// Reads from the source if the buffer is empty.
    ///
    /// # Errors
    ///
    /// Fails if the source fails or if this has been closed.
    pub fn exhausted(&mut self) -> Result<bool, S::Error> {
        Ok(!self.request(1)?)
    }

    /// Reads from the source until at least `byte_count` bytes are buffered.
    ///
    /// Returns `false` if the source reached the end of the stream first.
    ///
    /// # Errors
    ///
    /// Fails if the source fails or if this has been closed.
    pub fn request(&mut self, byte_count: usize) -> Result<bool, S::Error> {
        self.check_open()?;

        while self.buffer.len() < byte_count {
            if self.source.read_at_most_to(&mut self.buffer, SEGMENT_SIZE)? == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Reads from the source until at least `byte_count` bytes are buffered.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// source reached the end of the stream first. Also fails if the source fails or if this
    /// has been closed.
    pub fn require(&mut self, byte_count: usize) -> Result<(), S::Error> {
        if self.request(byte_count)? {
            Ok(())
        } else {
            Err(Error::insufficient_data(byte_count, self.buffer.len()).into())
        }
    }

    /// Reads a `u8`.
    ///
    /// # Errors
    ///
    /// See [`require()`][Self::require].
    pub fn read_byte(&mut self) -> Result<u8, S::Error> {
        self.require(1)?;
        Ok(self.buffer.read_byte()?)
    }

    /// Reads a number of type `T` stored in the given byte order.
    ///
    /// # Errors
    ///
    /// See [`require()`][Self::require].
    pub fn read_num<T: FromBytes>(&mut self, order: ByteOrder) -> Result<T, S::Error>
    where
        T::Bytes: Sized + Default,
    {
        self.require(size_of::<T::Bytes>())?;
        Ok(self.buffer.read_num(order)?)
    }

    /// Reads exactly `byte_count` bytes into a byte string.
    ///
    /// # Errors
    ///
    /// See [`require()`][Self::require].
    pub fn read_byte_string_exact(&mut self, byte_count: usize) -> Result<ByteString, S::Error> {
        self.require(byte_count)?;
        Ok(self.buffer.read_byte_string_exact(byte_count)?)
    }

    /// Reads at most `dst.len()` bytes into `dst`, fetching from the source only if nothing
    /// is buffered.
    ///
    /// Returns the number of bytes read, which is zero at the end of the stream.
    ///
    /// # Errors
    ///
    /// Fails if the source fails or if this has been closed.
    pub fn read_at_most_to(&mut self, dst: &mut [u8]) -> Result<usize, S::Error> {
        if dst.is_empty() || !self.request(1)? {
            return Ok(0);
        }

        Ok(self.buffer.read_at_most_to(dst))
    }

    /// Closes the source and discards any buffered bytes. Closing again does nothing.
    ///
    /// # Errors
    ///
    /// Propagates the error of the source, if any. This is closed regardless.
    pub fn close(&mut self) -> Result<(), S::Error> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.buffer.clear();
        self.source.close()
    }

    fn check_open(&self) -> Result<(), S::Error> {
        if self.closed {
            return Err(Error::closed().into());
        }

        Ok(())
    }
}

impl<S: RawSource> RawSource for BufferedSource<S> {
    type Error = S::Error;

    fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error> {
        if byte_count == 0 || !self.request(1)? {
            return Ok(0);
        }

        Ok(self.buffer.read_at_most_to_buffer(sink, byte_count))
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn close(&mut self) -> Result<(), Self::Error> {
        self.close()
    }
}
