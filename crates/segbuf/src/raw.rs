// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Buffer;

/// Produces bytes on demand, appending them to a [`Buffer`].
///
/// This is the narrow contract through which files, sockets and other byte producers feed
/// data into buffers. Wrap a raw source in a [`BufferedSource`][crate::BufferedSource] to
/// read numbers, byte strings and other values from it.
///
/// # Errors
///
/// Implementations report failures via their own error type. Any error of this crate that
/// occurs while driving the source is converted into that type, so callers only ever deal
/// with one error type per source.
pub trait RawSource {
    /// Type used to signal errors by the implementation of this trait.
    type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

    /// Appends at most `byte_count` bytes to `sink`.
    ///
    /// Returns the number of bytes appended. Zero with a non-zero `byte_count` means the
    /// end of the stream has been reached. Bytes already in `sink` are left untouched.
    ///
    /// # Errors
    ///
    /// Implementation-specific.
    fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error>;

    /// Releases the resources held by the source.
    ///
    /// # Errors
    ///
    /// Implementation-specific.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Consumes bytes, taking them from a [`Buffer`].
///
/// Wrap a raw sink in a [`BufferedSink`][crate::BufferedSink] to write numbers, byte strings
/// and other values to it.
pub trait RawSink {
    /// Type used to signal errors by the implementation of this trait.
    type Error: std::error::Error + From<crate::Error> + Send + Sync + 'static;

    /// Removes exactly `byte_count` bytes from the front of `source` and consumes them.
    ///
    /// # Errors
    ///
    /// Implementation-specific. Implementations are expected to fail if `source` holds fewer
    /// than `byte_count` bytes.
    fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), Self::Error>;

    /// Pushes any bytes held by the sink towards their final destination.
    ///
    /// # Errors
    ///
    /// Implementation-specific.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Flushes and then releases the resources held by the sink.
    ///
    /// # Errors
    ///
    /// Implementation-specific.
    fn close(&mut self) -> Result<(), Self::Error>;
}

impl RawSource for Buffer {
    type Error = crate::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error> {
        Ok(self.read_at_most_to_buffer(sink, byte_count))
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<S: RawSource + ?Sized> RawSource for &mut S {
    type Error = S::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize, Self::Error> {
        (**self).read_at_most_to(sink, byte_count)
    }

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}

impl RawSink for Buffer {
    type Error = crate::Error;

    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<(), Self::Error> {
        self.write_from(source, byte_count)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::ErrorKind;

    /// Produces `chunk` bytes per read from an in-memory vector.
    struct ChunkedSource {
        data: Vec<u8>,
        chunk: usize,
    }

    impl RawSource for ChunkedSource {
        type Error = io::Error;

        fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> io::Result<usize> {
            let count = byte_count.min(self.chunk).min(self.data.len());
            sink.write_slice(&self.data[..count]);
            self.data.drain(..count);
            Ok(count)
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn buffer_as_raw_source() {
        let mut source = Buffer::copied_from_slice(b"abcdef");
        let mut sink = Buffer::new();

        assert_eq!(RawSource::read_at_most_to(&mut source, &mut sink, 4).unwrap(), 4);
        assert_eq!(RawSource::read_at_most_to(&mut source, &mut sink, 4).unwrap(), 2);
        assert_eq!(RawSource::read_at_most_to(&mut source, &mut sink, 4).unwrap(), 0);
        RawSource::close(&mut source).unwrap();

        assert_eq!(sink.read_byte_array(), b"abcdef");
    }

    #[test]
    fn buffer_as_raw_sink() {
        let mut source = Buffer::copied_from_slice(b"abcdef");
        let mut sink = Buffer::new();

        RawSink::write(&mut sink, &mut source, 3).unwrap();
        RawSink::flush(&mut sink).unwrap();

        assert_eq!(sink.read_byte_array(), b"abc");
        assert_eq!(
            RawSink::write(&mut sink, &mut source, 4).unwrap_err().kind(),
            ErrorKind::InsufficientData
        );
    }

    #[test]
    fn write_all_from_collaborator_source() {
        let mut source = ChunkedSource {
            data: b"the quick brown fox".to_vec(),
            chunk: 3,
        };
        let mut buffer = Buffer::new();

        assert_eq!(buffer.write_all_from(&mut source).unwrap(), 19);
        assert_eq!(buffer.read_byte_array(), b"the quick brown fox");
    }
}
