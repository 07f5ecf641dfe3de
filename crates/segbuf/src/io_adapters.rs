// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, BufRead, Read, Write};

use crate::Buffer;

impl Buffer {
    /// Returns an adapter that implements [`Read`] and [`BufRead`] by consuming bytes from the
    /// head of this buffer.
    #[must_use]
    pub fn reader(&mut self) -> BufferReader<'_> {
        BufferReader { inner: self }
    }

    /// Returns an adapter that implements [`Write`] by appending bytes to the tail of this
    /// buffer.
    #[must_use]
    pub fn writer(&mut self) -> BufferWriter<'_> {
        BufferWriter { inner: self }
    }
}

/// Adapter that implements [`Read`] and [`BufRead`] for [`Buffer`].
///
/// Create an instance via [`Buffer::reader()`].
///
/// Because [`Buffer`] is already buffered, this adapter implements [`BufRead`] directly
/// without an intermediate buffer. Prefer this over wrapping in [`std::io::BufReader`].
#[derive(Debug)]
pub struct BufferReader<'b> {
    inner: &'b mut Buffer,
}

impl Read for BufferReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.inner.read_at_most_to(buf))
    }
}

impl BufRead for BufferReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.inner.first_slice())
    }

    fn consume(&mut self, amount: usize) {
        let amount = amount.min(self.inner.len());
        self.inner.consume(amount);
    }
}

/// Adapter that implements [`Write`] for [`Buffer`].
///
/// Create an instance via [`Buffer::writer()`]. Writes never fail and never write partially.
#[derive(Debug)]
pub struct BufferWriter<'b> {
    inner: &'b mut Buffer,
}

impl Write for BufferWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
