// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! We separate out the mutation functions for ease of maintenance.

use num_traits::ToBytes;

use crate::constants::SEGMENT_SIZE;
use crate::{Buffer, ByteOrder, ByteString, RawSource};

impl Buffer {
    /// Appends a slice of bytes to the buffer.
    ///
    /// Segments are taken from the pool as needed. A shared tail segment is never written
    /// to - the bytes go to a fresh segment instead.
    ///
    /// # Example
    ///
    /// ```
    /// use segbuf::Buffer;
    ///
    /// let mut buffer = Buffer::new();
    ///
    /// buffer.write_slice(b"Hello, ");
    /// buffer.write_slice(b"world!");
    ///
    /// assert_eq!(buffer.read_byte_array(), b"Hello, world!");
    /// ```
    pub fn write_slice(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let written = match self.segments.back_mut() {
                Some(tail) if tail.remaining_capacity() > 0 => tail.write_slice(bytes),
                _ => {
                    let mut segment = self.pool.take();
                    let written = segment.write_slice(bytes);
                    self.segments.push_back(segment);
                    written
                }
            };

            debug_assert_ne!(written, 0);

            self.len += written;
            bytes = &bytes[written..];
        }
    }

    /// Appends a `u8` to the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.write_slice(&[value]);
    }

    /// Appends a number of type `T` in the given byte order.
    ///
    /// A number that does not fit into the remaining room of the tail segment is split across
    /// two segments.
    ///
    /// # Example
    ///
    /// ```
    /// use segbuf::{Buffer, ByteOrder};
    ///
    /// let mut buffer = Buffer::new();
    ///
    /// buffer.write_num(0x1234_u16, ByteOrder::LittleEndian);
    /// buffer.write_num(0xDEAD_BEEF_u32, ByteOrder::BigEndian);
    ///
    /// assert_eq!(buffer.read_byte_array(), [0x34, 0x12, 0xDE, 0xAD, 0xBE, 0xEF]);
    /// ```
    #[expect(clippy::needless_pass_by_value, reason = "tiny numeric types, fine to always pass by value")]
    pub fn write_num<T: ToBytes>(&mut self, value: T, order: ByteOrder) {
        let bytes = match order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };

        self.write_slice(bytes.as_ref());
    }

    /// Appends a number of type `T` in big-endian representation.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn write_num_be<T: ToBytes>(&mut self, value: T) {
        self.write_num(value, ByteOrder::BigEndian);
    }

    /// Appends a number of type `T` in little-endian representation.
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn write_num_le<T: ToBytes>(&mut self, value: T) {
        self.write_num(value, ByteOrder::LittleEndian);
    }

    /// Appends the contents of a byte string.
    pub fn write_byte_string(&mut self, value: &ByteString) {
        self.write_slice(value.as_slice());
    }

    /// Moves `byte_count` bytes from the front of `source` to the back of this buffer.
    ///
    /// Whole segments are relinked without copying their contents. At most one segment is
    /// split, at the end of the moved range. Small segments are merged into the tail of this
    /// buffer if it has room for them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if `source`
    /// holds fewer than `byte_count` bytes. Neither buffer is modified in that case.
    pub fn write_from(&mut self, source: &mut Self, byte_count: usize) -> crate::Result<()> {
        source.check_available(byte_count)?;
        self.move_from(source, byte_count);
        Ok(())
    }

    /// Moves all bytes of this buffer to the back of `target`, leaving this buffer empty.
    pub fn transfer_to(&mut self, target: &mut Self) {
        let count = self.len;
        target.move_from(self, count);
    }

    /// Reads from `source` until it reports the end of the stream.
    ///
    /// Returns the total number of bytes appended.
    ///
    /// # Errors
    ///
    /// Propagates any error of the source unchanged. Bytes read before the error remain in
    /// the buffer.
    pub fn write_all_from<S>(&mut self, source: &mut S) -> Result<usize, S::Error>
    where
        S: RawSource + ?Sized,
    {
        let mut total = 0;

        loop {
            let read = source.read_at_most_to(self, SEGMENT_SIZE)?;
            if read == 0 {
                return Ok(total);
            }

            total += read;
        }
    }

    /// The caller must have checked that `source` holds at least `byte_count` bytes.
    pub(crate) fn move_from(&mut self, source: &mut Self, mut byte_count: usize) {
        debug_assert!(byte_count <= source.len);

        while byte_count > 0 {
            let Some(mut head) = source.segments.pop_front() else {
                break;
            };

            let head_len = head.len();

            if head_len <= byte_count {
                source.len -= head_len;
                byte_count -= head_len;
                self.link_segment(head);
                continue;
            }

            // Partial segment. Copy into our tail if there is room, otherwise split it.
            source.len -= byte_count;

            let merged = match self.segments.back_mut() {
                Some(tail) if !tail.is_shared() && tail.len() + byte_count <= tail.capacity() => {
                    head.write_to(tail, byte_count);
                    true
                }
                _ => false,
            };

            if merged {
                self.len += byte_count;
                source.segments.push_front(head);
            } else {
                let (prefix, rest) = head.split(byte_count, &self.pool);
                source.segments.push_front(rest);
                self.push_segment(prefix);
            }

            byte_count = 0;
        }
    }
}
