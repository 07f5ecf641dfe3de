// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! We separate out all the consumption methods for ease of maintenance.

use std::sync::Arc;

use nm::Event;
use num_traits::FromBytes;

use crate::constants::SHARE_MINIMUM;
use crate::{Buffer, ByteOrder, ByteString, Error, Result};

impl Buffer {
    /// Consumes a `u8` from the front of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer is empty.
    pub fn read_byte(&mut self) -> Result<u8> {
        let Some(&byte) = self.first_slice().first() else {
            return Err(Error::insufficient_data(1, 0));
        };

        self.consume(1);
        Ok(byte)
    }

    /// Consumes a number of type `T` stored in the given byte order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer holds fewer bytes than the size of `T`. Nothing is consumed in that case.
    ///
    /// # Example
    ///
    /// ```
    /// use segbuf::{Buffer, ByteOrder};
    ///
    /// let mut buffer = Buffer::copied_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
    ///
    /// assert_eq!(buffer.read_num::<u64>(ByteOrder::BigEndian).unwrap(), 0);
    /// assert!(buffer.read_num::<u8>(ByteOrder::BigEndian).is_err());
    /// ```
    pub fn read_num<T: FromBytes>(&mut self, order: ByteOrder) -> Result<T>
    where
        T::Bytes: Sized + Default,
    {
        let mut bytes = T::Bytes::default();
        self.read_exact_to(bytes.as_mut())?;

        Ok(match order {
            ByteOrder::BigEndian => T::from_be_bytes(&bytes),
            ByteOrder::LittleEndian => T::from_le_bytes(&bytes),
        })
    }

    /// Consumes a number of type `T` stored in big-endian representation.
    ///
    /// # Errors
    ///
    /// See [`read_num()`][Self::read_num].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn read_num_be<T: FromBytes>(&mut self) -> Result<T>
    where
        T::Bytes: Sized + Default,
    {
        self.read_num(ByteOrder::BigEndian)
    }

    /// Consumes a number of type `T` stored in little-endian representation.
    ///
    /// # Errors
    ///
    /// See [`read_num()`][Self::read_num].
    #[cfg_attr(test, mutants::skip)] // Trivial forwarder.
    pub fn read_num_le<T: FromBytes>(&mut self) -> Result<T>
    where
        T::Bytes: Sized + Default,
    {
        self.read_num(ByteOrder::LittleEndian)
    }

    /// Consumes exactly `dst.len()` bytes into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer holds fewer bytes than `dst`. Nothing is consumed in that case.
    pub fn read_exact_to(&mut self, dst: &mut [u8]) -> Result<()> {
        self.check_available(dst.len())?;

        let read = self.read_at_most_to(dst);
        debug_assert_eq!(read, dst.len());

        Ok(())
    }

    /// Consumes as many bytes as fit into `dst`.
    ///
    /// Returns the number of bytes copied, which is zero only if the buffer or `dst` is empty.
    pub fn read_at_most_to(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.len);
        let mut filled = 0;

        while filled < count {
            let src = self.first_slice();
            let step = src.len().min(count - filled);

            dst[filled..filled + step].copy_from_slice(&src[..step]);
            filled += step;

            self.consume(step);
        }

        count
    }

    /// Moves at most `byte_count` bytes from the front of this buffer to the back of `sink`.
    ///
    /// Returns the number of bytes moved, which is less than `byte_count` only if this buffer
    /// held fewer bytes.
    pub fn read_at_most_to_buffer(&mut self, sink: &mut Self, byte_count: usize) -> usize {
        let count = byte_count.min(self.len);
        sink.move_from(self, count);
        count
    }

    /// Consumes `byte_count` bytes without looking at them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer holds fewer than `byte_count` bytes. Nothing is consumed in that case.
    pub fn skip(&mut self, byte_count: usize) -> Result<()> {
        self.check_available(byte_count)?;
        self.consume(byte_count);
        Ok(())
    }

    /// Consumes all bytes of the buffer into a new vector.
    #[must_use]
    pub fn read_byte_array(&mut self) -> Vec<u8> {
        let mut bytes = vec![0; self.len];
        let read = self.read_at_most_to(&mut bytes);
        debug_assert_eq!(read, bytes.len());
        bytes
    }

    /// Consumes exactly `byte_count` bytes into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer holds fewer than `byte_count` bytes. Nothing is consumed in that case.
    pub fn read_byte_array_exact(&mut self, byte_count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0; byte_count];
        self.read_exact_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Consumes all bytes of the buffer into a byte string.
    #[must_use]
    pub fn read_byte_string(&mut self) -> ByteString {
        let count = self.len;
        self.take_byte_string(count)
    }

    /// Consumes exactly `byte_count` bytes into a byte string.
    ///
    /// If all of the bytes are in the head segment and there are at least [`SHARE_MINIMUM`]
    /// of them, the byte string shares the storage of the segment instead of copying.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InsufficientData`][crate::ErrorKind::InsufficientData] if the
    /// buffer holds fewer than `byte_count` bytes. Nothing is consumed in that case.
    ///
    /// [`SHARE_MINIMUM`]: crate::SHARE_MINIMUM
    pub fn read_byte_string_exact(&mut self, byte_count: usize) -> Result<ByteString> {
        self.check_available(byte_count)?;
        Ok(self.take_byte_string(byte_count))
    }

    fn take_byte_string(&mut self, byte_count: usize) -> ByteString {
        if byte_count >= SHARE_MINIMUM
            && let Some(head) = self.segments.front()
            && head.len() >= byte_count
        {
            let range = head.live_range();
            let value = ByteString::from_shared(Arc::clone(head.storage()), range.start..range.start + byte_count);
            self.consume(byte_count);

            BYTE_STRING_SHARED.with(|e| e.observe(byte_count));
            return value;
        }

        let mut bytes = vec![0; byte_count];
        let read = self.read_at_most_to(&mut bytes);
        debug_assert_eq!(read, byte_count);

        BYTE_STRING_COPIED.with(|e| e.observe(byte_count));
        ByteString::from_vec(bytes)
    }
}

thread_local! {
    static BYTE_STRING_SHARED: Event = Event::builder()
        .name("segbuf_byte_string_shared")
        .build();

    static BYTE_STRING_COPIED: Event = Event::builder()
        .name("segbuf_byte_string_copied")
        .build();
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use new_zealand::nz;
    use num_traits::ToBytes;
    use testing_aids::repeating_incrementing_bytes;

    use super::*;
    use crate::{ErrorKind, SegmentPool};

    /// Writes `value` after every prefix length up to one full segment, so that its bytes land
    /// on both sides of every possible segment boundary, and reads it back.
    fn assert_round_trips_at_every_offset<T>(value: T)
    where
        T: ToBytes + FromBytes + Copy + PartialEq + Debug,
        <T as FromBytes>::Bytes: Sized + Default,
    {
        for segment_size in [nz!(8), nz!(9), nz!(16), nz!(17)] {
            let pool = SegmentPool::builder().segment_size(segment_size).build();

            for prefix in 0..=segment_size.get() {
                for order in [ByteOrder::BigEndian, ByteOrder::LittleEndian] {
                    let mut buffer = Buffer::with_pool(pool.clone());
                    buffer.write_slice(&vec![0xEE; prefix]);
                    buffer.write_num(value, order);

                    let expected = match order {
                        ByteOrder::BigEndian => value.to_be_bytes(),
                        ByteOrder::LittleEndian => value.to_le_bytes(),
                    };
                    assert_eq!(buffer.len(), prefix + expected.as_ref().len());

                    let mut peek = buffer.clone();
                    peek.skip(prefix).unwrap();
                    assert_eq!(peek.read_byte_array(), expected.as_ref());

                    buffer.skip(prefix).unwrap();
                    assert_eq!(buffer.read_num::<T>(order).unwrap(), value, "{order:?} after {prefix} bytes");
                    assert!(buffer.is_empty());
                }
            }
        }
    }

    #[test]
    fn numbers_round_trip_at_every_offset() {
        assert_round_trips_at_every_offset(0xA5_u8);
        assert_round_trips_at_every_offset(0x1234_u16);
        assert_round_trips_at_every_offset(-2_i16);
        assert_round_trips_at_every_offset(0xDEAD_BEEF_u32);
        assert_round_trips_at_every_offset(i32::MIN + 7);
        assert_round_trips_at_every_offset(0x0102_0304_0506_0708_u64);
        assert_round_trips_at_every_offset(-0x0102_0304_0506_0708_i64);
        assert_round_trips_at_every_offset(u128::MAX - 0xFF);
        assert_round_trips_at_every_offset(i128::MIN + 1);
        assert_round_trips_at_every_offset(3.25_f32);
        assert_round_trips_at_every_offset(-1.0e-300_f64);
    }

    fn small_pool() -> SegmentPool {
        SegmentPool::builder().segment_size(nz!(16)).build()
    }

    #[test]
    fn eight_zero_bytes_as_big_endian_u64() {
        let mut buffer = Buffer::new();

        buffer.write_num(0_u64, ByteOrder::BigEndian);

        assert_eq!(buffer.read_byte_array(), [0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn numbers_round_trip_in_order() {
        let mut buffer = Buffer::with_pool(small_pool());

        buffer.write_byte(0xAB);
        buffer.write_num(-12_345_i16, ByteOrder::LittleEndian);
        buffer.write_num(0xDEAD_BEEF_u32, ByteOrder::BigEndian);
        buffer.write_num(i64::MIN, ByteOrder::LittleEndian);
        buffer.write_num(3.25_f32, ByteOrder::BigEndian);
        buffer.write_num(-0.5_f64, ByteOrder::LittleEndian);

        assert_eq!(buffer.len(), 1 + 2 + 4 + 8 + 4 + 8);

        assert_eq!(buffer.read_byte().unwrap(), 0xAB);
        assert_eq!(buffer.read_num::<i16>(ByteOrder::LittleEndian).unwrap(), -12_345);
        assert_eq!(buffer.read_num::<u32>(ByteOrder::BigEndian).unwrap(), 0xDEAD_BEEF);
        assert_eq!(buffer.read_num_le::<i64>().unwrap(), i64::MIN);
        assert_eq!(buffer.read_num_be::<f32>().unwrap().to_bits(), 3.25_f32.to_bits());
        assert_eq!(buffer.read_num_le::<f64>().unwrap().to_bits(), (-0.5_f64).to_bits());
        assert!(buffer.is_empty());
        assert_eq!(buffer.segment_count(), 0);
    }

    #[test]
    fn read_past_end_changes_nothing() {
        let mut buffer = Buffer::copied_from_slice(&[1, 2, 3]);

        assert_eq!(buffer.read_num_be::<u32>().unwrap_err().kind(), ErrorKind::InsufficientData);
        assert_eq!(buffer.read_byte_array_exact(4).unwrap_err().kind(), ErrorKind::InsufficientData);
        assert_eq!(buffer.skip(4).unwrap_err().kind(), ErrorKind::InsufficientData);
        assert_eq!(buffer.read_byte_string_exact(4).unwrap_err().kind(), ErrorKind::InsufficientData);
        assert_eq!(buffer.len(), 3);

        buffer.clear();
        assert_eq!(buffer.read_byte().unwrap_err().kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn read_at_most_to_is_partial() {
        let mut buffer = Buffer::with_pool(small_pool());
        let data = repeating_incrementing_bytes().take(40).collect::<Vec<_>>();
        buffer.write_slice(&data);

        let mut first = [0; 25];
        assert_eq!(buffer.read_at_most_to(&mut first), 25);
        assert_eq!(first, data[..25]);

        let mut rest = [0; 25];
        assert_eq!(buffer.read_at_most_to(&mut rest), 15);
        assert_eq!(rest[..15], data[25..]);

        assert_eq!(buffer.read_at_most_to(&mut rest), 0);
        assert_eq!(buffer.read_at_most_to(&mut []), 0);
    }

    #[test]
    fn size_tracks_writes_reads_and_clears() {
        let mut buffer = Buffer::with_pool(small_pool());

        buffer.write_slice(&[7; 30]);
        buffer.skip(3).unwrap();
        buffer.write_num_le(1_u32);
        _ = buffer.read_byte_array_exact(10).unwrap();
        assert_eq!(buffer.len(), 21);

        let mut drained = vec![0; 100];
        assert_eq!(buffer.read_at_most_to(&mut drained), 21);

        buffer.write_slice(&[1; 5]);
        buffer.clear();
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn read_at_most_to_buffer_moves_bytes() {
        let mut source = Buffer::copied_from_slice(b"hello world");
        let mut sink = Buffer::new();

        assert_eq!(source.read_at_most_to_buffer(&mut sink, 5), 5);
        assert_eq!(source.read_at_most_to_buffer(&mut sink, 100), 6);
        assert_eq!(source.read_at_most_to_buffer(&mut sink, 100), 0);
        assert_eq!(sink.read_byte_array(), b"hello world");
    }

    #[test]
    fn small_byte_string_is_copied() {
        let mut buffer = Buffer::copied_from_slice(b"0123456789");

        let value = buffer.read_byte_string_exact(4).unwrap();

        assert_eq!(value.as_slice(), b"0123");
        assert!(!buffer.segments[0].is_shared());
        assert_eq!(buffer.read_byte_string().as_slice(), b"456789");
    }

    #[test]
    fn large_byte_string_shares_head_segment() {
        let data = repeating_incrementing_bytes().take(3000).collect::<Vec<_>>();
        let mut buffer = Buffer::copied_from_slice(&data);

        let value = buffer.read_byte_string_exact(2000).unwrap();

        assert_eq!(value.as_slice(), &data[..2000]);
        assert!(buffer.segments[0].is_shared());

        // The shared tail is read-only, so new bytes go to a fresh segment.
        buffer.write_byte(1);
        assert_eq!(buffer.segment_count(), 2);
        assert_eq!(value.as_slice(), &data[..2000]);
    }

    #[test]
    fn byte_string_round_trip() {
        let mut buffer = Buffer::new();

        buffer.write_byte_string(&ByteString::copy_from_slice(&[0x42]));

        assert_eq!(buffer.read_byte_string(), ByteString::copy_from_slice(&[0x42]));
    }
}
