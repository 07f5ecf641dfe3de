// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::ops::Range;

use crate::constants::SHARE_MINIMUM;
use crate::hex::write_hex_preview;
use crate::{Error, Result, Segment, SegmentPool};

/// A growable queue of bytes stored in a sequence of segments.
///
/// Bytes are appended at the tail and consumed from the head. Moving bytes from one buffer to
/// another relinks whole segments instead of copying their contents, splitting at most one
/// segment at the boundary of the moved range.
///
/// Methods for writing live in the `buffer_put` module and methods for reading in the
/// `buffer_get` module.
///
/// # Failure policy
///
/// Reading more bytes than the buffer holds fails with [`ErrorKind::InsufficientData`] and an
/// invalid index or range fails with [`ErrorKind::OutOfBounds`]. A failed operation leaves the
/// buffer unchanged.
///
/// # Thread safety
///
/// A buffer is `Send` and `Sync` but has no internal synchronization - mutation requires
/// `&mut self`, so the borrow checker serializes all access.
///
/// # Example
///
/// ```
/// use segbuf::{Buffer, ByteOrder};
///
/// let mut buffer = Buffer::new();
/// buffer.write_num(0x1234_u16, ByteOrder::BigEndian);
/// buffer.write_slice(b"hello");
///
/// assert_eq!(buffer.len(), 7);
/// assert_eq!(buffer.read_num::<u16>(ByteOrder::BigEndian).unwrap(), 0x1234);
/// assert_eq!(buffer.read_byte_array(), b"hello");
/// ```
///
/// [`ErrorKind::InsufficientData`]: crate::ErrorKind::InsufficientData
/// [`ErrorKind::OutOfBounds`]: crate::ErrorKind::OutOfBounds
pub struct Buffer {
    // Never contains empty segments. Head at the front.
    pub(crate) segments: VecDeque<Segment>,
    pub(crate) len: usize,
    pub(crate) pool: SegmentPool,
}

impl Buffer {
    /// Creates an empty buffer that takes segments from the [global pool][SegmentPool::global].
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(SegmentPool::global())
    }

    /// Creates an empty buffer that takes segments from `pool`.
    #[must_use]
    pub fn with_pool(pool: SegmentPool) -> Self {
        Self {
            segments: VecDeque::new(),
            len: 0,
            pool,
        }
    }

    /// Creates a buffer holding a copy of `bytes`.
    #[must_use]
    pub fn copied_from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::new();
        buffer.write_slice(bytes);
        buffer
    }

    /// The pool this buffer takes segments from and releases them to.
    #[must_use]
    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    /// The number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of segments currently linked into the buffer.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The bytes of the head segment, i.e. the longest run of bytes at the front of the
    /// buffer that is consecutive in memory.
    ///
    /// Empty if the buffer is empty.
    #[must_use]
    pub fn first_slice(&self) -> &[u8] {
        match self.segments.front() {
            Some(head) => head.as_slice(),
            None => &[],
        }
    }

    /// The number of bytes in segments that can no longer be appended to.
    ///
    /// This excludes the tail segment if it still has room for more bytes. Sinks use this to
    /// emit whole segments while keeping a partially filled tail around for further writes.
    #[must_use]
    pub fn complete_segment_byte_count(&self) -> usize {
        match self.segments.back() {
            Some(tail) if tail.remaining_capacity() > 0 => self.len - tail.len(),
            _ => self.len,
        }
    }

    /// Removes all bytes from the buffer, releasing its segments to the pool.
    pub fn clear(&mut self) {
        while let Some(segment) = self.segments.pop_front() {
            self.pool.release(segment);
        }

        self.len = 0;
    }

    /// Returns the byte at `index` without consuming anything.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfBounds`][crate::ErrorKind::OutOfBounds] if `index` is not
    /// less than the length of the buffer.
    pub fn get(&self, index: usize) -> Result<u8> {
        if index >= self.len {
            return Err(Error::out_of_bounds(format!(
                "index {index} is out of bounds for a buffer of {} bytes",
                self.len
            )));
        }

        let mut offset = index;
        for segment in &self.segments {
            if let Some(byte) = segment.as_slice().get(offset) {
                return Ok(*byte);
            }

            offset -= segment.len();
        }

        unreachable!("buffer length is out of sync with its segments")
    }

    /// Appends the bytes in `range` to `target` without consuming them from this buffer.
    ///
    /// Runs of at least [`SHARE_MINIMUM`] bytes within one segment share storage with this
    /// buffer rather than being duplicated. Shared storage is never written to, so further writes
    /// to either buffer go to fresh segments. Shorter runs are copied into the tail of `target`,
    /// which leaves the segments of this buffer writable.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfBounds`][crate::ErrorKind::OutOfBounds] if the range is
    /// reversed or extends beyond the end of this buffer. Nothing is copied in that case.
    pub fn copy_to(&self, target: &mut Self, range: Range<usize>) -> Result<()> {
        self.check_range(&range)?;

        let mut skip = range.start;
        let mut remaining = range.len();

        for segment in &self.segments {
            if remaining == 0 {
                break;
            }

            if skip >= segment.len() {
                skip -= segment.len();
                continue;
            }

            let take = remaining.min(segment.len() - skip);
            if take < SHARE_MINIMUM {
                target.write_slice(&segment.as_slice()[skip..skip + take]);
            } else {
                target.push_segment(segment.shared_slice(skip, take));
            }

            remaining -= take;
            skip = 0;
        }

        Ok(())
    }

    /// Returns the index of the first occurrence of `byte` at or after `start`, or `None` if
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfBounds`][crate::ErrorKind::OutOfBounds] if `start` is beyond
    /// the end of the buffer.
    pub fn index_of(&self, byte: u8, start: usize) -> Result<Option<usize>> {
        self.check_start(start)?;

        let mut segment_start = 0;
        for segment in &self.segments {
            let slice = segment.as_slice();
            let segment_end = segment_start + slice.len();

            if start < segment_end {
                let from = start.saturating_sub(segment_start);
                if let Some(found) = slice[from..].iter().position(|b| *b == byte) {
                    return Ok(Some(segment_start + from + found));
                }
            }

            segment_start = segment_end;
        }

        Ok(None)
    }

    /// Returns the index of the first occurrence of `pattern` at or after `start`, or `None`
    /// if there is none.
    ///
    /// An empty pattern matches at `start`. Matches may span segment boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::OutOfBounds`][crate::ErrorKind::OutOfBounds] if `start` is beyond
    /// the end of the buffer.
    pub fn index_of_bytes(&self, pattern: &[u8], start: usize) -> Result<Option<usize>> {
        self.check_start(start)?;

        let Some((&first, _)) = pattern.split_first() else {
            return Ok(Some(start));
        };

        let Some(last_candidate) = self.len.checked_sub(pattern.len()) else {
            return Ok(None);
        };

        let mut segment_start = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            if segment_start > last_candidate {
                break;
            }

            let slice = segment.as_slice();
            let segment_end = segment_start + slice.len();

            if start < segment_end {
                let mut from = start.saturating_sub(segment_start);

                while let Some(found) = slice[from..].iter().position(|b| *b == first) {
                    let offset = from + found;
                    if segment_start + offset > last_candidate {
                        return Ok(None);
                    }

                    if self.matches_at(index, offset, pattern) {
                        return Ok(Some(segment_start + offset));
                    }

                    from = offset + 1;
                }
            }

            segment_start = segment_end;
        }

        Ok(None)
    }

    /// Whether `pattern` is found `offset` bytes into the live range of segment `index`,
    /// continuing into the following segments as needed.
    fn matches_at(&self, index: usize, offset: usize, pattern: &[u8]) -> bool {
        let mut remaining = pattern;
        let mut offset = offset;

        for segment in self.segments.range(index..) {
            let slice = &segment.as_slice()[offset..];
            let count = slice.len().min(remaining.len());

            if slice[..count] != remaining[..count] {
                return false;
            }

            remaining = &remaining[count..];
            if remaining.is_empty() {
                return true;
            }

            offset = 0;
        }

        false
    }

    /// Iterates over the bytes starting at `start`, which must not exceed the length.
    pub(crate) fn bytes_from(&self, start: usize) -> impl Iterator<Item = u8> + '_ {
        let mut skip = start;
        self.segments
            .iter()
            .map(Segment::as_slice)
            .filter_map(move |slice| {
                if skip >= slice.len() {
                    skip -= slice.len();
                    None
                } else {
                    let rest = &slice[skip..];
                    skip = 0;
                    Some(rest)
                }
            })
            .flat_map(|slice| slice.iter().copied())
    }

    /// Appends a segment at the tail without merging it into the current tail.
    pub(crate) fn push_segment(&mut self, segment: Segment) {
        if segment.is_empty() {
            self.pool.release(segment);
            return;
        }

        self.len += segment.len();
        self.segments.push_back(segment);
    }

    /// Appends a segment at the tail, merging its bytes into the current tail instead if the
    /// tail is unshared and has room for them.
    pub(crate) fn link_segment(&mut self, mut segment: Segment) {
        if let Some(tail) = self.segments.back_mut() {
            let count = segment.len();
            if count < SHARE_MINIMUM && segment.compact_into(tail) {
                self.len += count;
                self.pool.release(segment);
                return;
            }
        }

        self.push_segment(segment);
    }

    /// Consumes `count` bytes from the head, releasing drained segments.
    ///
    /// The caller must have checked that the buffer holds at least `count` bytes.
    pub(crate) fn consume(&mut self, mut count: usize) {
        debug_assert!(count <= self.len);
        self.len -= count;

        while count > 0 {
            let Some(head) = self.segments.front_mut() else {
                break;
            };

            let step = count.min(head.len());
            head.advance(step);
            count -= step;

            if head.is_empty() {
                self.release_head();
            }
        }
    }

    pub(crate) fn release_head(&mut self) {
        if let Some(segment) = self.segments.pop_front() {
            self.pool.release(segment);
        }
    }

    pub(crate) fn check_available(&self, required: usize) -> Result<()> {
        if required > self.len {
            return Err(Error::insufficient_data(required, self.len));
        }

        Ok(())
    }

    fn check_start(&self, start: usize) -> Result<()> {
        if start > self.len {
            return Err(Error::out_of_bounds(format!(
                "start index {start} is out of bounds for a buffer of {} bytes",
                self.len
            )));
        }

        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<()> {
        if range.start > range.end || range.end > self.len {
            return Err(Error::out_of_bounds(format!(
                "range {range:?} is out of bounds for a buffer of {} bytes",
                self.len
            )));
        }

        Ok(())
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Buffer {
    /// Creates a buffer with the same bytes by sharing the segments of this one.
    ///
    /// No bytes are copied. Both buffers can be consumed independently.
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.iter().map(Segment::shared_copy).collect(),
            len: self.len,
            pool: self.pool.clone(),
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer(size={} hex=", self.len)?;
        write_hex_preview(f, self.bytes_from(0), self.len)?;
        f.write_str(")")
    }
}
