// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::SegmentPool;
use crate::constants::SHARE_MINIMUM;

/// A fixed-capacity chunk of memory with a read cursor and a write cursor.
///
/// The bytes between the read cursor (`pos`) and the write cursor (`limit`) are the live
/// bytes of the segment. Bytes before `pos` have been consumed and bytes after `limit` have
/// not yet been written.
///
/// # Sharing
///
/// The storage of a segment is reference counted. [`shared_copy()`][Self::shared_copy] creates
/// a second segment over the same storage, after which both are *shared*. Shared storage is
/// never written to - a writer that needs to append to a shared segment uses a new segment
/// instead. The live range of each sharer can still be consumed independently, as cursors
/// are not shared.
pub struct Segment {
    data: Arc<Vec<u8>>,
    pos: usize,
    limit: usize,
}

impl Segment {
    /// Allocates a new segment with `capacity` bytes of fresh storage.
    ///
    /// Prefer [`SegmentPool::take()`] to reuse storage of previously released segments.
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        Self::from_storage(Arc::new(vec![0; capacity]))
    }

    pub(crate) fn from_storage(data: Arc<Vec<u8>>) -> Self {
        Self { data, pos: 0, limit: 0 }
    }

    pub(crate) fn into_storage(self) -> Arc<Vec<u8>> {
        self.data
    }

    /// Creates a segment over the same storage with the same cursors.
    ///
    /// Both segments are shared afterwards.
    #[must_use]
    pub fn shared_copy(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            pos: self.pos,
            limit: self.limit,
        }
    }

    /// Creates a segment with a private copy of the storage and the same cursors.
    #[must_use]
    pub fn unshared_copy(&self) -> Self {
        Self {
            data: Arc::new(self.data.as_ref().clone()),
            pos: self.pos,
            limit: self.limit,
        }
    }

    /// Splits the segment into two, the first covering the first `at` live bytes and the second
    /// covering the rest.
    ///
    /// The prefix shares storage with the original when it is at least [`SHARE_MINIMUM`] bytes
    /// long (or too long to fit into a segment of `pool`). Otherwise, the prefix is copied into
    /// a segment taken from `pool` and the original storage stays unshared.
    ///
    /// # Panics
    ///
    /// Panics if `at` is zero or greater than the number of live bytes.
    #[must_use]
    pub fn split(mut self, at: usize, pool: &SegmentPool) -> (Self, Self) {
        assert!(at > 0, "cannot split a segment at offset zero");
        assert!(
            at <= self.len(),
            "split offset {at} is beyond the {} live bytes of the segment",
            self.len()
        );

        let prefix = if at >= SHARE_MINIMUM || at > pool.segment_size() {
            let mut prefix = self.shared_copy();
            prefix.limit = prefix.pos + at;
            prefix
        } else {
            let mut prefix = pool.take();
            let copied = prefix.write_slice(&self.as_slice()[..at]);
            debug_assert_eq!(copied, at);
            prefix
        };

        self.pos += at;
        (prefix, self)
    }

    /// The number of live bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.limit - self.pos
    }

    /// Whether there are no live bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == self.limit
    }

    /// The total size of the storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The number of bytes that can be appended after the write cursor.
    ///
    /// Always zero for a shared segment.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        if self.is_shared() { 0 } else { self.capacity() - self.limit }
    }

    /// The number of segments referencing the storage of this segment.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Whether the storage is referenced by more than one segment.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.reference_count() > 1
    }

    /// The live bytes of the segment.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.pos..self.limit]
    }

    /// Appends as many bytes of `bytes` as fit after the write cursor.
    ///
    /// Returns the number of bytes written, which is zero if the segment is shared.
    pub fn write_slice(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.remaining_capacity());
        if count == 0 {
            return 0;
        }

        let Some(data) = Arc::get_mut(&mut self.data) else {
            return 0;
        };

        data[self.limit..self.limit + count].copy_from_slice(&bytes[..count]);
        self.limit += count;
        count
    }

    /// Consumes `count` live bytes from the front.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the number of live bytes.
    pub fn advance(&mut self, count: usize) {
        assert!(
            count <= self.len(),
            "cannot advance {count} bytes in a segment with {} live bytes",
            self.len()
        );

        self.pos += count;
    }

    /// Moves `count` live bytes from the front of this segment to the back of `target`.
    ///
    /// If the bytes do not fit after the write cursor of `target`, its live bytes are first
    /// moved to the front of its storage.
    ///
    /// # Panics
    ///
    /// Panics if `target` is shared, if this segment has fewer than `count` live bytes or if
    /// `target` cannot hold `count` more bytes even after compaction.
    pub fn write_to(&mut self, target: &mut Self, count: usize) {
        assert!(!target.is_shared(), "cannot write into a shared segment");
        assert!(
            count <= self.len(),
            "cannot move {count} bytes out of a segment with {} live bytes",
            self.len()
        );
        assert!(
            target.len() + count <= target.capacity(),
            "target segment cannot hold {count} more bytes"
        );

        if target.limit + count > target.capacity() {
            target.compact();
        }

        let written = target.write_slice(&self.as_slice()[..count]);
        debug_assert_eq!(written, count);
        self.pos += count;
    }

    /// Moves all live bytes of this segment into `target` if they fit there.
    ///
    /// Returns `false` and leaves both segments untouched if `target` is shared or lacks room.
    pub fn compact_into(&mut self, target: &mut Self) -> bool {
        if target.is_shared() || target.len() + self.len() > target.capacity() {
            return false;
        }

        let count = self.len();
        self.write_to(target, count);
        true
    }

    /// Moves the live bytes to the start of the storage, maximizing the room after `limit`.
    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }

        let Some(data) = Arc::get_mut(&mut self.data) else {
            return;
        };

        data.copy_within(self.pos..self.limit, 0);
        self.limit -= self.pos;
        self.pos = 0;
    }

    /// A shared copy narrowed to `len` live bytes starting `offset` bytes into the live range.
    pub(crate) fn shared_slice(&self, offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= self.len());

        let mut slice = self.shared_copy();
        slice.pos += offset;
        slice.limit = slice.pos + len;
        slice
    }

    pub(crate) fn storage(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    pub(crate) fn live_range(&self) -> std::ops::Range<usize> {
        self.pos..self.limit
    }
}

impl Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("pos", &self.pos)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity())
            .field("reference_count", &self.reference_count())
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing_aids::repeating_incrementing_bytes;

    use super::*;

    assert_impl_all!(Segment: Send, Sync);

    fn filled(capacity: usize, len: usize) -> Segment {
        let mut segment = Segment::allocate(capacity);
        let data = repeating_incrementing_bytes().take(len).collect::<Vec<_>>();
        assert_eq!(segment.write_slice(&data), len);
        segment
    }

    #[test]
    fn allocate_is_empty_and_unshared() {
        let segment = Segment::allocate(64);

        assert!(segment.is_empty());
        assert_eq!(segment.capacity(), 64);
        assert_eq!(segment.remaining_capacity(), 64);
        assert_eq!(segment.reference_count(), 1);
        assert!(!segment.is_shared());
    }

    #[test]
    fn write_and_advance() {
        let mut segment = Segment::allocate(8);

        assert_eq!(segment.write_slice(b"hello world"), 8);
        assert_eq!(segment.as_slice(), b"hello wo");
        assert_eq!(segment.remaining_capacity(), 0);

        segment.advance(6);
        assert_eq!(segment.as_slice(), b"wo");
        assert_eq!(segment.len(), 2);
    }

    #[test]
    #[should_panic]
    fn advance_beyond_live_bytes_panics() {
        let mut segment = filled(8, 2);

        segment.advance(3);
    }

    #[test]
    fn shared_copy_blocks_writes() {
        let mut segment = filled(16, 4);
        let mut copy = segment.shared_copy();

        assert_eq!(segment.reference_count(), 2);
        assert!(segment.is_shared());
        assert_eq!(copy.as_slice(), segment.as_slice());

        assert_eq!(segment.remaining_capacity(), 0);
        assert_eq!(segment.write_slice(b"x"), 0);
        assert_eq!(copy.write_slice(b"x"), 0);

        // Cursors are independent even though storage is shared.
        copy.advance(2);
        assert_eq!(copy.len(), 2);
        assert_eq!(segment.len(), 4);

        drop(copy);
        assert!(!segment.is_shared());
        assert_eq!(segment.write_slice(b"x"), 1);
    }

    #[test]
    fn unshared_copy_is_independent() {
        let segment = filled(16, 4);
        let mut copy = segment.unshared_copy();

        assert_eq!(segment.reference_count(), 1);
        assert_eq!(copy.reference_count(), 1);
        assert_eq!(copy.write_slice(b"zz"), 2);
        assert_eq!(segment.len(), 4);
        assert_eq!(copy.len(), 6);
    }

    #[test]
    fn split_small_prefix_copies() {
        let pool = SegmentPool::builder().segment_size(nz!(4096)).build();
        let segment = filled(4096, 100);
        let expected = segment.as_slice().to_vec();

        let (prefix, rest) = segment.split(10, &pool);

        assert_eq!(prefix.as_slice(), &expected[..10]);
        assert_eq!(rest.as_slice(), &expected[10..]);
        assert!(!prefix.is_shared());
        assert!(!rest.is_shared());
    }

    #[test]
    fn split_large_prefix_shares() {
        let pool = SegmentPool::builder().segment_size(nz!(4096)).build();
        let segment = filled(4096, 3000);
        let expected = segment.as_slice().to_vec();

        let (prefix, rest) = segment.split(SHARE_MINIMUM, &pool);

        assert_eq!(prefix.as_slice(), &expected[..SHARE_MINIMUM]);
        assert_eq!(rest.as_slice(), &expected[SHARE_MINIMUM..]);
        assert!(prefix.is_shared());
        assert_eq!(rest.reference_count(), 2);
    }

    #[test]
    #[should_panic]
    fn split_at_zero_panics() {
        let _ = filled(64, 10).split(0, &SegmentPool::new());
    }

    #[test]
    #[should_panic]
    fn split_beyond_live_bytes_panics() {
        let _ = filled(64, 10).split(11, &SegmentPool::new());
    }

    #[test]
    fn write_to_compacts_target() {
        let mut source = filled(8, 6);
        let mut target = Segment::allocate(8);
        assert_eq!(target.write_slice(b"abcdef"), 6);
        target.advance(5);

        // Only 2 bytes of room after the write cursor but 7 after compaction.
        source.write_to(&mut target, 4);

        assert_eq!(target.len(), 5);
        assert_eq!(&target.as_slice()[..1], b"f");
        assert_eq!(source.len(), 2);
    }

    #[test]
    #[should_panic]
    fn write_to_shared_target_panics() {
        let mut source = filled(8, 6);
        let mut target = Segment::allocate(8);
        let _sharer = target.shared_copy();

        source.write_to(&mut target, 1);
    }

    #[test]
    fn compact_into_requires_room() {
        let mut source = filled(8, 6);
        let mut target = filled(8, 3);

        assert!(!source.compact_into(&mut target));
        assert_eq!(source.len(), 6);

        source.advance(2);
        assert!(source.compact_into(&mut target));
        assert!(source.is_empty());
        assert_eq!(target.len(), 7);
    }
}
