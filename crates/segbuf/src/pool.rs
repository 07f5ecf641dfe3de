// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;
use std::sync::{Arc, LazyLock, Mutex};

use nm::Event;
use tracing::{Level, event};

use crate::Segment;
use crate::constants::{DEFAULT_POOL_BYTES, ERR_POISONED_LOCK, SEGMENT_SIZE};

static GLOBAL: LazyLock<SegmentPool> = LazyLock::new(SegmentPool::new);

/// A bounded recycler of segment storage.
///
/// Buffers take segments from a pool when they need room for more data and release them back
/// once they have been drained. Released storage is kept for reuse as long as the total size of
/// the pooled storage stays within the byte budget of the pool. Anything beyond the budget is
/// returned to the Rust global allocator.
///
/// A pool is a shared handle - clones of a pool share the same storage and budget. The pool may
/// be used from any thread and storage taken on one thread may be released on another.
///
/// # Example
///
/// ```
/// use segbuf::SegmentPool;
///
/// let pool = SegmentPool::builder().max_bytes(16 * 1024).build();
///
/// let segment = pool.take();
/// assert_eq!(segment.capacity(), segbuf::SEGMENT_SIZE);
///
/// pool.recycle(segment);
/// assert_eq!(pool.pooled_segments(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct SegmentPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    segment_size: usize,
    max_bytes: usize,
    free: Mutex<Vec<Arc<Vec<u8>>>>,
}

impl SegmentPool {
    /// Creates an independent pool with the default configuration.
    ///
    /// Each call creates a separate pool with its own budget. Most code should share the
    /// [`global()`][Self::global] pool instead.
    #[must_use]
    #[expect(
        clippy::new_without_default,
        reason = "to avoid accidental confusion with the process-wide pool returned by global()"
    )]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a new independent pool.
    #[must_use]
    pub fn builder() -> SegmentPoolBuilder {
        SegmentPoolBuilder::default()
    }

    /// The process-wide pool with the default configuration, created on first use.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    /// Takes an empty, unshared segment from the pool, allocating fresh storage if the pool
    /// has none to spare.
    #[must_use]
    pub fn take(&self) -> Segment {
        let reused = self.inner.free.lock().expect(ERR_POISONED_LOCK).pop();

        if let Some(storage) = reused {
            SEGMENT_REUSED.with(|e| e.observe(storage.len()));
            return Segment::from_storage(storage);
        }

        SEGMENT_ALLOCATED.with(|e| e.observe(self.inner.segment_size));
        event!(
            Level::TRACE,
            message = "segment allocated",
            segment_size = self.inner.segment_size
        );

        Segment::allocate(self.inner.segment_size)
    }

    /// Returns the storage of a segment to the pool.
    ///
    /// Any live bytes in the segment are discarded. The storage is dropped instead of pooled if
    /// keeping it would exceed the byte budget or if its capacity does not match the segment
    /// size of this pool.
    ///
    /// # Panics
    ///
    /// Panics if the segment is shared, as other segments may still be reading its storage.
    pub fn recycle(&self, segment: Segment) {
        assert!(
            !segment.is_shared(),
            "a shared segment cannot be recycled while other segments reference its storage"
        );

        if segment.capacity() != self.inner.segment_size {
            self.discard(segment.capacity());
            return;
        }

        let mut free = self.inner.free.lock().expect(ERR_POISONED_LOCK);

        if (free.len() + 1) * self.inner.segment_size > self.inner.max_bytes {
            drop(free);
            self.discard(segment.capacity());
            return;
        }

        free.push(segment.into_storage());
        drop(free);

        SEGMENT_RECYCLED.with(|e| e.observe(self.inner.segment_size));
    }

    /// Lets go of a segment that a buffer no longer needs.
    ///
    /// Unshared segments are [recycled][Self::recycle]. For a shared segment, only this
    /// reference to the storage is dropped - the remaining sharers keep it alive.
    pub fn release(&self, segment: Segment) {
        if segment.is_shared() {
            drop(segment);
        } else {
            self.recycle(segment);
        }
    }

    /// The total capacity of the storage currently held by the pool for reuse.
    #[must_use]
    pub fn pooled_bytes(&self) -> usize {
        self.pooled_segments() * self.inner.segment_size
    }

    /// The number of segments' worth of storage currently held by the pool for reuse.
    #[must_use]
    pub fn pooled_segments(&self) -> usize {
        self.inner.free.lock().expect(ERR_POISONED_LOCK).len()
    }

    /// The byte budget of the pool.
    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.inner.max_bytes
    }

    /// The capacity of segments handed out by [`take()`][Self::take].
    #[must_use]
    pub fn segment_size(&self) -> usize {
        self.inner.segment_size
    }

    /// Drops all pooled storage. The pool remains usable.
    pub fn clear(&self) {
        let released = {
            let mut free = self.inner.free.lock().expect(ERR_POISONED_LOCK);
            std::mem::take(&mut *free)
        };

        event!(Level::DEBUG, message = "segment pool cleared", segments = released.len());
    }

    fn discard(&self, capacity: usize) {
        SEGMENT_DISCARDED.with(|e| e.observe(capacity));
        event!(
            Level::TRACE,
            message = "segment discarded",
            capacity,
            pooled_bytes = self.pooled_bytes(),
            max_bytes = self.inner.max_bytes
        );
    }
}

/// Configures a [`SegmentPool`].
///
/// Create via [`SegmentPool::builder()`].
#[derive(Debug)]
#[must_use]
pub struct SegmentPoolBuilder {
    segment_size: NonZero<usize>,
    max_bytes: usize,
}

impl Default for SegmentPoolBuilder {
    fn default() -> Self {
        Self {
            segment_size: const { NonZero::new(SEGMENT_SIZE).expect("SEGMENT_SIZE is non-zero") },
            max_bytes: DEFAULT_POOL_BYTES,
        }
    }
}

impl SegmentPoolBuilder {
    /// The capacity of each segment taken from the pool. Defaults to [`SEGMENT_SIZE`].
    pub fn segment_size(mut self, segment_size: NonZero<usize>) -> Self {
        self.segment_size = segment_size;
        self
    }

    /// The maximum total size of storage kept for reuse. Defaults to [`DEFAULT_POOL_BYTES`].
    ///
    /// A budget smaller than one segment disables pooling.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Creates the configured pool.
    #[must_use]
    pub fn build(self) -> SegmentPool {
        SegmentPool {
            inner: Arc::new(PoolInner {
                segment_size: self.segment_size.get(),
                max_bytes: self.max_bytes,
                free: Mutex::new(Vec::new()),
            }),
        }
    }
}

thread_local! {
    static SEGMENT_REUSED: Event = Event::builder()
        .name("segbuf_pool_segment_reused")
        .build();

    static SEGMENT_ALLOCATED: Event = Event::builder()
        .name("segbuf_pool_segment_allocated")
        .build();

    static SEGMENT_RECYCLED: Event = Event::builder()
        .name("segbuf_pool_segment_recycled")
        .build();

    static SEGMENT_DISCARDED: Event = Event::builder()
        .name("segbuf_pool_segment_discarded")
        .build();
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::thread;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing_aids::LogCapture;

    use super::*;
    use crate::Buffer;

    assert_impl_all!(SegmentPool: Send, Sync, Clone);

    #[test]
    fn take_from_empty_pool_allocates() {
        let pool = SegmentPool::new();

        let segment = pool.take();

        assert!(segment.is_empty());
        assert_eq!(segment.capacity(), SEGMENT_SIZE);
        assert_eq!(segment.reference_count(), 1);
        assert_eq!(pool.pooled_segments(), 0);
    }

    #[test]
    fn budget_of_two_segments() {
        let pool = SegmentPool::builder()
            .segment_size(nz!(1024))
            .max_bytes(2 * 1024)
            .build();

        let a = pool.take();
        let b = pool.take();
        let c = pool.take();
        let b_ptr = Arc::as_ptr(b.storage());

        pool.recycle(a);
        pool.recycle(b);
        assert_eq!(pool.pooled_bytes(), 2 * 1024);

        // Over budget, so this one is dropped.
        pool.recycle(c);
        assert_eq!(pool.pooled_segments(), 2);

        // Last in, first out.
        let d = pool.take();
        assert_eq!(Arc::as_ptr(d.storage()), b_ptr);
        assert_eq!(pool.pooled_segments(), 1);
        assert!(d.is_empty());
        assert_eq!(d.reference_count(), 1);
    }

    #[test]
    fn take_reuses_recycled_storage() {
        let pool = SegmentPool::new();

        let mut segment = pool.take();
        assert_eq!(segment.write_slice(b"stale"), 5);
        let storage_ptr = Arc::as_ptr(segment.storage());

        pool.recycle(segment);

        let reused = pool.take();
        assert_eq!(Arc::as_ptr(reused.storage()), storage_ptr);
        assert!(reused.is_empty());
        assert_eq!(reused.remaining_capacity(), SEGMENT_SIZE);
    }

    #[test]
    fn reused_storage_never_exposes_stale_bytes() {
        let pool = SegmentPool::builder().segment_size(nz!(16)).build();

        let mut segment = pool.take();
        assert_eq!(segment.write_slice(b"stale stale stal"), 16);
        segment.advance(6);
        pool.recycle(segment);

        let mut reused = pool.take();
        assert!(reused.as_slice().is_empty());
        assert_eq!(reused.write_slice(b"new"), 3);
        assert_eq!(reused.as_slice(), b"new");
        pool.recycle(reused);

        // The same through buffers, which is how storage is normally reused.
        for round in 0..20_u8 {
            let mut buffer = Buffer::with_pool(pool.clone());
            let fresh = vec![round; usize::from(round)];
            buffer.write_slice(&fresh);

            assert_eq!(buffer.len(), fresh.len());
            assert_eq!(buffer.read_byte_array(), fresh);
            assert!(pool.pooled_segments() >= 1);
        }
    }

    #[test]
    fn zero_budget_disables_pooling() {
        let pool = SegmentPool::builder().max_bytes(0).build();

        pool.recycle(pool.take());

        assert_eq!(pool.pooled_bytes(), 0);
    }

    #[test]
    fn discard_is_logged() {
        let capture = LogCapture::new();
        let pool = SegmentPool::builder().max_bytes(0).build();

        tracing::subscriber::with_default(capture.subscriber(), || pool.recycle(pool.take()));

        capture.assert_contains("segment allocated");
        capture.assert_contains("segment discarded");
    }

    #[test]
    fn capacity_mismatch_is_discarded() {
        let pool = SegmentPool::new();

        pool.recycle(Segment::allocate(100));

        assert_eq!(pool.pooled_segments(), 0);
    }

    #[test]
    #[should_panic]
    fn recycle_shared_panics() {
        let pool = SegmentPool::new();
        let segment = pool.take();
        let _sharer = segment.shared_copy();

        pool.recycle(segment);
    }

    #[test]
    fn release_shared_drops_reference() {
        let pool = SegmentPool::new();
        let segment = pool.take();
        let sharer = segment.shared_copy();

        pool.release(segment);

        assert_eq!(pool.pooled_segments(), 0);
        assert_eq!(sharer.reference_count(), 1);

        pool.release(sharer);
        assert_eq!(pool.pooled_segments(), 1);
    }

    #[test]
    fn clear_drops_pooled_storage() {
        let pool = SegmentPool::new();
        let a = pool.take();
        let b = pool.take();
        pool.recycle(a);
        pool.recycle(b);
        assert_eq!(pool.pooled_segments(), 2);

        pool.clear();

        assert_eq!(pool.pooled_bytes(), 0);
        assert_eq!(pool.take().capacity(), SEGMENT_SIZE);
    }

    #[test]
    fn global_is_shared() {
        let a = SegmentPool::global();
        let b = SegmentPool::global();

        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.max_bytes(), DEFAULT_POOL_BYTES);
        assert_eq!(a.segment_size(), SEGMENT_SIZE);
    }

    #[test]
    fn budget_holds_across_threads() {
        let pool = SegmentPool::builder()
            .segment_size(nz!(64))
            .max_bytes(4 * 64)
            .build();

        let handles = (0..8)
            .map(|_| {
                let pool = pool.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let segments = [pool.take(), pool.take(), pool.take()];
                        for segment in segments {
                            pool.recycle(segment);
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.pooled_bytes() <= pool.max_bytes());
    }
}
