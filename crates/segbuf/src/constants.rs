// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Capacity of each segment handed out by a default-configured [`SegmentPool`][crate::SegmentPool].
pub const SEGMENT_SIZE: usize = 8192;

/// Segments are split or aliased by sharing their storage only when at least this many bytes
/// would be shared. Smaller ranges are copied.
pub const SHARE_MINIMUM: usize = 1024;

/// The default byte budget of a [`SegmentPool`][crate::SegmentPool].
pub const DEFAULT_POOL_BYTES: usize = 64 * 1024;

// If a lock is poisoned then pool bookkeeping may be inconsistent and execution cannot continue.
pub(crate) const ERR_POISONED_LOCK: &str =
    "poisoned lock - cannot continue execution because security and privacy guarantees can no longer be upheld";
