// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Segmented byte buffers for I/O.
//!
//! The central type is [`Buffer`], a growable queue of bytes stored in a sequence of
//! fixed-capacity [`Segment`]s. Bytes are written at the tail and read from the head. Moving
//! bytes between buffers relinks segments instead of copying their contents, and copying a
//! range shares the underlying storage. Shared storage is never written to; a writer that
//! needs to append to shared storage takes a fresh segment instead.
//!
//! ```
//! use segbuf::{Buffer, ByteOrder, ByteString};
//!
//! let mut request = Buffer::new();
//! request.write_num(3_u32, ByteOrder::BigEndian);
//! request.write_slice(b"GET");
//!
//! let mut wire = Buffer::new();
//! request.transfer_to(&mut wire);
//!
//! let len = wire.read_num::<u32>(ByteOrder::BigEndian).unwrap();
//! let verb = wire.read_byte_string_exact(usize::try_from(len).unwrap()).unwrap();
//! assert_eq!(verb, ByteString::from("GET"));
//! ```
//!
//! # Segments and pools
//!
//! Drained segments are returned to a [`SegmentPool`], which keeps up to a configurable number
//! of bytes worth of segments around for reuse. Every buffer holds a handle to the pool it
//! takes segments from. [`Buffer::new()`] uses the process-wide [`SegmentPool::global()`].
//!
//! # Byte strings
//!
//! [`ByteString`] is an immutable sequence of bytes with value semantics, a memoized hash and
//! hex/base64 codecs. Reading a large byte string from a buffer aliases the segment storage
//! instead of copying it.
//!
//! # Sources and sinks
//!
//! [`RawSource`] and [`RawSink`] are the contracts through which files, sockets and other byte
//! producers and consumers exchange bytes with buffers. [`BufferedSource`] and
//! [`BufferedSink`] wrap them to read and write values. The `segbuf_io` crate offers the
//! asynchronous counterparts.
//!
//! A [`Buffer`] also works with `std::io` via [`Buffer::reader()`] and [`Buffer::writer()`].

mod buffer;
mod buffer_get;
mod buffer_put;
mod buffered_sink;
mod buffered_source;
mod byte_order;
mod byte_string;
mod constants;
mod error;
mod hex;
mod io_adapters;
mod pool;
mod raw;
mod segment;

pub use buffer::Buffer;
pub use buffered_sink::BufferedSink;
pub use buffered_source::BufferedSource;
pub use byte_order::ByteOrder;
pub use byte_string::ByteString;
pub use constants::{DEFAULT_POOL_BYTES, SEGMENT_SIZE, SHARE_MINIMUM};
pub use error::{Error, ErrorKind, Result};
pub use io_adapters::{BufferReader, BufferWriter};
pub use pool::{SegmentPool, SegmentPoolBuilder};
pub use raw::{RawSink, RawSource};
pub use segment::Segment;
