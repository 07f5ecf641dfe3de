// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Asynchronous sources and sinks over [`segbuf`] buffers.
//!
//! [`AsyncRawSource`] and [`AsyncRawSink`] are the contracts for asynchronous byte producers
//! and consumers such as sockets. [`AsyncSource`] and [`AsyncSink`] wrap them with a
//! [`Buffer`][segbuf::Buffer], so that all parsing and formatting happens synchronously on
//! buffered bytes and only the waiting is asynchronous.
//!
//! ```
//! # testing_aids::execute_or_terminate_process(|| futures::executor::block_on(async {
//! use segbuf::{Buffer, ByteOrder, ByteString};
//! use segbuf_io::AsyncSource;
//! use segbuf_io::predicate::contains_byte;
//!
//! let mut wire = Buffer::new();
//! wire.write_slice(b"HELLO\n");
//! wire.write_num(42_u32, ByteOrder::LittleEndian);
//!
//! let mut source = AsyncSource::new(wire);
//!
//! assert!(source.await_until(contains_byte(b'\n')).await.unwrap());
//! let end = source.buffer().index_of(b'\n', 0).unwrap().unwrap();
//! let line = source.buffer_mut().read_byte_string_exact(end).unwrap();
//! source.buffer_mut().skip(1).unwrap();
//! assert_eq!(line, ByteString::from("HELLO"));
//!
//! source.require(4).await.unwrap();
//! assert_eq!(source.buffer_mut().read_num::<u32>(ByteOrder::LittleEndian).unwrap(), 42);
//! # }));
//! ```
//!
//! # Waiting
//!
//! [`AsyncSource::await_until()`] reads from the raw source until an [`AwaitPredicate`] holds
//! or the source is exhausted. The [`predicate`] module has the common conditions.
//!
//! # Single flight
//!
//! Only one operation may be in progress on a source or sink at a time. Dropping a pending
//! operation abandons it; bytes it already read stay buffered. Leaking a pending operation
//! instead makes every later operation fail with
//! [`ErrorKind::OperationInFlight`][segbuf::ErrorKind::OperationInFlight].
//!
//! # Aborting
//!
//! An [`AbortHandle`] can be sent to another thread to cancel the operations of a source or
//! sink. A pending operation wakes up and fails with
//! [`ErrorKind::Aborted`][segbuf::ErrorKind::Aborted], and the raw source or sink is closed
//! abruptly.

mod abort;
mod close_guard;
mod in_flight;
pub mod predicate;
mod raw;
mod sink;
mod source;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use abort::AbortHandle;
pub use predicate::AwaitPredicate;
pub use raw::{AsyncRawSink, AsyncRawSource};
pub use sink::AsyncSink;
pub use source::{AsyncSource, AsyncSourceBuilder};
