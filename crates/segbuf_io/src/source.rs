// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::num::NonZero;

use segbuf::{Buffer, ErrorKind, SEGMENT_SIZE, SegmentPool};
use tracing::{Level, event};

use crate::abort::AbortSignal;
use crate::close_guard::CloseGuard;
use crate::in_flight::InFlight;
use crate::predicate::data_available;
use crate::{AbortHandle, AsyncRawSource, AwaitPredicate};

const DEFAULT_READ_CHUNK_SIZE: NonZero<usize> = NonZero::new(SEGMENT_SIZE).expect("SEGMENT_SIZE is non-zero");

/// The read half of an asynchronous buffer: a [`Buffer`] fed on demand by an
/// [`AsyncRawSource`].
///
/// Callers state what they are waiting for as an [`AwaitPredicate`] and
/// [`await_until()`][Self::await_until] reads from the source until the predicate holds or the
/// source is exhausted. The buffered bytes are then consumed synchronously via
/// [`buffer_mut()`][Self::buffer_mut].
///
/// # Example
///
/// ```
/// # testing_aids::execute_or_terminate_process(|| futures::executor::block_on(async {
/// use segbuf::Buffer;
/// use segbuf_io::AsyncSource;
/// use segbuf_io::predicate::contains_byte;
///
/// let mut source = AsyncSource::new(Buffer::copied_from_slice(b"GET /\nHost: a\n"));
///
/// assert!(source.await_until(contains_byte(b'\n')).await.unwrap());
///
/// let end = source.buffer().index_of(b'\n', 0).unwrap().unwrap();
/// let line = source.buffer_mut().read_byte_string_exact(end + 1).unwrap();
/// assert_eq!(line.as_slice(), b"GET /\n");
/// # }));
/// ```
///
/// # Single flight
///
/// Operations take `&mut self`, so only one can be in flight at a time. If the future of an
/// operation is leaked while suspended, every later operation fails with
/// [`ErrorKind::OperationInFlight`]. Dropping the future instead is a normal cancellation: bytes
/// appended before the drop remain buffered and the next operation proceeds normally.
///
/// # Aborts
///
/// [`abort_handle()`][Self::abort_handle] returns a handle that can stop a pending operation from
/// any thread. The pending read is dropped, the raw source is closed abruptly and the operation
/// fails with [`ErrorKind::Aborted`]. Afterwards this is closed.
///
/// # Errors
///
/// Errors of the raw source are returned unchanged. Operations after
/// [`close()`][Self::close] fail with [`ErrorKind::Closed`], converted to the error type of the
/// source.
#[derive(Debug)]
pub struct AsyncSource<S: AsyncRawSource> {
    source: S,
    buffer: Buffer,
    read_chunk_size: NonZero<usize>,
    exhausted: bool,
    closed: bool,
    in_flight: InFlight,
    abort: AbortSignal,
}

impl<S: AsyncRawSource> AsyncSource<S> {
    /// Wraps `source` with the default configuration.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::builder(source).build()
    }

    /// Starts building an `AsyncSource` that reads from `source`.
    pub fn builder(source: S) -> AsyncSourceBuilder<S> {
        AsyncSourceBuilder {
            source,
            pool: None,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// The bytes read from the source but not yet consumed.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable access to the bytes read from the source, for consuming them.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// The wrapped source.
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Whether the source has reported the end of the stream.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether this has been closed, gracefully, abruptly or by an abort.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns a handle that aborts the operations of this source.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.handle()
    }

    /// Reads from the source until `predicate` holds.
    ///
    /// Returns `true` as soon as the predicate holds, without reading further. Returns `false`
    /// if the source reached the end of the stream and the predicate still does not hold.
    ///
    /// # Errors
    ///
    /// Propagates errors of the source. Fails with [`ErrorKind::Closed`] if this has been
    /// closed, with [`ErrorKind::Aborted`] if aborted and with
    /// [`ErrorKind::OperationInFlight`] if an earlier operation was leaked.
    pub async fn await_until(&mut self, predicate: impl AwaitPredicate) -> Result<bool, S::Error> {
        let _operation = self.in_flight.enter()?;
        self.check_ready()?;

        // Reads only append, so the bytes searched by an unsatisfied test need no second look.
        let mut tested_len = 0;

        loop {
            if predicate.test_appended(&self.buffer, self.exhausted, tested_len) {
                return Ok(true);
            }

            if self.exhausted {
                return Ok(false);
            }

            tested_len = self.buffer.len();

            let read = self
                .abort
                .race(self.source.read_at_most_to(&mut self.buffer, self.read_chunk_size.get()))
                .await;

            let Some(read) = read else {
                return Err(self.aborted());
            };

            let byte_count = read?;
            event!(
                Level::TRACE,
                message = "source read",
                byte_count,
                buffered = self.buffer.len()
            );

            if byte_count == 0 {
                event!(Level::DEBUG, message = "end of stream", buffered = self.buffer.len());
                self.exhausted = true;
            }
        }
    }

    /// Reads from the source until at least `byte_count` bytes are buffered.
    ///
    /// Returns `false` if the source reached the end of the stream first.
    ///
    /// # Errors
    ///
    /// See [`await_until()`][Self::await_until].
    pub async fn request(&mut self, byte_count: usize) -> Result<bool, S::Error> {
        self.await_until(data_available(byte_count)).await
    }

    /// Reads from the source until at least `byte_count` bytes are buffered.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InsufficientData`] if the source reached the end of the stream
    /// first. Otherwise see [`await_until()`][Self::await_until].
    pub async fn require(&mut self, byte_count: usize) -> Result<(), S::Error> {
        if self.request(byte_count).await? {
            Ok(())
        } else {
            Err(segbuf::Error::insufficient_data(byte_count, self.buffer.len()).into())
        }
    }

    /// Closes the source gracefully. Closing again does nothing.
    ///
    /// Buffered bytes remain readable. This is closed even if closing the source fails. If the
    /// returned future is dropped before the source has finished closing, the source is closed
    /// abruptly instead.
    ///
    /// # Errors
    ///
    /// Propagates the error of the source. Fails with [`ErrorKind::Aborted`] if aborted, in
    /// which case the source is closed abruptly instead.
    pub async fn close(&mut self) -> Result<(), S::Error> {
        let _operation = self.in_flight.enter()?;

        if self.closed {
            return Ok(());
        }

        self.closed = true;
        event!(Level::DEBUG, message = "source closing");

        let mut guard = CloseGuard::new(&mut self.source, S::close_abruptly);

        let closed = self.abort.race(guard.target().close()).await;

        match closed {
            Some(result) => {
                guard.disarm();
                result
            }
            // Dropping the guard closes the source abruptly.
            None => Err(segbuf::Error::from(ErrorKind::Aborted).into()),
        }
    }

    /// Closes the source abruptly without suspending. Does nothing if already closed.
    pub fn close_abruptly(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        event!(Level::DEBUG, message = "source closed abruptly");
        self.source.close_abruptly();
    }

    /// Takes apart this object, returning the source and any buffered bytes.
    #[must_use]
    pub fn into_parts(self) -> (S, Buffer) {
        (self.source, self.buffer)
    }

    fn check_ready(&mut self) -> Result<(), S::Error> {
        if self.closed {
            return Err(segbuf::Error::from(ErrorKind::Closed).into());
        }

        if self.abort.is_aborted() {
            return Err(self.aborted());
        }

        Ok(())
    }

    fn aborted(&mut self) -> S::Error {
        event!(Level::DEBUG, message = "source aborted", buffered = self.buffer.len());
        self.close_abruptly();
        segbuf::Error::from(ErrorKind::Aborted).into()
    }
}

/// Creates an instance of [`AsyncSource`].
///
/// Access through [`AsyncSource::builder()`].
#[derive(Debug)]
#[must_use]
pub struct AsyncSourceBuilder<S: AsyncRawSource> {
    source: S,
    pool: Option<SegmentPool>,
    read_chunk_size: NonZero<usize>,
}

impl<S: AsyncRawSource> AsyncSourceBuilder<S> {
    /// The pool the buffer takes segments from. Defaults to the
    /// [global pool][SegmentPool::global].
    pub fn pool(mut self, pool: SegmentPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// The maximum number of bytes requested from the source per read. Defaults to
    /// [`SEGMENT_SIZE`].
    pub fn read_chunk_size(mut self, read_chunk_size: NonZero<usize>) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }

    /// Builds the source with the provided configuration.
    #[must_use]
    pub fn build(self) -> AsyncSource<S> {
        AsyncSource {
            source: self.source,
            buffer: Buffer::with_pool(self.pool.unwrap_or_else(SegmentPool::global)),
            read_chunk_size: self.read_chunk_size,
            exhausted: false,
            closed: false,
            in_flight: InFlight::default(),
            abort: AbortSignal::default(),
        }
    }
}
