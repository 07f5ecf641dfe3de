// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use segbuf::{Buffer, ErrorKind, SegmentPool};
use tracing::{Level, event};

use crate::abort::AbortSignal;
use crate::close_guard::CloseGuard;
use crate::in_flight::InFlight;
use crate::{AbortHandle, AsyncRawSink};

/// The write half of an asynchronous buffer: a [`Buffer`] drained on demand into an
/// [`AsyncRawSink`].
///
/// Bytes are staged synchronously via [`buffer_mut()`][Self::buffer_mut] and handed to the sink
/// by [`emit()`][Self::emit], [`flush()`][Self::flush] or [`close()`][Self::close].
///
/// # Example
///
/// ```
/// # testing_aids::execute_or_terminate_process(|| futures::executor::block_on(async {
/// use segbuf::{Buffer, ByteOrder};
/// use segbuf_io::AsyncSink;
///
/// let mut sink = AsyncSink::new(Buffer::new());
///
/// sink.buffer_mut().write_num(7_u16, ByteOrder::BigEndian);
/// sink.buffer_mut().write_slice(b"payload");
/// sink.close().await.unwrap();
///
/// let (mut written, _) = sink.into_parts();
/// assert_eq!(written.read_num::<u16>(ByteOrder::BigEndian).unwrap(), 7);
/// # }));
/// ```
///
/// Single flight and aborts behave as described for [`AsyncSource`][crate::AsyncSource].
#[derive(Debug)]
pub struct AsyncSink<S: AsyncRawSink> {
    sink: S,
    buffer: Buffer,
    closed: bool,
    in_flight: InFlight,
    abort: AbortSignal,
}

impl<S: AsyncRawSink> AsyncSink<S> {
    /// Wraps `sink`, staging bytes in segments from the global pool.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_pool(sink, SegmentPool::global())
    }

    /// Wraps `sink`, staging bytes in segments from `pool`.
    #[must_use]
    pub fn with_pool(sink: S, pool: SegmentPool) -> Self {
        Self {
            sink,
            buffer: Buffer::with_pool(pool),
            closed: false,
            in_flight: InFlight::default(),
            abort: AbortSignal::default(),
        }
    }

    /// The bytes staged but not yet handed to the sink.
    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Mutable access to the staged bytes, for appending to them.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// The wrapped sink.
    #[must_use]
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Whether this has been closed, gracefully, abruptly or by an abort.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns a handle that aborts the operations of this sink.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.handle()
    }

    /// Hands all staged bytes to the sink without flushing it.
    ///
    /// # Errors
    ///
    /// Propagates errors of the sink. Fails with [`ErrorKind::Closed`] if this has been closed,
    /// with [`ErrorKind::Aborted`] if aborted and with [`ErrorKind::OperationInFlight`] if an
    /// earlier operation was leaked.
    pub async fn emit(&mut self) -> Result<(), S::Error> {
        let _operation = self.in_flight.enter()?;
        self.check_ready()?;
        self.emit_staged().await
    }

    /// Hands all staged bytes to the sink and flushes it.
    ///
    /// # Errors
    ///
    /// See [`emit()`][Self::emit].
    pub async fn flush(&mut self) -> Result<(), S::Error> {
        let _operation = self.in_flight.enter()?;
        self.check_ready()?;
        self.flush_staged().await
    }

    /// Flushes all staged bytes and closes the sink gracefully. Closing again does nothing.
    ///
    /// This is closed even if flushing or closing the sink fails, and the sink is closed even
    /// if flushing fails. If the returned future is dropped while the sink is closing, the sink
    /// is closed abruptly instead.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Fails with [`ErrorKind::Aborted`] if aborted, in
    /// which case the sink is closed abruptly instead.
    pub async fn close(&mut self) -> Result<(), S::Error> {
        let _operation = self.in_flight.enter()?;

        if self.closed {
            return Ok(());
        }

        if self.abort.is_aborted() {
            return Err(self.aborted());
        }

        let flushed = self.flush_staged().await;

        // An abort during the flush has already closed the sink abruptly.
        if self.closed {
            return flushed;
        }

        self.closed = true;
        event!(Level::DEBUG, message = "sink closing", discarded = self.buffer.len());

        let mut guard = CloseGuard::new(&mut self.sink, S::close_abruptly);

        let closed = self.abort.race(guard.target().close()).await;

        let closed = match closed {
            Some(result) => {
                guard.disarm();
                result
            }
            // Dropping the guard closes the sink abruptly.
            None => Err(segbuf::Error::from(ErrorKind::Aborted).into()),
        };

        flushed.and(closed)
    }

    /// Closes the sink abruptly without suspending. Staged bytes are not written. Does nothing
    /// if already closed.
    pub fn close_abruptly(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        event!(Level::DEBUG, message = "sink closed abruptly", discarded = self.buffer.len());
        self.sink.close_abruptly();
    }

    /// Takes apart this object, returning the sink and any staged bytes.
    #[must_use]
    pub fn into_parts(self) -> (S, Buffer) {
        (self.sink, self.buffer)
    }

    async fn emit_staged(&mut self) -> Result<(), S::Error> {
        let byte_count = self.buffer.len();
        if byte_count == 0 {
            return Ok(());
        }

        match self.abort.race(self.sink.write(&mut self.buffer, byte_count)).await {
            Some(result) => {
                result?;
                event!(Level::TRACE, message = "sink write", byte_count);
                Ok(())
            }
            None => Err(self.aborted()),
        }
    }

    async fn flush_staged(&mut self) -> Result<(), S::Error> {
        self.emit_staged().await?;

        match self.abort.race(self.sink.flush()).await {
            Some(result) => result,
            None => Err(self.aborted()),
        }
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
        event!(Level::DEBUG, message = "sink aborted", staged = self.buffer.len());
        self.close_abruptly();
        segbuf::Error::from(ErrorKind::Aborted).into()
    }
}
