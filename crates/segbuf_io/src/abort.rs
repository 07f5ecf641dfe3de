// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::future::{Future, poll_fn};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

use futures::future::{Either, select};
use futures::task::AtomicWaker;

#[derive(Debug, Default)]
struct AbortState {
    aborted: AtomicBool,
    waker: AtomicWaker,
}

/// Requests that the operations of an [`AsyncSource`][crate::AsyncSource] or
/// [`AsyncSink`][crate::AsyncSink] stop.
///
/// Aborting wakes any pending operation, which then abruptly closes its raw source or sink and
/// fails with [`ErrorKind::Aborted`][segbuf::ErrorKind::Aborted]. If no operation is pending,
/// the next one does so instead. An abort cannot be undone.
///
/// The handle can be cloned and sent to other threads.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    state: Arc<AbortState>,
}

impl AbortHandle {
    /// Requests the abort.
    pub fn abort(&self) {
        self.state.aborted.store(true, Ordering::Release);
        self.state.waker.wake();
    }

    /// Whether [`abort()`][Self::abort] has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Acquire)
    }
}

/// The receiving side of an [`AbortHandle`], owned by the object whose operations it aborts.
#[derive(Debug, Default)]
pub(crate) struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    pub(crate) fn handle(&self) -> AbortHandle {
        AbortHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Acquire)
    }

    /// Completes once an abort has been requested.
    async fn wait(&self) {
        poll_fn(|cx| {
            if self.is_aborted() {
                return Poll::Ready(());
            }

            self.state.waker.register(cx.waker());

            // The abort may have happened between the check above and the registration.
            if self.is_aborted() { Poll::Ready(()) } else { Poll::Pending }
        })
        .await;
    }

    /// Runs `operation` to completion unless an abort is requested first, in which case the
    /// operation is dropped at its suspension point and `None` is returned.
    pub(crate) async fn race<F: Future>(&self, operation: F) -> Option<F::Output> {
        if self.is_aborted() {
            return None;
        }

        let operation = pin!(operation);
        let aborted = pin!(self.wait());

        match select(operation, aborted).await {
            Either::Left((output, _)) => Some(output),
            Either::Right(((), _)) => None,
        }
    }
}
