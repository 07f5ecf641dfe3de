// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use segbuf::ErrorKind;

/// Tracks whether an operation is in flight.
///
/// Operations take `&mut self`, so two can only overlap if the future of an earlier one was
/// leaked (e.g. via `mem::forget`) while suspended. Such a leaked future keeps its guard
/// forever and every later operation is rejected, because the state it left behind cannot be
/// trusted.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    /// Marks an operation as started until the returned guard is dropped.
    pub(crate) fn enter(&self) -> Result<OperationGuard, segbuf::Error> {
        if self.flag.swap(true, Ordering::AcqRel) {
            return Err(ErrorKind::OperationInFlight.into());
        }

        Ok(OperationGuard {
            flag: Arc::clone(&self.flag),
        })
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag when the operation completes or its future is dropped.
#[derive(Debug)]
#[must_use]
pub(crate) struct OperationGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
