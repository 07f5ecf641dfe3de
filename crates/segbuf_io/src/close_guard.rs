// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tracing::{Level, event};

/// Closes a raw source or sink abruptly when dropped, unless disarmed.
///
/// Held across the suspension point of a graceful close. If the future of the close is dropped
/// before the raw close completes, or an abort wins the race against it, the raw source or sink
/// is still released.
pub(crate) struct CloseGuard<'a, T> {
    target: &'a mut T,
    close_abruptly: fn(&mut T),
    armed: bool,
}

impl<'a, T> CloseGuard<'a, T> {
    pub(crate) fn new(target: &'a mut T, close_abruptly: fn(&mut T)) -> Self {
        Self {
            target,
            close_abruptly,
            armed: true,
        }
    }

    pub(crate) fn target(&mut self) -> &mut T {
        self.target
    }

    /// Called once the raw close has completed, successfully or not.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for CloseGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            event!(Level::DEBUG, message = "unfinished close, closing abruptly");
            (self.close_abruptly)(self.target);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    fn mark(closed: &mut bool) {
        *closed = true;
    }

    #[test]
    fn dropped_guard_closes_abruptly() {
        let mut closed = false;

        drop(CloseGuard::new(&mut closed, mark));

        assert!(closed);
    }

    #[test]
    fn disarmed_guard_does_nothing() {
        let mut closed = false;

        let mut guard = CloseGuard::new(&mut closed, mark);
        assert!(!*guard.target());
        guard.disarm();

        assert!(!closed);
    }
}
