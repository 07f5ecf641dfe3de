// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! An unpublished crate containing testing utilities for the segbuf crates.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::time::Duration;
use std::{env, process, thread};

mod log;

pub use log::*;

/// If something does not happen in a test within this time, the test fails.
///
/// Only meant to break out of infinite loops and hung futures, never to time expected work.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the tests are running under `cargo mutants`.
#[must_use]
pub fn is_mutation_testing() -> bool {
    env::var("MUTATION_TESTING").as_deref() == Ok("1")
}

/// Executes a function on the current thread with a watchdog that terminates the process if
/// the function does not complete within [`TEST_TIMEOUT`].
///
/// # Panics
///
/// Re-raises any panic of `f`.
#[cfg_attr(test, mutants::skip)] // Test logic.
pub fn execute_or_terminate_process<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    if is_mutation_testing() {
        return f();
    }

    let (sender, receiver) = mpsc::channel();

    let watchdog = thread::Builder::new()
        .name("test watchdog".to_string())
        .spawn(move || {
            if receiver.recv_timeout(TEST_TIMEOUT).is_err() {
                eprintln!("Test timed out, terminating process.");
                #[expect(clippy::exit, reason = "a hung test cannot be recovered in-process")]
                // Arbitrary value in portable range (8 bits) to signal "emergency timeout".
                process::exit(112);
            }
        })
        .expect("failed to spawn test watchdog thread");

    let result = catch_unwind(AssertUnwindSafe(f));

    // Signal completion whether `f` panicked or not.
    _ = sender.send(());
    _ = watchdog.join();

    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Runs an async test body on the `futures` executor, blocking until it completes and
/// enforcing [`TEST_TIMEOUT`].
#[cfg_attr(test, mutants::skip)] // Test logic.
pub fn async_test<F, FF>(f: F)
where
    F: FnOnce() -> FF + 'static,
    FF: Future<Output = ()>,
{
    execute_or_terminate_process(|| {
        futures::executor::block_on(f());
    });
}

/// Standard test data generator - a repeating sequence of bytes from 0 to 255.
pub fn repeating_incrementing_bytes() -> impl Iterator<Item = u8> {
    (0..=u8::MAX).cycle()
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_wraps_around() {
        let bytes = repeating_incrementing_bytes().skip(255).take(3).collect::<Vec<_>>();
        assert_eq!(bytes, [255, 0, 1]);
    }

    #[test]
    fn execute_or_terminate_process_returns_result() {
        assert_eq!(execute_or_terminate_process(|| 40 + 2), 42);
    }

    #[test]
    fn async_test_runs_body_to_completion() {
        let (sender, receiver) = mpsc::channel();

        async_test(async move || {
            futures::future::ready(()).await;
            sender.send(42).unwrap();
        });

        assert_eq!(receiver.try_recv().unwrap(), 42);
    }
}
