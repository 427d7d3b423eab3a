#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private fixtures and helpers for testing poly packages.
//!
//! The fixtures model a small type hierarchy with two intermediate interfaces, a type that
//! implements both of them, and a type whose base is a field at a non-zero offset. Every fixture
//! counts how many times it has been dropped so tests can check ownership.

mod drops;
mod hierarchy;
mod layout;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub use drops::*;
pub use hierarchy::*;
pub use layout::*;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// The limit is 10 seconds, or 60 seconds under Miri where threads are much slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the test runs directly on
/// the calling thread without a limit, so that mutations which hang can be detected by the
/// mutation testing tool itself.
///
/// # Panics
///
/// Panics if the test exceeds the limit. Panics from the test itself are propagated.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
#[cfg_attr(test, mutants::skip)] // Mutating the time limit can only be observed by hanging a test.
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        // If sending fails, the watchdog has already given up on us.
        drop(tx.send(test_fn()));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after sending its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {} second limit", timeout.as_secs());
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected without a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn watchdog_returns_result() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    #[should_panic(expected = "inner failure")]
    fn watchdog_propagates_panics() {
        with_watchdog::<_, ()>(|| panic!("inner failure"));
    }
}
