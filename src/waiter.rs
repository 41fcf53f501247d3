// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Waiting for long-running server-side operations.
//!
//! Mutating calls against cloud services usually return before the work is
//! done; the caller is expected to poll the resource until its status leaves
//! an in-progress state. A [Waiter](struct.Waiter.html) runs that loop:
//! sleep for the next interval of a backoff schedule, re-fetch the resource,
//! report it to an optional progress observer, and stop once the status is
//! terminal, the schedule is exhausted or cancellation is requested.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::Error;

/// A resource snapshot exposing a status name.
pub trait HasStatus {
    /// The name of the current status, as returned by the server.
    fn status_name(&self) -> &str;
}

/// Whether a status name denotes an operation still in progress.
///
/// This is a case-insensitive substring match for `IN_PROGRESS`, the rule
/// OpenStack and Rackspace orchestration statuses follow. It is knowingly
/// fragile: a future status containing the substring coincidentally will
/// match too. Use [with_check](struct.Waiter.html#method.with_check) for
/// resources with a different status taxonomy.
#[inline]
pub fn is_in_progress(status: &str) -> bool {
    status.to_ascii_uppercase().contains("IN_PROGRESS")
}

/// An exponential backoff schedule.
///
/// Yields the initial interval, then doubles it on every step up to the cap.
/// Without [with_limit](#method.with_limit) the schedule is infinite, so a
/// waiter using it only stops on a terminal status or cancellation.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    next: Duration,
    cap: Duration,
    remaining: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a schedule starting at `initial` and capped at `cap`.
    pub fn new(initial: Duration, cap: Duration) -> ExponentialBackoff {
        ExponentialBackoff {
            next: initial,
            cap,
            remaining: None,
        }
    }

    /// Limit the schedule to the given number of intervals.
    pub fn with_limit(mut self, attempts: usize) -> ExponentialBackoff {
        self.remaining = Some(attempts);
        self
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(ref mut remaining) = self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let current = self.next;
        self.next = (current * 2).min(self.cap);
        Some(current)
    }
}

/// A fixed-interval schedule of the given length.
pub fn fixed_interval(
    interval: Duration,
    attempts: usize,
) -> std::iter::Take<std::iter::Repeat<Duration>> {
    std::iter::repeat(interval).take(attempts)
}

fn default_schedule() -> ExponentialBackoff {
    ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30)).with_limit(60)
}

/// Outcome of waiting for a long-running operation.
///
/// Cancellation is a regular outcome rather than an error, so that callers
/// can tell "I gave up" apart from "it failed".
#[derive(Debug)]
pub enum WaitOutcome<S> {
    /// The operation reached a terminal status; the last snapshot is inside.
    Completed(S),
    /// Cancellation was requested, or the backoff schedule ran out.
    Cancelled,
}

impl<S> WaitOutcome<S> {
    /// The final snapshot, if the operation completed.
    pub fn completed(self) -> Option<S> {
        match self {
            WaitOutcome::Completed(snapshot) => Some(snapshot),
            WaitOutcome::Cancelled => None,
        }
    }

    /// Whether the wait was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitOutcome::Cancelled)
    }
}

/// Polls a fetch operation until the resource leaves an in-progress state.
///
/// The waiter issues at most one fetch at a time: it sleeps for the next
/// interval of the schedule, fetches, reports the snapshot to the progress
/// observer and re-evaluates. A fetch failure resolves the wait with the
/// underlying error; the waiter itself never retries a failed fetch.
///
/// ```rust,no_run
/// # async fn example() -> Result<(), oscloud::Error> {
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// use oscloud::orchestration::{Orchestration, Stack, StackName};
/// use oscloud::{Client, Waiter};
///
/// let heat = Orchestration::new(Client::new("https://heat.example.org/v1/project")?);
/// let name = StackName::new("teapot")?;
///
/// let outcome = Waiter::new(|| heat.get_stack(&name))
///     .with_backoff(oscloud::fixed_interval(Duration::from_secs(5), 120))
///     .on_progress(|stack: &Stack| println!("still {}", stack.stack_status))
///     .wait(&CancellationToken::new())
///     .await?;
/// # Ok(()) }
/// # #[tokio::main]
/// # async fn main() { example().await.unwrap(); }
/// ```
pub struct Waiter<S, F> {
    fetch: F,
    schedule: Box<dyn Iterator<Item = Duration> + Send>,
    check: Box<dyn Fn(&S) -> bool + Send>,
    progress: Option<Box<dyn FnMut(&S) + Send>>,
}

impl<S, F> Waiter<S, F> {
    /// Create a waiter with an explicit in-progress check.
    ///
    /// The check receives each fetched snapshot and returns whether the
    /// operation is still running.
    pub fn with_check<C>(fetch: F, check: C) -> Waiter<S, F>
    where
        C: Fn(&S) -> bool + Send + 'static,
    {
        Waiter {
            fetch,
            schedule: Box::new(default_schedule()),
            check: Box::new(check),
            progress: None,
        }
    }

    /// Replace the backoff schedule.
    ///
    /// The schedule bounds the wait: when it runs out, the wait resolves to
    /// [WaitOutcome::Cancelled](enum.WaitOutcome.html). An infinite schedule
    /// combined with an inert cancellation token polls forever.
    pub fn with_backoff<I>(mut self, schedule: I) -> Waiter<S, F>
    where
        I: Iterator<Item = Duration> + Send + 'static,
    {
        self.schedule = Box::new(schedule);
        self
    }

    /// Observe every fetched snapshot, including the terminal one.
    pub fn on_progress<P>(mut self, progress: P) -> Waiter<S, F>
    where
        P: FnMut(&S) + Send + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Run the poll loop until a terminal status, an error or cancellation.
    ///
    /// Cancellation is checked before every sleep and before every fetch;
    /// once observed, no further fetches are issued.
    pub async fn wait<Fut>(self, cancel: &CancellationToken) -> Result<WaitOutcome<S>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S, Error>>,
    {
        let Waiter {
            mut fetch,
            mut schedule,
            check,
            mut progress,
        } = self;

        let mut fetches = 0_usize;
        loop {
            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }

            let interval = match schedule.next() {
                Some(interval) => interval,
                None => {
                    debug!("Backoff schedule exhausted after {} fetch(es)", fetches);
                    return Ok(WaitOutcome::Cancelled);
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(WaitOutcome::Cancelled),
                _ = time::sleep(interval) => {}
            }

            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }

            let snapshot = fetch().await?;
            fetches += 1;
            if let Some(observer) = progress.as_mut() {
                observer(&snapshot);
            }

            if check(&snapshot) {
                trace!("Operation still in progress after {} fetch(es)", fetches);
            } else {
                debug!("Operation reached a terminal status after {} fetch(es)", fetches);
                return Ok(WaitOutcome::Completed(snapshot));
            }
        }
    }
}

impl<S: HasStatus, F> Waiter<S, F> {
    /// Create a waiter with the default in-progress check.
    ///
    /// The default check is [is_in_progress](fn.is_in_progress.html) over the
    /// snapshot's status name.
    pub fn new(fetch: F) -> Waiter<S, F> {
        Waiter::with_check(fetch, |snapshot: &S| is_in_progress(snapshot.status_name()))
    }
}

impl<S, F> fmt::Debug for Waiter<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::{fixed_interval, is_in_progress, ExponentialBackoff, HasStatus, Waiter};
    use crate::{Error, ErrorKind};

    #[derive(Debug, Clone)]
    struct Snapshot {
        status: String,
    }

    impl HasStatus for Snapshot {
        fn status_name(&self) -> &str {
            &self.status
        }
    }

    fn scripted_fetch(
        statuses: &[&str],
        counter: Arc<AtomicUsize>,
    ) -> impl FnMut() -> std::future::Ready<Result<Snapshot, Error>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        move || {
            let index = counter.fetch_add(1, Ordering::SeqCst);
            let status = statuses[index.min(statuses.len() - 1)].clone();
            std::future::ready(Ok(Snapshot { status }))
        }
    }

    const TICK: Duration = Duration::from_millis(1);

    #[test]
    fn test_is_in_progress() {
        assert!(is_in_progress("CREATE_IN_PROGRESS"));
        assert!(is_in_progress("delete_in_progress"));
        assert!(!is_in_progress("CREATE_COMPLETE"));
        assert!(!is_in_progress("CREATE_FAILED"));
    }

    #[test]
    fn test_exponential_backoff_doubles_to_cap() {
        let schedule = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5));
        let intervals: Vec<_> = schedule.take(4).map(|d| d.as_secs()).collect();
        assert_eq!(intervals, vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_exponential_backoff_limit() {
        let schedule =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5)).with_limit(2);
        assert_eq!(schedule.count(), 2);
    }

    #[tokio::test]
    async fn test_wait_until_complete() {
        let _ = env_logger::builder().is_test(true).try_init();
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(
            &[
                "CREATE_IN_PROGRESS",
                "CREATE_IN_PROGRESS",
                "CREATE_COMPLETE",
            ],
            Arc::clone(&counter),
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);

        let outcome = Waiter::new(fetch)
            .with_backoff(fixed_interval(TICK, 10))
            .on_progress(move |snapshot: &Snapshot| {
                recorded.lock().unwrap().push(snapshot.status.clone());
            })
            .wait(&CancellationToken::new())
            .await
            .unwrap();

        let snapshot = outcome.completed().unwrap();
        assert_eq!(snapshot.status, "CREATE_COMPLETE");
        // Exactly three fetches, reported to the observer in order.
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "CREATE_IN_PROGRESS",
                "CREATE_IN_PROGRESS",
                "CREATE_COMPLETE",
            ]
        );
    }

    #[tokio::test]
    async fn test_wait_schedule_exhausted() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(&["UPDATE_IN_PROGRESS"], Arc::clone(&counter));

        let outcome = Waiter::new(fetch)
            .with_backoff(fixed_interval(TICK, 1))
            .wait(&CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_cancelled_before_first_fetch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(&["CREATE_IN_PROGRESS"], Arc::clone(&counter));

        let token = CancellationToken::new();
        token.cancel();

        let outcome = Waiter::new(fetch)
            .with_backoff(fixed_interval(Duration::from_secs(3600), 10))
            .wait(&token)
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_fetch_failure_propagates() {
        let mut first = true;
        let fetch = move || {
            let result = if first {
                first = false;
                Ok(Snapshot {
                    status: "DELETE_IN_PROGRESS".to_string(),
                })
            } else {
                Err(Error::new(ErrorKind::ServiceUnavailable, "gone away"))
            };
            std::future::ready(result)
        };

        let err = Waiter::new(fetch)
            .with_backoff(fixed_interval(TICK, 10))
            .wait(&CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_wait_custom_check() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch = scripted_fetch(&["spawning", "active"], Arc::clone(&counter));

        let outcome = Waiter::with_check(fetch, |snapshot: &Snapshot| {
            snapshot.status != "active"
        })
        .with_backoff(fixed_interval(TICK, 10))
        .wait(&CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.completed().unwrap().status, "active");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
