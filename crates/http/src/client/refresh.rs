//! Single-flight token refresh coordination
//!
//! The first request to hit a recoverable 401 becomes the leader and performs
//! the refresh. Requests that hit a 401 while the leader is refreshing park
//! as waiters. Once the refresh resolves every waiter receives a verdict: a
//! [`ReplayTurn`] after a success, or the shared failure reason.
//!
//! Each request replays inside its own future. Turns are chained in arrival
//! order (leader first, then waiters FIFO) so replays are dispatched in that
//! order; a turn dropped by a cancelled caller releases the next one.
//!
//! The state sits behind a mutex so the idle check and the transition to
//! refreshing happen as one step. The lock is never held across an await.

use super::error::UnrecoverableAuth;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// What a parked request learns once the refresh resolves
pub(crate) type Verdict = Result<ReplayTurn, UnrecoverableAuth>;

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<oneshot::Sender<Verdict>>,
}

/// Point-in-time view of the refresh state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSnapshot {
    /// A refresh call is outstanding
    pub in_progress: bool,
    /// Requests parked behind it
    pub waiting: usize,
    /// Refresh calls started since the client was built
    pub refreshes: u64,
}

/// What a request that got a recoverable 401 must do next
pub(crate) enum Admission<'a> {
    /// Perform the refresh; the guard returns the state to idle
    Leader(RefreshGuard<'a>),
    /// Wait for the leader's verdict
    Queued(oneshot::Receiver<Verdict>),
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    refreshes: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // The state is only mutated under short, non-panicking critical
        // sections, so a poisoned lock still holds consistent data.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Idle -> Refreshing for the first caller, park everyone else
    pub fn admit(&self) -> Admission<'_> {
        let mut state = self.lock();
        if state.in_progress {
            let (responder, receiver) = oneshot::channel();
            state.waiters.push_back(responder);
            tracing::debug!(
                waiting = state.waiters.len(),
                "Queued request behind in-flight token refresh"
            );
            Admission::Queued(receiver)
        } else {
            state.in_progress = true;
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            Admission::Leader(RefreshGuard {
                coordinator: self,
                finished: false,
            })
        }
    }

    pub fn snapshot(&self) -> RefreshSnapshot {
        let state = self.lock();
        RefreshSnapshot {
            in_progress: state.in_progress,
            waiting: state.waiters.len(),
            refreshes: self.refreshes.load(Ordering::Relaxed),
        }
    }
}

/// Permission to replay, handed out in arrival order
///
/// Dropping the turn, or calling [`ReplayTurn::release`], lets the next
/// request in the chain go.
pub(crate) struct ReplayTurn {
    after: Option<oneshot::Receiver<()>>,
    release: oneshot::Sender<()>,
}

impl ReplayTurn {
    /// Wait until the previous request in the chain has replayed or gone away
    pub async fn wait(&mut self) {
        if let Some(after) = self.after.take() {
            if after.await.is_err() {
                tracing::debug!("Preceding replay was cancelled; continuing");
            }
        }
    }

    /// Let the next request in the chain replay
    pub fn release(self) {
        if self.release.send(()).is_err() {
            tracing::debug!("No request left waiting for this replay");
        }
    }
}

/// Held by the leader for the duration of a refresh call
///
/// Dropping it without a verdict (the leading future was cancelled) returns
/// the state to idle and fails every waiter with
/// [`UnrecoverableAuth::RefreshAbandoned`].
pub(crate) struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    finished: bool,
}

impl RefreshGuard<'_> {
    /// Return to idle and hand back every parked responder, oldest first.
    ///
    /// Replays happen after this, so a replay that is rejected again starts
    /// a new cycle instead of parking behind the one that just ended.
    fn take_waiters(&mut self) -> Vec<oneshot::Sender<Verdict>> {
        self.finished = true;
        let mut state = self.coordinator.lock();
        state.in_progress = false;
        state.waiters.drain(..).collect()
    }

    /// The refresh succeeded: give every waiter its place in the replay
    /// chain and return the leader's turn, which comes first.
    pub fn succeed(mut self) -> ReplayTurn {
        let waiters = self.take_waiters();
        tracing::info!(waiting = waiters.len(), "Token refreshed; replaying requests");

        let (release, mut after) = oneshot::channel();
        let leader = ReplayTurn {
            after: None,
            release,
        };
        for responder in waiters {
            let (release, next) = oneshot::channel();
            let turn = ReplayTurn {
                after: Some(after),
                release,
            };
            // An unsent turn is dropped here, which releases the next waiter
            if responder.send(Ok(turn)).is_err() {
                tracing::debug!("Queued caller stopped waiting before the refresh finished");
            }
            after = next;
        }
        leader
    }

    /// The refresh failed: reject every waiter with `reason`
    pub fn fail(mut self, reason: &UnrecoverableAuth) {
        reject(self.take_waiters(), reason);
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let abandoned = self.take_waiters();
        if !abandoned.is_empty() {
            tracing::warn!(
                waiting = abandoned.len(),
                "Token refresh abandoned; failing queued requests"
            );
        }
        reject(abandoned, &UnrecoverableAuth::RefreshAbandoned);
    }
}

fn reject(waiters: Vec<oneshot::Sender<Verdict>>, reason: &UnrecoverableAuth) {
    for responder in waiters {
        if responder.send(Err(reason.clone())).is_err() {
            tracing::debug!("Queued caller stopped waiting before the refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshGuard<'_> {
        match coordinator.admit() {
            Admission::Leader(guard) => guard,
            Admission::Queued(_) => panic!("expected leader"),
        }
    }

    fn queued(coordinator: &RefreshCoordinator) -> oneshot::Receiver<Verdict> {
        match coordinator.admit() {
            Admission::Queued(receiver) => receiver,
            Admission::Leader(_) => panic!("expected queued"),
        }
    }

    #[test]
    fn test_first_caller_leads() {
        let coordinator = RefreshCoordinator::new();
        let _guard = leader(&coordinator);

        let snapshot = coordinator.snapshot();
        assert!(snapshot.in_progress);
        assert_eq!(snapshot.waiting, 0);
        assert_eq!(snapshot.refreshes, 1);
    }

    #[test]
    fn test_later_callers_queue() {
        let coordinator = RefreshCoordinator::new();
        let _guard = leader(&coordinator);
        let _r1 = queued(&coordinator);
        let _r2 = queued(&coordinator);
        let _r3 = queued(&coordinator);

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.waiting, 3);
        assert_eq!(snapshot.refreshes, 1);
    }

    #[test]
    fn test_idle_after_cycle_allows_new_leader() {
        let coordinator = RefreshCoordinator::new();
        leader(&coordinator).succeed().release();
        assert!(!coordinator.snapshot().in_progress);

        let _guard = leader(&coordinator);
        assert_eq!(coordinator.snapshot().refreshes, 2);
    }

    #[tokio::test]
    async fn test_turns_follow_arrival_order() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let r1 = queued(&coordinator);
        let r2 = queued(&coordinator);

        let lead_turn = guard.succeed();
        assert!(!coordinator.snapshot().in_progress);

        let Ok(Ok(mut first)) = r1.await else {
            panic!("expected a turn");
        };
        let Ok(Ok(mut second)) = r2.await else {
            panic!("expected a turn");
        };

        // The second waiter cannot go before the first has replayed
        let mut second_wait = Box::pin(async move {
            second.wait().await;
            second
        });
        assert!(futures::poll!(second_wait.as_mut()).is_pending());

        lead_turn.release();
        first.wait().await;
        assert!(futures::poll!(second_wait.as_mut()).is_pending());

        first.release();
        second_wait.await.release();
    }

    #[tokio::test]
    async fn test_dropped_turn_releases_next() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let r1 = queued(&coordinator);

        let lead_turn = guard.succeed();
        drop(lead_turn);

        let Ok(Ok(mut turn)) = r1.await else {
            panic!("expected a turn");
        };
        turn.wait().await;
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let receivers = [queued(&coordinator), queued(&coordinator)];

        guard.fail(&UnrecoverableAuth::MissingCredentials);

        for receiver in receivers {
            assert!(matches!(
                receiver.await,
                Ok(Err(UnrecoverableAuth::MissingCredentials))
            ));
        }
        assert!(!coordinator.snapshot().in_progress);
    }

    #[tokio::test]
    async fn test_dropped_leader_fails_waiters() {
        let coordinator = RefreshCoordinator::new();
        let guard = leader(&coordinator);
        let receiver = queued(&coordinator);

        drop(guard);

        assert!(matches!(
            receiver.await,
            Ok(Err(UnrecoverableAuth::RefreshAbandoned))
        ));
        assert!(!coordinator.snapshot().in_progress);
    }
}
