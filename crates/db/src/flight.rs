//! Single-flight deduplication for concurrent store loads.
//!
//! Collapses N concurrent loads of the same id into one store query and
//! fans the leader's result out to every waiter.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;

use guildhall_core::types::DbId;

use crate::error::DbError;

/// Process-local call group, keyed by record id.
///
/// A ticket exists only while duplicate loads are in flight and is
/// discarded as soon as the leader completes, so the map is empty in the
/// steady state. Not shared across processes: two instances of the
/// service may still each issue one load for the same id.
pub struct SingleFlight<T> {
    inflight: Mutex<HashMap<DbId, broadcast::Sender<Result<T, DbError>>>>,
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DbId, broadcast::Sender<Result<T, DbError>>>> {
        // A poisoning panic can only come from this module, which does
        // not panic while holding the lock; recover rather than unwind.
        self.inflight.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SingleFlight<T> {
    /// Run `load` for `key`, or wait on the load already in flight.
    ///
    /// The first caller per key becomes the leader and executes `load`;
    /// everyone arriving before it completes receives a clone of the
    /// leader's result without issuing their own load. A waiter whose
    /// future is dropped stops waiting immediately; the leader keeps
    /// running for the remaining waiters, and the leader's underlying
    /// call is never aborted by a waiter going away. If the leader itself
    /// is dropped mid-load, waiters get [`DbError::Interrupted`].
    pub async fn run<F, Fut>(&self, key: DbId, load: F) -> Result<T, DbError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DbError>>,
    {
        let waiter = {
            let mut inflight = self.lock();
            match inflight.get(&key) {
                Some(leader) => Some(leader.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    inflight.insert(key, sender);
                    None
                }
            }
        };

        if let Some(mut receiver) = waiter {
            return match receiver.recv().await {
                Ok(result) => result,
                Err(_) => Err(DbError::Interrupted),
            };
        }

        let mut ticket = Ticket {
            flight: self,
            key,
            armed: true,
        };
        let result = load().await;

        // Close the group before fanning out: callers arriving from here
        // on start a fresh flight instead of joining a finished one.
        let sender = self.lock().remove(&key);
        ticket.armed = false;
        if let Some(sender) = sender {
            // No receivers just means nobody joined; nothing to fan out.
            let _ = sender.send(result.clone());
        }
        result
    }
}

/// Removes the in-flight entry if the leader never reached its fan-out,
/// so waiters see a closed channel instead of hanging forever.
struct Ticket<'a, T> {
    flight: &'a SingleFlight<T>,
    key: DbId,
    armed: bool,
}

impl<T> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.flight.lock().remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let flight = Arc::new(SingleFlight::<i64>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let flight = Arc::clone(&flight);
            let loads = Arc::clone(&loads);
            tasks.push(tokio::spawn(async move {
                flight
                    .run(1, || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share_flights() {
        let flight = Arc::new(SingleFlight::<i64>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for key in [1, 2] {
            let flight = Arc::clone(&flight);
            let loads = Arc::clone(&loads);
            tasks.push(tokio::spawn(async move {
                flight
                    .run(key, || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(key * 10)
                    })
                    .await
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waiters_receive_the_leaders_error() {
        let flight = Arc::new(SingleFlight::<i64>::new());
        let release = Arc::new(tokio::sync::Notify::new());

        let leader = {
            let flight = Arc::clone(&flight);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                flight
                    .run(5, || async {
                        release.notified().await;
                        Err(DbError::RecordNotFound)
                    })
                    .await
            })
        };
        // Let the leader claim the flight before the waiter joins.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move { flight.run(5, || async { Ok(99) }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();

        assert_matches!(leader.await.unwrap(), Err(DbError::RecordNotFound));
        // The waiter's own load closure never ran; it saw the leader's error.
        assert_matches!(waiter.await.unwrap(), Err(DbError::RecordNotFound));
    }

    #[tokio::test]
    async fn sequential_calls_each_load() {
        let flight = SingleFlight::<i64>::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = flight
                .run(7, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(result.unwrap(), 7);
        }
        // The group is discarded after each flight; no stale fan-out.
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_leader_interrupts_waiters() {
        let flight = Arc::new(SingleFlight::<i64>::new());
        let started = Arc::new(tokio::sync::Notify::new());

        let leader = {
            let flight = Arc::clone(&flight);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                flight
                    .run(3, || async {
                        started.notify_one();
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        started.notified().await;

        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move { flight.run(3, || async { Ok(2) }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        assert_matches!(waiter.await.unwrap(), Err(DbError::Interrupted));
    }
}
