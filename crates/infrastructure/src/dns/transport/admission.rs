use dohproxy_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Caps the number of outstanding upstream requests. A caller that cannot
/// get a permit within the acquire timeout is turned away instead of
/// queueing without bound.
#[derive(Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl AdmissionGate {
    pub fn new(capacity: usize, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout,
        }
    }

    /// Waits for a permit. The permit goes back to the gate when dropped.
    pub async fn acquire(
        &self,
        ctx: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit, DomainError> {
        let acquire = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        );

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(DomainError::QueryCancelled),
            result = acquire => match result {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_closed)) => Err(DomainError::QueryCancelled),
                Err(_elapsed) => Err(DomainError::AdmissionTimeout {
                    timeout_ms: self.acquire_timeout.as_millis() as u64,
                }),
            },
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dohproxy_domain::config::upstream::MAX_CONCURRENT_REQUESTS;

    #[tokio::test]
    async fn test_acquire_within_capacity() {
        let gate = AdmissionGate::new(2, Duration::from_millis(50));
        let ctx = CancellationToken::new();

        let first = gate.acquire(&ctx).await.unwrap();
        let _second = gate.acquire(&ctx).await.unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_flight(), 2);

        drop(first);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_full_gate_times_out() {
        let gate = AdmissionGate::new(1, Duration::from_millis(20));
        let ctx = CancellationToken::new();
        let _held = gate.acquire(&ctx).await.unwrap();

        let result = gate.acquire(&ctx).await;
        assert_eq!(result.unwrap_err(), DomainError::AdmissionTimeout { timeout_ms: 20 });
    }

    #[tokio::test]
    async fn test_release_admits_exactly_one_waiter() {
        let gate = AdmissionGate::new(1, Duration::from_secs(5));
        let ctx = CancellationToken::new();
        let held = gate.acquire(&ctx).await.unwrap();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { gate.acquire(&ctx).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        drop(held);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let finished = waiters.iter().filter(|w| w.is_finished()).count();
        assert_eq!(finished, 1);
        assert_eq!(gate.available(), 0);

        ctx.cancel();
        for waiter in waiters {
            let _ = waiter.await;
        }
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_waiting() {
        let gate = AdmissionGate::new(1, Duration::from_secs(5));
        let ctx = CancellationToken::new();
        let _held = gate.acquire(&ctx).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { gate.acquire(&ctx).await })
        };

        ctx.cancel();
        let result = waiter.await.unwrap();
        assert_eq!(result.unwrap_err(), DomainError::QueryCancelled);
    }

    #[test]
    fn test_config_limit_matches_semaphore_ceiling() {
        assert_eq!(MAX_CONCURRENT_REQUESTS, Semaphore::MAX_PERMITS);

        let gate = AdmissionGate::new(MAX_CONCURRENT_REQUESTS, Duration::from_millis(50));
        assert_eq!(gate.capacity(), MAX_CONCURRENT_REQUESTS);
    }
}
