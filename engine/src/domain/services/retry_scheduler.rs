//! Retry Scheduler
//!
//! Pure fixed-interval polling of a readiness probe: no backoff, no jitter.
//! This is the only retry logic in the crate.

use crate::domain::ports::ReadinessProbe;
use crate::domain::{DomainError, ProbeError, RetryBudget};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Repeats a probe every `delay` until it succeeds or the budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryScheduler {
    budget: RetryBudget,
}

impl RetryScheduler {
    pub fn new(budget: RetryBudget) -> Self {
        Self { budget }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(RetryBudget::default().with_timeout(timeout))
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    /// Run `probe` until it succeeds.
    ///
    /// Every probe failure is swallowed. Once the elapsed budget exceeds the
    /// timeout the call fails with [`DomainError::ReadinessTimeout`], carrying
    /// the attempt count and the last failure seen.
    pub async fn wait_until_ready(&self, probe: &dyn ReadinessProbe) -> Result<(), DomainError> {
        // Each invocation owns its own accumulator.
        let mut budget = self.budget;
        let mut attempts: u32 = 0;
        let mut last_error: Option<ProbeError> = None;

        loop {
            if budget.is_exhausted() {
                warn!(
                    service = %probe.service(),
                    attempts = attempts,
                    elapsed_ms = budget.elapsed().as_millis() as u64,
                    "Readiness budget exhausted"
                );
                return Err(DomainError::ReadinessTimeout {
                    service: probe.service().to_string(),
                    elapsed: budget.elapsed(),
                    attempts,
                    last_error,
                });
            }

            attempts += 1;
            match probe.check(budget.elapsed()).await {
                Ok(()) => {
                    info!(
                        service = %probe.service(),
                        attempts = attempts,
                        elapsed_ms = budget.elapsed().as_millis() as u64,
                        "Service is ready"
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        service = %probe.service(),
                        attempt = attempts,
                        elapsed_ms = budget.elapsed().as_millis() as u64,
                        error = %e,
                        "Readiness probe failed"
                    );
                    last_error = Some(e);
                }
            }

            tokio::time::sleep(budget.delay()).await;
            budget.advance();
        }
    }
}

/// Shorthand for a one-off scheduler run.
pub async fn wait_for_check(
    probe: &dyn ReadinessProbe,
    timeout: Duration,
    delay: Duration,
) -> Result<(), DomainError> {
    RetryScheduler::new(RetryBudget::new(timeout, delay))
        .wait_until_ready(probe)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockReadinessProbe;
    use crate::domain::ServiceKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn probe_succeeding_on(attempt: u32, calls: Arc<AtomicU32>) -> MockReadinessProbe {
        let mut probe = MockReadinessProbe::new();
        probe
            .expect_service()
            .return_const(ServiceKind::Coordination);
        probe.expect_check().returning(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n >= attempt {
                Ok(())
            } else {
                Err(ProbeError::Connection("refused".into()))
            }
        });
        probe
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_probe_gets_floor_t_over_d_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = probe_succeeding_on(u32::MAX, calls.clone());

        let err = wait_for_check(&probe, ms(3_000), ms(1_000))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match err {
            DomainError::ReadinessTimeout {
                service,
                attempts,
                elapsed,
                last_error,
            } => {
                assert_eq!(service, "zookeeper");
                assert_eq!(attempts, 4);
                assert_eq!(elapsed, ms(4_000));
                assert_eq!(last_error, Some(ProbeError::Connection("refused".into())));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_multiple_timeout_rounds_down() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = probe_succeeding_on(u32::MAX, calls.clone());

        let result = wait_for_check(&probe, ms(2_500), ms(1_000)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_attempt_k_makes_k_plus_one_calls() {
        for k in 0..4 {
            let calls = Arc::new(AtomicU32::new(0));
            let probe = probe_succeeding_on(k, calls.clone());

            wait_for_check(&probe, ms(60_000), ms(1_000)).await.unwrap();

            assert_eq!(calls.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_still_attempts_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = probe_succeeding_on(u32::MAX, calls.clone());

        let err = wait_for_check(&probe, Duration::ZERO, ms(1_000))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.is_readiness_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_with_ready_service_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = probe_succeeding_on(0, calls.clone());

        wait_for_check(&probe, Duration::ZERO, ms(1_000)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_sees_monotonic_elapsed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();

        let mut probe = MockReadinessProbe::new();
        probe.expect_service().return_const(ServiceKind::Broker);
        probe.expect_check().times(3).returning(move |elapsed| {
            let mut seen = recorder.lock().unwrap();
            seen.push(elapsed);
            if seen.len() == 3 {
                Ok(())
            } else {
                Err(ProbeError::NoBrokersRegistered)
            }
        });

        wait_for_check(&probe, ms(10_000), ms(250)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![ms(0), ms(250), ms(500)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_exactly_delay_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = probe_succeeding_on(2, calls.clone());

        let start = Instant::now();
        wait_for_check(&probe, ms(60_000), ms(1_000)).await.unwrap();

        assert_eq!(start.elapsed(), ms(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_scheduler_budget() {
        let scheduler = RetryScheduler::default();
        assert_eq!(scheduler.budget().timeout(), ms(60_000));
        assert_eq!(scheduler.budget().delay(), ms(1_000));

        let scheduler = RetryScheduler::with_timeout(ms(30_000));
        assert_eq!(scheduler.budget().timeout(), ms(30_000));
        assert_eq!(scheduler.budget().delay(), ms(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_is_reusable() {
        let scheduler = RetryScheduler::new(RetryBudget::new(ms(1_000), ms(1_000)));

        for _ in 0..2 {
            let calls = Arc::new(AtomicU32::new(0));
            let probe = probe_succeeding_on(u32::MAX, calls.clone());
            assert!(scheduler.wait_until_ready(&probe).await.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }
}
