//! Background delivery of invitation emails.
//!
//! Registrations commit the user and its invitation first, then hand an
//! [`InvitationJob`] to a bounded queue. A single [`InvitationWorker`] drains
//! the queue, retrying the notification gateway with capped exponential
//! backoff and jitter. When every attempt fails, the worker compensates by
//! deleting the invitation and the user, so a registration whose email could
//! never be sent leaves nothing behind.
//!
//! The worker is owned through a [`WorkerHandle`]; shutting it down closes the
//! queue and gives in-flight and queued jobs a bounded grace period.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::domain::auth::models::MailTemplate;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::ports::NotificationGateway;
use crate::domain::user::models::UserId;
use crate::user::ports::IdentityStore;

/// One invitation email to deliver for a freshly committed registration.
#[derive(Clone)]
pub struct InvitationJob {
    pub user_id: UserId,
    pub recipient: Recipient,
    pub activation_url: String,
}

impl InvitationJob {
    fn template_data(&self) -> serde_json::Value {
        json!({
            "username": self.recipient.name,
            "activation_url": self.activation_url,
        })
    }
}

impl fmt::Debug for InvitationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvitationJob")
            .field("user_id", &self.user_id)
            .field("recipient", &self.recipient)
            .field("activation_url", &"<redacted>")
            .finish()
    }
}

/// Bounded retry schedule shared by delivery and compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            backoff_max: backoff_max.max(backoff_base),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Doubles per attempt up to `backoff_max`, then keeps a random half.
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << shift;
        let delay = self
            .backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max);
        jitter(delay.min(self.backoff_max))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(500),
            Duration::from_secs(8),
        )
    }
}

fn jitter(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    Duration::from_millis(half + rand::thread_rng().gen_range(0..=half))
}

/// Final state of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Compensated { attempts: u32 },
    CompensationFailed,
}

/// Counters describing the worker's progress.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    compensated: AtomicU64,
    compensation_failed: AtomicU64,
    pending: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatsSnapshot {
    pub delivered: u64,
    pub compensated: u64,
    pub compensation_failed: u64,
    pub pending: u64,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            compensated: self.compensated.load(Ordering::Relaxed),
            compensation_failed: self.compensation_failed.load(Ordering::Relaxed),
            pending: self.pending.load(Ordering::Relaxed),
        }
    }

    /// Jobs accepted by the queue but not finished yet.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Delivered { .. } => &self.delivered,
            DeliveryOutcome::Compensated { .. } => &self.compensated,
            DeliveryOutcome::CompensationFailed => &self.compensation_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn job_accepted(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    fn job_finished(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Invitation queue is full")]
    Full,

    #[error("Invitation queue is closed")]
    Closed,
}

/// Producer side of the invitation queue.
#[derive(Clone)]
pub struct InvitationQueue {
    sender: mpsc::Sender<InvitationJob>,
    stats: Arc<DeliveryStats>,
}

impl InvitationQueue {
    pub fn new(sender: mpsc::Sender<InvitationJob>, stats: Arc<DeliveryStats>) -> Self {
        Self { sender, stats }
    }

    /// Queue a job without waiting.
    ///
    /// # Errors
    /// * `Full` - The worker is behind; the job was not accepted
    /// * `Closed` - The worker has shut down; the job was not accepted
    pub fn enqueue(&self, job: InvitationJob) -> Result<(), QueueError> {
        self.stats.job_accepted();
        self.sender.try_send(job).map_err(|e| {
            self.stats.job_finished();
            match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            }
        })
    }
}

/// Delivers invitation emails and compensates registrations that cannot be
/// notified.
pub struct InvitationWorker<S, N>
where
    S: IdentityStore,
    N: NotificationGateway,
{
    store: Arc<S>,
    gateway: Arc<N>,
    policy: RetryPolicy,
    stats: Arc<DeliveryStats>,
}

impl<S, N> InvitationWorker<S, N>
where
    S: IdentityStore,
    N: NotificationGateway,
{
    pub fn new(store: Arc<S>, gateway: Arc<N>, policy: RetryPolicy) -> Self {
        Self {
            store,
            gateway,
            policy,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DeliveryStats> {
        Arc::clone(&self.stats)
    }

    /// Run one job to completion: deliver, or compensate after the last
    /// failed attempt.
    pub async fn process(&self, job: &InvitationJob) -> DeliveryOutcome {
        let outcome = match self.deliver(job).await {
            Some(attempts) => DeliveryOutcome::Delivered { attempts },
            None => self.compensate(&job.user_id).await,
        };

        match outcome {
            DeliveryOutcome::Delivered { attempts } => {
                tracing::info!(user_id = %job.user_id, attempts, "Invitation delivered");
            }
            DeliveryOutcome::Compensated { attempts } => {
                tracing::warn!(
                    user_id = %job.user_id,
                    attempts,
                    "Invitation undeliverable, registration reverted"
                );
            }
            DeliveryOutcome::CompensationFailed => {
                tracing::error!(
                    user_id = %job.user_id,
                    "Invitation undeliverable and registration could not be reverted"
                );
            }
        }

        self.stats.record(outcome);
        outcome
    }

    async fn deliver(&self, job: &InvitationJob) -> Option<u32> {
        let data = job.template_data();

        for attempt in 1..=self.policy.max_attempts() {
            match self
                .gateway
                .send(MailTemplate::UserInvitation, &job.recipient, &data)
                .await
            {
                Ok(()) => return Some(attempt),
                Err(e) => {
                    tracing::warn!(
                        user_id = %job.user_id,
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        error = %e,
                        "Invitation delivery failed"
                    );
                    if attempt < self.policy.max_attempts() {
                        tokio::time::sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }

        None
    }

    async fn compensate(&self, user_id: &UserId) -> DeliveryOutcome {
        for attempt in 1..=self.policy.max_attempts() {
            match self.store.revert_create_and_invite(user_id).await {
                Ok(()) => return DeliveryOutcome::Compensated { attempts: attempt },
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        attempt,
                        error = %e,
                        "Registration revert failed"
                    );
                    if attempt < self.policy.max_attempts() {
                        tokio::time::sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }

        DeliveryOutcome::CompensationFailed
    }

    /// Start the worker on the current runtime.
    ///
    /// # Returns
    /// The queue to hand to producers and the handle that owns the task
    pub fn spawn(self, capacity: usize) -> (InvitationQueue, WorkerHandle) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = self.stats();
        let queue = InvitationQueue::new(sender, Arc::clone(&stats));

        let task = tokio::spawn(
            self.run(receiver, shutdown_rx)
                .instrument(tracing::info_span!("invitation_worker")),
        );

        (
            queue,
            WorkerHandle {
                shutdown: shutdown_tx,
                task,
                stats,
            },
        )
    }

    async fn run(
        self,
        mut jobs: mpsc::Receiver<InvitationJob>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!("Invitation worker started");

        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => self.run_job(&job).await,
                    None => break,
                },
                _ = shutdown.changed() => {
                    jobs.close();
                    while let Some(job) = jobs.recv().await {
                        self.run_job(&job).await;
                    }
                    break;
                }
            }
        }

        tracing::info!(stats = ?self.stats.snapshot(), "Invitation worker stopped");
    }

    async fn run_job(&self, job: &InvitationJob) {
        self.process(job).await;
        self.stats.job_finished();
    }
}

/// Owns the running worker task.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: Arc<DeliveryStats>,
}

impl WorkerHandle {
    pub fn stats(&self) -> Arc<DeliveryStats> {
        Arc::clone(&self.stats)
    }

    /// Close the queue and wait up to `grace` for queued jobs to finish.
    ///
    /// # Returns
    /// `true` if every accepted job finished within the grace period
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        let _ = self.shutdown.send(true);

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Invitation worker terminated abnormally");
                false
            }
            Err(_) => {
                tracing::warn!(
                    pending = self.stats.pending(),
                    grace_seconds = grace.as_secs(),
                    "Invitation worker did not drain in time, abandoning pending jobs"
                );
                self.task.abort();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use auth::TokenHash;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::auth::errors::NotificationError;
    use crate::domain::user::models::EmailAddress;
    use crate::domain::user::models::Invitation;
    use crate::domain::user::models::NewUser;
    use crate::domain::user::models::User;
    use crate::user::errors::StoreError;

    mock! {
        pub TestIdentityStore {}

        #[async_trait]
        impl IdentityStore for TestIdentityStore {
            async fn create(&self, user: NewUser) -> Result<User, StoreError>;
            async fn create_and_invite(&self, user: NewUser, invitation: &Invitation) -> Result<User, StoreError>;
            async fn revert_create_and_invite(&self, id: &UserId) -> Result<(), StoreError>;
            async fn activate(&self, token_hash: &TokenHash) -> Result<UserId, StoreError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError>;
        }
    }

    /// Fails the first `failures` sends, then succeeds.
    struct FlakyGateway {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyGateway {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationGateway for FlakyGateway {
        async fn send(
            &self,
            template: MailTemplate,
            recipient: &Recipient,
            data: &serde_json::Value,
        ) -> Result<(), NotificationError> {
            assert_eq!(template, MailTemplate::UserInvitation);
            assert_eq!(recipient.email, "gendry@example.com");
            assert_eq!(data["username"], "GendryBaratheon");

            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(NotificationError::Transport("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(1), Duration::from_millis(4))
    }

    fn job() -> InvitationJob {
        InvitationJob {
            user_id: UserId(7),
            recipient: Recipient {
                name: "GendryBaratheon".to_string(),
                email: "gendry@example.com".to_string(),
            },
            activation_url: "http://localhost:4000/confirm/abc".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_capped_and_jittered() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), Duration::from_millis(400));

        for _ in 0..20 {
            let first = policy.delay(1);
            assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));

            let third = policy.delay(3);
            assert!(third >= Duration::from_millis(200) && third <= Duration::from_millis(400));

            let tenth = policy.delay(10);
            assert!(tenth >= Duration::from_millis(200) && tenth <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_job_debug_hides_activation_url() {
        let debug = format!("{:?}", job());
        assert!(!debug.contains("confirm/abc"));
    }

    #[tokio::test]
    async fn test_delivers_after_transient_failures() {
        let mut store = MockTestIdentityStore::new();
        store.expect_revert_create_and_invite().times(0);
        let gateway = Arc::new(FlakyGateway::new(2));

        let worker = InvitationWorker::new(Arc::new(store), Arc::clone(&gateway), fast_policy());
        let outcome = worker.process(&job()).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3 });
        assert_eq!(gateway.calls(), 3);
        assert_eq!(worker.stats().snapshot().delivered, 1);
    }

    #[tokio::test]
    async fn test_compensates_after_exhausting_attempts() {
        let mut store = MockTestIdentityStore::new();
        store
            .expect_revert_create_and_invite()
            .with(eq(UserId(7)))
            .times(1)
            .returning(|_| Ok(()));
        let gateway = Arc::new(FlakyGateway::new(u32::MAX));

        let worker = InvitationWorker::new(Arc::new(store), Arc::clone(&gateway), fast_policy());
        let outcome = worker.process(&job()).await;

        assert_eq!(outcome, DeliveryOutcome::Compensated { attempts: 1 });
        assert_eq!(gateway.calls(), 4);
        assert_eq!(worker.stats().snapshot().compensated, 1);
    }

    #[tokio::test]
    async fn test_compensation_failure_is_recorded_not_escalated() {
        let mut store = MockTestIdentityStore::new();
        store
            .expect_revert_create_and_invite()
            .times(4)
            .returning(|_| Err(StoreError::Database("connection closed".to_string())));
        let gateway = Arc::new(FlakyGateway::new(u32::MAX));

        let worker = InvitationWorker::new(Arc::new(store), gateway, fast_policy());
        let outcome = worker.process(&job()).await;

        assert_eq!(outcome, DeliveryOutcome::CompensationFailed);
        assert_eq!(worker.stats().snapshot().compensation_failed, 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs() {
        let store = MockTestIdentityStore::new();
        let gateway = Arc::new(FlakyGateway::new(0));

        let worker = InvitationWorker::new(Arc::new(store), Arc::clone(&gateway), fast_policy());
        let (queue, handle) = worker.spawn(8);

        for _ in 0..3 {
            queue.enqueue(job()).unwrap();
        }

        let stats = handle.stats();
        assert!(handle.shutdown(Duration::from_secs(5)).await);
        assert_eq!(gateway.calls(), 3);
        assert_eq!(
            stats.snapshot(),
            DeliveryStatsSnapshot {
                delivered: 3,
                compensated: 0,
                compensation_failed: 0,
                pending: 0,
            }
        );

        assert_eq!(queue.enqueue(job()), Err(QueueError::Closed));
        assert_eq!(stats.pending(), 0);
    }

    #[test]
    fn test_full_queue_rejects_without_waiting() {
        let (sender, mut receiver) = mpsc::channel(1);
        let stats = Arc::new(DeliveryStats::default());
        let queue = InvitationQueue::new(sender, Arc::clone(&stats));

        queue.enqueue(job()).unwrap();
        assert_eq!(queue.enqueue(job()), Err(QueueError::Full));
        assert_eq!(stats.pending(), 1);

        assert!(receiver.try_recv().is_ok());
        queue.enqueue(job()).unwrap();
        assert_eq!(stats.pending(), 2);
    }
}
