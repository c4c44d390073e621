//! Job lifecycle driver.
//!
//! A [`JobRunner`] starts server-side jobs and hands back one [`JobPoller`]
//! per job. The poller checks job status on a fixed per-kind interval until
//! the backend reports a terminal state, the overall timeout elapses, or the
//! owner cancels it.
//!
//! ```text
//! NotStarted --start ok--> Processing --COMPLETED--> Completed
//!                          Processing --FAILED/timeout--> Failed
//!                          Processing --cancel--> NotStarted (no callback)
//! ```
//!
//! Status checks within one poller are strictly sequential: the next tick is
//! not taken until the previous response (or its transport timeout) has been
//! handled. Exactly one of `on_complete` / `on_failed` fires per job, and
//! neither fires once `cancel` has been called.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::models::job::{
    Job, JobId, JobKind, JobKindConfig, JobOutput, JobRequest, JobSettings, JobState, OwnerKey,
    RemoteState,
};
use crate::services::api::JobBackend;

const TIMEOUT_REASON: &str = "timeout";
const DEFAULT_FAILURE_REASON: &str = "job failed";
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Terminal-state callbacks; exactly one of them is invoked, at most once.
pub struct JobCallbacks {
    on_complete: Box<dyn FnOnce(JobOutput) + Send + 'static>,
    on_failed: Box<dyn FnOnce(String) + Send + 'static>,
}

impl JobCallbacks {
    pub fn new<C, F>(on_complete: C, on_failed: F) -> Self
    where
        C: FnOnce(JobOutput) + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        Self {
            on_complete: Box::new(on_complete),
            on_failed: Box::new(on_failed),
        }
    }

    /// Run `hook` right after `on_complete`; failures are left untouched.
    pub fn after_complete<H>(self, hook: H) -> Self
    where
        H: FnOnce() + Send + 'static,
    {
        let JobCallbacks { on_complete, on_failed } = self;
        Self {
            on_complete: Box::new(move |output| {
                on_complete(output);
                hook();
            }),
            on_failed,
        }
    }
}

/// Registry enforcing at most one in-flight job per (kind, owner).
#[derive(Clone, Default)]
pub struct InFlightJobs {
    slots: Arc<Mutex<HashSet<(JobKind, OwnerKey)>>>,
}

impl InFlightJobs {
    fn claim(&self, kind: JobKind, owner: &OwnerKey) -> Option<InFlightSlot> {
        let mut slots = lock(&self.slots);
        if slots.insert((kind, owner.clone())) {
            Some(InFlightSlot {
                jobs: self.clone(),
                kind,
                owner: owner.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, kind: JobKind, owner: &OwnerKey) -> bool {
        lock(&self.slots).contains(&(kind, owner.clone()))
    }
}

/// Claimed registry slot, released on drop.
struct InFlightSlot {
    jobs: InFlightJobs,
    kind: JobKind,
    owner: OwnerKey,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        lock(&self.jobs.slots).remove(&(self.kind, self.owner.clone()));
    }
}

struct Shared {
    job: Job,
    callbacks: Option<JobCallbacks>,
    slot: Option<InFlightSlot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Starts jobs against a backend with per-kind polling configuration.
#[derive(Clone)]
pub struct JobRunner {
    backend: Arc<dyn JobBackend>,
    settings: JobSettings,
    in_flight: InFlightJobs,
}

impl JobRunner {
    pub fn new(backend: Arc<dyn JobBackend>, settings: JobSettings) -> Self {
        Self {
            backend,
            settings,
            in_flight: InFlightJobs::default(),
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    pub fn in_flight(&self) -> &InFlightJobs {
        &self.in_flight
    }

    /// Begin a job and arm its status timer.
    ///
    /// Fails without polling when another job of the same kind is in flight
    /// for `owner`, or when the backend's begin call errors.
    pub async fn start(
        &self,
        owner: OwnerKey,
        request: JobRequest,
        callbacks: JobCallbacks,
    ) -> Result<JobPoller, JobError> {
        let kind = request.kind();
        let slot = self
            .in_flight
            .claim(kind, &owner)
            .ok_or_else(|| JobError::AlreadyInFlight { kind, owner: owner.clone() })?;

        let job_id = match self.backend.begin(&owner, &request).await {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::warn!(kind = %kind, owner = %owner, error = %e, "Job start failed");
                return Err(JobError::StartFailed { kind, reason: e.message() });
            }
        };

        metrics::counter!("jobs_started_total", "kind" => kind.to_string()).increment(1);
        tracing::info!(kind = %kind, job_id = %job_id, "Job started, polling for status");

        let shared = Arc::new(Mutex::new(Shared {
            job: Job {
                job_id: job_id.clone(),
                kind,
                state: JobState::Processing,
                result: None,
                failure_reason: None,
            },
            callbacks: Some(callbacks),
            slot: Some(slot),
        }));

        let task = tokio::spawn(poll_until_terminal(
            Arc::clone(&self.backend),
            self.settings.config_for(kind),
            self.settings.timeout,
            owner,
            job_id,
            Arc::clone(&shared),
        ));

        Ok(JobPoller { shared, task })
    }
}

/// Handle to one job in flight.
///
/// Dropping the handle cancels the job, so the owning context must keep it
/// alive for as long as it wants the result.
#[must_use = "dropping a JobPoller cancels the job"]
pub struct JobPoller {
    shared: Arc<Mutex<Shared>>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("job", &lock(&self.shared).job)
            .finish_non_exhaustive()
    }
}

impl JobPoller {
    pub fn state(&self) -> JobState {
        lock(&self.shared).job.state
    }

    pub fn job_id(&self) -> JobId {
        lock(&self.shared).job.job_id.clone()
    }

    pub fn snapshot(&self) -> Job {
        lock(&self.shared).job.clone()
    }

    /// Disarm the timer. No callback fires afterwards. Safe to call
    /// repeatedly or after a terminal state.
    pub fn cancel(&self) {
        {
            let mut shared = lock(&self.shared);
            if shared.job.state == JobState::Processing {
                shared.job.state = JobState::NotStarted;
                shared.callbacks = None;
                shared.slot = None;
                tracing::info!(kind = %shared.job.kind, job_id = %shared.job.job_id, "Job polling cancelled");
            }
        }
        self.task.abort();
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

enum Outcome {
    Completed(JobOutput),
    Failed(String),
}

async fn poll_until_terminal(
    backend: Arc<dyn JobBackend>,
    config: JobKindConfig,
    timeout: Duration,
    owner: OwnerKey,
    job_id: JobId,
    shared: Arc<Mutex<Shared>>,
) {
    let kind = config.kind;
    let period = config.poll_interval.max(MIN_POLL_INTERVAL);
    let started = Instant::now();
    let mut ticker = interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if lock(&shared).job.state != JobState::Processing {
            return;
        }

        if started.elapsed() >= timeout {
            tracing::warn!(kind = %kind, job_id = %job_id, timeout_secs = timeout.as_secs(), "Job timed out");
            finish(&shared, Outcome::Failed(TIMEOUT_REASON.to_string()));
            return;
        }

        let report = match backend.status(&owner, kind, &job_id).await {
            Ok(report) => report,
            Err(e) => {
                metrics::counter!("job_poll_errors_total", "kind" => kind.to_string()).increment(1);
                tracing::warn!(kind = %kind, job_id = %job_id, error = %e, "Status check failed, will retry");
                continue;
            }
        };

        tracing::debug!(kind = %kind, job_id = %job_id, state = ?report.state, "Polled job status");

        match (report.state, report.output) {
            (RemoteState::Completed, Some(output)) => {
                finish(&shared, Outcome::Completed(output));
                return;
            }
            (RemoteState::Completed, None) => {
                tracing::warn!(kind = %kind, job_id = %job_id, "Completed status without result, will retry");
            }
            (RemoteState::Failed, _) => {
                let reason = report
                    .failure_reason
                    .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
                finish(&shared, Outcome::Failed(reason));
                return;
            }
            (RemoteState::Processing | RemoteState::Idle, _) => {}
        }
    }
}

/// Move to a terminal state and fire the matching callback, unless the job
/// was cancelled in the meantime.
fn finish(shared: &Mutex<Shared>, outcome: Outcome) {
    let (callbacks, slot, kind, job_id) = {
        let mut shared = lock(shared);
        if shared.job.state != JobState::Processing {
            return;
        }
        match &outcome {
            Outcome::Completed(output) => {
                shared.job.state = JobState::Completed;
                shared.job.result = Some(output.clone());
            }
            Outcome::Failed(reason) => {
                shared.job.state = JobState::Failed;
                shared.job.failure_reason = Some(reason.clone());
            }
        }
        (
            shared.callbacks.take(),
            shared.slot.take(),
            shared.job.kind,
            shared.job.job_id.clone(),
        )
    };
    drop(slot);

    let Some(callbacks) = callbacks else {
        return;
    };

    match outcome {
        Outcome::Completed(output) => {
            metrics::counter!("jobs_completed_total", "kind" => kind.to_string()).increment(1);
            tracing::info!(kind = %kind, job_id = %job_id, "Job completed");
            (callbacks.on_complete)(output);
        }
        Outcome::Failed(reason) => {
            metrics::counter!("jobs_failed_total", "kind" => kind.to_string()).increment(1);
            tracing::warn!(kind = %kind, job_id = %job_id, reason = %reason, "Job failed");
            (callbacks.on_failed)(reason);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Could not start {kind} job: {reason}")]
    StartFailed { kind: JobKind, reason: String },

    #[error("A {kind} job is already in flight for {owner}")]
    AlreadyInFlight { kind: JobKind, owner: OwnerKey },
}
