//! Poll-until-terminal: watch one submitted task until it finishes.
//!
//! A poll session fetches the task's status, hands every successfully fetched
//! report to an [`UpdateSink`], and stops on the first terminal status, once
//! the attempt budget is spent, or when cancelled.
//!
//! Timing: the first fetch happens immediately; `interval` elapses between
//! consecutive fetches. A session therefore takes at most
//! `(max_attempts - 1) * interval` plus fetch latency.
//!
//! Fetch failures are logged and swallowed. They count as an attempt and the
//! next fetch is still scheduled, so an endpoint that keeps failing simply
//! exhausts the budget. Exhaustion is not reported to the sink either; the
//! last status the sink saw stays the caller's final view.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use genai_core::{StatusReport, TaskStatus};

use crate::error::ClientError;

/// Fetches the current status of a task from the remote service.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Report type returned by the status endpoint.
    type Report: StatusReport + Send + 'static;

    async fn fetch_status(&self, task_id: &str) -> Result<Self::Report, ClientError>;
}

/// Receives every status report fetched by a poll session, terminal one included.
pub trait UpdateSink<R>: Send + Sync {
    fn on_update(&self, update: R);
}

impl<R, F> UpdateSink<R> for F
where
    F: Fn(R) + Send + Sync,
{
    fn on_update(&self, update: R) {
        self(update)
    }
}

/// Cadence and budget of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive fetches.
    pub interval: Duration,
    /// Maximum number of fetches.
    pub max_attempts: u32,
}

impl PollConfig {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Research tasks: every 3 seconds, 20 attempts.
    pub const fn research() -> Self {
        Self::new(Duration::from_secs(3), 20)
    }

    /// Resume analyses: every 2 seconds, 15 attempts.
    pub const fn resume() -> Self {
        Self::new(Duration::from_secs(2), 15)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.interval.is_zero() {
            return Err(ClientError::InvalidInput("poll interval must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(ClientError::InvalidInput("max_attempts must be positive".into()));
        }
        Ok(())
    }

    /// Upper bound on how long the attempt budget lasts (`max_attempts * interval`).
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// A terminal status was observed.
    Completed,
    /// Every attempt was used without a terminal status.
    Exhausted,
    /// The session was cancelled.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Exhausted => f.write_str("attempts exhausted"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Lifecycle of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Created, no fetch issued yet.
    Idle,
    /// Fetching or waiting for the next tick.
    Polling,
    /// Finished; never leaves this state.
    Stopped(StopReason),
}

/// Attempt accounting for one task.
///
/// Invariant: `attempts_made <= max_attempts`. Reaching the budget or
/// recording a terminal status moves the session to [`PollState::Stopped`].
#[derive(Debug, Clone)]
pub struct PollSession {
    task_id: String,
    attempts_made: u32,
    config: PollConfig,
    state: PollState,
}

impl PollSession {
    pub fn new(task_id: impl Into<String>, config: PollConfig) -> Result<Self, ClientError> {
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(ClientError::InvalidInput("task id must not be empty".into()));
        }
        config.validate()?;

        Ok(Self {
            task_id,
            attempts_made: 0,
            config,
            state: PollState::Idle,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.state, PollState::Stopped(_))
    }

    /// Idle -> Polling. No effect in any other state.
    pub fn start(&mut self) {
        if self.state == PollState::Idle {
            self.state = PollState::Polling;
        }
    }

    /// Count one finished attempt and return the stop reason if the session
    /// is now over. Failed fetches are recorded with `terminal = false`.
    pub fn record_attempt(&mut self, terminal: bool) -> Option<StopReason> {
        if let PollState::Stopped(reason) = self.state {
            return Some(reason);
        }

        self.attempts_made += 1;

        let reason = if terminal {
            StopReason::Completed
        } else if self.attempts_made >= self.config.max_attempts {
            StopReason::Exhausted
        } else {
            return None;
        };

        self.state = PollState::Stopped(reason);
        Some(reason)
    }

    /// Stop the session unless it already stopped for another reason.
    pub fn cancel(&mut self) -> StopReason {
        match self.state {
            PollState::Stopped(reason) => reason,
            _ => {
                self.state = PollState::Stopped(StopReason::Cancelled);
                StopReason::Cancelled
            }
        }
    }
}

/// Cancellation signal shared between a running session and its owner.
///
/// Once [`Cancellation::cancel`] returns, the session makes no further sink
/// call: delivery and cancellation take the same lock, so an update that is
/// mid-delivery finishes first and any later one is dropped. A sink may
/// cancel its own session; the update it is handling is the last one.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    gate: Arc<Mutex<()>>,
    /// Thread currently running a sink call while holding `gate`.
    delivering: Arc<Mutex<Option<ThreadId>>>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if self.is_delivering_here() {
            // Called from inside the sink; `gate` is already held below us.
            self.token.cancel();
            return;
        }
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Run `deliver` unless cancelled. Returns false if it was skipped.
    fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return false;
        }
        let _marker = DeliveryMarker::set(&self.delivering);
        deliver();
        true
    }

    fn is_delivering_here(&self) -> bool {
        *self.delivering.lock().unwrap_or_else(PoisonError::into_inner)
            == Some(thread::current().id())
    }
}

/// Records the delivering thread until dropped, including on sink panic.
struct DeliveryMarker<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> DeliveryMarker<'a> {
    fn set(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for DeliveryMarker<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Final account of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub task_id: String,
    pub attempts_made: u32,
    pub reason: StopReason,
    /// Last status delivered to the sink, if any fetch succeeded.
    pub last_status: Option<TaskStatus>,
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        self.reason == StopReason::Completed
    }
}

/// Poll `task_id` until terminal, exhausted or cancelled.
///
/// Returns an error only if the arguments are invalid, in which case no fetch
/// is made.
pub async fn poll_until_terminal<F, S>(
    task_id: &str,
    fetcher: &F,
    sink: &S,
    config: PollConfig,
    cancel: &Cancellation,
) -> Result<PollOutcome, ClientError>
where
    F: StatusFetcher + ?Sized,
    S: UpdateSink<F::Report> + ?Sized,
{
    let mut session = PollSession::new(task_id, config)?;
    session.start();

    info!(
        task_id = %task_id,
        interval_ms = config.interval.as_millis() as u64,
        max_attempts = config.max_attempts,
        "Polling task status"
    );

    let mut last_status = None;

    let reason = loop {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break session.cancel(),
            fetched = fetcher.fetch_status(task_id) => fetched,
        };

        let attempt = session.attempts_made() + 1;
        let terminal = match fetched {
            Ok(report) => {
                let status = report.status().clone();
                let terminal = status.is_terminal();
                if !cancel.deliver(|| sink.on_update(report)) {
                    break session.cancel();
                }
                debug!(task_id = %task_id, attempt, status = %status, "Fetched task status");
                last_status = Some(status);
                terminal
            }
            Err(e) => {
                warn!(task_id = %task_id, attempt, error = %e, "Status fetch failed");
                false
            }
        };

        if let Some(reason) = session.record_attempt(terminal) {
            break reason;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break session.cancel(),
            _ = tokio::time::sleep(config.interval) => {}
        }
    };

    match reason {
        StopReason::Completed => info!(
            task_id = %task_id,
            attempts = session.attempts_made(),
            "Task completed"
        ),
        StopReason::Exhausted => info!(
            task_id = %task_id,
            attempts = session.attempts_made(),
            last_status = ?last_status,
            "Stopped polling, attempt budget exhausted"
        ),
        StopReason::Cancelled => debug!(
            task_id = %task_id,
            attempts = session.attempts_made(),
            "Polling cancelled"
        ),
    }

    Ok(PollOutcome {
        task_id: task_id.to_string(),
        attempts_made: session.attempts_made(),
        reason,
        last_status,
    })
}

/// Runs poll sessions as background tokio tasks.
pub struct Poller;

impl Poller {
    /// Validate the arguments and start polling on a new task.
    ///
    /// Sessions are independent: each owns its fetcher, sink, counter and
    /// timer. Dropping the returned handle cancels the session.
    pub fn spawn<F, S>(
        task_id: impl Into<String>,
        fetcher: F,
        sink: S,
        config: PollConfig,
    ) -> Result<PollHandle, ClientError>
    where
        F: StatusFetcher + 'static,
        S: UpdateSink<F::Report> + 'static,
    {
        let task_id = task_id.into();
        PollSession::new(task_id.as_str(), config)?;

        let cancel = Cancellation::new();
        let session_cancel = cancel.clone();
        let session_task_id = task_id.clone();

        let handle = tokio::spawn(async move {
            poll_until_terminal(&session_task_id, &fetcher, &sink, config, &session_cancel).await
        });

        Ok(PollHandle {
            task_id,
            cancel,
            handle: Some(handle),
        })
    }
}

/// Owner's handle on a background poll session.
pub struct PollHandle {
    task_id: String,
    cancel: Cancellation,
    handle: Option<JoinHandle<Result<PollOutcome, ClientError>>>,
}

impl PollHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Stop the session. No sink call happens after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the session to stop.
    pub async fn join(mut self) -> Result<PollOutcome, ClientError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ClientError::Background("poll session already joined".into()))?;
        handle
            .await
            .map_err(|e| ClientError::Background(e.to_string()))?
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle")
            .field("task_id", &self.task_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai_core::ResumeFeedback;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Script = dyn Fn(u32) -> Result<ResumeFeedback, ClientError> + Send + Sync;

    /// Answers fetch number `n` (1-based) with `script(n)`.
    struct ScriptedFetcher {
        calls: Arc<AtomicU32>,
        script: Box<Script>,
    }

    impl ScriptedFetcher {
        fn new(
            script: impl Fn(u32) -> Result<ResumeFeedback, ClientError> + Send + Sync + 'static,
        ) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            (
                Self {
                    calls: calls.clone(),
                    script: Box::new(script),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        type Report = ResumeFeedback;

        async fn fetch_status(&self, _task_id: &str) -> Result<ResumeFeedback, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.script)(n)
        }
    }

    fn feedback(status: &str, score: Option<i64>) -> ResumeFeedback {
        ResumeFeedback {
            id: None,
            job_description: None,
            status: TaskStatus::from(status),
            feedback: None,
            score,
            created_at: None,
            completed_at: None,
        }
    }

    fn transport_failure() -> ClientError {
        ClientError::Status {
            status: 503,
            path: "/status".into(),
            message: "unavailable".into(),
        }
    }

    fn recorder() -> (
        Arc<Mutex<Vec<ResumeFeedback>>>,
        impl Fn(ResumeFeedback) + Send + Sync + 'static,
    ) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink_updates = updates.clone();
        (updates, move |update| sink_updates.lock().unwrap().push(update))
    }

    #[test]
    fn test_presets() {
        assert_eq!(PollConfig::research().ceiling(), Duration::from_secs(60));
        assert_eq!(PollConfig::resume().ceiling(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        assert!(PollSession::new("", PollConfig::resume()).is_err());
        assert!(PollSession::new("1", PollConfig::new(Duration::ZERO, 3)).is_err());
        assert!(PollSession::new("1", PollConfig::new(Duration::from_secs(1), 0)).is_err());
    }

    #[test]
    fn test_session_state_machine() {
        let mut session = PollSession::new("7", PollConfig::new(Duration::from_secs(1), 2)).unwrap();
        assert_eq!(session.state(), PollState::Idle);

        session.start();
        assert_eq!(session.state(), PollState::Polling);

        assert_eq!(session.record_attempt(false), None);
        assert_eq!(session.record_attempt(false), Some(StopReason::Exhausted));
        assert_eq!(session.attempts_made(), 2);

        // Stopped sessions stay stopped and stop counting.
        assert_eq!(session.record_attempt(true), Some(StopReason::Exhausted));
        assert_eq!(session.cancel(), StopReason::Exhausted);
        assert_eq!(session.attempts_made(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_terminal_exhausts_budget() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (updates, sink) = recorder();

        let outcome = poll_until_terminal(
            "42",
            &fetcher,
            &sink,
            PollConfig::new(Duration::from_secs(2), 5),
            &Cancellation::new(),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(updates.lock().unwrap().len(), 5);
        assert_eq!(outcome.reason, StopReason::Exhausted);
        assert_eq!(outcome.attempts_made, 5);
        assert_eq!(outcome.last_status, Some(TaskStatus::Pending));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_stops_immediately() {
        let (fetcher, calls) = ScriptedFetcher::new(|n| {
            Ok(if n == 3 {
                feedback("completed", Some(70))
            } else {
                feedback("processing", None)
            })
        });
        let (updates, sink) = recorder();

        let outcome = poll_until_terminal(
            "42",
            &fetcher,
            &sink,
            PollConfig::new(Duration::from_secs(2), 10),
            &Cancellation::new(),
        )
        .await
        .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts_made, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(updates.lock().unwrap().len(), 3);

        // Nothing else is scheduled afterwards.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (_updates, sink) = recorder();

        let handle =
            Poller::spawn("1", fetcher, sink, PollConfig::new(Duration::from_secs(5), 3)).unwrap();

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.attempts_made, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_counts_but_does_not_notify() {
        let (fetcher, calls) = ScriptedFetcher::new(|n| match n {
            2 => Err(transport_failure()),
            4 => Ok(feedback("completed", Some(90))),
            _ => Ok(feedback("pending", None)),
        });
        let (updates, sink) = recorder();

        let outcome = poll_until_terminal(
            "42",
            &fetcher,
            &sink,
            PollConfig::new(Duration::from_secs(1), 10),
            &Cancellation::new(),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.attempts_made, 4);
        assert!(outcome.is_completed());

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[2].score, Some(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanently_failing_endpoint_exhausts_silently() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Err(transport_failure()));
        let (updates, sink) = recorder();

        let outcome = poll_until_terminal(
            "42",
            &fetcher,
            &sink,
            PollConfig::new(Duration::from_secs(1), 4),
            &Cancellation::new(),
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(updates.lock().unwrap().is_empty());
        assert_eq!(outcome.reason, StopReason::Exhausted);
        assert_eq!(outcome.last_status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_scenario_completes_on_last_attempt() {
        let (fetcher, calls) = ScriptedFetcher::new(|n| {
            Ok(if n == 15 {
                feedback("completed", Some(87))
            } else {
                feedback("pending", None)
            })
        });
        let (updates, sink) = recorder();

        let handle = Poller::spawn("analysis-1", fetcher, sink, PollConfig::resume()).unwrap();
        let outcome = handle.join().await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts_made, 15);

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 15);
        let last = updates.last().unwrap();
        assert_eq!(last.status, TaskStatus::Completed);
        assert_eq!(last.score, Some(87));
        drop(updates);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_research_scenario_times_out_without_notice() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("started", None)));
        let (updates, sink) = recorder();

        let handle = Poller::spawn("task-1", fetcher, sink, PollConfig::research()).unwrap();
        let outcome = handle.join().await.unwrap();

        assert_eq!(outcome.reason, StopReason::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 20);

        // Exactly one update per fetch and nothing marking a timeout.
        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 20);
        assert!(updates.iter().all(|u| u.status == TaskStatus::Started));
        assert!(!updates.last().unwrap().status.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_updates() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (updates, sink) = recorder();

        let handle =
            Poller::spawn("1", fetcher, sink, PollConfig::new(Duration::from_secs(3), 20)).unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(updates.lock().unwrap().len(), 2);

        handle.cancel();
        let seen = updates.lock().unwrap().len();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(updates.lock().unwrap().len(), seen);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.attempts_made, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_in_flight_fetch_drops_its_result() {
        struct SlowFetcher;

        #[async_trait]
        impl StatusFetcher for SlowFetcher {
            type Report = ResumeFeedback;

            async fn fetch_status(&self, _task_id: &str) -> Result<ResumeFeedback, ClientError> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(feedback("completed", Some(50)))
            }
        }

        let (updates, sink) = recorder();
        let handle =
            Poller::spawn("1", SlowFetcher, sink, PollConfig::new(Duration::from_secs(1), 5))
                .unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.attempts_made, 0);
        assert!(updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_can_cancel_its_own_session() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let cancel = Cancellation::new();
        let sink_cancel = cancel.clone();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink_updates = updates.clone();
        let sink = move |update: ResumeFeedback| {
            let mut seen = sink_updates.lock().unwrap();
            seen.push(update);
            if seen.len() == 2 {
                sink_cancel.cancel();
            }
        };

        let outcome = poll_until_terminal(
            "42",
            &fetcher,
            &sink,
            PollConfig::new(Duration::from_secs(1), 10),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.attempts_made, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(updates.lock().unwrap().len(), 2);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sink_can_cancel_through_shared_handle() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let handle_slot: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
        let sink_slot = handle_slot.clone();
        let sink = move |_update: ResumeFeedback| {
            if let Some(cancel) = sink_slot.lock().unwrap().as_ref() {
                cancel.cancel();
            }
        };

        let handle =
            Poller::spawn("1", fetcher, sink, PollConfig::new(Duration::from_secs(1), 10)).unwrap();
        *handle_slot.lock().unwrap() = Some(handle.cancel.clone());

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_session() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (updates, sink) = recorder();

        let handle =
            Poller::spawn("1", fetcher, sink, PollConfig::new(Duration::from_secs(1), 50)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(handle);

        let seen = updates.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(updates.lock().unwrap().len(), seen);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_are_independent() {
        let (fast, fast_calls) = ScriptedFetcher::new(|n| {
            Ok(if n == 2 {
                feedback("completed", Some(10))
            } else {
                feedback("pending", None)
            })
        });
        let (slow, slow_calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (fast_updates, fast_sink) = recorder();
        let (slow_updates, slow_sink) = recorder();

        let a = Poller::spawn("a", fast, fast_sink, PollConfig::new(Duration::from_secs(1), 5))
            .unwrap();
        let b = Poller::spawn("b", slow, slow_sink, PollConfig::new(Duration::from_secs(1), 5))
            .unwrap();

        let (a, b) = tokio::join!(a.join(), b.join());
        assert!(a.unwrap().is_completed());
        assert_eq!(b.unwrap().reason, StopReason::Exhausted);

        assert_eq!(fast_calls.load(Ordering::SeqCst), 2);
        assert_eq!(slow_calls.load(Ordering::SeqCst), 5);
        assert_eq!(fast_updates.lock().unwrap().len(), 2);
        assert_eq!(slow_updates.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_spawn_rejects_empty_task_id() {
        let (fetcher, calls) = ScriptedFetcher::new(|_| Ok(feedback("pending", None)));
        let (_updates, sink) = recorder();

        let err = Poller::spawn("  ", fetcher, sink, PollConfig::resume()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
