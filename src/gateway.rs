//! Single-flight admission to the accelerator.
//!
//! Callers queue on a one-permit semaphore. The permit holder's task is
//! dispatched to tokio's blocking pool and the caller suspends until the
//! worker reports back, so the intake loop never runs inference itself.
//! Waiters are admitted in the semaphore's FIFO order and there is no
//! batching or caching: throughput is capped at one task at a time.
//!
//! Per request: `Queued -> Admitted -> Running -> {Completed | Failed}`.
//! The permit is owned by the worker and dropped before the outcome is
//! sent back, so it is released exactly once even if the caller has
//! stopped waiting or the task panics.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use derive_builder::Builder;
use tokio::sync::{oneshot, Semaphore};

use crate::audio::EncodedAudio;
use crate::capability::SynthesisCapability;
use crate::error::{InferenceError, SynthesisError};
use crate::task::{InferenceTask, SynthesisRequest};

/// Gateway settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(default)]
pub struct GatewayConfig {
    /// Caller-side limit on queueing plus running. `None` waits forever.
    #[builder(setter(strip_option))]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Queued,
    Admitted,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Point-in-time view of the gateway counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct GatewayStats {
    pub waiting: usize,
    pub running: usize,
    pub admitted: u64,
    pub completed: u64,
    pub failed: u64,
    /// Tasks that finished after their caller had stopped waiting.
    pub orphaned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    waiting: AtomicUsize,
    running: AtomicUsize,
    admitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    orphaned: AtomicU64,
}

/// Decrements a gauge when dropped, including on cancellation and unwinding.
struct GaugeGuard<'a>(&'a AtomicUsize);

impl<'a> GaugeGuard<'a> {
    fn enter(gauge: &'a AtomicUsize) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serializes all inference onto one exclusive slot.
#[derive(Clone)]
pub struct SingleFlightGateway {
    task: Arc<InferenceTask>,
    slot: Arc<Semaphore>,
    counters: Arc<Counters>,
    next_id: Arc<AtomicU64>,
    timeout: Option<Duration>,
}

impl SingleFlightGateway {
    pub fn new(capability: Arc<dyn SynthesisCapability>, config: GatewayConfig) -> Self {
        Self {
            task: Arc::new(InferenceTask::new(capability)),
            slot: Arc::new(Semaphore::new(1)),
            counters: Arc::new(Counters::default()),
            next_id: Arc::new(AtomicU64::new(0)),
            timeout: config.timeout,
        }
    }

    pub fn capability_name(&self) -> &str {
        self.task.capability_name()
    }

    /// True when no task holds the admission slot.
    pub fn is_idle(&self) -> bool {
        self.slot.available_permits() == 1
    }

    pub fn stats(&self) -> GatewayStats {
        let c = &self.counters;
        GatewayStats {
            waiting: c.waiting.load(Ordering::SeqCst),
            running: c.running.load(Ordering::SeqCst),
            admitted: c.admitted.load(Ordering::SeqCst),
            completed: c.completed.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
            orphaned: c.orphaned.load(Ordering::SeqCst),
        }
    }

    /// Wait for the slot, run the request on a worker and return its outcome.
    ///
    /// With a timeout configured, expiry abandons the wait. A request still
    /// queued is never run; one already running keeps the slot until it
    /// finishes and its result is discarded.
    pub async fn submit(&self, request: SynthesisRequest) -> Result<EncodedAudio, SynthesisError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let Some(limit) = self.timeout else {
            return self.admit_and_run(id, request).await;
        };

        match tokio::time::timeout(limit, self.admit_and_run(id, request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("request {id}: no result after {limit:?}, caller gave up");
                Err(InferenceError::TimedOut(limit).into())
            }
        }
    }

    async fn admit_and_run(
        &self,
        id: u64,
        request: SynthesisRequest,
    ) -> Result<EncodedAudio, SynthesisError> {
        log::debug!(
            "request {id}: {} ({} chars, voice {})",
            Phase::Queued,
            request.text.chars().count(),
            request.voice_reference.display()
        );

        let permit = {
            let _waiting = GaugeGuard::enter(&self.counters.waiting);
            self.slot
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| InferenceError::Worker("admission slot closed".to_string()))?
        };
        self.counters.admitted.fetch_add(1, Ordering::SeqCst);
        log::debug!("request {id}: {}", Phase::Admitted);

        let (tx, rx) = oneshot::channel();
        let task = Arc::clone(&self.task);
        let counters = Arc::clone(&self.counters);

        tokio::task::spawn_blocking(move || {
            let running = GaugeGuard::enter(&counters.running);
            log::debug!("request {id}: {}", Phase::Running);

            let outcome = task.run(&request);
            match &outcome {
                Ok(audio) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                    log::debug!("request {id}: {} ({} bytes)", Phase::Completed, audio.len());
                }
                Err(err) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    log::debug!("request {id}: {} at {}", Phase::Failed, err.stage());
                }
            }

            drop(running);
            drop(permit);

            if tx.send(outcome).is_err() {
                counters.orphaned.fetch_add(1, Ordering::SeqCst);
                log::warn!("request {id}: orphaned completion, caller is no longer waiting");
            }
        });

        rx.await.map_err(|_| {
            SynthesisError::from(InferenceError::Worker(
                "inference worker exited without a result".to_string(),
            ))
        })?
    }
}
