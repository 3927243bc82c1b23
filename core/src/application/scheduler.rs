// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provider Scheduler - Background task running entity providers on a cadence
//!
//! Each provider gets its own loop. Runs of one provider never overlap: the
//! next tick is only awaited once the current run has finished or hit its
//! timeout.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Recurring catalog sync with per-run timeout and graceful shutdown

use crate::application::entity_provider::{EntityProvider, ProviderError, SyncSummary};
use crate::domain::config::ScheduleConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScheduledRunError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Provider run exceeded timeout of {0:?}")]
    TimedOut(Duration),
}

/// How often a provider runs and how long a single run may take.
#[derive(Debug, Clone, Copy)]
pub struct TaskSchedule {
    pub frequency: Duration,
    pub timeout: Duration,
}

impl From<&ScheduleConfig> for TaskSchedule {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            frequency: config.frequency(),
            timeout: config.timeout(),
        }
    }
}

#[derive(Clone)]
struct ScheduledProvider {
    provider: Arc<dyn EntityProvider>,
    schedule: TaskSchedule,
}

#[derive(Default)]
struct SchedulerState {
    tasks: Vec<ScheduledProvider>,
    running: Vec<JoinHandle<()>>,
    started: bool,
}

/// Cloneable handle; every clone schedules onto the same set of loops.
#[derive(Clone)]
pub struct TaskScheduler {
    state: Arc<Mutex<SchedulerState>>,
    shutdown_token: CancellationToken,
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Register a provider. Once the scheduler has started, its loop is
    /// spawned right away.
    pub async fn schedule(&self, provider: Arc<dyn EntityProvider>, schedule: TaskSchedule) {
        info!(
            provider = provider.name(),
            frequency_seconds = schedule.frequency.as_secs(),
            timeout_seconds = schedule.timeout.as_secs(),
            "Scheduled entity provider"
        );

        let task = ScheduledProvider { provider, schedule };
        let mut state = self.state.lock().await;
        if state.started {
            let handle = tokio::spawn(provider_loop(task.clone(), self.shutdown_token.clone()));
            state.running.push(handle);
        }
        state.tasks.push(task);
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.tasks.is_empty()
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Run every scheduled provider once, one after another.
    pub async fn run_all_once(&self) -> Vec<(String, Result<SyncSummary, ScheduledRunError>)> {
        let tasks = self.state.lock().await.tasks.clone();
        let mut results = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let outcome = run_with_timeout(task.provider.as_ref(), task.schedule.timeout).await;
            results.push((task.provider.name().to_string(), outcome));
        }
        results
    }

    /// Start one background loop per provider.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if state.started {
            return;
        }
        state.started = true;

        let handles: Vec<JoinHandle<()>> = state
            .tasks
            .iter()
            .cloned()
            .map(|task| tokio::spawn(provider_loop(task, self.shutdown_token.clone())))
            .collect();
        state.running.extend(handles);
    }

    /// Cancel every loop and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        let handles = std::mem::take(&mut self.state.lock().await.running);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Provider task ended abnormally: {}", e);
            }
        }
    }
}

async fn provider_loop(task: ScheduledProvider, shutdown_token: CancellationToken) {
    let name = task.provider.name().to_string();
    let mut tick = interval(task.schedule.frequency);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                debug!(provider = %name, "Running provider cycle");

                match run_with_timeout(task.provider.as_ref(), task.schedule.timeout).await {
                    Ok(summary) => {
                        debug!(provider = %name, entity_count = summary.entity_count, "Provider cycle completed");
                    }
                    Err(e) => {
                        warn!(provider = %name, "Provider cycle failed: {}", e);
                    }
                }
            }
            _ = shutdown_token.cancelled() => {
                info!(provider = %name, "Shutdown signal received, stopping provider");
                break;
            }
        }
    }
}

/// Run a provider once, bounded by `timeout`.
pub async fn run_with_timeout(
    provider: &dyn EntityProvider,
    timeout: Duration,
) -> Result<SyncSummary, ScheduledRunError> {
    match tokio::time::timeout(timeout, provider.run()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ScheduledRunError::TimedOut(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::EntityProviderConnection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        name: String,
        runs: Arc<AtomicUsize>,
        delay: Duration,
    }

    #[async_trait]
    impl EntityProvider for CountingProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn connect(&self, _connection: Arc<dyn EntityProviderConnection>) {}

        async fn run(&self) -> Result<SyncSummary, ProviderError> {
            tokio::time::sleep(self.delay).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(SyncSummary {
                provider: self.name.clone(),
                entity_count: 0,
                duration: self.delay,
                completed_at: chrono::Utc::now(),
            })
        }
    }

    fn provider(delay: Duration) -> (Arc<CountingProvider>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(CountingProvider {
                name: "counting".to_string(),
                runs: runs.clone(),
                delay,
            }),
            runs,
        )
    }

    #[tokio::test]
    async fn test_scheduler_runs_until_cancelled() {
        let (provider, runs) = provider(Duration::ZERO);
        let scheduler = TaskScheduler::new();
        scheduler
            .schedule(
                provider,
                TaskSchedule {
                    frequency: Duration::from_millis(20),
                    timeout: Duration::from_secs(1),
                },
            )
            .await;
        scheduler.start().await;

        tokio::time::sleep(Duration::from_millis(90)).await;
        scheduler.shutdown().await;

        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected at least two runs, saw {}", seen);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let (provider, runs) = provider(Duration::from_millis(500));
        let err = run_with_timeout(provider.as_ref(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduledRunError::TimedOut(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_all_once() {
        let (provider, runs) = provider(Duration::ZERO);
        let scheduler = TaskScheduler::new();
        scheduler
            .schedule(provider, TaskSchedule::from(&ScheduleConfig::default()))
            .await;

        let results = scheduler.run_all_once().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "counting");
        assert!(results[0].1.is_ok());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_scheduled_after_start_runs() {
        let scheduler = TaskScheduler::new();
        scheduler.start().await;

        let (provider, runs) = provider(Duration::ZERO);
        scheduler
            .schedule(
                provider,
                TaskSchedule {
                    frequency: Duration::from_millis(20),
                    timeout: Duration::from_secs(1),
                },
            )
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown().await;
        assert!(runs.load(Ordering::SeqCst) >= 1);
        assert_eq!(scheduler.len().await, 1);
    }
}
