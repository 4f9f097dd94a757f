// src/dispatch.rs
//! Task dispatcher: fans the component × source matrix out under a
//! concurrency bound and collects exactly one outcome per pair.
//!
//! - Every task owns its component text and a handle to one source.
//! - A task is spawned only after it holds a semaphore permit, so at most
//!   `max_concurrency` tasks exist at once.
//! - Budget lookup, fetch and resolution all run inside the spawned task. A
//!   panic anywhere in an adapter surfaces as that task's `JoinError` and is
//!   recorded as `Panicked` for that pair alone.
//! - A fetch that overruns its budget is dropped and recorded as `Timeout`.
//! - Outcomes are tagged with their [`TaskKey`]; callers sort by it.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::error::FetchError;
use crate::matcher::Resolution;
use crate::sources::{FetchContext, SourceAdapter};

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("match_tasks_total", "Component x source tasks executed.");
        describe_counter!(
            "match_task_failures_total",
            "Tasks whose retrieval failed (timeout, status, extraction, panic)."
        );
        describe_counter!(
            "match_not_found_total",
            "Tasks that fetched fine but produced no acceptable listing."
        );
        describe_histogram!("match_task_ms", "Wall time of one task in milliseconds.");
    });
}

/// Position of a task in the matrix: `component` indexes the request list,
/// `source` the adapter list. Ordering is component-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskKey {
    pub component: usize,
    pub source: usize,
}

pub struct Task {
    pub key: TaskKey,
    pub component: String,
    pub source: Arc<dyn SourceAdapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Resolved { resolution: Resolution },
    Failed { error: FetchError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub component: String,
    pub site: String,
    #[serde(flatten)]
    pub status: TaskStatus,
    pub elapsed_ms: u64,
}

impl TaskOutcome {
    pub fn failed(key: TaskKey, component: &str, site: &str, error: FetchError) -> Self {
        Self {
            key,
            component: component.to_string(),
            site: site.to_string(),
            status: TaskStatus::Failed { error },
            elapsed_ms: 0,
        }
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.status {
            TaskStatus::Resolved { resolution } => Some(resolution),
            TaskStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            TaskStatus::Failed { error } => Some(error),
            TaskStatus::Resolved { .. } => None,
        }
    }
}

/// Full cross product, component-major.
pub fn build_tasks(components: &[String], sources: &[Arc<dyn SourceAdapter>]) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(components.len() * sources.len());
    for (ci, component) in components.iter().enumerate() {
        for (si, source) in sources.iter().enumerate() {
            tasks.push(Task {
                key: TaskKey {
                    component: ci,
                    source: si,
                },
                component: component.clone(),
                source: Arc::clone(source),
            });
        }
    }
    tasks
}

#[derive(Clone, Debug)]
pub struct Dispatcher {
    max_concurrency: usize,
    budget_override: Option<Duration>,
    ctx: FetchContext,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl Dispatcher {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            budget_override: None,
            ctx: FetchContext::default(),
        }
    }

    pub fn with_context(mut self, ctx: FetchContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Apply one budget to every task instead of each source's own.
    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget_override = budget;
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn dispatch(
        &self,
        components: &[String],
        sources: &[Arc<dyn SourceAdapter>],
    ) -> Vec<TaskOutcome> {
        ensure_metrics_described();
        let tasks = build_tasks(components, sources);
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }
        tracing::info!(
            target: "dispatch",
            tasks = total,
            max_concurrency = self.max_concurrency,
            "dispatch started"
        );

        // Resolved up front so a lost task can still be attributed.
        let sites: Vec<String> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| site_name(s.as_ref(), i))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut pending = Vec::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);
        for task in tasks {
            let site = sites[task.key.source].clone();
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    let err = FetchError::Panicked {
                        message: e.to_string(),
                    };
                    outcomes.push(lost_task(task.key, &task.component, &site, err));
                    continue;
                }
            };
            let key = task.key;
            let component = task.component.clone();
            let ctx = self.ctx.clone();
            let budget = self.budget_override;
            let task_site = site.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                run_task(task, task_site, &ctx, budget).await
            });
            pending.push((key, component, site, handle));
        }

        for (key, component, site, handle) in pending {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(join) => {
                    let err = FetchError::Panicked {
                        message: panic_message(join),
                    };
                    outcomes.push(lost_task(key, &component, &site, err));
                }
            }
        }

        tracing::info!(target: "dispatch", outcomes = outcomes.len(), "dispatch finished");
        outcomes
    }
}

/// Dispatch with a default retrieval context.
pub async fn dispatch(
    components: &[String],
    sources: &[Arc<dyn SourceAdapter>],
    max_concurrency: usize,
) -> Vec<TaskOutcome> {
    Dispatcher::new(max_concurrency)
        .dispatch(components, sources)
        .await
}

fn site_name(source: &dyn SourceAdapter, index: usize) -> String {
    catch_unwind(AssertUnwindSafe(|| source.name().to_string()))
        .unwrap_or_else(|_| format!("source#{index}"))
}

async fn run_task(
    task: Task,
    site: String,
    ctx: &FetchContext,
    budget_override: Option<Duration>,
) -> TaskOutcome {
    let t0 = Instant::now();
    let budget = budget_override.unwrap_or_else(|| task.source.time_budget());

    // Dropping the fetch future on expiry cancels it.
    let fetch = task.source.fetch_listings(ctx, &task.component);
    let fetched = match tokio::time::timeout(budget, fetch).await {
        Ok(res) => res,
        Err(_) => Err(FetchError::Timeout {
            budget_ms: budget.as_millis() as u64,
        }),
    };

    let status = match fetched {
        Ok(listings) => {
            let resolution = task.source.policy().resolve_component(&task.component, listings);
            if !resolution.is_found() {
                counter!("match_not_found_total", "site" => site.clone()).increment(1);
            }
            TaskStatus::Resolved { resolution }
        }
        Err(error) => {
            record_failure(&site, &task.component, &error);
            TaskStatus::Failed { error }
        }
    };

    let elapsed_ms = t0.elapsed().as_millis() as u64;
    counter!("match_tasks_total", "site" => site.clone()).increment(1);
    histogram!("match_task_ms", "site" => site.clone()).record(elapsed_ms as f64);

    TaskOutcome {
        key: task.key,
        component: task.component,
        site,
        status,
        elapsed_ms,
    }
}

/// Outcome for a task that never returned its own (panic or cancellation).
fn lost_task(key: TaskKey, component: &str, site: &str, error: FetchError) -> TaskOutcome {
    record_failure(site, component, &error);
    counter!("match_tasks_total", "site" => site.to_string()).increment(1);
    TaskOutcome::failed(key, component, site, error)
}

fn record_failure(site: &str, component: &str, error: &FetchError) {
    tracing::warn!(
        target: "dispatch",
        site = %site,
        component = %component,
        error = %error,
        "task failed"
    );
    counter!("match_task_failures_total", "site" => site.to_string(), "kind" => error.kind())
        .increment(1);
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
