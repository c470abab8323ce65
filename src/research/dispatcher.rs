//! Concurrent execution of capability tasks.
//!
//! Tasks run at most `max_concurrent` at a time. A task that fails, times out
//! or panics yields a [`CapabilityResult`] describing the fault; the other
//! tasks are unaffected. Completion order is not observable by callers:
//! outcomes are sorted by `(capability, gap, submission index)`.

use crate::progress::{EventType, ProgressPublisher};
use crate::tools::registry::CapabilityRegistry;
use crate::types::{CapabilityResult, CapabilityTask};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Result of one dispatched task together with the task itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub index: usize,
    pub task: CapabilityTask,
    pub result: CapabilityResult,
}

impl DispatchOutcome {
    fn sort_key(&self) -> (&str, &str, usize) {
        (
            self.task.capability.as_str(),
            self.task.gap.as_deref().unwrap_or(""),
            self.index,
        )
    }
}

#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<CapabilityRegistry>,
    publisher: ProgressPublisher,
    max_concurrent: usize,
    task_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        publisher: ProgressPublisher,
        max_concurrent: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            publisher,
            max_concurrent: max_concurrent.max(1),
            task_timeout,
        }
    }

    async fn run_one(&self, index: usize, task: CapabilityTask) -> DispatchOutcome {
        let execution = AssertUnwindSafe(self.registry.execute(&task)).catch_unwind();

        let result = match tokio::time::timeout(self.task_timeout, execution).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                let message = format!(
                    "Error executing {} for gap '{}': capability panicked",
                    task.capability,
                    task.gap.as_deref().unwrap_or("")
                );
                tracing::warn!("{}", message);
                self.publisher.publish(EventType::ToolError, message.clone());
                CapabilityResult::failure(message)
            }
            Err(_) => {
                let message = format!(
                    "Error executing {} for gap '{}': timed out after {}s",
                    task.capability,
                    task.gap.as_deref().unwrap_or(""),
                    self.task_timeout.as_secs()
                );
                tracing::warn!("{}", message);
                self.publisher.publish(EventType::ToolError, message.clone());
                CapabilityResult::failure(message)
            }
        };

        DispatchOutcome {
            index,
            task,
            result,
        }
    }

    /// Run every task and return the outcomes in stable order.
    pub async fn dispatch(&self, tasks: Vec<CapabilityTask>) -> Vec<DispatchOutcome> {
        let total = tasks.len();
        if total == 0 {
            return Vec::new();
        }

        let mut completed = 0usize;
        let mut outcomes = Vec::with_capacity(total);
        let mut running = stream::iter(tasks.into_iter().enumerate())
            .map(|(index, task)| self.run_one(index, task))
            .buffer_unordered(self.max_concurrent);

        while let Some(outcome) = running.next().await {
            completed += 1;
            self.publisher.publish(
                EventType::ToolDispatchProgress,
                format!(
                    "<processing>\n{}/{} tasks completed ({})\n</processing>",
                    completed, total, outcome.task.capability
                ),
            );
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        outcomes
    }
}
