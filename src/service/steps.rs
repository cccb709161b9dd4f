//! Sequential workflow steps
//!
//! Multi-request workflows (publish, edit, delete) run one request at a
//! time. Nothing is rolled back when a step fails, so the log records which
//! steps were already committed.

use std::future::Future;

use crate::error::AppError;

pub(crate) struct StepLog {
    workflow: &'static str,
    committed: Vec<String>,
}

impl StepLog {
    pub(crate) fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            committed: Vec::new(),
        }
    }

    /// Await one step, recording it on success and logging the partial state on failure
    pub(crate) async fn run<T, F>(&mut self, step: impl Into<String>, future: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let step = step.into();
        match future.await {
            Ok(value) => {
                tracing::debug!(workflow = self.workflow, step = %step, "Step committed");
                self.committed.push(step);
                Ok(value)
            }
            Err(error) => {
                tracing::error!(
                    workflow = self.workflow,
                    step = %step,
                    committed = ?self.committed,
                    error = %error,
                    "Workflow step failed, earlier steps stay committed"
                );
                Err(error)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn committed(&self) -> &[String] {
        &self.committed
    }

    pub(crate) fn finish(self) {
        tracing::info!(
            workflow = self.workflow,
            steps = self.committed.len(),
            "Workflow completed"
        );
    }
}
