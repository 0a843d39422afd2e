//! Per-invocation workflow context
//!
//! A [`WorkflowContext`] owns the `tracing` span of one workflow run. Each
//! step runs inside a child span, so every log line of one invocation,
//! including those emitted by waiters and the poller, carries the workflow
//! and step it belongs to.

use std::future::Future;

use tokio::time::Instant;
use tracing::field::Empty;
use tracing::{Instrument, Span, info, info_span, warn};

use crate::error::{CoreError, Result, Step};

pub struct WorkflowContext {
    workflow: &'static str,
    span: Span,
}

impl WorkflowContext {
    pub fn new(workflow: &'static str, subject: &str) -> Self {
        let span = info_span!("workflow", workflow, subject = %subject, cluster = Empty);
        Self { workflow, span }
    }

    pub fn workflow(&self) -> &'static str {
        self.workflow
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Attach the cluster identifier once it is known
    pub fn record_cluster(&self, cluster_identifier: &str) {
        self.span.record("cluster", cluster_identifier);
    }

    /// Run one step inside its own span
    ///
    /// Any error is wrapped in [`CoreError::Step`] so the caller can tell
    /// which step failed; later steps are simply never started.
    pub async fn step<T, F>(&self, step: Step, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let span = info_span!(parent: &self.span, "step", step = step.as_str());
        let start = Instant::now();

        span.in_scope(|| info!("Step started"));
        match fut.instrument(span.clone()).await {
            Ok(value) => {
                span.in_scope(|| {
                    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Step completed")
                });
                Ok(value)
            }
            Err(e) => {
                span.in_scope(|| warn!(error = %e, "Step failed"));
                Err(CoreError::Step {
                    workflow: self.workflow,
                    step,
                    source: Box::new(e),
                })
            }
        }
    }
}
