//! Execution context: cooperative cancellation, deadline and tunables for one run.

use crate::config::PipelineConfig;
use crate::error::OperationError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cloneable cancellation signal shared between a caller and running pipelines.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Everything an operation may consult while applying itself.
///
/// The context is read-only during a run; the same context may drive several runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    config: PipelineConfig,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config.normalised();
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fails if the token was signalled or the deadline passed.
    pub fn check(&self) -> Result<(), OperationError> {
        if self.token.is_cancelled() {
            return Err(OperationError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(OperationError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Polls [`check`](Self::check) once every `cancel_check_interval` processed records.
    pub fn check_every(&self, processed: usize) -> Result<(), OperationError> {
        let interval = self.config.cancel_check_interval.max(1);
        if processed % interval == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}
