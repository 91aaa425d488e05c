//! Caller-facing entry point around the conversation loop.

use crate::conversation_loop::{ConversationLoop, LoopOutcome, RenderFn};
use crate::interfaces::{ModelBackend, ResourceHandle, RuntimeError, ToolExecutor};
use crate::metrics::MetricTimer;
use crate::types::Transcript;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Conversation<B: ModelBackend, E: ToolExecutor> {
    engine: ConversationLoop<B, E>,
    resources: Arc<dyn ResourceHandle>,
    keep_images: RwLock<Option<usize>>,
    concurrency_limiter: Arc<Semaphore>,
    shutdown_token: CancellationToken,
    shut_down: AtomicBool,
}

impl<B: ModelBackend, E: ToolExecutor> Conversation<B, E> {
    pub fn new(engine: ConversationLoop<B, E>, resources: Arc<dyn ResourceHandle>) -> Self {
        Self::with_max_concurrent_runs(engine, resources, 16)
    }

    pub fn with_max_concurrent_runs(
        engine: ConversationLoop<B, E>,
        resources: Arc<dyn ResourceHandle>,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            engine,
            resources,
            keep_images: RwLock::new(Some(1)),
            concurrency_limiter: Arc::new(Semaphore::new(max_concurrent_runs.max(1))),
            shutdown_token: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Set how many screenshots are replayed to the model; `None` keeps all.
    pub fn configure(&self, keep_images: Option<usize>) {
        info!("Image budget set to {:?}", keep_images);
        *self.keep_images.write() = keep_images;
    }

    pub fn keep_images(&self) -> Option<usize> {
        *self.keep_images.read()
    }

    pub async fn run(
        &self,
        transcript: &mut Transcript,
        render: Option<&RenderFn>,
    ) -> Result<LoopOutcome, RuntimeError> {
        let token = self.run_token();
        self.run_with_token(transcript, render, &token).await
    }

    /// Token for one run. `shutdown` and `cancel` reach every token made here.
    pub fn run_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    /// Like `run`, stopping before the next model call once `cancel` fires.
    pub async fn run_with_token(
        &self,
        transcript: &mut Transcript,
        render: Option<&RenderFn>,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, RuntimeError> {
        let _permit = self
            .concurrency_limiter
            .acquire()
            .await
            .map_err(|_| RuntimeError::ResourceUnavailable("conversation is shut down".to_string()))?;

        let _timer = MetricTimer::new("conversation_run_duration");
        let outcome = self
            .engine
            .run(transcript, self.keep_images(), render, cancel)
            .await;

        match &outcome {
            Ok(outcome) => info!("Run ended: {:?}", outcome),
            Err(e) => warn!("Run failed: {}", e),
        }
        outcome
    }

    /// Stop all runs, current and future, before their next model call.
    pub fn cancel(&self) {
        self.shutdown_token.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Cancel runs, refuse new ones and release the browser. Idempotent.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down conversation");
        self.shutdown_token.cancel();
        self.concurrency_limiter.close();
        self.resources.shutdown().await;
    }
}
