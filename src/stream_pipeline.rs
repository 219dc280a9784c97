// THEORY:
// `Engine::process_frame` is not re-entrant, but frames often arrive from a
// capture task while a dashboard asks for reports from somewhere else. The
// `EngineService` makes that safe without putting any locking inside the
// engine itself.
//
// Key architectural principles:
// 1.  **Single Writer**: Frames are queued on an mpsc channel and applied by
//     exactly one consumer task, in submission order, under the write lock.
// 2.  **Consistent Readers**: Reports, snapshots and exports take the read lock,
//     so they always observe the state between two whole frames.
// 3.  **Explicit Lifecycle**: `shutdown` closes the queue, waits for the
//     consumer to drain it, and hands the engine back to the caller.

use crate::core_modules::analytics::{AnalyticsOutcome, TrendAnalysis};
use crate::error::EngineError;
use crate::pipeline::{Engine, FrameInput, FrameResult};
use crate::session::{SessionExport, SessionSnapshot};
use crate::simulation::StopFlag;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One queued frame and the channel its result is delivered on.
pub struct FrameTask {
    pub input: FrameInput,
    pub result_sender: oneshot::Sender<FrameResult>,
}

pub struct EngineService {
    engine: Arc<RwLock<Engine>>,
    task_sender: mpsc::UnboundedSender<FrameTask>,
    consumer: JoinHandle<()>,
}

impl EngineService {
    /// Moves `engine` behind a lock and starts the consumer task. Must be called
    /// from within a tokio runtime.
    pub fn spawn(engine: Engine) -> Self {
        let engine = Arc::new(RwLock::new(engine));
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<FrameTask>();

        let worker_engine = Arc::clone(&engine);
        let consumer = tokio::spawn(async move {
            info!("engine service started");
            while let Some(task) = task_receiver.recv().await {
                let result = {
                    let mut engine = worker_engine.write().await;
                    engine.analyze_frame(&task.input)
                };
                // The submitter may have stopped waiting; the frame still counts.
                let _ = task.result_sender.send(result);
            }
            info!("engine service stopped");
        });

        Self {
            engine,
            task_sender,
            consumer,
        }
    }

    /// Queues a frame and returns the receiver for its result.
    pub fn submit(&self, input: FrameInput) -> Result<oneshot::Receiver<FrameResult>, EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(FrameTask { input, result_sender })
            .map_err(|_| EngineError::ServiceClosed)?;
        Ok(result_receiver)
    }

    /// Queues a frame and waits for it to be processed.
    pub async fn process_frame(&self, input: FrameInput) -> Result<FrameResult, EngineError> {
        let receiver = self.submit(input)?;
        receiver.await.map_err(|_| EngineError::ServiceClosed)
    }

    /// Drives a whole frame stream through the engine, stopping early once
    /// `stop` is raised. Returns the number of frames processed.
    pub async fn process_stream<S>(&self, stream: S, stop: &StopFlag) -> Result<usize, EngineError>
    where
        S: Stream<Item = FrameInput>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut processed = 0;

        while let Some(input) = stream.next().await {
            if stop.is_raised() {
                info!(processed, "frame stream cancelled");
                break;
            }
            let result = self.process_frame(input).await?;
            debug!(attention = result.learning_state.attention, alerts = result.new_alerts.len(), "stream frame processed");
            processed += 1;
        }
        Ok(processed)
    }

    pub async fn report(&self, window_hours: f64) -> AnalyticsOutcome {
        self.engine.read().await.report(window_hours)
    }

    pub async fn trend_analysis(&self, window_minutes: f64) -> Option<TrendAnalysis> {
        self.engine.read().await.trend_analysis(window_minutes)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.engine.read().await.current_snapshot()
    }

    pub async fn export(&self) -> SessionExport {
        self.engine.read().await.export_session()
    }

    /// Shared handle to the engine, for callers that need other read-only queries.
    pub fn engine(&self) -> Arc<RwLock<Engine>> {
        Arc::clone(&self.engine)
    }

    /// Stops accepting frames, drains the queue and returns the engine.
    pub async fn shutdown(self) -> Result<Engine, EngineError> {
        let EngineService {
            engine,
            task_sender,
            consumer,
        } = self;
        drop(task_sender);
        consumer.await.map_err(|_| EngineError::ServiceClosed)?;

        Arc::try_unwrap(engine)
            .map(RwLock::into_inner)
            .map_err(|_| EngineError::EngineShared)
    }
}
