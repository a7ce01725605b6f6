//! A cloneable handle that serializes runner operations from many callers.
//!
//! The runner moves into its own task and processes one command at a time,
//! in arrival order. Recovery runs first, so commands issued right after
//! `spawn` queue behind it and every command sees the settled result of the
//! one before.

use tokio::sync::{mpsc, oneshot};

use crate::error::RunnerError;
use crate::grading::ScoreSummary;
use crate::model::AttemptId;
use crate::runner::{AttemptRunner, RunnerPhase};
use crate::traits::{Activity, QuestionData};

const QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, RunnerError>>;

enum Command<R> {
    Render(Reply<()>),
    View(Reply<QuestionData<R>>),
    Submit(Reply<ScoreSummary>),
    Reset(Reply<()>),
    Status(oneshot::Sender<(RunnerPhase, AttemptId)>),
}

/// Sends operations to a runner task. Dropping every clone stops the task.
pub struct RunnerHandle<R> {
    tx: mpsc::Sender<Command<R>>,
}

impl<R> Clone for RunnerHandle<R> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<R: Send + Sync + 'static> RunnerHandle<R> {
    /// Move `runner` into a new tokio task and start recovering its state.
    pub fn spawn<A>(mut runner: AttemptRunner<A>) -> Self
    where
        A: Activity<Response = R> + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command<R>>(QUEUE_DEPTH);

        tokio::spawn(async move {
            if let Err(e) = runner.recover().await {
                // The next command retries recovery and reports the error.
                tracing::warn!("initial recovery failed: {e}");
            }

            while let Some(command) = rx.recv().await {
                match command {
                    Command::Render(reply) => {
                        let _ = reply.send(runner.render().await);
                    }
                    Command::View(reply) => {
                        let _ = reply.send(runner.question_data().await);
                    }
                    Command::Submit(reply) => {
                        let _ = reply.send(runner.submit().await);
                    }
                    Command::Reset(reply) => {
                        let _ = reply.send(runner.reset().await);
                    }
                    Command::Status(reply) => {
                        let _ = reply.send((runner.phase(), runner.attempt()));
                    }
                }
            }
            tracing::debug!("runner handle dropped; stopping");
        });

        Self { tx }
    }

    pub async fn render(&self) -> Result<(), RunnerError> {
        self.call(Command::Render).await
    }

    pub async fn question_data(&self) -> Result<QuestionData<R>, RunnerError> {
        self.call(Command::View).await
    }

    pub async fn submit(&self) -> Result<ScoreSummary, RunnerError> {
        self.call(Command::Submit).await
    }

    pub async fn reset(&self) -> Result<(), RunnerError> {
        self.call(Command::Reset).await
    }

    /// Current phase and attempt, after every earlier command has finished.
    pub async fn status(&self) -> Result<(RunnerPhase, AttemptId), RunnerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Status(reply))
            .await
            .map_err(|_| RunnerError::Stopped)?;
        rx.await.map_err(|_| RunnerError::Stopped)
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command<R>) -> Result<T, RunnerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| RunnerError::Stopped)?;
        rx.await.map_err(|_| RunnerError::Stopped)?
    }
}
