//! Serialized access to the configuration manager.
//!
//! The manager lives on a single task; callers send [`SessionCommand`]s and
//! await the reply, so a second reconfiguration queues behind the first.
//! Recording start and stop share the queue, so a recording never begins
//! while inputs are being swapped.

use anyhow::anyhow;
use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::session::{SessionState, SessionTarget};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::manager::ConfigurationManager;

const COMMAND_QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<OpticaResult<T>>;

#[derive(Debug)]
pub enum SessionCommand {
    Reconfigure {
        target: SessionTarget,
        reply: Reply<SessionState>,
    },
    StartRunning {
        reply: Reply<bool>,
    },
    StopRunning {
        reply: Reply<bool>,
    },
    StartRecording {
        reply: Reply<bool>,
    },
    StopRecording {
        reply: Reply<bool>,
    },
}

pub struct SessionWorker {
    manager: ConfigurationManager,
    commands: mpsc::Receiver<SessionCommand>,
}

impl SessionWorker {
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        tracing::debug!("Session worker stopped");
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Reconfigure { target, reply } => {
                let _ = reply.send(self.manager.reconfigure(&target));
            }
            SessionCommand::StartRunning { reply } => {
                let _ = reply.send(self.manager.start_running());
            }
            SessionCommand::StopRunning { reply } => {
                let _ = reply.send(self.manager.stop_running());
            }
            SessionCommand::StartRecording { reply } => {
                let result = match self.manager.recorder() {
                    Some(recorder) => recorder.start().await,
                    None => Err(no_recorder()),
                };
                let _ = reply.send(result);
            }
            SessionCommand::StopRecording { reply } => {
                let result = match self.manager.recorder() {
                    Some(recorder) => recorder.stop().await,
                    None => Err(no_recorder()),
                };
                let _ = reply.send(result);
            }
        }
    }
}

/// Cloneable handle to a running [`SessionWorker`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

fn worker_gone() -> OpticaError {
    OpticaError::Other(anyhow!("session worker is no longer running"))
}

fn no_recorder() -> OpticaError {
    OpticaError::recording("no recorder is attached to the session")
}

impl SessionHandle {
    /// Move `manager` onto its own task. Must be called inside a runtime.
    pub fn spawn(manager: ConfigurationManager) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let state = manager.subscribe();
        let worker = SessionWorker {
            manager,
            commands: receiver,
        };
        let task = tokio::spawn(worker.run());
        (Self { commands, state }, task)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> OpticaResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| worker_gone())?;
        response.await.map_err(|_| worker_gone())?
    }

    pub async fn reconfigure(&self, target: SessionTarget) -> OpticaResult<SessionState> {
        self.request(|reply| SessionCommand::Reconfigure { target, reply })
            .await
    }

    pub async fn start_running(&self) -> OpticaResult<bool> {
        self.request(|reply| SessionCommand::StartRunning { reply })
            .await
    }

    pub async fn stop_running(&self) -> OpticaResult<bool> {
        self.request(|reply| SessionCommand::StopRunning { reply })
            .await
    }

    pub async fn start_recording(&self) -> OpticaResult<bool> {
        self.request(|reply| SessionCommand::StartRecording { reply })
            .await
    }

    pub async fn stop_recording(&self) -> OpticaResult<bool> {
        self.request(|reply| SessionCommand::StopRecording { reply })
            .await
    }

    /// Last committed state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}
