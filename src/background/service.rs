use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("background task already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub task_name: String,
    pub title: String,
    pub description: String,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            task_name: "trackpost".to_string(),
            title: "Location tracking".to_string(),
            description: "Capturing position".to_string(),
        }
    }
}

/// Fires once when the owner asks the task to wind down, or is dropped.
pub struct StopSignal {
    rx: oneshot::Receiver<()>,
    stopped: bool,
}

impl StopSignal {
    /// Resolves once stop was requested. Cancel-safe.
    pub async fn wait(&mut self) {
        if self.stopped {
            return;
        }
        let _ = (&mut self.rx).await;
        self.stopped = true;
    }

    pub fn is_stopped(&mut self) -> bool {
        if !self.stopped {
            match self.rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => self.stopped = true,
            }
        }
        self.stopped
    }
}

#[derive(Clone)]
pub struct Notifier {
    task_name: String,
    text: Arc<StdMutex<String>>,
}

impl Notifier {
    pub fn update(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("[{}] {}", self.task_name, text);
        *self.text.lock().unwrap() = text;
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

pub struct BackgroundService {
    options: TaskOptions,
    notifier: Notifier,
    worker: Option<WorkerHandle>,
}

impl BackgroundService {
    pub fn new(options: TaskOptions) -> Self {
        let notifier = Notifier {
            task_name: options.task_name.clone(),
            text: Arc::new(StdMutex::new(options.description.clone())),
        };
        Self {
            options,
            notifier,
            worker: None,
        }
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.join.is_finished())
            .unwrap_or(false)
    }

    /// Spawns `work` on the runtime. Only one task may run at a time.
    pub fn start<F, Fut>(&mut self, work: F) -> Result<(), TaskError>
    where
        F: FnOnce(StopSignal, Notifier) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() {
            return Err(TaskError::AlreadyRunning);
        }

        self.notifier.update(self.options.description.clone());
        let (stop_tx, rx) = oneshot::channel();
        let signal = StopSignal { rx, stopped: false };
        let join = tokio::spawn(work(signal, self.notifier.clone()));

        log::info!("Started background task {} ({})", self.options.task_name, self.options.title);
        self.worker = Some(WorkerHandle { stop_tx, join });
        Ok(())
    }

    /// Signals the task and waits for whatever it is doing to finish.
    pub async fn stop(&mut self) {
        if let Some(stopping) = self.signal_stop() {
            stopping.finished().await;
        }
    }

    /// Signals the task without waiting for it. The service counts as idle
    /// right away; await the returned handle to know the task has exited.
    pub fn signal_stop(&mut self) -> Option<StoppingTask> {
        let worker = self.worker.take()?;
        let _ = worker.stop_tx.send(());
        Some(StoppingTask {
            task_name: self.options.task_name.clone(),
            join: worker.join,
        })
    }
}

/// A task that was asked to stop and may still be finishing its work.
#[derive(Debug)]
pub struct StoppingTask {
    task_name: String,
    join: JoinHandle<()>,
}

impl StoppingTask {
    pub async fn finished(self) {
        if let Err(e) = self.join.await {
            log::error!("Background task {} ended abnormally: {}", self.task_name, e);
        }
        log::info!("Stopped background task {}", self.task_name);
    }
}
