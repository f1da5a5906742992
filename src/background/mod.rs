//! Long-running task facility that keeps the capture cycle alive.
//!
//! The host owns one task at a time. The task gets a [`StopSignal`] to
//! watch and a [`Notifier`] for the status line a host would show while
//! the task runs.

mod service;

pub use service::{BackgroundService, Notifier, StopSignal, StoppingTask, TaskError, TaskOptions};
