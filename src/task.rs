//! Progress tracking for long-running tool work (document conversions, AI
//! flows). A tracker is a cheap clonable handle; every clone sees the same
//! state.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Idle,
    Running { progress: u8 },
    Success,
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct TaskTracker {
    state: Arc<Mutex<TaskState>>,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TaskState::Idle)),
        }
    }

    // A panic while holding the lock leaves a valid state behind
    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> TaskState {
        self.lock().clone()
    }

    pub fn start(&self) {
        *self.lock() = TaskState::Running { progress: 0 };
    }

    /// Clamped to 100; ignored unless the task is running
    pub fn set_progress(&self, percent: u8) {
        let mut state = self.lock();
        if let TaskState::Running { progress } = &mut *state {
            *progress = percent.min(100);
        }
    }

    pub fn succeed(&self) {
        *self.lock() = TaskState::Success;
    }

    pub fn fail(&self, message: impl Into<String>) {
        *self.lock() = TaskState::Error {
            message: message.into(),
        };
    }

    /// Drive `work` to completion, recording Running then Success or Error
    pub async fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.start();
        match work.await {
            Ok(value) => {
                self.succeed();
                Ok(value)
            }
            Err(e) => {
                log::warn!("task failed: {e}");
                self.fail(e.to_string());
                Err(e)
            }
        }
    }
}

/// Named trackers, one per tool or flow
#[derive(Debug, Default)]
pub struct TaskRegistry {
    trackers: Mutex<HashMap<String, TaskTracker>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tracker for `name`, creating an idle one on first use
    pub fn tracker(&self, name: &str) -> TaskTracker {
        let mut trackers = self
            .trackers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trackers.entry(name.to_string()).or_default().clone()
    }

    /// State of `name`, or `None` if nothing has used it yet
    pub fn state(&self, name: &str) -> Option<TaskState> {
        let trackers = self
            .trackers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trackers.get(name).map(TaskTracker::state)
    }
}
