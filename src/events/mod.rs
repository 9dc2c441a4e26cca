//! In-process notification hub.
//!
//! Task status changes are broadcast to whoever is subscribed at the time.
//! Nothing is persisted; a receiver that falls behind loses the oldest events.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::TaskStatus;

/// Events retained for slow receivers.
const CHANNEL_CAPACITY: usize = 256;

/// A task was dropped into a kanban column.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusEvent {
    pub task_id: String,
    pub title: String,
    pub status: TaskStatus,
    pub actor_id: String,
    pub actor_name: String,
    pub at: String,
}

/// Fan-out of notification events.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<TaskStatusEvent>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast `event`; returns how many receivers got it.
    pub fn publish(&self, event: TaskStatusEvent) -> usize {
        // send only fails when nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskStatusEvent> {
        self.sender.subscribe()
    }

    /// Spawn the listener that surfaces notifications in the server log.
    pub fn spawn_log_listener(&self) -> JoinHandle<()> {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => tracing::info!(
                        task = %event.task_id,
                        status = %event.status,
                        actor = %event.actor_name,
                        "Task \"{}\" moved to {}",
                        event.title,
                        event.status
                    ),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Notification listener skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
