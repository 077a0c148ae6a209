//! Upload progress events
//!
//! Provides the event definitions and EventBus used to report upload batch
//! progress to whatever renders it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Stage of a single file within an upload batch
///
/// Each stage carries a fixed display percentage; stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Queued,
    Uploading,
    Analyzing,
    Enhancing,
    Completed,
    Failed,
}

impl UploadStage {
    /// Display percentage for the stage
    ///
    /// `Failed` has no percentage of its own; a failed job keeps the one it reached.
    pub fn percent(&self) -> Option<u8> {
        match self {
            UploadStage::Queued => Some(0),
            UploadStage::Uploading => Some(20),
            UploadStage::Analyzing => Some(40),
            UploadStage::Enhancing => Some(70),
            UploadStage::Completed => Some(100),
            UploadStage::Failed => None,
        }
    }

    /// Status line shown next to the file
    pub fn status_text(&self) -> &'static str {
        match self {
            UploadStage::Queued => "Waiting...",
            UploadStage::Uploading => "Uploading...",
            UploadStage::Analyzing => "Analyzing with AI...",
            UploadStage::Enhancing => "Enhancing image...",
            UploadStage::Completed => "Completed!",
            UploadStage::Failed => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStage::Completed | UploadStage::Failed)
    }
}

/// Upload pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UploadEvent {
    BatchStarted {
        batch_id: Uuid,
        file_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    FileProgress {
        batch_id: Uuid,
        index: usize,
        file_name: String,
        stage: UploadStage,
        percent: u8,
        status_text: String,
    },
    FileCompleted {
        batch_id: Uuid,
        index: usize,
        file_name: String,
    },
    FileFailed {
        batch_id: Uuid,
        index: usize,
        file_name: String,
        error: String,
    },
    BatchCompleted {
        batch_id: Uuid,
        succeeded: usize,
        failed: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast channel for upload events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UploadEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use photoenh_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: UploadEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percentages_increase() {
        let stages = [
            UploadStage::Queued,
            UploadStage::Uploading,
            UploadStage::Analyzing,
            UploadStage::Enhancing,
            UploadStage::Completed,
        ];
        let percents: Vec<u8> = stages.iter().filter_map(|s| s.percent()).collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(UploadStage::Failed.percent(), None);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        bus.emit_lossy(UploadEvent::FileCompleted {
            batch_id,
            index: 0,
            file_name: "a.jpg".to_string(),
        });

        match rx.recv().await.unwrap() {
            UploadEvent::FileCompleted { index, .. } => assert_eq!(index, 0),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(UploadEvent::BatchCompleted {
            batch_id: Uuid::new_v4(),
            succeeded: 0,
            failed: 0,
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = UploadEvent::FileProgress {
            batch_id: Uuid::nil(),
            index: 1,
            file_name: "b.jpg".to_string(),
            stage: UploadStage::Analyzing,
            percent: 40,
            status_text: "Analyzing with AI...".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FileProgress");
        assert_eq!(json["stage"], "analyzing");
    }
}
