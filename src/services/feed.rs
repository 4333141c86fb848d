// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process activity change feed.
//!
//! Lifecycle writes publish an [`ActivityEvent`]; SSE subscribers receive
//! them through a `tokio::sync::broadcast` channel. Slow subscribers that
//! fall behind skip the missed events.

use crate::models::ActivityStatus;
use serde::Serialize;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

string_enum! {
    /// What happened to the activity.
    pub enum ActivityEventKind {
        Created => "created",
        Updated => "updated",
        Started => "started",
        PointAdded => "point_added",
        Finished => "finished",
        Cancelled => "cancelled",
        Deleted => "deleted",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub activity_id: i64,
    pub ranger_id: String,
    pub status: ActivityStatus,
    pub kind: ActivityEventKind,
}

/// Sender side of the feed, shared through `AppState`.
pub struct ActivityFeed {
    sender: broadcast::Sender<ActivityEvent>,
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ActivityEvent) {
        let activity_id = event.activity_id;
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(activity_id, kind = %kind, receivers, "Activity event published")
            }
            Err(_) => tracing::trace!(activity_id, "No feed subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, kind: ActivityEventKind) -> ActivityEvent {
        ActivityEvent {
            activity_id: id,
            ranger_id: "r1".to_string(),
            status: ActivityStatus::InProgress,
            kind,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let feed = ActivityFeed::new();
        let mut rx = feed.subscribe();
        feed.publish(event(1, ActivityEventKind::Started));
        feed.publish(event(1, ActivityEventKind::PointAdded));

        assert_eq!(rx.recv().await.unwrap().kind, ActivityEventKind::Started);
        assert_eq!(rx.recv().await.unwrap().kind, ActivityEventKind::PointAdded);
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ActivityFeed::new();
        feed.publish(event(1, ActivityEventKind::Created));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_reports_skip() {
        let feed = ActivityFeed::new();
        let mut rx = feed.subscribe();
        for i in 0..(FEED_CAPACITY as i64 + 10) {
            feed.publish(event(i, ActivityEventKind::PointAdded));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(10))
        ));
    }
}
