//! Pipeline events for observers of the tutor.
//!
//! One query publishes, in order: `QueryClassified`, `QueryDelegated`, one
//! `ToolExecuted` per tool run and `ResponseGenerated`. A routing or handler
//! failure publishes `ErrorOccurred` instead of the rest. Each event goes
//! out wrapped in an [`EventRecord`] carrying a bus-wide sequence number, so
//! observers of concurrent queries can still order what they saw.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::subject::{Route, SubjectLabel};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    QueryClassified {
        classifier: String,
        label: SubjectLabel,
        /// Shortened question text, see [`preview`].
        query: String,
    },
    QueryDelegated {
        label: SubjectLabel,
        route: Route,
        handler: String,
        granted_tools: Vec<String>,
    },
    ToolExecuted {
        tool: String,
        success: bool,
        duration_ms: u64,
    },
    ResponseGenerated {
        route: Route,
        tool_calls: usize,
        chars: usize,
    },
    /// `handler` is `None` when no handler could be selected.
    ErrorOccurred {
        route: Route,
        handler: Option<String>,
        error_message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

/// Broadcasts [`EventRecord`]s to every subscriber. Publishing never blocks
/// and never fails; slow subscribers lose the oldest records.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EventRecord>>,
    next_seq: AtomicU64,
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Stamp and broadcast `event`, returning its sequence number.
    pub fn publish(&self, event: DomainEvent) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        if self.sender.receiver_count() > 0 {
            let record = EventRecord {
                seq,
                at: Utc::now(),
                event,
            };
            // Receivers may drop between the count and the send.
            let _ = self.sender.send(Arc::new(record));
        }
        seq
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventRecord>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Everything already queued on `receiver`, skipping over any lag gap.
pub fn drain(receiver: &mut broadcast::Receiver<Arc<EventRecord>>) -> Vec<Arc<EventRecord>> {
    let mut records = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(record) => records.push(record),
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Event subscriber lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return records,
        }
    }
}

/// First `max` characters of `text`, for log-friendly previews.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Specialist;

    fn tool_ran(tool: &str) -> DomainEvent {
        DomainEvent::ToolExecuted {
            tool: tool.into(),
            success: true,
            duration_ms: 1,
        }
    }

    #[tokio::test]
    async fn subscribers_see_sequenced_records() {
        let bus = EventBus::with_capacity(16);
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(tool_ran("calculator")), 0);
        assert_eq!(bus.publish(tool_ran("equation_solver")), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(first.event, tool_ran("calculator"));
        let rest = drain(&mut rx);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].seq, 1);
    }

    #[test]
    fn publishing_without_subscribers_still_counts() {
        let bus = EventBus::with_capacity(4);
        bus.publish(tool_ran("calculator"));
        assert_eq!(bus.publish(tool_ran("calculator")), 1);
    }

    #[test]
    fn drain_skips_lagged_records() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(tool_ran("calculator"));
        }
        let seqs: Vec<u64> = drain(&mut rx).iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    #[test]
    fn records_serialize_as_flat_json() {
        let record = EventRecord {
            seq: 7,
            at: Utc::now(),
            event: DomainEvent::QueryDelegated {
                label: SubjectLabel::Physics,
                route: Route::Specialist(Specialist::Physics),
                handler: "reference".into(),
                granted_tools: vec!["physics_constants".into()],
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "query_delegated");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["label"], "PHYSICS");
        assert_eq!(json["granted_tools"][0], "physics_constants");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo…");
    }
}
