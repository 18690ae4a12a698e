//! # Events Module
//!
//! Structured results forwarded to the UI layer. Event names and payload
//! field names are what front ends subscribe to, so they are fixed here:
//!
//! | event          | payload                                      |
//! |----------------|----------------------------------------------|
//! | `newLogEntry`  | `timestamp`, `uid`, `displayName`, `result`  |
//! | `logEntry`     | `timestamp`, `uid`, `displayName`, `result`  |
//! | `logsCleared`  | `{}`                                         |
//! | `cardRemoved`  | `success`, optional `uid`, optional `error`  |
//! | `cardAdded`    | `success`, optional `error`                  |
//! | `aliasSaved`   | `success`                                    |
//! | `memoryUsage`  | `used`, `total`                              |
//! | `eepromReset`  | `success`                                    |
//! | `cardEntry`    | `uid`, `alias`                               |

use log::{debug, error};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// One access attempt as recorded by the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Device-supplied, opaque.
    pub timestamp: String,
    pub uid: String,
    pub display_name: String,
    pub result: String,
}

/// Success or failure of a card-store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            uid: None,
            error: None,
        }
    }

    pub fn ok_with_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            ..Self::ok()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            uid: None,
            error: Some(error.into()),
        }
    }
}

/// EEPROM telemetry snapshot, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub used: i64,
    pub total: i64,
}

/// One stored card as listed by `GET_CARDS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardEntry {
    pub uid: String,
    pub alias: String,
}

/// Everything the bridge reports to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewLogEntry(LogEvent),
    LogEntry(LogEvent),
    LogsCleared,
    CardRemoved(Outcome),
    CardAdded(Outcome),
    AliasSaved(Outcome),
    MemoryUsage(MemoryUsage),
    EepromReset(Outcome),
    CardEntry(CardEntry),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::NewLogEntry(_) => "newLogEntry",
            Event::LogEntry(_) => "logEntry",
            Event::LogsCleared => "logsCleared",
            Event::CardRemoved(_) => "cardRemoved",
            Event::CardAdded(_) => "cardAdded",
            Event::AliasSaved(_) => "aliasSaved",
            Event::MemoryUsage(_) => "memoryUsage",
            Event::EepromReset(_) => "eepromReset",
            Event::CardEntry(_) => "cardEntry",
        }
    }

    /// The payload mapping handed to `emit(name, payload)`.
    pub fn payload(&self) -> Value {
        let value = match self {
            Event::NewLogEntry(log) | Event::LogEntry(log) => serde_json::to_value(log),
            Event::LogsCleared => Ok(Value::Object(Map::new())),
            Event::CardRemoved(outcome)
            | Event::CardAdded(outcome)
            | Event::AliasSaved(outcome)
            | Event::EepromReset(outcome) => serde_json::to_value(outcome),
            Event::MemoryUsage(usage) => serde_json::to_value(usage),
            Event::CardEntry(card) => serde_json::to_value(card),
        };
        // Plain string/bool/integer structs always serialize.
        value.unwrap_or_default()
    }
}

/// Sink for events, implemented by whatever front end hosts the bridge.
#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn emit(&self, event: &Event);
}

/// Forwards events to a single in-process consumer.
///
/// The queue is unbounded: a `GET_LOGS` dump emits one event per stored log
/// line in a burst, and none of them may be dropped while the consumer
/// catches up.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn emit(&self, event: &Event) {
        if self.tx.send(event.clone()).is_err() {
            debug!("event receiver dropped, discarding {}", event.name());
        }
    }
}

/// Writes one JSON object per event, e.g.
/// `{"event":"memoryUsage","payload":{"used":120,"total":512},"receivedAt":"..."}`.
pub struct JsonLinesPublisher<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> EventPublisher for JsonLinesPublisher<W> {
    fn emit(&self, event: &Event) {
        let received_at = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string();
        let line = json!({
            "event": event.name(),
            "payload": event.payload(),
            "receivedAt": received_at,
        });
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            error!("failed to write {} event: {}", event.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_event() -> LogEvent {
        LogEvent {
            timestamp: "100".to_string(),
            uid: "AA:BB:CC:DD".to_string(),
            display_name: "Door1".to_string(),
            result: "GRANTED".to_string(),
        }
    }

    #[test]
    fn test_log_payload_field_names() {
        let event = Event::NewLogEntry(log_event());
        assert_eq!(event.name(), "newLogEntry");
        assert_eq!(
            event.payload(),
            json!({
                "timestamp": "100",
                "uid": "AA:BB:CC:DD",
                "displayName": "Door1",
                "result": "GRANTED",
            })
        );
    }

    #[test]
    fn test_outcome_payloads_omit_absent_fields() {
        assert_eq!(
            Event::CardAdded(Outcome::ok()).payload(),
            json!({ "success": true })
        );
        assert_eq!(
            Event::CardRemoved(Outcome::ok_with_uid("AA:BB")).payload(),
            json!({ "success": true, "uid": "AA:BB" })
        );
        assert_eq!(
            Event::CardRemoved(Outcome::failed("Card not found")).payload(),
            json!({ "success": false, "error": "Card not found" })
        );
    }

    #[test]
    fn test_logs_cleared_has_empty_payload() {
        assert_eq!(Event::LogsCleared.payload(), json!({}));
    }

    #[test]
    fn test_memory_and_card_payloads() {
        assert_eq!(
            Event::MemoryUsage(MemoryUsage { used: 120, total: 512 }).payload(),
            json!({ "used": 120, "total": 512 })
        );
        let card = CardEntry {
            uid: "AA:BB:CC:DD".to_string(),
            alias: "Door1".to_string(),
        };
        assert_eq!(
            Event::CardEntry(card).payload(),
            json!({ "uid": "AA:BB:CC:DD", "alias": "Door1" })
        );
    }

    #[tokio::test]
    async fn test_channel_publisher_preserves_order() {
        let (publisher, mut rx) = ChannelPublisher::channel();
        publisher.emit(&Event::LogsCleared);
        publisher.emit(&Event::EepromReset(Outcome::ok()));
        assert_eq!(rx.recv().await.unwrap(), Event::LogsCleared);
        assert_eq!(rx.recv().await.unwrap(), Event::EepromReset(Outcome::ok()));
    }

    #[tokio::test]
    async fn test_channel_publisher_keeps_every_event_of_a_burst() {
        let (publisher, mut rx) = ChannelPublisher::channel();
        let mut log = log_event();
        for i in 0..500 {
            log.timestamp = i.to_string();
            publisher.emit(&Event::LogEntry(log.clone()));
        }
        drop(publisher);
        let mut received = 0;
        while let Some(event) = rx.recv().await {
            match event {
                Event::LogEntry(log) => assert_eq!(log.timestamp, received.to_string()),
                other => panic!("unexpected event {other:?}"),
            }
            received += 1;
        }
        assert_eq!(received, 500);
    }

    #[test]
    fn test_channel_publisher_without_receiver_does_not_panic() {
        let (publisher, rx) = ChannelPublisher::channel();
        drop(rx);
        publisher.emit(&Event::LogsCleared);
    }

    #[test]
    fn test_json_lines_publisher_writes_one_object_per_line() {
        let publisher = JsonLinesPublisher::new(Vec::new());
        publisher.emit(&Event::MemoryUsage(MemoryUsage { used: 1, total: 2 }));
        publisher.emit(&Event::LogsCleared);
        let out = String::from_utf8(publisher.into_inner()).unwrap();
        let lines: Vec<Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "memoryUsage");
        assert_eq!(lines[0]["payload"]["total"], 2);
        assert_eq!(lines[1]["event"], "logsCleared");
        assert!(lines[1]["receivedAt"].is_string());
    }
}
