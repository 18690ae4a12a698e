//! Classification of complete device lines.
//!
//! The firmware has no framing beyond the newline, so each line is matched
//! against a fixed, ordered list of prefix and content predicates and the
//! first match decides its kind. Several predicates overlap (a log line
//! carries both commas and colons, `CARD_REMOVED` prefixes
//! `CARD_REMOVED_WITH_UID:`), so the order below is significant.

use crate::events::MemoryUsage;

const NEW_LOG: &str = "NEW_LOG:";
const LOGS_HEADER: &str = "LOGS:";
const LOGS_CLEARED: &str = "LOGS_CLEARED";
const CARDS_HEADER: &str = "CARDS:";
const CARD_REMOVED_WITH_UID: &str = "CARD_REMOVED_WITH_UID:";
const CARD_REMOVED: &str = "CARD_REMOVED";
const CARD_NOT_FOUND: &str = "CARD_NOT_FOUND";
const INVALID_UID: &str = "INVALID_UID";
const CARD_ADDED: &str = "CARD_ADDED";
const MEMORY_USAGE: &str = "MEMORY_USAGE:";
const ALIAS_SAVED: &str = "ALIAS_SAVED";
const CARD_LIST_FULL: &str = "CARD_LIST_FULL";
const PONG: &str = "PONG";
const RESETTING_EEPROM: &str = "RESETTING_EEPROM";
const EEPROM_RESET_COMPLETE: &str = "EEPROM_RESET_COMPLETE";
const ECHO_RESPONSE: &str = "ECHO_RESPONSE";

/// Command echoes and debug output that look like `uid,alias` records.
const CARD_ENTRY_EXCLUSIONS: &[&str] = &[
    "Received command:",
    "REMOVE_CARD:",
    "GET_CARDS",
    "GET_LOGS",
    "CLEAR_LOGS",
    "DEBUG_MEMORY:",
];

/// `timestamp,uid,result` as sent by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub uid: String,
    pub result: String,
}

/// A classified device line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NewLog(LogRecord),
    LogsHeader,
    LogLine(LogRecord),
    LogsCleared,
    CardsHeader,
    CardRemoved,
    CardRemovedWithUid(String),
    CardNotFound,
    InvalidUid,
    CardAdded,
    MemoryUsage(MemoryUsage),
    AliasSaved,
    CardListFull,
    Pong,
    ResettingEeprom,
    EepromResetComplete,
    EchoResponse,
    CardEntry { uid: String, alias: String },
    /// Matched a rule but its fields could not be parsed.
    Malformed { kind: &'static str },
}

impl Message {
    /// Classifies one complete, trimmed line. `None` means no rule matched.
    pub fn classify(line: &str) -> Option<Self> {
        let message = if let Some(rest) = line.strip_prefix(NEW_LOG) {
            parse_log(rest).map_or(Message::Malformed { kind: "NEW_LOG" }, Message::NewLog)
        } else if line.starts_with(LOGS_HEADER) {
            Message::LogsHeader
        } else if line.contains("GRANTED") || line.contains("DENIED") {
            parse_log(line).map_or(Message::Malformed { kind: "log entry" }, Message::LogLine)
        } else if line.starts_with(LOGS_CLEARED) {
            Message::LogsCleared
        } else if line.starts_with(CARDS_HEADER) {
            Message::CardsHeader
        } else if let Some(uid) = line.strip_prefix(CARD_REMOVED_WITH_UID) {
            Message::CardRemovedWithUid(uid.trim().to_string())
        } else if line.starts_with(CARD_REMOVED) {
            Message::CardRemoved
        } else if line.starts_with(CARD_NOT_FOUND) {
            Message::CardNotFound
        } else if line.starts_with(INVALID_UID) {
            Message::InvalidUid
        } else if line.starts_with(CARD_ADDED) {
            Message::CardAdded
        } else if let Some(rest) = line.strip_prefix(MEMORY_USAGE) {
            parse_memory(rest)
                .map_or(Message::Malformed { kind: "MEMORY_USAGE" }, Message::MemoryUsage)
        } else if line.starts_with(ALIAS_SAVED) {
            Message::AliasSaved
        } else if line.starts_with(CARD_LIST_FULL) {
            Message::CardListFull
        } else if line.starts_with(PONG) {
            Message::Pong
        } else if line.starts_with(RESETTING_EEPROM) {
            Message::ResettingEeprom
        } else if line.starts_with(EEPROM_RESET_COMPLETE) {
            Message::EepromResetComplete
        } else if line.starts_with(ECHO_RESPONSE) {
            Message::EchoResponse
        } else if is_card_entry(line) {
            let mut parts = line.split(',');
            match (parts.next(), parts.next()) {
                (Some(uid), Some(alias)) => Message::CardEntry {
                    uid: uid.trim().to_string(),
                    alias: alias.trim().to_string(),
                },
                _ => Message::Malformed { kind: "card entry" },
            }
        } else {
            return None;
        };
        Some(message)
    }
}

fn is_card_entry(line: &str) -> bool {
    line.contains(',')
        && line.contains(':')
        && !CARD_ENTRY_EXCLUSIONS
            .iter()
            .any(|prefix| line.starts_with(prefix))
}

fn parse_log(data: &str) -> Option<LogRecord> {
    let mut parts = data.split(',').map(str::trim);
    let timestamp = parts.next()?;
    let uid = parts.next()?;
    let result = parts.next()?;
    Some(LogRecord {
        timestamp: timestamp.to_string(),
        uid: uid.to_string(),
        result: result.to_string(),
    })
}

/// Needs two fields; a field that is not an integer reads as zero.
fn parse_memory(data: &str) -> Option<MemoryUsage> {
    let mut parts = data.split(',').map(|field| field.trim().parse().unwrap_or(0));
    let used = parts.next()?;
    let total = parts.next()?;
    Some(MemoryUsage { used, total })
}
