//! Turns classified lines into UI events and alias-cache updates.

use log::{debug, info, warn};

use super::cache::AliasCache;
use super::message::{LogRecord, Message};
use crate::events::{CardEntry, Event, LogEvent, Outcome};

/// What the read loop should do with one dispatched line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dispatch {
    pub event: Option<Event>,
    /// Ask the device for fresh memory telemetry after the settle delay.
    pub refresh_memory: bool,
}

impl Dispatch {
    fn emit(event: Event) -> Self {
        Self {
            event: Some(event),
            refresh_memory: false,
        }
    }

    fn emit_and_refresh(event: Event) -> Self {
        Self {
            event: Some(event),
            refresh_memory: true,
        }
    }

    fn none() -> Self {
        Self::default()
    }
}

/// Owns the alias cache and applies the device's line protocol to it.
#[derive(Debug, Default)]
pub struct Dispatcher {
    aliases: AliasCache,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aliases(&self) -> &AliasCache {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasCache {
        &mut self.aliases
    }

    /// Handles one complete line.
    pub fn dispatch(&mut self, line: &str) -> Dispatch {
        let Some(message) = Message::classify(line) else {
            debug!("ignoring line: {line}");
            return Dispatch::none();
        };

        match message {
            Message::NewLog(record) => {
                let log = self.resolve(record);
                info!("new log entry: {} ({}) {}", log.display_name, log.uid, log.result);
                Dispatch::emit_and_refresh(Event::NewLogEntry(log))
            }
            Message::LogLine(record) => Dispatch::emit(Event::LogEntry(self.resolve(record))),
            Message::LogsHeader => {
                debug!("log listing follows");
                Dispatch::none()
            }
            Message::CardsHeader => {
                debug!("card listing follows");
                Dispatch::none()
            }
            Message::LogsCleared => {
                info!("logs cleared");
                Dispatch::emit_and_refresh(Event::LogsCleared)
            }
            Message::CardRemoved => {
                info!("card removed");
                Dispatch::emit_and_refresh(Event::CardRemoved(Outcome::ok()))
            }
            Message::CardRemovedWithUid(uid) => {
                info!("card {uid} removed");
                self.aliases.remove(&uid);
                Dispatch::emit_and_refresh(Event::CardRemoved(Outcome::ok_with_uid(uid)))
            }
            Message::CardNotFound => {
                Dispatch::emit(Event::CardRemoved(Outcome::failed("Card not found")))
            }
            Message::InvalidUid => {
                Dispatch::emit(Event::CardRemoved(Outcome::failed("Invalid UID format")))
            }
            Message::CardAdded => {
                info!("card added");
                Dispatch::emit_and_refresh(Event::CardAdded(Outcome::ok()))
            }
            Message::MemoryUsage(usage) => {
                debug!("memory usage: {}/{} bytes", usage.used, usage.total);
                Dispatch::emit(Event::MemoryUsage(usage))
            }
            Message::AliasSaved => {
                info!("alias saved");
                Dispatch::emit_and_refresh(Event::AliasSaved(Outcome::ok()))
            }
            Message::CardListFull => {
                warn!("device card list is full");
                Dispatch::emit(Event::CardAdded(Outcome::failed("Card list is full")))
            }
            Message::Pong => {
                debug!("PONG");
                Dispatch::none()
            }
            Message::ResettingEeprom => {
                info!("EEPROM reset in progress");
                Dispatch::none()
            }
            Message::EepromResetComplete => {
                info!("EEPROM reset complete, dropping {} aliases", self.aliases.len());
                self.aliases.clear();
                Dispatch::emit_and_refresh(Event::EepromReset(Outcome::ok()))
            }
            Message::EchoResponse => {
                debug!("ECHO_RESPONSE");
                Dispatch::none()
            }
            Message::CardEntry { uid, alias } => {
                debug!("card {uid} alias '{alias}'");
                self.aliases.upsert(uid.clone(), alias.clone());
                Dispatch::emit(Event::CardEntry(CardEntry { uid, alias }))
            }
            Message::Malformed { kind } => {
                warn!("malformed {kind} line: {line}");
                Dispatch::none()
            }
        }
    }

    fn resolve(&self, record: LogRecord) -> LogEvent {
        let display_name = self.aliases.display_name(&record.uid).to_string();
        LogEvent {
            timestamp: record.timestamp,
            uid: record.uid,
            display_name,
            result: record.result,
        }
    }
}
