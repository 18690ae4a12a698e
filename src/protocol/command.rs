//! Outbound command vocabulary.

use std::fmt;
use std::str::FromStr;

use super::uid::canonical_uid;
use crate::error::{BridgeError, Result};

/// A command understood by the reader firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    GetMemory,
    GetCards,
    GetLogs,
    ClearLogs,
    Ping,
    Echo,
    ResetEeprom,
    AddCard { uid: String },
    RemoveCard { uid: String },
    SaveAlias { uid: String, alias: String },
    /// Passed through untouched, for firmware commands not modelled here.
    Raw(String),
}

impl DeviceCommand {
    pub fn add_card(uid: &str) -> Result<Self> {
        Ok(Self::AddCard {
            uid: canonical_uid(uid)?,
        })
    }

    pub fn remove_card(uid: &str) -> Result<Self> {
        Ok(Self::RemoveCard {
            uid: canonical_uid(uid)?,
        })
    }

    /// The device stores `uid,alias` records, so the alias may not carry a
    /// comma or a line break.
    pub fn save_alias(uid: &str, alias: &str) -> Result<Self> {
        let alias = alias.trim();
        if alias.contains([',', '\n', '\r']) {
            return Err(BridgeError::invalid_command(format!(
                "alias '{alias}' may not contain commas or line breaks"
            )));
        }
        Ok(Self::SaveAlias {
            uid: canonical_uid(uid)?,
            alias: alias.to_string(),
        })
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::GetMemory => write!(f, "GET_MEMORY"),
            DeviceCommand::GetCards => write!(f, "GET_CARDS"),
            DeviceCommand::GetLogs => write!(f, "GET_LOGS"),
            DeviceCommand::ClearLogs => write!(f, "CLEAR_LOGS"),
            DeviceCommand::Ping => write!(f, "PING"),
            DeviceCommand::Echo => write!(f, "ECHO"),
            DeviceCommand::ResetEeprom => write!(f, "RESET_EEPROM"),
            DeviceCommand::AddCard { uid } => write!(f, "ADD_CARD:{uid}"),
            DeviceCommand::RemoveCard { uid } => write!(f, "REMOVE_CARD:{uid}"),
            DeviceCommand::SaveAlias { uid, alias } => write!(f, "SAVE_ALIAS:{uid}:{alias}"),
            DeviceCommand::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

/// Parses a command as typed by a user, e.g. `remove_card aa:bb:cc:dd` or
/// `SAVE_ALIAS:AA:BB:CC:DD:Back door`.
impl FromStr for DeviceCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BridgeError::invalid_command("empty command"));
        }
        let (keyword, separator, arg) = match s.find([':', ' ']) {
            Some(pos) => (&s[..pos], &s[pos..pos + 1], s[pos + 1..].trim()),
            None => (s, "", ""),
        };

        match keyword.to_ascii_uppercase().as_str() {
            "GET_MEMORY" => Ok(Self::GetMemory),
            "GET_CARDS" => Ok(Self::GetCards),
            "GET_LOGS" => Ok(Self::GetLogs),
            "CLEAR_LOGS" => Ok(Self::ClearLogs),
            "PING" => Ok(Self::Ping),
            "ECHO" => Ok(Self::Echo),
            "RESET_EEPROM" => Ok(Self::ResetEeprom),
            "ADD_CARD" => Self::add_card(arg),
            "REMOVE_CARD" => Self::remove_card(arg),
            "SAVE_ALIAS" => {
                // The UID itself contains colons, so the colon form splits on
                // the last one.
                let split = if separator == ":" {
                    arg.rsplit_once(':')
                } else {
                    arg.split_once(' ')
                };
                let (uid, alias) = split.ok_or_else(|| {
                    BridgeError::invalid_command("SAVE_ALIAS expects <uid>:<alias>")
                })?;
                Self::save_alias(uid, alias)
            }
            _ => Ok(Self::Raw(s.to_string())),
        }
    }
}
