//! Volatile UID to alias mapping learned from the device's card list.

use std::collections::HashMap;

/// Aliases reported by the device, keyed by UID exactly as the device sent it.
///
/// Only the read loop mutates the cache, so it carries no locking.
#[derive(Debug, Default, Clone)]
pub struct AliasCache {
    aliases: HashMap<String, String>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any alias already stored for `uid`.
    pub fn upsert(&mut self, uid: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(uid.into(), alias.into());
    }

    pub fn remove(&mut self, uid: &str) -> Option<String> {
        self.aliases.remove(uid)
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn lookup(&self, uid: &str) -> Option<&str> {
        self.aliases.get(uid).map(String::as_str)
    }

    /// The alias when one is known and non-empty, the UID otherwise.
    pub fn display_name<'a>(&'a self, uid: &'a str) -> &'a str {
        match self.lookup(uid) {
            Some(alias) if !alias.is_empty() => alias,
            _ => uid,
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_then_lookup() {
        let mut cache = AliasCache::new();
        cache.upsert("AA:BB", "x");
        assert_eq!(cache.lookup("AA:BB"), Some("x"));
        cache.upsert("AA:BB", "y");
        assert_eq!(cache.lookup("AA:BB"), Some("y"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_is_silent_when_absent() {
        let mut cache = AliasCache::new();
        cache.upsert("AA:BB", "x");
        assert_eq!(cache.remove("AA:BB").as_deref(), Some("x"));
        assert_eq!(cache.lookup("AA:BB"), None);
        assert_eq!(cache.remove("AA:BB"), None);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut cache = AliasCache::new();
        for i in 0..50 {
            cache.upsert(format!("{i:02X}:00:00:00"), format!("card {i}"));
        }
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("00:00:00:00"), None);
    }

    #[test]
    fn test_display_name_falls_back_to_uid() {
        let mut cache = AliasCache::new();
        assert_eq!(cache.display_name("AA:BB:CC:DD"), "AA:BB:CC:DD");
        cache.upsert("AA:BB:CC:DD", "");
        assert_eq!(cache.display_name("AA:BB:CC:DD"), "AA:BB:CC:DD");
        cache.upsert("AA:BB:CC:DD", "Door1");
        assert_eq!(cache.display_name("AA:BB:CC:DD"), "Door1");
    }
}
