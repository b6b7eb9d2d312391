//! Read-only lookup from player id to display name.

use std::collections::HashMap;

/// External directory of players. The scorekeeper never writes to it.
pub trait PlayerDirectory: Send + Sync {
    /// Display name of `id`, if the directory knows it.
    fn display_name(&self, id: &str) -> Option<String>;

    /// Display name of `id`, falling back to the id itself.
    fn resolve(&self, id: &str) -> String {
        self.display_name(id).unwrap_or_else(|| id.to_string())
    }
}

/// Directory seeded once from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPlayerDirectory {
    names: HashMap<String, String>,
}

impl StaticPlayerDirectory {
    /// Build the directory from `(id, name)` pairs. Later duplicates win.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            names: entries.into_iter().collect(),
        }
    }

    /// Number of known players.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no player is known.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl PlayerDirectory for StaticPlayerDirectory {
    fn display_name(&self, id: &str) -> Option<String> {
        self.names.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_resolve_to_themselves() {
        let directory = StaticPlayerDirectory::new([("p1".to_string(), "Ana".to_string())]);
        assert_eq!(directory.resolve("p1"), "Ana");
        assert_eq!(directory.resolve("p9"), "p9");
        assert_eq!(directory.len(), 1);
    }
}
