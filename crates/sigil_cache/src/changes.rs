//! File-level change detection between two fingerprint snapshots.

use std::collections::HashMap;

use sigil_common::Fingerprint;

use crate::manifest::FileEntry;

/// How the files of a library changed since the recorded snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files absent from the snapshot.
    pub added: Vec<String>,
    /// Files whose fingerprint changed.
    pub modified: Vec<String>,
    /// Files in the snapshot but no longer in the archive.
    pub removed: Vec<String>,
    /// Files whose fingerprint matches.
    pub unchanged: Vec<String>,
}

impl ChangeSet {
    /// Compares current file fingerprints against recorded ones.
    /// Each list keeps the order of the side it was taken from.
    pub fn between(recorded: &[FileEntry], current: &[(String, Fingerprint)]) -> Self {
        let previous: HashMap<&str, Fingerprint> = recorded
            .iter()
            .map(|e| (e.name.as_str(), e.fingerprint))
            .collect();

        let mut changes = ChangeSet::default();
        for (name, fingerprint) in current {
            match previous.get(name.as_str()) {
                Some(old) if old == fingerprint => changes.unchanged.push(name.clone()),
                Some(_) => changes.modified.push(name.clone()),
                None => changes.added.push(name.clone()),
            }
        }
        changes.removed = recorded
            .iter()
            .filter(|e| !current.iter().any(|(name, _)| *name == e.name))
            .map(|e| e.name.clone())
            .collect();
        changes
    }

    /// Treats every current file as added.
    pub fn all_added(current: &[(String, Fingerprint)]) -> Self {
        Self {
            added: current.iter().map(|(name, _)| name.clone()).collect(),
            ..Default::default()
        }
    }

    /// Returns `true` if nothing was added, modified or removed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Files that must be rebuilt: added then modified.
    pub fn dirty_files(&self) -> Vec<String> {
        self.added.iter().chain(&self.modified).cloned().collect()
    }
}
