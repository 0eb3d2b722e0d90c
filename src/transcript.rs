//! Append-only, in-memory record of the conversation.

use serde::Serialize;
use tokio::time::Instant;

/// Who said it. Serialized with the collaborator's role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    #[serde(rename = "rep")]
    Representative,
    #[serde(rename = "doctor")]
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub at: Instant,
}

/// Entries in arrival order. Nothing is ever removed or rewritten.
#[derive(Debug, Default, Clone)]
pub struct TranscriptStore {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    ///
    /// After every second entry, returns the two most recent ones for mirroring.
    pub fn append(
        &mut self,
        role: Role,
        content: impl Into<String>,
        at: Instant,
    ) -> Option<Vec<TranscriptEntry>> {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
            at,
        });

        if self.entries.len() % 2 == 0 {
            let start = self.entries.len() - 2;
            Some(self.entries[start..].to_vec())
        } else {
            None
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent utterance by `role`.
    pub fn last_by(&self, role: Role) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.role == role)
            .map(|e| e.content.as_str())
    }

    pub fn into_entries(self) -> Vec<TranscriptEntry> {
        self.entries
    }
}
