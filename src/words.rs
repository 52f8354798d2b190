//! Word catalog: the immutable pool secret words are drawn from.

use std::path::Path;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// A single catalog entry.
///
/// Serialized in the `wordlist.json` shape: `word_id`, `word_entry`,
/// `description`.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct WordEntry {
    /// Catalog identifier.
    #[serde(rename = "word_id")]
    id: u32,
    /// The word or phrase to guess. May contain spaces.
    #[serde(rename = "word_entry")]
    text: String,
    /// Hint shown to players.
    description: String,
}

/// Why a catalog could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WordBankErrorKind {
    /// The source could not be read.
    #[display("load failed")]
    Load,
    /// The source was read but is not a valid catalog.
    #[display("malformed catalog")]
    Malformed,
    /// The catalog holds no entries.
    #[display("empty catalog")]
    Empty,
}

/// Word bank error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Word bank error ({}): {} at {}:{}", kind, message, file, line)]
pub struct WordBankError {
    /// What went wrong.
    pub kind: WordBankErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl WordBankError {
    /// Creates a new word bank error with caller location tracking.
    #[track_caller]
    pub fn new(kind: WordBankErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Immutable set of candidate words.
///
/// Nothing mutates a bank after it is built, so one instance can be shared
/// behind an `Arc` by any number of sessions without locking.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    entries: Vec<WordEntry>,
}

impl WordBank {
    /// Builds a bank from entries already in memory.
    pub fn from_entries(entries: Vec<WordEntry>) -> Self {
        Self { entries }
    }

    /// Loads a JSON catalog from disk.
    ///
    /// # Errors
    ///
    /// Returns [`WordBankErrorKind::Load`] if the file cannot be read and
    /// [`WordBankErrorKind::Malformed`] if it does not parse as a list of
    /// entries. An empty but well-formed list loads successfully; drawing
    /// from it fails later with [`WordBankErrorKind::Empty`].
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WordBankError> {
        let path = path.as_ref();
        debug!("Loading word catalog");

        let content = std::fs::read_to_string(path).map_err(|e| {
            WordBankError::new(
                WordBankErrorKind::Load,
                format!("Failed to read {}: {}", path.display(), e),
            )
        })?;

        let bank = Self::from_json(&content)?;
        info!(count = bank.len(), "Word catalog loaded");
        Ok(bank)
    }

    /// Parses a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns [`WordBankErrorKind::Malformed`] on invalid JSON.
    pub fn from_json(json: &str) -> Result<Self, WordBankError> {
        let entries: Vec<WordEntry> = serde_json::from_str(json).map_err(|e| {
            WordBankError::new(
                WordBankErrorKind::Malformed,
                format!("Failed to parse catalog: {}", e),
            )
        })?;

        if let Some(blank) = entries.iter().find(|e| e.text.trim().is_empty()) {
            warn!(word_id = blank.id, "Catalog entry has blank text");
            return Err(WordBankError::new(
                WordBankErrorKind::Malformed,
                format!("Entry {} has no text", blank.id),
            ));
        }

        Ok(Self { entries })
    }

    /// Draws one entry uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`WordBankErrorKind::Empty`] if the bank holds no entries.
    #[instrument(skip(self, rng), fields(count = self.entries.len()))]
    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&WordEntry, WordBankError> {
        let entry = self.entries.choose(rng).ok_or_else(|| {
            WordBankError::new(WordBankErrorKind::Empty, "Cannot draw from an empty catalog")
        })?;
        debug!(word_id = entry.id, "Drew catalog entry");
        Ok(entry)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bank has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[WordEntry] {
        &self.entries
    }
}
