//! Token-id to string vocabulary.
//!
//! Loaded once from a JSON object whose keys are decimal integer strings and
//! whose values are token strings. Token id 1024 (blank / SOS) must be
//! present but is never rendered. SentencePiece word-start markers (U+2581)
//! become spaces during detokenization.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::constants::BLANK_ID;
use crate::error::{Error, Result};

const WORD_START: char = '\u{2581}';

#[derive(Debug)]
pub struct Vocabulary {
    tokens: Vec<String>,
    terminal_ids: Vec<u32>,
}

impl Vocabulary {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ModelLoadFailed(format!(
                "failed to read vocabulary {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| Error::ModelLoadFailed(format!("failed to parse vocabulary JSON: {e}")))?;

        let mut entries = Vec::with_capacity(raw.len());
        let mut max_id = 0u32;
        let mut has_blank = false;
        for (key, token) in raw {
            let id: u32 = key.parse().map_err(|_| {
                Error::ModelLoadFailed(format!("vocabulary key `{key}` is not an integer"))
            })?;
            max_id = max_id.max(id);
            has_blank |= id == BLANK_ID;
            entries.push((id, token));
        }

        if !has_blank {
            return Err(Error::ModelLoadFailed(format!(
                "vocabulary is missing the blank/SOS token id {BLANK_ID}"
            )));
        }

        let mut tokens = vec![String::new(); max_id as usize + 1];
        for (id, token) in entries {
            tokens[id as usize] = token;
        }

        let terminal_ids = tokens
            .iter()
            .enumerate()
            .filter(|(id, text)| {
                *id != BLANK_ID as usize
                    && matches!(text.trim_matches(WORD_START), "." | "?" | "!")
            })
            .map(|(id, _)| id as u32)
            .collect();

        Ok(Self {
            tokens,
            terminal_ids,
        })
    }

    /// Token string for `id`, or the empty string for unknown ids.
    pub fn lookup(&self, id: u32) -> &str {
        self.tokens
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Display form of a single token (word-start marker as a space).
    pub fn token_text(&self, id: u32) -> String {
        self.lookup(id).replace(WORD_START, " ")
    }

    /// Concatenate the tokens for `ids`, map word-start markers to spaces,
    /// and trim surrounding whitespace. Blank ids contribute nothing.
    pub fn detokenize(&self, ids: &[u32]) -> String {
        let mut text = String::new();
        for &id in ids {
            if id == BLANK_ID {
                continue;
            }
            text.push_str(self.lookup(id));
        }
        text.replace(WORD_START, " ").trim().to_string()
    }

    /// Whether `id` is sentence-terminal punctuation (".", "?", "!"), the
    /// set given special treatment by chunk-overlap deduplication.
    pub fn is_terminal_punctuation(&self, id: u32) -> bool {
        self.terminal_ids.contains(&id)
    }

    pub fn size(&self) -> usize {
        self.tokens.len()
    }
}
