//! Turns transcript text into queueable words.
//!
//! Recognizer output is split on whitespace. Purely alphabetic tokens (which
//! covers single letters and spelled-out digits like "niner") pass through
//! lowercased; anything else becomes the fallback word `#`.

use std::collections::VecDeque;

use morsecast_core::morse::FALLBACK_CHAR;

/// How many accepted words the transcript display keeps.
pub const RECENT_WORDS_LIMIT: usize = 20;

/// Map one recognizer token to the word that gets queued.
///
/// Returns `None` for blank input.
pub fn filter_word(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }
    let lower = token.to_lowercase();
    if lower.chars().all(char::is_alphabetic) {
        Some(lower)
    } else {
        Some(FALLBACK_CHAR.to_string())
    }
}

/// Filter every whitespace-separated token of a transcript line.
pub fn split_line(line: &str) -> Vec<String> {
    line.split_whitespace().filter_map(filter_word).collect()
}

/// Rolling transcript of the most recent words, oldest first.
#[derive(Debug, Clone)]
pub struct RecentWords {
    words: VecDeque<String>,
    limit: usize,
}

impl Default for RecentWords {
    fn default() -> Self {
        Self::new(RECENT_WORDS_LIMIT)
    }
}

impl RecentWords {
    pub fn new(limit: usize) -> Self {
        Self {
            words: VecDeque::with_capacity(limit),
            limit: limit.max(1),
        }
    }

    /// Record real words only; fallback markers are not part of the transcript.
    pub fn extend<'a>(&mut self, words: impl IntoIterator<Item = &'a String>) {
        for word in words {
            if word.chars().any(|c| c == FALLBACK_CHAR) {
                continue;
            }
            if self.words.len() == self.limit {
                self.words.pop_front();
            }
            self.words.push_back(word.clone());
        }
    }

    pub fn text(&self) -> String {
        self.words.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}
