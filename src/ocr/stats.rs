//! Text statistics for recognized documents

use serde::Serialize;

/// Page separator used in engine sidecar files
pub const SIDECAR_PAGE_SEPARATOR: char = '\x0c';

/// Character, word and page counts of a recognized document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub pages: usize,
}

impl TextStats {
    /// Count over the pages joined with newlines
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let joined = pages
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            characters: joined.chars().count(),
            words: joined.split_whitespace().count(),
            pages: pages.len(),
        }
    }

    /// Count over a sidecar text file where pages are separated by form feeds
    pub fn from_sidecar(text: &str) -> Self {
        let trimmed = text.trim_end_matches(SIDECAR_PAGE_SEPARATOR);
        if trimmed.is_empty() {
            return Self::default();
        }
        let pages: Vec<&str> = trimmed.split(SIDECAR_PAGE_SEPARATOR).collect();
        Self::from_pages(pages.as_slice())
    }

    pub fn accumulate(&mut self, other: &TextStats) {
        self.characters += other.characters;
        self.words += other.words;
        self.pages += other.pages;
    }
}
