//! Character-window text splitter with separator-aware break points.
//!
//! Documents are cut into chunks of at most `chunk_size` characters, with
//! `chunk_overlap` characters shared between consecutive chunks. Break
//! points are chosen by trying separators in priority order: paragraph
//! break, line break, sentence boundary, word boundary. A separator is only
//! honored when it falls in the second half of the window, otherwise the
//! next separator in the list is tried.

use regex::Regex;

/// Splits text into bounded, overlapping chunks.
#[derive(Debug)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    sentence_boundary: Regex,
}

impl TextSplitter {
    /// Creates a splitter. The overlap is clamped below half the chunk size
    /// so the window always advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(2);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size / 2),
            sentence_boundary: Regex::new(r"[.!?]\s").unwrap(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into chunks. Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let hard_end = (start + self.chunk_size).min(chars.len());
            let end = if hard_end == chars.len() {
                hard_end
            } else {
                start + self.break_point(&chars[start..hard_end])
            };

            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }

            if end == chars.len() {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }

    /// Picks where to cut a full window, as an offset into `window`.
    ///
    /// Falls through paragraph → line → sentence → word boundaries; when no
    /// separator lands in the second half of the window the cut is hard.
    fn break_point(&self, window: &[char]) -> usize {
        let len = window.len();
        let floor = len / 2;
        let text: String = window.iter().collect();

        for separator in ["\n\n", "\n"] {
            if let Some(pos) = rfind_chars(window, separator) {
                if pos > floor {
                    return pos + separator.chars().count();
                }
            }
            // Only consider a lower-priority separator when this one is absent
            // from the usable region, matching the recursive-splitter order.
        }

        if let Some(pos) = self
            .sentence_boundary
            .find_iter(&text)
            .map(|m| text[..m.end()].chars().count())
            .filter(|&pos| pos > floor && pos < len)
            .last()
        {
            return pos;
        }

        if let Some(pos) = rfind_chars(window, " ") {
            if pos > floor {
                return pos + 1;
            }
        }

        len
    }
}

/// Index (in chars) of the last occurrence of `needle` in `haystack`.
fn rfind_chars(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&idx| haystack[idx..idx + needle.len()] == needle[..])
}
