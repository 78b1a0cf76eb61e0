//! Whole-word literal term matching

use regex::Regex;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A blacklist term compiled for whole-word matching.
///
/// The term is escaped before compilation, so characters such as `+`, `.` or
/// `(` are matched literally. A match only counts when the characters on both
/// sides are non-word characters or the edges of the text.
#[derive(Debug, Clone)]
pub struct WordFilter {
    term: String,
    pattern: Regex,
}

impl WordFilter {
    /// Compile `term` as-is. Callers normalise case beforehand.
    pub fn new(term: impl Into<String>) -> Result<Self, regex::Error> {
        let term = term.into();
        let pattern = Regex::new(&regex::escape(&term))?;
        Ok(Self { term, pattern })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Byte ranges of every whole-word occurrence, left to right, non-overlapping.
    pub fn find_whole_words(&self, content: &str) -> Vec<(usize, usize)> {
        let mut found = Vec::new();
        let mut pos = 0;
        while pos <= content.len() {
            let Some(m) = self.pattern.find_at(content, pos) else {
                break;
            };
            let before_ok = content[..m.start()]
                .chars()
                .next_back()
                .map_or(true, |c| !is_word_char(c));
            let after_ok = content[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| !is_word_char(c));

            if before_ok && after_ok && !m.as_str().is_empty() {
                found.push((m.start(), m.end()));
                pos = m.end();
            } else {
                // Retry from the next character: a longer word may hide a later hit.
                pos = m.start()
                    + content[m.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
            }
        }
        found
    }

    pub fn is_match(&self, content: &str) -> bool {
        !self.find_whole_words(content).is_empty()
    }

    /// Replace every whole-word occurrence with `replacement`.
    pub fn sanitize(&self, content: &str, replacement: &str) -> String {
        let ranges = self.find_whole_words(content);
        if ranges.is_empty() {
            return content.to_string();
        }

        let mut result = String::with_capacity(content.len());
        let mut last_end = 0;
        for (start, end) in ranges {
            result.push_str(&content[last_end..start]);
            result.push_str(replacement);
            last_end = end;
        }
        result.push_str(&content[last_end..]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_only() {
        let f = WordFilter::new("kill").unwrap();
        assert!(!f.is_match("i love killjoy"));
        assert!(!f.is_match("overkill"));
        assert!(f.is_match("i will kill the bug"));
        assert!(f.is_match("kill"));
        assert!(f.is_match("kill, then"));
    }

    #[test]
    fn test_finds_hit_after_partial_word() {
        let f = WordFilter::new("kill").unwrap();
        assert_eq!(f.find_whole_words("killkill kill"), vec![(9, 13)]);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let f = WordFilter::new("a.b").unwrap();
        assert!(!f.is_match("axb"));
        assert!(f.is_match("see a.b here"));

        let f = WordFilter::new("c++").unwrap();
        assert_eq!(f.sanitize("i write c++ daily", "#"), "i write # daily");
        assert!(!f.is_match("abc++"));
    }

    #[test]
    fn test_underscore_counts_as_word_character() {
        let f = WordFilter::new("spam").unwrap();
        assert!(!f.is_match("spam_filter"));
        assert!(f.is_match("spam-filter"));
    }

    #[test]
    fn test_sanitize_replaces_every_occurrence() {
        let f = WordFilter::new("scam").unwrap();
        assert_eq!(
            f.sanitize("scam or scam? scammer", "[X]"),
            "[X] or [X]? scammer"
        );
    }
}
