//! Text normalization: HTML stripping, sentence splitting, and tokenization.
//!
//! The normalizer is a pure function over its input plus fixed
//! stopword/stemmer resources. Downstream consumers treat sentence
//! boundaries as token-group boundaries, so words are tokenized within
//! sentences rather than over the whole body at once.

pub mod stem;
pub mod stopwords;

use std::collections::HashSet;

use tracing::debug;

/// Result of normalizing one body of text.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedText {
    /// Cleaned single-paragraph prose (whitespace collapsed).
    pub text: String,
    /// Sentences of normalized word tokens: lowercased, alphabetic-only,
    /// stopword-filtered, stemmed.
    pub sentences: Vec<Vec<String>>,
}

/// Stateless-per-call normalizer configured with stopword languages.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stopwords: HashSet<&'static str>,
}

impl Normalizer {
    /// Build a normalizer for the given stopword languages.
    /// Unknown language names are skipped with a diagnostic.
    pub fn new(languages: &[String]) -> Self {
        let mut stopwords = HashSet::new();
        for lang in languages {
            match stopwords::for_language(lang) {
                Some(set) => stopwords.extend(set.iter().copied()),
                None => debug!(language = %lang, "No bundled stopword set, skipping"),
            }
        }
        Self { stopwords }
    }

    /// Normalize a message body. `is_html` selects tag stripping first.
    pub fn normalize(&self, raw: &str, is_html: bool) -> NormalizedText {
        let plain = if is_html {
            html_to_text(raw)
        } else {
            raw.to_string()
        };

        let text = collapse_whitespace(&plain);

        let sentences = split_sentences(&plain)
            .iter()
            .map(|s| self.tokenize(s))
            .filter(|tokens| !tokens.is_empty())
            .collect();

        NormalizedText { text, sentences }
    }

    /// Tokenize a standalone phrase (subject line, display name) into one
    /// normalized token group.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();

        for ch in text.chars() {
            if ch.is_alphabetic() {
                word.extend(ch.to_lowercase());
            } else if !word.is_empty() {
                self.push_token(&mut tokens, &word);
                word.clear();
            }
        }
        if !word.is_empty() {
            self.push_token(&mut tokens, &word);
        }

        tokens
    }

    fn push_token(&self, tokens: &mut Vec<String>, word: &str) {
        if word.len() < 2 || self.stopwords.contains(word) {
            return;
        }
        tokens.push(stem::stem_word(word));
    }
}

/// Split text into sentences on terminal punctuation and line breaks.
fn split_sentences(text: &str) -> Vec<String> {
    text.split(|c| c == '.' || c == '!' || c == '?' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Collapse all whitespace runs into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert HTML to plain text.
///
/// - Removes `<script>` and `<style>` blocks entirely
/// - Converts block elements (`<br>`, `<p>`, `<div>`, …) to line breaks
/// - Strips all remaining tags
/// - Decodes common HTML entities
/// - Collapses runs of blank lines
///
/// Tolerates malformed markup: an unclosed script/style block discards the
/// remainder rather than leaking raw code into the text.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();

    // Remove script and style blocks
    text = remove_tag_block(&text, "script");
    text = remove_tag_block(&text, "style");

    // Convert block elements to newlines
    for tag in &["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in &["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    // Strip all remaining HTML tags
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    // Decode HTML entities
    result = result.replace("&amp;", "&");
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");

    // Collapse multiple blank lines
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
///
/// Tag names are ASCII, so matching is ASCII-case-insensitive over the
/// raw bytes; every match starts at an ASCII `<` and therefore at a
/// char boundary regardless of surrounding multi-byte text.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = find_ascii_case_insensitive(remaining, &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = find_ascii_case_insensitive(after, &close) {
            remaining = &after[end + close.len()..];
        } else {
            // No closing tag — remove rest
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Normalizer {
        Normalizer::new(&["english".to_string()])
    }

    #[test]
    fn test_tokenize_lowercases_and_filters() {
        let n = english();
        let tokens = n.tokenize("The Quick Brown Fox!");
        // "the" is a stopword; the rest are stemmed lowercase words
        assert_eq!(tokens, vec!["quick", "brown", "fox"]);
    }

    #[test]
    fn test_tokenize_drops_non_alphabetic() {
        let n = english();
        let tokens = n.tokenize("call 555-1234 tomorrow");
        assert_eq!(tokens, vec!["call", "tomorrow"]);
    }

    #[test]
    fn test_normalize_plain_text_sentences() {
        let n = english();
        let result = n.normalize("Project kickoff planning. Budget review next week.", false);
        assert_eq!(result.sentences.len(), 2);
        assert!(result.sentences[0].contains(&"kickoff".to_string()));
        assert!(result.sentences[1].contains(&"budget".to_string()));
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        let n = english();
        let result = n.normalize("one\n\n  two\tthree", false);
        assert_eq!(result.text, "one two three");
    }

    #[test]
    fn test_normalize_html_strips_markup() {
        let n = english();
        let html = "<html><style>p{color:red}</style><body><p>Hello world</p>\
                    <script>alert(1)</script><p>Second paragraph</p></body></html>";
        let result = n.normalize(html, true);
        assert!(result.text.contains("Hello world"));
        assert!(!result.text.contains("alert"));
        assert!(!result.text.contains("color"));
    }

    #[test]
    fn test_html_to_text_entities() {
        let text = html_to_text("Tom &amp; Jerry &lt;3&gt;");
        assert_eq!(text, "Tom & Jerry <3>");
    }

    #[test]
    fn test_html_to_text_unclosed_script() {
        let text = html_to_text("Before<script>var x = 1;");
        assert_eq!(text, "Before");
    }

    #[test]
    fn test_html_to_text_mixed_case_tags() {
        let text = html_to_text("a<STYLE>p{}</Style>b<ScRiPt>x</sCrIpT>c");
        assert_eq!(text, "abc");
    }

    #[test]
    fn test_html_to_text_multibyte_around_blocks() {
        // "İ" (U+0130) lowercases to two chars, so a lowercase-copy
        // search would misalign byte offsets here
        let text = html_to_text("İstanbul <style>p{color:red}</style> body text");
        assert!(text.contains("İstanbul"));
        assert!(text.contains("body text"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_html_to_text_multibyte_prefix_does_not_panic() {
        let input = format!("{}<style>é</style>body", "İ".repeat(8));
        let text = html_to_text(&input);
        assert!(text.ends_with("body"));
        assert!(!text.contains('é'));
    }

    #[test]
    fn test_spanish_stopwords() {
        let n = Normalizer::new(&["english".to_string(), "spanish".to_string()]);
        let tokens = n.tokenize("la oferta para todos");
        assert_eq!(tokens, vec!["oferta"]);
    }

    #[test]
    fn test_unknown_language_skipped() {
        let n = Normalizer::new(&["klingon".to_string()]);
        // No stopwords loaded; everything alphabetic survives
        let tokens = n.tokenize("the budget");
        assert_eq!(tokens, vec!["the", "budget"]);
    }
}
