//! Bundled stopword sets, selected by language name in the config.

use std::collections::HashSet;

use once_cell::sync::Lazy;

fn english() -> &'static HashSet<&'static str> {
    static SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
        [
            "a", "an", "the", "and", "or", "but", "if", "then", "of", "to", "in", "on", "at",
            "for", "with", "as", "by", "from", "into", "over", "under", "about", "after",
            "before", "between", "during", "without", "within", "than", "is", "are", "was",
            "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
            "would", "could", "should", "may", "might", "must", "shall", "can", "this", "that",
            "these", "those", "i", "you", "he", "she", "it", "we", "they", "me", "him", "her",
            "us", "them", "my", "your", "his", "its", "our", "their", "what", "which", "who",
            "whom", "whose", "where", "when", "why", "how", "all", "each", "every", "both",
            "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own",
            "same", "so", "too", "very", "just", "also", "now", "here", "there", "up", "down",
            "out", "off", "again", "once",
        ]
        .into_iter()
        .collect()
    });
    &SET
}

fn spanish() -> &'static HashSet<&'static str> {
    static SET: Lazy<HashSet<&'static str>> = Lazy::new(|| {
        [
            "el", "la", "los", "las", "un", "una", "unos", "unas", "y", "o", "u", "pero", "si",
            "de", "del", "al", "a", "en", "por", "para", "con", "sin", "sobre", "entre",
            "hasta", "desde", "es", "son", "era", "eran", "ser", "estar", "esta", "este",
            "estos", "estas", "ese", "esa", "esos", "esas", "lo", "le", "les", "se", "su",
            "sus", "mi", "mis", "tu", "tus", "yo", "usted", "nosotros", "ellos", "ellas",
            "que", "cual", "quien", "donde", "cuando", "como", "todo", "toda", "todos",
            "todas", "mas", "menos", "muy", "mucho", "poco", "no", "ni", "ya", "tambien",
            "aqui", "alli",
        ]
        .into_iter()
        .collect()
    });
    &SET
}

/// Look up the stopword set for a language name ("english", "spanish").
pub fn for_language(name: &str) -> Option<&'static HashSet<&'static str>> {
    match name.to_lowercase().as_str() {
        "english" | "en" => Some(english()),
        "spanish" | "es" => Some(spanish()),
        _ => None,
    }
}
