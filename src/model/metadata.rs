//! Per-message metadata record.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;

/// Semantic metadata for a single archived message.
///
/// Computed once by the extractor, then cached for the process lifetime and
/// across runs via the store's persisted cache. All classifier stages read
/// from this record; none of them touch the raw message again.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    /// Stable message id: the `.eml` filename within the archive.
    pub id: String,

    /// Sender; display name and address may both be empty.
    pub sender: EmailAddress,

    /// All recipients (`To:` and `CC:`).
    pub recipients: Vec<EmailAddress>,

    /// Decoded subject with carriage-return artifacts removed.
    pub subject: String,

    /// Parsed date. A message without a parseable date is rejected
    /// by the extractor and never reaches this record.
    pub date: DateTime<Utc>,

    /// Reference-id chain from the `References` header, with the message's
    /// own `Message-ID` appended. Used as thread identity keys.
    pub references: Vec<String>,

    /// First ~200 characters of the normalized body text.
    pub preview: String,

    /// Normalized token sentences: body sentences first, then synthetic
    /// sentences for subject, sender identity, and recipient identities.
    pub sentences: Vec<Vec<String>>,
}

impl Metadata {
    /// Flatten all token sentences into one space-joined string, the
    /// document form consumed by the TF-IDF vectorizer.
    pub fn token_text(&self) -> String {
        let mut words: Vec<&str> = Vec::new();
        for sentence in &self.sentences {
            for word in sentence {
                words.push(word);
            }
        }
        words.join(" ")
    }

    /// Every participant address (sender + recipients), lowercased,
    /// sorted and deduplicated.
    pub fn participant_addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = Vec::new();
        if !self.sender.address.is_empty() {
            addrs.push(self.sender.normalized());
        }
        for r in &self.recipients {
            if !r.address.is_empty() {
                addrs.push(r.normalized());
            }
        }
        addrs.sort();
        addrs.dedup();
        addrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Metadata {
        Metadata {
            id: "msg1.eml".to_string(),
            sender: EmailAddress::parse("Alice <alice@x.com>"),
            recipients: vec![
                EmailAddress::parse("Bob <BOB@y.com>"),
                EmailAddress::parse("alice@x.com"),
            ],
            subject: "Project kickoff".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            references: vec!["msg1@x.com".to_string()],
            preview: String::new(),
            sentences: vec![
                vec!["project".to_string(), "kickoff".to_string()],
                vec!["alice".to_string()],
            ],
        }
    }

    #[test]
    fn test_token_text_flattens_sentences() {
        assert_eq!(sample().token_text(), "project kickoff alice");
    }

    #[test]
    fn test_participant_addresses_sorted_deduped() {
        let addrs = sample().participant_addresses();
        assert_eq!(addrs, vec!["alice@x.com", "bob@y.com"]);
    }
}
