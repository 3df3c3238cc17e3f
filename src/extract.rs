//! Metadata extraction: builds a [`Metadata`] record from a parsed message.

use crate::error::{DigestError, Result};
use crate::model::address::EmailAddress;
use crate::model::metadata::Metadata;
use crate::normalize::Normalizer;
use crate::parser::eml::ParsedEml;

/// Number of characters of normalized body text kept as the preview.
const PREVIEW_CHARS: usize = 200;

/// Build the [`Metadata`] record for one message.
///
/// The HTML body is preferred over the plain-text one when both are
/// present, since stripped HTML usually carries the richer content.
/// A missing or unparseable date is a hard error: the message cannot
/// participate in metadata-dependent grouping without one.
pub fn extract(id: &str, parsed: &ParsedEml, normalizer: &Normalizer) -> Result<Metadata> {
    let date = match parsed.date {
        Some(d) => d,
        None if parsed.date_raw.is_empty() => {
            return Err(DigestError::MissingDate(id.to_string()));
        }
        None => {
            return Err(DigestError::InvalidDate {
                id: id.to_string(),
                value: parsed.date_raw.clone(),
            });
        }
    };

    let subject = parsed.subject.replace('\r', "");

    let normalized = match (&parsed.body_html, &parsed.body_text) {
        (Some(html), _) => normalizer.normalize(html, true),
        (None, Some(text)) => normalizer.normalize(text, false),
        (None, None) => normalizer.normalize("", false),
    };

    let preview: String = normalized.text.chars().take(PREVIEW_CHARS).collect();

    let mut sentences = normalized.sentences;
    push_sentence(&mut sentences, normalizer.tokenize(&subject));
    push_sentence(&mut sentences, sender_tokens(&parsed.sender, normalizer));
    for recipient in &parsed.recipients {
        push_sentence(&mut sentences, identity_tokens(recipient, normalizer));
    }

    // The thread identity chain: referenced ids plus the message's own id
    let mut references = parsed.references.clone();
    if !parsed.message_id.is_empty() {
        references.push(parsed.message_id.clone());
    }

    Ok(Metadata {
        id: id.to_string(),
        sender: parsed.sender.clone(),
        recipients: parsed.recipients.clone(),
        subject,
        date,
        references,
        preview,
        sentences,
    })
}

/// Sender identity tokens: name words, the raw address, and the domain
/// split into its dot-separated labels.
fn sender_tokens(sender: &EmailAddress, normalizer: &Normalizer) -> Vec<String> {
    let mut tokens = identity_tokens(sender, normalizer);
    let domain = sender.domain();
    for part in domain.split('.') {
        if !part.is_empty() {
            tokens.push(part.to_string());
        }
    }
    tokens
}

/// Identity tokens shared by senders and recipients: name words plus the
/// raw lowercased address as a single token.
fn identity_tokens(addr: &EmailAddress, normalizer: &Normalizer) -> Vec<String> {
    let mut tokens = normalizer.tokenize(&addr.display_name);
    if !addr.address.is_empty() {
        tokens.push(addr.normalized());
    }
    tokens
}

fn push_sentence(sentences: &mut Vec<Vec<String>>, tokens: Vec<String>) {
    if !tokens.is_empty() {
        sentences.push(tokens);
    }
}
