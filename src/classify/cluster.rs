//! Topical cluster labels built from TF-IDF + mean-shift output.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{DigestError, Result};
use crate::model::metadata::Metadata;

use super::{meanshift, tfidf};

/// A group of messages with similar content.
///
/// Holds the cluster id and a frequency counter of sender identities,
/// used to pick a representative title.
#[derive(Debug, Clone)]
pub struct Label {
    cluster: usize,
    /// Sender identity (display name if present, else address) → count.
    titles: HashMap<String, usize>,
}

impl Label {
    fn new(cluster: usize) -> Self {
        Self {
            cluster,
            titles: HashMap::new(),
        }
    }

    /// The integer cluster id this label was built from.
    pub fn cluster(&self) -> usize {
        self.cluster
    }

    /// Total message count contributing to the counter.
    pub fn size(&self) -> usize {
        self.titles.values().sum()
    }

    /// A label with at most two occurrences.
    pub fn small(&self) -> bool {
        self.size() <= 2
    }

    /// A label with more than three occurrences. Size 3 is neither small
    /// nor large; the gap is part of the heuristic's contract.
    pub fn large(&self) -> bool {
        self.size() > 3
    }

    /// The most frequent sender identity; ties break lexicographically
    /// so titles are deterministic.
    pub fn title(&self) -> &str {
        self.titles
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(name, _)| name.as_str())
            .unwrap_or("")
    }

    fn record(&mut self, sender_identity: &str) {
        *self.titles.entry(sender_identity.to_string()).or_insert(0) += 1;
    }
}

/// All cluster labels for a corpus, with per-message lookup.
#[derive(Debug, Default)]
pub struct ClusterSet {
    labels: Vec<Label>,
    by_message: HashMap<String, usize>,
}

impl ClusterSet {
    /// Cluster a message corpus by content similarity.
    ///
    /// An empty corpus is a defined no-op (no labels). A non-empty corpus
    /// whose documents contain no tokens at all leaves nothing to
    /// vectorize; that degenerate matrix is fatal for the stage.
    pub fn build(messages: &[Metadata], bandwidth: f64) -> Result<Self> {
        if messages.is_empty() {
            return Ok(Self::default());
        }

        let documents: Vec<String> = messages.iter().map(|m| m.token_text()).collect();
        let matrix = tfidf::vectorize(&documents);
        if matrix.terms == 0 {
            return Err(DigestError::Clustering(
                "no vocabulary: every document tokenized to nothing".to_string(),
            ));
        }

        let assignments = meanshift::mean_shift(&matrix.rows, bandwidth);
        debug!(
            messages = messages.len(),
            terms = matrix.terms,
            clusters = assignments.iter().max().map_or(0, |&m| m + 1),
            "Clustered corpus"
        );

        let mut set = Self::default();
        for (meta, &cluster) in messages.iter().zip(&assignments) {
            let index = match set.labels.iter().position(|l| l.cluster == cluster) {
                Some(i) => i,
                None => {
                    set.labels.push(Label::new(cluster));
                    set.labels.len() - 1
                }
            };
            let identity = meta.sender.identity();
            if identity.is_empty() {
                warn!(id = %meta.id, "Message has no sender identity for its label");
            }
            set.labels[index].record(identity);
            set.by_message.insert(meta.id.clone(), index);
        }

        Ok(set)
    }

    /// The label a message belongs to.
    pub fn get(&self, message_id: &str) -> Option<&Label> {
        let index = *self.by_message.get(message_id)?;
        self.labels.get(index)
    }

    /// All labels.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
