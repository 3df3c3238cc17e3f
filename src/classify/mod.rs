//! The two-stage classifier and its reconciliation step.
//!
//! Stages run strictly in sequence over the whole corpus: conversations
//! from identity keys, then content clusters, then per-message label
//! reconciliation on demand. Results live in explicit [`Assignments`]
//! records rather than being attached to the messages themselves.

pub mod cluster;
pub mod conversation;
pub mod meanshift;
pub mod reconcile;
pub mod tfidf;

use std::collections::HashSet;

use tracing::info;

use crate::config::ClassifyConfig;
use crate::error::Result;
use crate::model::metadata::Metadata;

use self::cluster::ClusterSet;
use self::conversation::ConversationSet;
use self::reconcile::DisplayLabel;

/// Completed per-message label assignments for one corpus.
#[derive(Debug)]
pub struct Assignments {
    conversations: ConversationSet,
    clusters: ClusterSet,
    promotional: HashSet<String>,
    debug_titles: bool,
}

/// Run both classifier stages over an extracted corpus.
///
/// Clustering needs the full corpus at once, so this is a batch
/// operation; an empty corpus yields empty assignments.
pub fn classify(messages: &[Metadata], options: &ClassifyConfig) -> Result<Assignments> {
    let conversations = ConversationSet::build(messages);
    let clusters = ClusterSet::build(messages, options.bandwidth)?;

    info!(
        messages = messages.len(),
        conversations = conversations.len(),
        clusters = clusters.len(),
        "Classified corpus"
    );

    Ok(Assignments {
        conversations,
        clusters,
        promotional: options
            .promotional_senders
            .iter()
            .map(|a| a.trim().to_lowercase())
            .collect(),
        debug_titles: options.debug_titles,
    })
}

impl Assignments {
    /// The reconciled display label for a message. `None` only for ids
    /// that were not part of the classified corpus.
    pub fn display_label(&self, message_id: &str) -> Option<DisplayLabel<'_>> {
        let conversation = self.conversations.get(message_id)?;
        let label = self.clusters.get(message_id)?;
        Some(reconcile::reconcile(conversation, label, &self.promotional))
    }

    /// The digest title for a message's chosen label.
    pub fn display_title(&self, message_id: &str) -> Option<String> {
        self.display_label(message_id)
            .map(|l| l.title(self.debug_titles))
    }

    /// Conversation assignments (stage one).
    pub fn conversations(&self) -> &ConversationSet {
        &self.conversations
    }

    /// Cluster assignments (stage two).
    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }
}
