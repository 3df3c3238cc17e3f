//! Conversation reconstruction from identity keys.
//!
//! Two messages land in the same conversation iff they are connected by a
//! chain of shared participant sets or shared reference ids (transitive
//! closure). Merging uses the map-of-keys survivor approach: every key of
//! every merged conversation is re-pointed at the survivor, which keeps
//! the result independent of processing order.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::model::metadata::Metadata;

/// A merged group of messages connected by shared participants or
/// reply-chain references.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// Participant address (lowercased) → display name. Senders only;
    /// recipients contribute to identity keys but not to this map.
    participants: HashMap<String, String>,
    /// Ids of the messages in this conversation.
    messages: HashSet<String>,
}

impl Conversation {
    /// Number of messages in the conversation.
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    /// More than one distinct participant address.
    pub fn active(&self) -> bool {
        self.participants.len() > 1
    }

    /// Participant address → display name map.
    pub fn participants(&self) -> &HashMap<String, String> {
        &self.participants
    }

    /// Ids of the messages in this conversation.
    pub fn messages(&self) -> &HashSet<String> {
        &self.messages
    }

    /// Whether any participant address appears in `addresses`.
    pub fn intersects(&self, addresses: &HashSet<String>) -> bool {
        self.participants.keys().any(|a| addresses.contains(a))
    }

    /// The representative participant: the lexicographically smallest
    /// address, which makes titles deterministic.
    pub fn representative(&self) -> Option<(&str, &str)> {
        self.participants
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(addr, name)| (addr.as_str(), name.as_str()))
    }

    /// Union another conversation into this one.
    fn absorb(&mut self, other: Conversation) {
        for (addr, name) in other.participants {
            let entry = self.participants.entry(addr).or_default();
            if entry.is_empty() && !name.is_empty() {
                *entry = name;
            }
        }
        self.messages.extend(other.messages);
    }
}

/// A key under which a conversation can be discovered by later messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    /// Sorted, lowercased sender+recipient addresses, joined.
    Participants(String),
    /// One reference id from the message's reference chain.
    Reference(String),
}

/// All conversations built from a message corpus, with per-message lookup.
#[derive(Debug, Default)]
pub struct ConversationSet {
    /// Slot storage; merged-away conversations leave `None` holes.
    slots: Vec<Option<Slot>>,
    index: HashMap<IdentityKey, usize>,
    by_message: HashMap<String, usize>,
}

#[derive(Debug)]
struct Slot {
    conversation: Conversation,
    /// Keys currently pointing at this slot, so merges can re-point them.
    keys: Vec<IdentityKey>,
}

impl ConversationSet {
    /// Build conversations from a message corpus. Input order is
    /// irrelevant to the resulting partition.
    pub fn build(messages: &[Metadata]) -> Self {
        let mut set = Self::default();
        for meta in messages {
            set.insert(meta);
        }
        set
    }

    /// The conversation a message belongs to.
    pub fn get(&self, message_id: &str) -> Option<&Conversation> {
        let slot = *self.by_message.get(message_id)?;
        self.slots[slot].as_ref().map(|s| &s.conversation)
    }

    /// Iterate over all live conversations.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.slots
            .iter()
            .filter_map(|s| s.as_ref().map(|s| &s.conversation))
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, meta: &Metadata) {
        let keys = identity_keys(meta);

        // Every distinct conversation already reachable through any key
        let mut found: BTreeSet<usize> = BTreeSet::new();
        for key in &keys {
            if let Some(&slot) = self.index.get(key) {
                found.insert(slot);
            }
        }

        // Survivor: the lowest-numbered slot, or a fresh one
        let survivor = match found.iter().next() {
            Some(&first) => first,
            None => {
                self.slots.push(Some(Slot {
                    conversation: Conversation::default(),
                    keys: Vec::new(),
                }));
                self.slots.len() - 1
            }
        };

        // Merge the rest into the survivor, re-pointing their keys and messages
        for &loser in found.iter().skip(1) {
            let taken = self.slots[loser].take().expect("found slots are live");
            debug!(
                survivor = survivor,
                merged = loser,
                messages = taken.conversation.messages.len(),
                "Merging conversations"
            );
            for id in &taken.conversation.messages {
                self.by_message.insert(id.clone(), survivor);
            }
            for key in &taken.keys {
                self.index.insert(key.clone(), survivor);
            }
            let slot = self.slots[survivor].as_mut().expect("survivor is live");
            slot.keys.extend(taken.keys);
            slot.conversation.absorb(taken.conversation);
        }

        // Register this message's keys on the survivor
        let slot = self.slots[survivor].as_mut().expect("survivor is live");
        for key in keys {
            if self.index.insert(key.clone(), survivor) != Some(survivor) {
                slot.keys.push(key);
            }
        }

        // Add the message itself and its sender identity
        slot.conversation.messages.insert(meta.id.clone());
        if !meta.sender.address.is_empty() {
            let entry = slot
                .conversation
                .participants
                .entry(meta.sender.normalized())
                .or_default();
            if entry.is_empty() && !meta.sender.display_name.is_empty() {
                *entry = meta.sender.display_name.clone();
            }
        }
        self.by_message.insert(meta.id.clone(), survivor);
    }
}

/// Identity keys for one message: the composite participant-set key plus
/// one key per reference id.
fn identity_keys(meta: &Metadata) -> Vec<IdentityKey> {
    let mut keys = Vec::new();

    let addrs = meta.participant_addresses();
    if !addrs.is_empty() {
        keys.push(IdentityKey::Participants(addrs.join(",")));
    }

    for reference in &meta.references {
        keys.push(IdentityKey::Reference(reference.clone()));
    }

    keys
}
