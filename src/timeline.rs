use chrono::Utc;
use uuid::Uuid;

use crate::models::{Message, MessageStatus, Party};

/// One entry in the merged view. `pending` marks an optimistic local
/// message the server has not acknowledged yet.
#[derive(Debug, Clone, Copy)]
pub struct TimelineEntry<'a> {
    pub message: &'a Message,
    pub pending: bool,
}

/// Client-side merge of the three message inputs: fetched history
/// pages, optimistic local sends, and pushed `message:new` events.
///
/// Every transition is keyed by message id, so the merge is idempotent
/// and independent of arrival order: the synchronous acknowledgement
/// and the broker push carry the same canonical record, and whichever
/// lands second is dropped. Events authored by the viewer are ignored
/// outright since the optimistic path already delivers them.
#[derive(Debug)]
pub struct Timeline {
    conversation_id: Uuid,
    viewer: Party,
    canonical: Vec<Message>,
    pending: Vec<Message>,
}

impl Timeline {
    pub fn new(conversation_id: Uuid, viewer: Party) -> Self {
        Self {
            conversation_id,
            viewer,
            canonical: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Inserts a placeholder for a send that is still in flight and
    /// returns its temporary id, used to resolve or reject it later.
    pub fn push_local(&mut self, text: &str) -> Uuid {
        let temp_id = Uuid::new_v4();
        self.pending.push(Message {
            id: temp_id,
            conversation_id: self.conversation_id,
            sender: self.viewer,
            text: text.to_string(),
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        });
        temp_id
    }

    /// Replaces a placeholder with the server's canonical record.
    pub fn resolve_local(&mut self, temp_id: Uuid, canonical: Message) {
        self.pending.retain(|m| m.id != temp_id);
        self.insert_canonical(canonical);
    }

    /// Drops a placeholder whose send failed.
    pub fn reject_local(&mut self, temp_id: Uuid) {
        self.pending.retain(|m| m.id != temp_id);
    }

    /// Merges a pushed `message:new` event.
    pub fn apply_event(&mut self, message: Message) {
        if message.sender == self.viewer {
            return;
        }
        self.insert_canonical(message);
    }

    /// Merges a fetched history page.
    pub fn load_history(&mut self, messages: Vec<Message>) {
        for message in messages {
            self.insert_canonical(message);
        }
    }

    /// Canonical records in creation order, then pending placeholders.
    pub fn iter(&self) -> impl Iterator<Item = TimelineEntry<'_>> {
        self.canonical
            .iter()
            .map(|message| TimelineEntry {
                message,
                pending: false,
            })
            .chain(self.pending.iter().map(|message| TimelineEntry {
                message,
                pending: true,
            }))
    }

    pub fn len(&self) -> usize {
        self.canonical.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty() && self.pending.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.canonical.iter().any(|m| m.id == id) || self.pending.iter().any(|m| m.id == id)
    }

    // History arrives in store order but events can land out of order,
    // so inserts keep creation order with the id as a stable tie-break.
    fn insert_canonical(&mut self, message: Message) {
        if self.canonical.iter().any(|m| m.id == message.id) {
            return;
        }
        let at = self
            .canonical
            .iter()
            .position(|m| (m.created_at, m.id) > (message.created_at, message.id))
            .unwrap_or(self.canonical.len());
        self.canonical.insert(at, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn canonical(conversation_id: Uuid, sender: Party, text: &str, offset_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender,
            text: text.to_string(),
            status: MessageStatus::Sent,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn optimistic_send_survives_ack_and_echo_exactly_once() {
        let conversation_id = Uuid::new_v4();
        let mut timeline = Timeline::new(conversation_id, Party::User);

        let temp_id = timeline.push_local("Hello");
        assert_eq!(timeline.len(), 1);
        assert!(timeline.iter().next().unwrap().pending);

        let acked = canonical(conversation_id, Party::User, "Hello", 0);
        timeline.resolve_local(temp_id, acked.clone());
        assert_eq!(timeline.len(), 1);
        assert!(!timeline.contains(temp_id));

        // The broker echo of one's own send must not duplicate it.
        timeline.apply_event(acked);
        let hellos: Vec<_> = timeline
            .iter()
            .filter(|e| e.message.text == "Hello")
            .collect();
        assert_eq!(hellos.len(), 1);
        assert!(!hellos[0].pending);
    }

    #[test]
    fn duplicate_events_insert_once() {
        let conversation_id = Uuid::new_v4();
        let mut timeline = Timeline::new(conversation_id, Party::User);

        let incoming = canonical(conversation_id, Party::Admin, "check page 2", 0);
        timeline.apply_event(incoming.clone());
        timeline.apply_event(incoming);

        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn event_and_history_merge_regardless_of_arrival_order() {
        let conversation_id = Uuid::new_v4();
        let first = canonical(conversation_id, Party::User, "first", 0);
        let second = canonical(conversation_id, Party::Admin, "second", 5);

        let mut event_first = Timeline::new(conversation_id, Party::User);
        event_first.apply_event(second.clone());
        event_first.load_history(vec![first.clone(), second.clone()]);

        let mut history_first = Timeline::new(conversation_id, Party::User);
        history_first.load_history(vec![first.clone(), second.clone()]);
        history_first.apply_event(second.clone());

        for timeline in [&event_first, &history_first] {
            let texts: Vec<_> = timeline.iter().map(|e| e.message.text.clone()).collect();
            assert_eq!(texts, vec!["first", "second"]);
        }
    }

    #[test]
    fn rejected_send_disappears() {
        let mut timeline = Timeline::new(Uuid::new_v4(), Party::User);

        let temp_id = timeline.push_local("never made it");
        timeline.reject_local(temp_id);

        assert!(timeline.is_empty());
    }

    #[test]
    fn own_authored_events_are_ignored() {
        let conversation_id = Uuid::new_v4();
        let mut timeline = Timeline::new(conversation_id, Party::Admin);

        timeline.apply_event(canonical(conversation_id, Party::Admin, "mine", 0));
        assert!(timeline.is_empty());

        timeline.apply_event(canonical(conversation_id, Party::User, "theirs", 0));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn out_of_order_events_land_in_creation_order() {
        let conversation_id = Uuid::new_v4();
        let mut timeline = Timeline::new(conversation_id, Party::User);

        let late = canonical(conversation_id, Party::Admin, "late", 10);
        let early = canonical(conversation_id, Party::Admin, "early", 1);
        timeline.apply_event(late);
        timeline.apply_event(early);

        let texts: Vec<_> = timeline.iter().map(|e| e.message.text.clone()).collect();
        assert_eq!(texts, vec!["early", "late"]);
    }
}
