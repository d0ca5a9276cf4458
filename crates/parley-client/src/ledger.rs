//! Conversation ledgers: one partition per account holding every
//! conversation that account takes part in, keyed by counterpart.

use parley_shared::types::AccountId;
use parley_store::{Conversation, LedgerRepository, Message};
use tracing::debug;

use crate::error::Result;

/// Create an empty conversation with `counterpart` unless one exists.
/// Returns `true` when a conversation was created.
pub fn ensure_conversation(ledger: &mut Vec<Conversation>, counterpart: &AccountId) -> bool {
    if ledger.iter().any(|c| &c.counterpart == counterpart) {
        return false;
    }
    ledger.push(Conversation::new(counterpart.clone()));
    true
}

/// Append `message` to the conversation with `counterpart`, creating it if
/// needed, and refresh the preview and timestamp.
pub fn append_message(ledger: &mut Vec<Conversation>, counterpart: &AccountId, message: Message) {
    ensure_conversation(ledger, counterpart);
    if let Some(convo) = ledger.iter_mut().find(|c| &c.counterpart == counterpart) {
        convo.last_message = message.body.preview().to_string();
        convo.last_message_timestamp = message.timestamp.clone();
        convo.messages.push(message);
    }
}

/// Load-modify-save access to a single owner's ledger.
pub struct ConversationLedger<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R: LedgerRepository + ?Sized> ConversationLedger<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    pub fn load(&self, owner: &AccountId) -> Result<Vec<Conversation>> {
        Ok(self.repo.load_ledger(owner)?)
    }

    /// Returns the owner's ledger after the call.
    pub fn ensure_conversation(
        &self,
        owner: &AccountId,
        counterpart: &AccountId,
    ) -> Result<Vec<Conversation>> {
        let mut ledger = self.repo.load_ledger(owner)?;
        if ensure_conversation(&mut ledger, counterpart) {
            self.repo.save_ledger(owner, &ledger)?;
            debug!(account = %owner, counterpart = %counterpart, "conversation created");
        }
        Ok(ledger)
    }

    /// Returns the owner's ledger after the append.
    pub fn append_message(
        &self,
        owner: &AccountId,
        counterpart: &AccountId,
        message: Message,
    ) -> Result<Vec<Conversation>> {
        let mut ledger = self.repo.load_ledger(owner)?;
        append_message(&mut ledger, counterpart, message);
        self.repo.save_ledger(owner, &ledger)?;
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_shared::constants::EMPTY_CONVERSATION_PREVIEW;
    use parley_store::{Attachment, MemoryStore, MessageBody};

    fn uid(s: &str) -> AccountId {
        AccountId::parse(s).unwrap()
    }

    fn message(id: u64, sender: &AccountId, body: MessageBody) -> Message {
        Message {
            id,
            sender_uid: sender.clone(),
            timestamp: format!("10:{id:02}"),
            body,
        }
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut ledger = Vec::new();
        let bob = uid("22222222");
        assert!(ensure_conversation(&mut ledger, &bob));
        assert!(!ensure_conversation(&mut ledger, &bob));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].last_message, EMPTY_CONVERSATION_PREVIEW);
    }

    #[test]
    fn append_creates_and_updates_preview() {
        let mut ledger = Vec::new();
        let ann = uid("11111111");
        let bob = uid("22222222");

        append_message(&mut ledger, &bob, message(1, &ann, MessageBody::text("hello")));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].last_message, "hello");
        assert_eq!(ledger[0].last_message_timestamp, "10:01");

        let att = Attachment {
            file_url: "data:video/mp4;base64,AA==".into(),
            file_name: "clip.mp4".into(),
            file_size: "0.00 KB".into(),
        };
        append_message(&mut ledger, &bob, message(2, &bob, MessageBody::Video(att)));
        assert_eq!(ledger[0].last_message, "Video");
        assert_eq!(ledger[0].last_message_timestamp, "10:02");
        assert_eq!(
            ledger[0].messages.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn append_targets_the_right_conversation() {
        let mut ledger = Vec::new();
        let ann = uid("11111111");
        let bob = uid("22222222");
        let cat = uid("33333333");
        ensure_conversation(&mut ledger, &bob);
        ensure_conversation(&mut ledger, &cat);

        append_message(&mut ledger, &cat, message(1, &ann, MessageBody::text("hi cat")));
        assert!(ledger[0].messages.is_empty());
        assert_eq!(ledger[1].messages.len(), 1);
    }

    #[test]
    fn repository_backed_ledger_persists() {
        let store = MemoryStore::new();
        let ledgers = ConversationLedger::new(&store);
        let ann = uid("11111111");
        let bob = uid("22222222");

        ledgers.ensure_conversation(&ann, &bob).unwrap();
        ledgers
            .append_message(&ann, &bob, message(5, &ann, MessageBody::text("persisted")))
            .unwrap();

        let ledger = ledgers.load(&ann).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].messages[0].id, 5);
        assert!(ledgers.load(&bob).unwrap().is_empty());
    }
}
