//! Message delivery between two accounts on one device.
//!
//! Nothing is transmitted: the sender's ledger is written, then the
//! recipient's ledger partition is loaded, appended to and rewritten.  The two
//! writes are independent.  If the second one fails the sender keeps the
//! message and the caller gets [`ServiceError::PartialDelivery`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, Utc};
use parley_shared::types::AccountId;
use parley_store::{Conversation, LedgerRepository, Message, MessageBody};
use tracing::{error, info};

use crate::error::{Result, ServiceError};
use crate::ledger::ConversationLedger;

/// Issues message ids that strictly increase, both per process and within
/// every conversation they are appended to.
///
/// Ids are microsecond timestamps, bumped past the previous id and past any
/// floor the caller supplies (the newest id already in either ledger).
#[derive(Debug, Default)]
pub struct MessageIds {
    last: AtomicU64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_after(&self, floor: u64) -> u64 {
        let clock = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = clock
                .max(prev.saturating_add(1))
                .max(floor.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Local wall-clock time as shown beside a message.
pub fn display_time() -> String {
    Local::now().format("%H:%M").to_string()
}

pub struct Delivery<'a, R: ?Sized> {
    repo: &'a R,
    ids: &'a MessageIds,
}

impl<'a, R: LedgerRepository + ?Sized> Delivery<'a, R> {
    pub fn new(repo: &'a R, ids: &'a MessageIds) -> Self {
        Self { repo, ids }
    }

    /// Build a message from `sender` to `recipient` with an id newer than
    /// anything either side already holds for the pair.
    pub fn compose(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        body: MessageBody,
    ) -> Result<Message> {
        let floor = newest_id(&self.repo.load_ledger(sender)?, recipient)
            .max(newest_id(&self.repo.load_ledger(recipient)?, sender));

        Ok(Message {
            id: self.ids.next_after(floor),
            sender_uid: sender.clone(),
            timestamp: display_time(),
            body,
        })
    }

    /// Append `message` to the sender's conversation with the recipient, then
    /// to the recipient's conversation with the sender.  Returns the sender's
    /// ledger after the first write.
    pub fn send(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        message: &Message,
    ) -> Result<Vec<Conversation>> {
        if sender == recipient {
            return Err(ServiceError::validation("You cannot message yourself."));
        }
        let ledgers = ConversationLedger::new(self.repo);

        let sender_ledger = ledgers.append_message(sender, recipient, message.clone())?;

        if let Err(e) = ledgers.append_message(recipient, sender, message.clone()) {
            error!(
                from = %sender,
                to = %recipient,
                message_id = message.id,
                error = %e,
                "recipient ledger not updated"
            );
            let source = match e {
                ServiceError::Storage(source) => source,
                other => return Err(other),
            };
            return Err(ServiceError::PartialDelivery {
                message_id: message.id,
                source,
            });
        }

        info!(
            from = %sender,
            to = %recipient,
            message_id = message.id,
            kind = ?message.body.kind(),
            "message delivered"
        );
        Ok(sender_ledger)
    }

    /// [`compose`](Self::compose) then [`send`](Self::send).
    pub fn deliver(
        &self,
        sender: &AccountId,
        recipient: &AccountId,
        body: MessageBody,
    ) -> Result<(Message, Vec<Conversation>)> {
        let message = self.compose(sender, recipient, body)?;
        let ledger = self.send(sender, recipient, &message)?;
        Ok((message, ledger))
    }
}

fn newest_id(ledger: &[Conversation], counterpart: &AccountId) -> u64 {
    ledger
        .iter()
        .find(|c| &c.counterpart == counterpart)
        .and_then(Conversation::last_message_id)
        .unwrap_or(0)
}
