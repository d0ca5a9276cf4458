//! The active client instance.
//!
//! A [`SessionManager`] owns one handle on the partition store, remembers
//! which account is logged in, and keeps in-memory copies of that account's
//! ledger and of the active story feed for the presentation layer to render.
//! Every mutation goes through the directory / ledger / delivery / story
//! components and then refreshes those copies.

use std::path::Path;

use parley_shared::types::AccountId;
use parley_store::{
    Account, Conversation, LedgerRepository, Message, MessageBody, PartitionStore,
    SessionRepository, Story,
};
use tracing::{debug, info};

use crate::attachments;
use crate::delivery::{Delivery, MessageIds};
use crate::directory::{AccountDirectory, LinkOutcome};
use crate::error::{Result, ServiceError};
use crate::ledger::ConversationLedger;
use crate::reply::ReplyGenerator;
use crate::stories::{self, StoryFeed, StoryGroup, StoryPlayback};

pub struct SessionManager<S> {
    store: S,
    ids: MessageIds,
    current: Option<Account>,
    conversations: Vec<Conversation>,
    stories: Vec<Story>,
}

impl<S: PartitionStore> SessionManager<S> {
    /// A logged-out session.  Nothing is read until [`bootstrap`](Self::bootstrap)
    /// or a login.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: MessageIds::new(),
            current: None,
            conversations: Vec::new(),
            stories: Vec::new(),
        }
    }

    /// Start-up: restore the saved current account (and its ledger) if there
    /// is one, and load the story feed without expired stories.
    pub fn bootstrap(store: S) -> Result<Self> {
        let mut session = Self::new(store);

        if let Some(account) = session.store.load_session()? {
            info!(account = %account.uid, "restoring saved session");
            session.conversations = session.store.load_ledger(&account.uid)?;
            session.current = Some(account);
        }
        session.stories = StoryFeed::new(&session.store).load_active()?;

        Ok(session)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_account(&self) -> Option<&Account> {
        self.current.as_ref()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, counterpart: &AccountId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|c| &c.counterpart == counterpart)
    }

    /// Active stories as of the last load.
    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    // -- authentication ----------------------------------------------------

    pub fn sign_up(&mut self, name: &str, secret: &str) -> Result<Account> {
        let account = AccountDirectory::new(&self.store).create_account(name, secret)?;
        self.enter(account.clone())?;
        Ok(account)
    }

    pub fn log_in(&mut self, uid: &str, secret: &str) -> Result<Account> {
        let account = AccountDirectory::new(&self.store).authenticate(uid, secret)?;
        self.enter(account.clone())?;
        info!(account = %account.uid, "logged in");
        Ok(account)
    }

    pub fn log_out(&mut self) -> Result<()> {
        self.store.clear_session()?;
        if let Some(account) = self.current.take() {
            info!(account = %account.uid, "logged out");
        }
        self.conversations.clear();
        Ok(())
    }

    fn enter(&mut self, account: Account) -> Result<()> {
        self.store.save_session(&account)?;
        self.conversations = self.store.load_ledger(&account.uid)?;
        self.current = Some(account);
        Ok(())
    }

    // -- profile -----------------------------------------------------------

    pub fn update_name(&mut self, new_name: &str) -> Result<()> {
        let uid = self.require()?.uid.clone();
        AccountDirectory::new(&self.store).rename_account(&uid, new_name)?;
        self.refresh_account()?;
        self.refresh_stories()
    }

    pub fn update_avatar(&mut self, avatar_url: &str) -> Result<()> {
        let uid = self.require()?.uid.clone();
        AccountDirectory::new(&self.store).set_avatar(&uid, avatar_url)?;
        self.refresh_account()?;
        self.refresh_stories()
    }

    /// Link the current account with `target` and open a conversation with
    /// them.
    pub fn add_contact(&mut self, target: &str, proposed_name: &str) -> Result<LinkOutcome> {
        let uid = self.require()?.uid.clone();
        let outcome = AccountDirectory::new(&self.store).link_contact(&uid, target, proposed_name)?;

        let target = AccountId::parse(target)?;
        self.conversations =
            ConversationLedger::new(&self.store).ensure_conversation(&uid, &target)?;
        self.refresh_account()?;
        Ok(outcome)
    }

    // -- messaging ---------------------------------------------------------

    pub fn send_text(&mut self, to: &AccountId, text: &str) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ServiceError::validation("Message cannot be empty."));
        }
        self.send_body(to, MessageBody::text(text))
    }

    /// Read `path` fully, then deliver it as a file message.
    pub async fn send_file(&mut self, to: &AccountId, path: &Path) -> Result<Message> {
        self.require()?;
        let body = attachments::read_file_body(path).await?;
        self.send_body(to, body)
    }

    pub fn send_body(&mut self, to: &AccountId, body: MessageBody) -> Result<Message> {
        let uid = self.require()?.uid.clone();
        let (message, ledger) = Delivery::new(&self.store, &self.ids).deliver(&uid, to, body)?;
        self.conversations = ledger;
        Ok(message)
    }

    /// Send `text`, then ask `replies` for an answer and deliver it back as a
    /// message from `to`.
    pub async fn send_text_with_reply<G: ReplyGenerator>(
        &mut self,
        to: &AccountId,
        text: &str,
        replies: &G,
    ) -> Result<(Message, Option<Message>)> {
        let sent = self.send_text(to, text)?;
        let uid = self.require()?.uid.clone();

        let conversation = self
            .conversation(to)
            .cloned()
            .unwrap_or_else(|| Conversation::new(to.clone()));
        let Some(reply_text) = replies.reply(&conversation, text).await else {
            return Ok((sent, None));
        };

        let (reply, _) = Delivery::new(&self.store, &self.ids).deliver(
            to,
            &uid,
            MessageBody::text(reply_text),
        )?;
        self.conversations = self.store.load_ledger(&uid)?;
        Ok((sent, Some(reply)))
    }

    // -- stories -----------------------------------------------------------

    pub fn post_story(&mut self, image_url: &str) -> Result<Story> {
        let account = self.require()?.clone();
        let story = StoryFeed::new(&self.store).post(
            &account.uid,
            &account.name,
            account.avatar_url.as_deref(),
            image_url,
        )?;
        self.refresh_stories()?;
        Ok(story)
    }

    /// Other accounts' stories for the feed strip.
    pub fn story_groups(&self) -> Vec<StoryGroup> {
        match &self.current {
            Some(account) => stories::group_by_owner(&self.active_stories(), &account.uid),
            None => Vec::new(),
        }
    }

    /// A viewer over `owner`'s active stories, oldest first.
    pub fn view_stories(&self, owner: &AccountId) -> StoryPlayback {
        StoryPlayback::new(stories::stories_for_owner(&self.active_stories(), owner))
    }

    fn active_stories(&self) -> Vec<Story> {
        let now = stories::now_ms();
        self.stories
            .iter()
            .filter(|s| s.is_active_at(now))
            .cloned()
            .collect()
    }

    // -- refresh -----------------------------------------------------------

    /// Re-read everything other instances may have written: profile (new
    /// contacts, renamed contacts), ledger (delivered messages) and stories.
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(uid) = self.current.as_ref().map(|a| a.uid.clone()) {
            self.refresh_account()?;
            self.conversations = self.store.load_ledger(&uid)?;
        }
        self.refresh_stories()
    }

    fn refresh_account(&mut self) -> Result<()> {
        let uid = self.require()?.uid.clone();
        if let Some(account) = AccountDirectory::new(&self.store).account(&uid)? {
            self.store.save_session(&account)?;
            self.current = Some(account);
            debug!(account = %uid, "session snapshot refreshed");
        }
        Ok(())
    }

    fn refresh_stories(&mut self) -> Result<()> {
        self.stories = StoryFeed::new(&self.store).load_active()?;
        Ok(())
    }

    fn require(&self) -> Result<&Account> {
        self.current.as_ref().ok_or(ServiceError::NotLoggedIn)
    }
}
