//! The shared story feed and sequential playback.
//!
//! Stories expire 14 hours after posting.  Expiry is logical: stale entries
//! stay in the partition until the next load that rewrites the feed.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use parley_shared::constants::{MAX_ACTIVE_STORIES, STORY_DURATION_MS};
use parley_shared::types::AccountId;
use parley_store::{Story, StoryRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// One owner's active stories, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryGroup {
    pub owner: AccountId,
    pub stories: Vec<Story>,
}

impl StoryGroup {
    pub fn latest(&self) -> Option<&Story> {
        self.stories.first()
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct StoryFeed<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R: StoryRepository + ?Sized> StoryFeed<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Load the feed, dropping expired stories.  If any were dropped the
    /// partition is rewritten without them.
    pub fn load_active(&self) -> Result<Vec<Story>> {
        self.load_active_at(now_ms())
    }

    pub fn load_active_at(&self, now: i64) -> Result<Vec<Story>> {
        let mut stories = self.repo.load_stories()?;
        let before = stories.len();
        stories.retain(|s| s.is_active_at(now));
        if stories.len() != before {
            self.repo.save_stories(&stories)?;
            debug!(purged = before - stories.len(), "expired stories purged");
        }
        Ok(stories)
    }

    pub fn post(
        &self,
        owner: &AccountId,
        owner_name: &str,
        owner_avatar: Option<&str>,
        image_url: &str,
    ) -> Result<Story> {
        self.post_at(owner, owner_name, owner_avatar, image_url, now_ms())
    }

    pub fn post_at(
        &self,
        owner: &AccountId,
        owner_name: &str,
        owner_avatar: Option<&str>,
        image_url: &str,
        now: i64,
    ) -> Result<Story> {
        let mut stories = self.load_active_at(now)?;

        let active = stories.iter().filter(|s| &s.user_id == owner).count();
        if active >= MAX_ACTIVE_STORIES {
            return Err(ServiceError::Limit(format!(
                "You can only have up to {MAX_ACTIVE_STORIES} active stories."
            )));
        }

        let story = Story {
            id: Uuid::new_v4(),
            user_id: owner.clone(),
            user_name: owner_name.to_string(),
            user_avatar_url: owner_avatar.map(str::to_string),
            image_url: image_url.to_string(),
            timestamp: now,
        };
        stories.push(story.clone());
        self.repo.save_stories(&stories)?;

        info!(account = %owner, story = %story.id, active = active + 1, "story posted");
        Ok(story)
    }

    /// Every owner except `exclude`, each with stories newest first.  Groups
    /// are ordered by their newest story, newest first.
    pub fn list_active_grouped_by_owner(&self, exclude: &AccountId) -> Result<Vec<StoryGroup>> {
        self.list_active_grouped_by_owner_at(exclude, now_ms())
    }

    pub fn list_active_grouped_by_owner_at(
        &self,
        exclude: &AccountId,
        now: i64,
    ) -> Result<Vec<StoryGroup>> {
        Ok(group_by_owner(&self.load_active_at(now)?, exclude))
    }

    /// One owner's active stories, oldest first (playback order).
    pub fn list_active_for_owner(&self, owner: &AccountId) -> Result<Vec<Story>> {
        self.list_active_for_owner_at(owner, now_ms())
    }

    pub fn list_active_for_owner_at(&self, owner: &AccountId, now: i64) -> Result<Vec<Story>> {
        Ok(stories_for_owner(&self.load_active_at(now)?, owner))
    }
}

/// Group already-filtered stories by owner, skipping `exclude`.
pub fn group_by_owner(stories: &[Story], exclude: &AccountId) -> Vec<StoryGroup> {
    let mut by_owner: BTreeMap<&AccountId, Vec<Story>> = BTreeMap::new();
    for story in stories.iter().filter(|s| &s.user_id != exclude) {
        by_owner.entry(&story.user_id).or_default().push(story.clone());
    }

    let mut groups: Vec<StoryGroup> = by_owner
        .into_iter()
        .map(|(owner, mut stories)| {
            stories.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            StoryGroup {
                owner: owner.clone(),
                stories,
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        let newest = |g: &StoryGroup| g.latest().map(|s| s.timestamp).unwrap_or(i64::MIN);
        newest(b).cmp(&newest(a))
    });
    groups
}

/// One owner's stories from an already-filtered set, oldest first.
pub fn stories_for_owner(stories: &[Story], owner: &AccountId) -> Vec<Story> {
    let mut mine: Vec<Story> = stories
        .iter()
        .filter(|s| &s.user_id == owner)
        .cloned()
        .collect();
    mine.sort_by_key(|s| s.timestamp);
    mine
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Sequential viewer over one owner's stories.
///
/// Each story is shown for [`StoryPlayback::cadence`]; stepping past the last
/// one closes the viewer, and an empty set is closed from the start.
#[derive(Debug, Clone)]
pub struct StoryPlayback {
    stories: Vec<Story>,
    index: usize,
    closed: bool,
    shown_for: Duration,
}

impl StoryPlayback {
    pub fn new(stories: Vec<Story>) -> Self {
        let closed = stories.is_empty();
        Self {
            stories,
            index: 0,
            closed,
            shown_for: Duration::ZERO,
        }
    }

    pub fn cadence() -> Duration {
        Duration::from_millis(STORY_DURATION_MS)
    }

    pub fn current(&self) -> Option<&Story> {
        if self.closed {
            None
        } else {
            self.stories.get(self.index)
        }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Advance, closing after the last story.  Timer expiry and a tap on the
    /// right half both land here.
    pub fn next(&mut self) -> Option<&Story> {
        self.shown_for = Duration::ZERO;
        self.advance()
    }

    fn advance(&mut self) -> Option<&Story> {
        if !self.closed {
            if self.index + 1 < self.stories.len() {
                self.index += 1;
            } else {
                self.closed = true;
            }
        }
        self.current()
    }

    /// Step back; a no-op on the first story.
    pub fn previous(&mut self) -> Option<&Story> {
        self.shown_for = Duration::ZERO;
        if !self.closed && self.index > 0 {
            self.index -= 1;
        }
        self.current()
    }

    /// Account for `elapsed` viewing time, auto-advancing once per full
    /// cadence. Leftover time carries over to the next story.
    pub fn tick(&mut self, elapsed: Duration) -> Option<&Story> {
        if self.closed {
            return None;
        }
        self.shown_for += elapsed;
        while !self.closed && self.shown_for >= Self::cadence() {
            self.shown_for -= Self::cadence();
            self.advance();
        }
        self.current()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Show every remaining story for one cadence each, then close.
    pub async fn play<F>(&mut self, mut on_show: F)
    where
        F: FnMut(usize, &Story),
    {
        while let Some(story) = self.current() {
            on_show(self.index, story);
            tokio::time::sleep(Self::cadence()).await;
            self.next();
        }
    }
}
