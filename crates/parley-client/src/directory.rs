//! Account directory: credentials, profiles, contact links, and the push
//! propagation that keeps denormalised snapshots in sync.
//!
//! Contact entries and story owner fields are caches of another account's
//! profile.  They are never re-read from the source; instead every profile
//! mutation here calls the matching `propagate_*` function, which rewrites
//! every cached copy in one pass.  The shared partitions are rewritten whole,
//! so two instances racing on them are last-write-wins.

use parley_shared::constants::MIN_SECRET_LEN;
use parley_shared::types::AccountId;
use parley_store::{
    Account, AccountRepository, Contact, Credentials, Profile, Profiles, Story, StoryRepository,
};
use rand::Rng;
use tracing::{debug, info};

use crate::error::{Result, ServiceError};

/// Which sides of a contact link were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutcome {
    /// The owner gained a contact entry for the target.
    pub owner_added: bool,
    /// The target gained a contact entry for the owner.
    pub target_added: bool,
}

pub struct AccountDirectory<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R> AccountDirectory<'a, R>
where
    R: AccountRepository + StoryRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    pub fn create_account(&self, name: &str, secret: &str) -> Result<Account> {
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(ServiceError::validation(format!(
                "Password must be at least {MIN_SECRET_LEN} characters long."
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Please enter your name."));
        }

        let mut profiles = self.repo.load_profiles()?;
        if name_taken(&profiles, name, None) {
            return Err(ServiceError::validation(
                "This name is already taken. Please choose another one.",
            ));
        }

        let mut credentials = self.repo.load_credentials()?;
        let uid = fresh_identifier(&mut rand::thread_rng(), &credentials, &profiles);

        credentials.insert(uid.clone(), secret.to_string());
        self.repo.save_credentials(&credentials)?;

        let profile = Profile::new(name);
        let account = Account::from_profile(uid.clone(), &profile);
        profiles.insert(uid.clone(), profile);
        self.repo.save_profiles(&profiles)?;

        info!(account = %uid, "account created");
        Ok(account)
    }

    pub fn authenticate(&self, uid: &str, secret: &str) -> Result<Account> {
        let invalid = || ServiceError::Auth("Invalid UID or password.".to_string());

        let uid = AccountId::parse(uid).map_err(|_| invalid())?;
        let credentials = self.repo.load_credentials()?;
        match credentials.get(&uid) {
            Some(stored) if stored == secret => {}
            _ => return Err(invalid()),
        }

        let profiles = self.repo.load_profiles()?;
        let profile = profiles.get(&uid).ok_or_else(|| {
            ServiceError::Auth(
                "Could not find user data. Please try signing up again.".to_string(),
            )
        })?;

        debug!(account = %uid, "credentials accepted");
        Ok(Account::from_profile(uid, profile))
    }

    pub fn account(&self, uid: &AccountId) -> Result<Option<Account>> {
        let profiles = self.repo.load_profiles()?;
        Ok(profiles
            .get(uid)
            .map(|profile| Account::from_profile(uid.clone(), profile)))
    }

    pub fn rename_account(&self, uid: &AccountId, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ServiceError::validation("Name cannot be empty."));
        }

        let mut profiles = self.repo.load_profiles()?;
        if name_taken(&profiles, new_name, Some(uid)) {
            return Err(ServiceError::validation("This name is already taken."));
        }
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| ServiceError::validation("User with this UID does not exist."))?;
        profile.name = new_name.to_string();

        let contacts = propagate_name(&mut profiles, uid, new_name);
        self.repo.save_profiles(&profiles)?;

        let mut stories = self.repo.load_stories()?;
        let snapshots = propagate_story_name(&mut stories, uid, new_name);
        if snapshots > 0 {
            self.repo.save_stories(&stories)?;
        }

        info!(account = %uid, contacts, snapshots, "account renamed");
        Ok(())
    }

    pub fn set_avatar(&self, uid: &AccountId, avatar_url: &str) -> Result<()> {
        let avatar = Some(avatar_url.to_string()).filter(|a| !a.is_empty());

        let mut profiles = self.repo.load_profiles()?;
        match profiles.get_mut(uid) {
            Some(profile) => profile.avatar_url = avatar.clone(),
            None => tracing::warn!(account = %uid, "avatar set for account without profile"),
        }
        let contacts = propagate_avatar(&mut profiles, uid, avatar.as_deref());
        self.repo.save_profiles(&profiles)?;

        let mut stories = self.repo.load_stories()?;
        let snapshots = propagate_story_avatar(&mut stories, uid, avatar.as_deref());
        if snapshots > 0 {
            self.repo.save_stories(&stories)?;
        }

        info!(account = %uid, contacts, snapshots, "avatar updated");
        Ok(())
    }

    /// Link `owner` to `target`, and `target` back to `owner`.
    ///
    /// The owner's entry uses `proposed_name`; the target's entry uses the
    /// owner's real name.  A side that already holds the link is left alone.
    pub fn link_contact(
        &self,
        owner: &AccountId,
        target: &str,
        proposed_name: &str,
    ) -> Result<LinkOutcome> {
        let target = AccountId::parse(target)?;
        if &target == owner {
            return Err(ServiceError::validation("You cannot add yourself."));
        }

        let mut profiles = self.repo.load_profiles()?;
        let Some(target_profile) = profiles.get(&target) else {
            return Err(ServiceError::validation("User with this UID does not exist."));
        };
        let target_avatar = target_profile.avatar_url.clone();
        let target_knows_owner = target_profile.has_contact(owner);

        let owner_profile = profiles
            .get(owner)
            .ok_or_else(|| ServiceError::validation("Your account could not be found."))?;
        let owner_knows_target = owner_profile.has_contact(&target);
        let proposed_name = proposed_name.trim();
        if !owner_knows_target && proposed_name.is_empty() {
            return Err(ServiceError::validation(
                "Contact name cannot be empty for a new contact.",
            ));
        }
        let owner_snapshot = Contact {
            uid: owner.clone(),
            name: owner_profile.name.clone(),
            avatar_url: owner_profile.avatar_url.clone(),
        };

        let outcome = LinkOutcome {
            owner_added: !owner_knows_target,
            target_added: !target_knows_owner,
        };

        if outcome.owner_added {
            if let Some(profile) = profiles.get_mut(owner) {
                profile.contacts.push(Contact {
                    uid: target.clone(),
                    name: proposed_name.to_string(),
                    avatar_url: target_avatar,
                });
            }
        }
        if outcome.target_added {
            if let Some(profile) = profiles.get_mut(&target) {
                profile.contacts.push(owner_snapshot);
            }
        }

        if outcome.owner_added || outcome.target_added {
            self.repo.save_profiles(&profiles)?;
        }

        info!(
            account = %owner,
            contact = %target,
            owner_added = outcome.owner_added,
            target_added = outcome.target_added,
            "contact linked"
        );
        Ok(outcome)
    }
}

/// Draw identifiers until one is unused by both credentials and profiles.
fn fresh_identifier<G: Rng + ?Sized>(
    rng: &mut G,
    credentials: &Credentials,
    profiles: &Profiles,
) -> AccountId {
    loop {
        let candidate = AccountId::random(rng);
        if !credentials.contains_key(&candidate) && !profiles.contains_key(&candidate) {
            return candidate;
        }
    }
}

/// Case-insensitive name clash against every account other than `except`.
fn name_taken(profiles: &Profiles, name: &str, except: Option<&AccountId>) -> bool {
    let wanted = name.to_lowercase();
    profiles
        .iter()
        .any(|(uid, profile)| Some(uid) != except && profile.name.to_lowercase() == wanted)
}

/// Rewrite every other account's cached name for `subject`.  Returns the
/// number of contact entries touched.
pub fn propagate_name(profiles: &mut Profiles, subject: &AccountId, name: &str) -> usize {
    each_cached_contact(profiles, subject, |contact| contact.name = name.to_string())
}

/// Rewrite every other account's cached avatar for `subject`.
pub fn propagate_avatar(
    profiles: &mut Profiles,
    subject: &AccountId,
    avatar: Option<&str>,
) -> usize {
    each_cached_contact(profiles, subject, |contact| {
        contact.avatar_url = avatar.map(str::to_string)
    })
}

/// Rewrite the owner name on every story posted by `subject`.
pub fn propagate_story_name(stories: &mut [Story], subject: &AccountId, name: &str) -> usize {
    let mut touched = 0;
    for story in stories.iter_mut().filter(|s| &s.user_id == subject) {
        story.user_name = name.to_string();
        touched += 1;
    }
    touched
}

/// Rewrite the owner avatar on every story posted by `subject`.
pub fn propagate_story_avatar(
    stories: &mut [Story],
    subject: &AccountId,
    avatar: Option<&str>,
) -> usize {
    let mut touched = 0;
    for story in stories.iter_mut().filter(|s| &s.user_id == subject) {
        story.user_avatar_url = avatar.map(str::to_string);
        touched += 1;
    }
    touched
}

fn each_cached_contact(
    profiles: &mut Profiles,
    subject: &AccountId,
    mut apply: impl FnMut(&mut Contact),
) -> usize {
    let mut touched = 0;
    for (uid, profile) in profiles.iter_mut() {
        if uid == subject {
            continue;
        }
        for contact in profile.contacts.iter_mut().filter(|c| &c.uid == subject) {
            apply(contact);
            touched += 1;
        }
    }
    debug!(subject = %subject, touched, "propagated profile change");
    touched
}
