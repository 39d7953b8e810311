use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::domain::{Profile, ProfileUpdate, Uid};
use super::error::MatchError;
use super::ledger::{MutualInterestLedger, PurgeSummary};
use super::store::{bounded, ChatStore, LikeStore, ProfileStore};
use crate::config::MatchingConfig;

/// Reasons a profile write is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileViolation {
    #[error("at most {limit} subjects may be selected, got {actual}")]
    TooManySubjects { limit: usize, actual: usize },
    #[error("subject codes must not be blank")]
    BlankSubject,
    #[error("avatar image is {actual} bytes, limit is {limit}")]
    AvatarTooLarge { limit: usize, actual: usize },
}

/// Normalize an owner's edit into the stored schema, enforcing configured limits.
pub fn apply_update(
    uid: &Uid,
    update: ProfileUpdate,
    limits: &MatchingConfig,
) -> Result<Profile, ProfileViolation> {
    let mut subjects: Vec<String> = Vec::with_capacity(update.current_subjects.len());
    for subject in update.current_subjects {
        let subject = subject.trim().to_string();
        if subject.is_empty() {
            return Err(ProfileViolation::BlankSubject);
        }
        if !subjects.contains(&subject) {
            subjects.push(subject);
        }
    }
    if subjects.len() > limits.max_subjects {
        return Err(ProfileViolation::TooManySubjects {
            limit: limits.max_subjects,
            actual: subjects.len(),
        });
    }

    let avatar_image = update.avatar_image.filter(|image| !image.is_empty());
    if let Some(image) = &avatar_image {
        if image.len() > limits.avatar_max_bytes {
            return Err(ProfileViolation::AvatarTooLarge {
                limit: limits.avatar_max_bytes,
                actual: image.len(),
            });
        }
    }

    Ok(Profile {
        uid: uid.clone(),
        name: update.name.trim().to_string(),
        major: update.major.trim().to_string(),
        years_of_study: update.years_of_study,
        description: update.description.trim().to_string(),
        current_subjects: subjects,
        preferred_schedule: update.preferred_schedule,
        learning_style: update.learning_style,
        avatar_image,
    })
}

/// Outcome of deleting an account's matching data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountDeletion {
    pub profile_removed: bool,
    #[serde(flatten)]
    pub ledger: PurgeSummary,
}

/// Profile lifecycle: creation on first session, owner edits, and account deletion.
pub struct ProfileDirectory<P, L, C> {
    profiles: Arc<P>,
    ledger: Arc<MutualInterestLedger<L, C>>,
    limits: MatchingConfig,
}

impl<P, L, C> ProfileDirectory<P, L, C>
where
    P: ProfileStore,
    L: LikeStore,
    C: ChatStore,
{
    pub fn new(
        profiles: Arc<P>,
        ledger: Arc<MutualInterestLedger<L, C>>,
        limits: MatchingConfig,
    ) -> Self {
        Self {
            profiles,
            ledger,
            limits,
        }
    }

    fn timeout(&self) -> Duration {
        self.limits.store_timeout
    }

    pub async fn get_profile(&self, uid: &Uid) -> Result<Profile, MatchError> {
        bounded(self.timeout(), "profiles.get", self.profiles.get(uid))
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {uid}")))
    }

    /// Return the stored profile, creating a blank one on first use.
    pub async fn ensure_profile(&self, uid: &Uid) -> Result<Profile, MatchError> {
        if let Some(existing) =
            bounded(self.timeout(), "profiles.get", self.profiles.get(uid)).await?
        {
            return Ok(existing);
        }

        let profile = Profile::empty(uid.clone());
        bounded(self.timeout(), "profiles.put", self.profiles.put(profile.clone())).await?;
        info!(%uid, "created profile on first session");
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        uid: &Uid,
        update: ProfileUpdate,
    ) -> Result<Profile, MatchError> {
        let profile = apply_update(uid, update, &self.limits)?;
        bounded(self.timeout(), "profiles.put", self.profiles.put(profile.clone())).await?;
        info!(%uid, subjects = profile.current_subjects.len(), "profile updated");
        Ok(profile)
    }

    /// Remove the user's likes, threads, and profile. Safe to retry after a partial failure.
    pub async fn delete_account(&self, uid: &Uid) -> Result<AccountDeletion, MatchError> {
        let ledger = self.ledger.purge(uid).await?;

        let profile_removed = bounded(self.timeout(), "profiles.get", self.profiles.get(uid))
            .await?
            .is_some();
        bounded(self.timeout(), "profiles.delete", self.profiles.delete(uid)).await?;

        info!(%uid, profile_removed, "account deleted");
        Ok(AccountDeletion {
            profile_removed,
            ledger,
        })
    }
}
