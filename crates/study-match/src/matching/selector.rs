use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::domain::{Profile, Uid};
use super::error::MatchError;
use super::ledger::MutualInterestLedger;
use super::store::{bounded, ChatStore, LikeStore, ProfileStore};

/// Picks a random slice of peers the viewer has not yet acted on.
pub struct CandidateSelector<P, L, C> {
    profiles: Arc<P>,
    ledger: Arc<MutualInterestLedger<L, C>>,
    timeout: Duration,
}

impl<P, L, C> CandidateSelector<P, L, C>
where
    P: ProfileStore,
    L: LikeStore,
    C: ChatStore,
{
    pub fn new(
        profiles: Arc<P>,
        ledger: Arc<MutualInterestLedger<L, C>>,
        timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            ledger,
            timeout,
        }
    }

    /// Up to `desired_count` shuffled candidates, never the viewer and never anyone linked
    /// to the viewer by a like in either direction.
    pub async fn select_candidates(
        &self,
        viewer: &Uid,
        desired_count: usize,
    ) -> Result<Vec<Profile>, MatchError> {
        ensure_positive(desired_count)?;
        let pool = self.eligible_pool(viewer).await?;
        Ok(draw(pool, desired_count, &mut rand::thread_rng()))
    }

    /// Same as [`Self::select_candidates`] with a caller-supplied RNG.
    pub async fn select_candidates_with<R>(
        &self,
        viewer: &Uid,
        desired_count: usize,
        rng: &mut R,
    ) -> Result<Vec<Profile>, MatchError>
    where
        R: Rng + Send + ?Sized,
    {
        ensure_positive(desired_count)?;
        let pool = self.eligible_pool(viewer).await?;
        Ok(draw(pool, desired_count, rng))
    }

    async fn eligible_pool(&self, viewer: &Uid) -> Result<Vec<Profile>, MatchError> {
        let fetched = bounded(
            self.timeout,
            "profiles.query_uid_not_equal",
            self.profiles.query_uid_not_equal(viewer),
        )
        .await?;
        let fetched_count = fetched.len();

        let mut pool = Vec::with_capacity(fetched_count);
        for profile in fetched {
            if &profile.uid == viewer {
                continue;
            }
            if self.ledger.is_linked(viewer, &profile.uid).await? {
                continue;
            }
            pool.push(profile);
        }

        debug!(%viewer, fetched = fetched_count, eligible = pool.len(), "candidate pool built");
        Ok(pool)
    }
}

/// Uniformly shuffle `pool` and keep the first `desired_count` entries.
pub fn draw<R>(mut pool: Vec<Profile>, desired_count: usize, rng: &mut R) -> Vec<Profile>
where
    R: Rng + ?Sized,
{
    pool.shuffle(rng);
    pool.truncate(desired_count);
    pool
}

fn ensure_positive(desired_count: usize) -> Result<(), MatchError> {
    if desired_count == 0 {
        return Err(MatchError::InvalidArgument(
            "desired candidate count must be positive".to_string(),
        ));
    }
    Ok(())
}
