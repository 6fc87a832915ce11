//! Negative sampling.
//!
//! For every user the negative pool is the complement of the items the
//! user interacted with. Two fixed-size evaluation samples (validation and
//! test) are drawn from it once at construction time; the full pool is
//! retained so that training negatives can be drawn afresh on every call.
use std::collections::HashSet;
use std::str::FromStr;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use rayon::prelude::*;

use failure;

use data::CompressedInteractions;
use {DatasetError, ItemId, UserId};

/// Number of negatives drawn per user for each evaluation split.
pub const DEFAULT_NUM_EVALUATION_NEGATIVES: usize = 100;

/// What to do with a user whose negative pool is too small.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Fail the whole operation.
    Abort,
    /// Log the user and leave them out of every later stage.
    SkipUser,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::Abort
    }
}

/// Evaluation split selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationKind {
    /// Second most recent interaction of every user.
    Validation,
    /// Most recent interaction of every user.
    Test,
}

impl FromStr for EvaluationKind {
    type Err = failure::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "validation" => Ok(EvaluationKind::Validation),
            "test" => Ok(EvaluationKind::Test),
            other => Err(format_err!(
                "Unknown evaluation kind {:?}: expected \"validation\" or \"test\".",
                other
            )),
        }
    }
}

/// Negative pool and evaluation samples of a single user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserNegatives {
    negative_items: Vec<ItemId>,
    validation: Vec<ItemId>,
    test: Vec<ItemId>,
}

impl UserNegatives {
    /// All items the user has not interacted with, ascending.
    pub fn negative_items(&self) -> &[ItemId] {
        &self.negative_items
    }

    /// Negatives drawn for validation.
    pub fn validation(&self) -> &[ItemId] {
        &self.validation
    }

    /// Negatives drawn for test.
    pub fn test(&self) -> &[ItemId] {
        &self.test
    }

    /// Negatives drawn for the given evaluation split.
    pub fn for_evaluation(&self, kind: EvaluationKind) -> &[ItemId] {
        match kind {
            EvaluationKind::Validation => &self.validation,
            EvaluationKind::Test => &self.test,
        }
    }
}

/// Items in `0..num_items` not present in `interacted`, ascending.
pub fn negative_items(interacted: &[ItemId], num_items: usize) -> Vec<ItemId> {
    let mut seen = vec![false; num_items];

    for &item_id in interacted {
        if item_id < num_items {
            seen[item_id] = true;
        }
    }

    (0..num_items).filter(|&item_id| !seen[item_id]).collect()
}

/// Draw `num_samples` distinct items uniformly from `pool`.
pub fn sample_negatives<R: Rng>(
    user_id: UserId,
    pool: &[ItemId],
    num_samples: usize,
    rng: &mut R,
) -> Result<Vec<ItemId>, DatasetError> {
    if pool.len() < num_samples {
        return Err(DatasetError::InsufficientNegatives {
            user_id,
            available: pool.len(),
            requested: num_samples,
        });
    }

    Ok(index::sample(rng, pool.len(), num_samples)
        .into_iter()
        .map(|idx| pool[idx])
        .collect())
}

fn sample_user(
    user_id: UserId,
    interacted: &[ItemId],
    num_items: usize,
    num_samples: usize,
    seed: u64,
) -> Result<UserNegatives, DatasetError> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    let negative_items = negative_items(interacted, num_items);

    let validation = sample_negatives(user_id, &negative_items, num_samples, &mut rng)?;
    let test = sample_negatives(user_id, &negative_items, num_samples, &mut rng)?;

    Ok(UserNegatives {
        negative_items,
        validation,
        test,
    })
}

/// Per-user negative table.
#[derive(Clone, Debug)]
pub struct NegativeSamples {
    num_samples: usize,
    users: Vec<Option<UserNegatives>>,
    skipped: HashSet<UserId>,
}

impl NegativeSamples {
    /// Compute the negative pool and draw evaluation samples for every user.
    ///
    /// Users are processed in parallel. Each user gets its own generator
    /// seeded from `rng` in user order, so the result depends only on the
    /// state of `rng` and not on the number of threads.
    pub fn build<R: Rng>(
        interactions: &CompressedInteractions,
        num_samples: usize,
        policy: SamplingPolicy,
        rng: &mut R,
    ) -> Result<Self, DatasetError> {
        let num_items = interactions.num_items();
        let seeds: Vec<u64> = (0..interactions.num_users()).map(|_| rng.gen()).collect();

        let results: Vec<Result<UserNegatives, DatasetError>> = interactions
            .iter_users()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|user| {
                sample_user(
                    user.user_id,
                    user.item_ids,
                    num_items,
                    num_samples,
                    seeds[user.user_id],
                )
            })
            .collect();

        let mut users = Vec::with_capacity(results.len());
        let mut skipped = HashSet::new();

        for (user_id, result) in results.into_iter().enumerate() {
            match result {
                Ok(negatives) => users.push(Some(negatives)),
                Err(DatasetError::InsufficientNegatives {
                    available,
                    requested,
                    ..
                }) if policy == SamplingPolicy::SkipUser =>
                {
                    warn!(
                        "Skipping user {}: {} negative candidates, {} requested",
                        user_id, available, requested
                    );
                    users.push(None);
                    skipped.insert(user_id);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(NegativeSamples {
            num_samples,
            users,
            skipped,
        })
    }

    /// Look up a user's negatives.
    ///
    /// Returns `Ok(None)` for users skipped during construction and an
    /// invariant violation for any other user missing from the table.
    pub fn get(&self, user_id: UserId) -> Result<Option<&UserNegatives>, DatasetError> {
        match self.users.get(user_id).and_then(|x| x.as_ref()) {
            Some(negatives) => Ok(Some(negatives)),
            None if self.skipped.contains(&user_id) => Ok(None),
            None => Err(DatasetError::InvariantViolation {
                user_id,
                table: "negative sample",
            }),
        }
    }

    /// Number of negatives drawn per user for each evaluation split.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Users left out because their negative pool was too small.
    pub fn skipped(&self) -> &HashSet<UserId> {
        &self.skipped
    }

    /// Number of users covered, skipped users included.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the table covers no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn forget_user(&mut self, user_id: UserId) {
        if let Some(entry) = self.users.get_mut(user_id) {
            *entry = None;
        }
    }
}
