//! Dataset assembly: the model-facing outputs built from the remapped
//! interactions, their recency split and the negative table.
use std::io::Read;
use std::path::Path;

use failure;
use ndarray::Array2;
use rand;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use data::{Interactions, RawInteraction};
use datasets::{read_interactions, read_interactions_from_path, ReaderConfig};
use remap::{remap, IdMapping};
use sampling::{
    sample_negatives, EvaluationKind, NegativeSamples, SamplingPolicy,
    DEFAULT_NUM_EVALUATION_NEGATIVES,
};
use split::{recency_split_compressed, RecencySplit};
use {DatasetError, ItemId, Rating, UserId};

/// Configuration for building a [`Dataset`](struct.Dataset.html).
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    reader: ReaderConfig,
    num_evaluation_negatives: usize,
    policy: SamplingPolicy,
    rng: XorShiftRng,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig::new()
    }
}

impl DatasetConfig {
    /// Build a new configuration with a randomly seeded generator.
    pub fn new() -> Self {
        DatasetConfig {
            reader: ReaderConfig::new(),
            num_evaluation_negatives: DEFAULT_NUM_EVALUATION_NEGATIVES,
            policy: SamplingPolicy::Abort,
            rng: XorShiftRng::from_seed(rand::thread_rng().gen()),
        }
    }

    /// Set the layout of the input file.
    pub fn reader(mut self, reader: ReaderConfig) -> Self {
        self.reader = reader;
        self
    }

    /// Set the number of negatives drawn per user for validation and for test.
    pub fn num_evaluation_negatives(mut self, num_evaluation_negatives: usize) -> Self {
        self.num_evaluation_negatives = num_evaluation_negatives;
        self
    }

    /// Set the policy for users with too few negative candidates.
    pub fn policy(mut self, policy: SamplingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the random number generator.
    pub fn rng(mut self, rng: XorShiftRng) -> Self {
        self.rng = rng;
        self
    }

    /// Set the random number generator from seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = XorShiftRng::seed_from_u64(seed);
        self
    }

    /// Build a dataset from parsed records.
    pub fn build<I: IntoIterator<Item = RawInteraction>>(
        mut self,
        records: I,
    ) -> Result<Dataset, DatasetError> {
        let remapped = remap(records);
        let compressed = remapped.interactions.to_compressed();
        let splits = recency_split_compressed(&remapped.interactions, &compressed);
        let negatives = NegativeSamples::build(
            &compressed,
            self.num_evaluation_negatives,
            self.policy,
            &mut self.rng,
        )?;

        info!(
            "Built dataset: {} interactions, {} users, {} items, {} skipped users",
            remapped.interactions.len(),
            remapped.users.len(),
            remapped.items.len(),
            negatives.skipped().len()
        );

        Ok(Dataset {
            users: remapped.users,
            items: remapped.items,
            interactions: remapped.interactions,
            splits,
            negatives,
            policy: self.policy,
            rng: self.rng,
        })
    }

    /// Read a delimited interaction log and build a dataset from it.
    pub fn build_from_reader<R: Read>(self, reader: R) -> Result<Dataset, failure::Error> {
        let records = read_interactions(reader, &self.reader)?;

        Ok(self.build(records)?)
    }

    /// Read the delimited interaction log at `path` and build a dataset from it.
    pub fn load<P: AsRef<Path>>(self, path: P) -> Result<Dataset, failure::Error> {
        let records = read_interactions_from_path(path, &self.reader)?;

        Ok(self.build(records)?)
    }
}

/// A training example.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    /// Dense user index.
    pub user_id: UserId,
    /// Dense item index.
    pub item_id: ItemId,
    /// Observed rating for positives, `0.0` for sampled negatives.
    pub rating: Rating,
}

/// Training examples: each positive followed by its sampled negatives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    rows: Vec<TrainingRow>,
}

impl TrainingData {
    /// All rows.
    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as a `(len, 3)` array of `[user, item, rating]`.
    pub fn to_array(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.rows.len(), 3), |(row, col)| {
            let row = &self.rows[row];
            match col {
                0 => row.user_id as f32,
                1 => row.item_id as f32,
                _ => row.rating,
            }
        })
    }
}

/// Evaluation examples as four parallel sequences.
///
/// `negative_users` and `negative_items` hold `num_negatives` entries per
/// positive, grouped by the positive they belong to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationData {
    /// Users of the positive examples.
    pub users: Vec<UserId>,
    /// Items of the positive examples.
    pub items: Vec<ItemId>,
    /// Users of the negative examples.
    pub negative_users: Vec<UserId>,
    /// Items of the negative examples.
    pub negative_items: Vec<ItemId>,
    /// Negatives per positive.
    pub num_negatives: usize,
}

impl EvaluationData {
    /// Number of positive examples.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether there are no positive examples.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Negative items of the positive at position `idx`.
    pub fn negatives_for(&self, idx: usize) -> Option<&[ItemId]> {
        if idx >= self.len() {
            return None;
        }

        let start = idx * self.num_negatives;
        Some(&self.negative_items[start..start + self.num_negatives])
    }
}

/// A remapped, split and negative-sampled implicit-feedback dataset.
#[derive(Clone, Debug)]
pub struct Dataset {
    users: IdMapping,
    items: IdMapping,
    interactions: Interactions,
    splits: RecencySplit,
    negatives: NegativeSamples,
    policy: SamplingPolicy,
    rng: XorShiftRng,
}

impl Dataset {
    /// Number of distinct users.
    pub fn n_user(&self) -> usize {
        self.users.len()
    }

    /// Number of distinct items.
    pub fn n_item(&self) -> usize {
        self.items.len()
    }

    /// Raw user identifier mapping.
    pub fn users(&self) -> &IdMapping {
        &self.users
    }

    /// Raw item identifier mapping.
    pub fn items(&self) -> &IdMapping {
        &self.items
    }

    /// All interactions, in input order.
    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    /// Train, validation and test splits.
    pub fn splits(&self) -> &RecencySplit {
        &self.splits
    }

    /// Per-user negative table.
    pub fn negatives(&self) -> &NegativeSamples {
        &self.negatives
    }

    /// Training examples with `n_negative` fresh negatives per positive,
    /// drawn with the dataset's own generator.
    pub fn make_train_data(&mut self, n_negative: usize) -> Result<TrainingData, DatasetError> {
        let mut rng = self.rng.clone();
        let data = self.make_train_data_with(n_negative, &mut rng);
        self.rng = rng;

        data
    }

    /// Training examples with `n_negative` fresh negatives per positive,
    /// drawn with `rng`.
    ///
    /// Rows follow the order of the training split; every positive is
    /// immediately followed by its negatives, which carry a rating of `0.0`.
    pub fn make_train_data_with<R: Rng>(
        &self,
        n_negative: usize,
        rng: &mut R,
    ) -> Result<TrainingData, DatasetError> {
        let train = &self.splits.train;
        let mut rows = Vec::with_capacity(train.len() * (n_negative + 1));
        let mut skipped = 0;

        for interaction in train.data() {
            let user_id = interaction.user_id();

            let pool = match self.negatives.get(user_id)? {
                Some(negatives) => negatives.negative_items(),
                None => {
                    skipped += 1;
                    continue;
                }
            };

            let sampled = match sample_negatives(user_id, pool, n_negative, rng) {
                Ok(sampled) => sampled,
                Err(DatasetError::InsufficientNegatives { .. })
                    if self.policy == SamplingPolicy::SkipUser =>
                {
                    skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            rows.push(TrainingRow {
                user_id,
                item_id: interaction.item_id(),
                rating: interaction.rating(),
            });
            rows.extend(sampled.into_iter().map(|item_id| TrainingRow {
                user_id,
                item_id,
                rating: 0.0,
            }));
        }

        if skipped > 0 {
            warn!("Left out {} training interactions of skipped users", skipped);
        }

        debug!(
            "Generated {} training rows with {} negatives each",
            rows.len(),
            n_negative
        );

        Ok(TrainingData { rows })
    }

    /// Positives of the requested evaluation split, each paired with the
    /// user's precomputed evaluation negatives.
    pub fn make_evaluation_data(&self, kind: EvaluationKind) -> Result<EvaluationData, DatasetError> {
        let split = match kind {
            EvaluationKind::Validation => &self.splits.validation,
            EvaluationKind::Test => &self.splits.test,
        };
        let num_negatives = self.negatives.num_samples();

        let mut data = EvaluationData {
            users: Vec::with_capacity(split.len()),
            items: Vec::with_capacity(split.len()),
            negative_users: Vec::with_capacity(split.len() * num_negatives),
            negative_items: Vec::with_capacity(split.len() * num_negatives),
            num_negatives,
        };

        for interaction in split.data() {
            let user_id = interaction.user_id();

            let negatives = match self.negatives.get(user_id)? {
                Some(negatives) => negatives.for_evaluation(kind),
                None => continue,
            };

            data.users.push(user_id);
            data.items.push(interaction.item_id());

            for &item_id in negatives {
                data.negative_users.push(user_id);
                data.negative_items.push(item_id);
            }
        }

        Ok(data)
    }

    /// Dense `(n_user, n_item)` matrix of training ratings.
    ///
    /// Validation and test interactions are left at zero. When a pair occurs
    /// more than once in the training split the last rating wins.
    pub fn rating_matrix(&self) -> Array2<f32> {
        let mut matrix = Array2::zeros((self.n_user(), self.n_item()));

        for interaction in self.splits.train.data() {
            matrix[(interaction.user_id(), interaction.item_id())] = interaction.rating();
        }

        matrix
    }
}
