#![deny(missing_docs)]
//! # recsplit
//!
//! `recsplit` prepares implicit-feedback recommendation datasets from raw
//! user-item interaction logs: sparse identifiers are remapped to dense
//! indices, each user's interactions are split into train, validation and
//! test sets by recency, and negative (non-interacted) items are sampled
//! for training and evaluation.
//!
//! ## Example
//! Load the MovieLens 1M ratings file and produce model inputs:
//!
//! ```rust,no_run
//! # extern crate recsplit;
//! use recsplit::dataset::DatasetConfig;
//! use recsplit::datasets::ReaderConfig;
//! use recsplit::sampling::EvaluationKind;
//!
//! let mut dataset = DatasetConfig::new()
//!     .reader(ReaderConfig::movielens())
//!     .num_evaluation_negatives(100)
//!     .seed(42)
//!     .load("data/ml-1m/ratings.dat")
//!     .unwrap();
//!
//! println!("{} users, {} items", dataset.n_user(), dataset.n_item());
//!
//! let train = dataset.make_train_data(4).unwrap();
//! let test = dataset.make_evaluation_data(EvaluationKind::Test).unwrap();
//! let ratings = dataset.rating_matrix();
//!
//! println!(
//!     "Train rows {}, test positives {}, rating matrix {:?}",
//!     train.len(),
//!     test.len(),
//!     ratings.shape()
//! );
//! ```
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate failure;
#[macro_use]
extern crate tracing;

extern crate csv;
extern crate ndarray;
extern crate rand;
extern crate rand_xorshift;
extern crate rayon;
extern crate serde;

pub mod data;
pub mod dataset;
pub mod datasets;
pub mod remap;
pub mod sampling;
pub mod split;

/// Alias for dense user indices.
pub type UserId = usize;
/// Alias for dense item indices.
pub type ItemId = usize;
/// Alias for timestamps.
pub type Timestamp = u64;
/// Alias for ratings.
pub type Rating = f32;

/// Errors raised while sampling negatives and assembling model inputs.
#[derive(Clone, Debug, Fail, PartialEq)]
pub enum DatasetError {
    /// A user's negative pool is smaller than the requested sample size.
    #[fail(
        display = "Insufficient negative candidates for user {}: {} available, {} requested.",
        user_id, available, requested
    )]
    InsufficientNegatives {
        /// Dense index of the offending user.
        user_id: UserId,
        /// Size of the user's negative pool.
        available: usize,
        /// Number of samples requested.
        requested: usize,
    },
    /// A user present in one derived table is missing from another.
    /// This is a bug in dataset construction, never bad input.
    #[fail(
        display = "Invariant violation: user {} is missing from the {} table.",
        user_id, table
    )]
    InvariantViolation {
        /// Dense index of the offending user.
        user_id: UserId,
        /// Name of the table the user is missing from.
        table: &'static str,
    },
}
