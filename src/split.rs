//! Leave-two-out split by recency.
//!
//! Each user's interactions are ranked by timestamp, most recent first. On a
//! timestamp tie the interaction that appears earlier in the input ranks
//! higher. Rank 1 goes to test, rank 2 to validation and the rest to train.
use data::{CompressedInteractions, Interactions};

/// Split label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    /// Training split.
    Train,
    /// Validation split.
    Validation,
    /// Test split.
    Test,
}

impl Split {
    /// Label for a 1-based recency rank.
    pub fn from_rank(rank: usize) -> Split {
        match rank {
            1 => Split::Test,
            2 => Split::Validation,
            _ => Split::Train,
        }
    }
}

/// Label every row of `interactions`, indexed by row position.
pub fn assign_splits(interactions: &Interactions, compressed: &CompressedInteractions) -> Vec<Split> {
    let mut labels = vec![Split::Train; interactions.len()];

    for user in compressed.iter_users() {
        for (idx, &row) in user.rows.iter().enumerate() {
            labels[row] = Split::from_rank(idx + 1);
        }
    }

    labels
}

/// The three splits, each in input row order.
#[derive(Clone, Debug, PartialEq)]
pub struct RecencySplit {
    /// Everything except the two most recent interactions of each user.
    pub train: Interactions,
    /// Second most recent interaction of each user.
    pub validation: Interactions,
    /// Most recent interaction of each user.
    pub test: Interactions,
}

impl RecencySplit {
    /// The split with the given label.
    pub fn get(&self, split: Split) -> &Interactions {
        match split {
            Split::Train => &self.train,
            Split::Validation => &self.validation,
            Split::Test => &self.test,
        }
    }
}

/// Partition `interactions` into train, validation and test.
pub fn recency_split(interactions: &Interactions) -> RecencySplit {
    recency_split_compressed(interactions, &interactions.to_compressed())
}

/// Like [`recency_split`](fn.recency_split.html), reusing an existing
/// per-user grouping of `interactions`.
pub fn recency_split_compressed(
    interactions: &Interactions,
    compressed: &CompressedInteractions,
) -> RecencySplit {
    let labels = assign_splits(interactions, compressed);

    let (num_users, num_items) = interactions.shape();
    let mut train = Interactions::new(num_users, num_items);
    let mut validation = Interactions::new(num_users, num_items);
    let mut test = Interactions::new(num_users, num_items);

    for (interaction, label) in interactions.data().iter().zip(labels) {
        let target = match label {
            Split::Train => &mut train,
            Split::Validation => &mut validation,
            Split::Test => &mut test,
        };
        target.push(interaction.clone());
    }

    debug!(
        "Recency split: {} train, {} validation, {} test",
        train.len(),
        validation.len(),
        test.len()
    );

    RecencySplit {
        train,
        validation,
        test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use data::Interaction;

    fn items(interactions: &Interactions) -> Vec<(usize, usize)> {
        interactions
            .data()
            .iter()
            .map(|x| (x.user_id(), x.item_id()))
            .collect()
    }

    #[test]
    fn ranks() {
        assert_eq!(Split::from_rank(1), Split::Test);
        assert_eq!(Split::from_rank(2), Split::Validation);
        assert_eq!(Split::from_rank(3), Split::Train);
        assert_eq!(Split::from_rank(40), Split::Train);
    }

    #[test]
    fn most_recent_goes_to_test() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 0, 5.0, 100),
            Interaction::new(0, 1, 4.0, 90),
            Interaction::new(0, 2, 3.0, 80),
        ]);
        let split = recency_split(&interactions);

        assert_eq!(items(&split.test), vec![(0, 0)]);
        assert_eq!(items(&split.validation), vec![(0, 1)]);
        assert_eq!(items(&split.train), vec![(0, 2)]);
    }

    #[test]
    fn input_order_is_irrelevant_to_rank() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 2, 3.0, 80),
            Interaction::new(0, 0, 5.0, 100),
            Interaction::new(0, 3, 1.0, 10),
            Interaction::new(0, 1, 4.0, 90),
        ]);
        let split = recency_split(&interactions);

        assert_eq!(items(&split.test), vec![(0, 0)]);
        assert_eq!(items(&split.validation), vec![(0, 1)]);
        assert_eq!(items(&split.train), vec![(0, 2), (0, 3)]);
    }

    #[test]
    fn short_histories() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 0, 1.0, 10),
            Interaction::new(1, 1, 1.0, 10),
            Interaction::new(1, 2, 1.0, 20),
        ]);
        let split = recency_split(&interactions);

        assert_eq!(items(&split.test), vec![(0, 0), (1, 2)]);
        assert_eq!(items(&split.validation), vec![(1, 1)]);
        assert!(split.train.is_empty());
        assert_eq!(split.train.shape(), (2, 3));
    }

    #[test]
    fn timestamp_ties_favour_earlier_rows() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 0, 1.0, 50),
            Interaction::new(0, 1, 1.0, 50),
            Interaction::new(0, 2, 1.0, 50),
            Interaction::new(0, 3, 1.0, 10),
        ]);
        let split = recency_split(&interactions);

        assert_eq!(items(&split.test), vec![(0, 0)]);
        assert_eq!(items(&split.validation), vec![(0, 1)]);
        assert_eq!(items(&split.train), vec![(0, 2), (0, 3)]);
    }

    #[test]
    fn split_is_a_partition() {
        let mut data = Vec::new();
        for user_id in 0..10 {
            for item_id in 0..(user_id % 5 + 1) {
                data.push(Interaction::new(user_id, item_id, 1.0, (item_id * 7 % 5) as u64));
            }
        }
        let interactions = Interactions::from(data);
        let split = recency_split(&interactions);

        assert_eq!(
            split.train.len() + split.validation.len() + split.test.len(),
            interactions.len()
        );

        for user_id in 0..10 {
            let count = |x: &Interactions| x.data().iter().filter(|x| x.user_id() == user_id).count();
            let total = user_id % 5 + 1;

            assert_eq!(count(&split.test), 1);
            assert_eq!(count(&split.validation), if total >= 2 { 1 } else { 0 });
            assert_eq!(count(&split.train), total.saturating_sub(2));
        }

        assert_eq!(split.get(Split::Test), &split.test);
    }

    #[test]
    fn reuses_grouping() {
        let interactions = Interactions::from(vec![
            Interaction::new(1, 0, 1.0, 3),
            Interaction::new(0, 1, 1.0, 9),
            Interaction::new(1, 2, 1.0, 7),
            Interaction::new(0, 3, 1.0, 4),
            Interaction::new(1, 1, 1.0, 1),
        ]);
        let compressed = interactions.to_compressed();
        let split = recency_split_compressed(&interactions, &compressed);

        assert_eq!(split, recency_split(&interactions));
        assert_eq!(items(&split.test), vec![(0, 1), (1, 2)]);
        assert_eq!(items(&split.train), vec![(1, 1)]);
    }
}
