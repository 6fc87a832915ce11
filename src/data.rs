//! Interaction tables and their per-user grouping.
use std::cmp::Ordering;

use super::{ItemId, Rating, Timestamp, UserId};

/// A single interaction as read from the source log, before remapping.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RawInteraction {
    /// Raw user identifier.
    pub user_id: String,
    /// Raw item identifier.
    pub item_id: String,
    /// Rating attached to the interaction.
    pub rating: Rating,
    /// Time of the interaction.
    pub timestamp: Timestamp,
}

impl RawInteraction {
    /// Build a new raw interaction.
    pub fn new<U: Into<String>, I: Into<String>>(
        user_id: U,
        item_id: I,
        rating: Rating,
        timestamp: Timestamp,
    ) -> Self {
        RawInteraction {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
            timestamp,
        }
    }
}

/// An interaction between a dense user index and a dense item index.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Interaction {
    user_id: UserId,
    item_id: ItemId,
    rating: Rating,
    timestamp: Timestamp,
}

impl Interaction {
    /// Build a new interaction.
    pub fn new(user_id: UserId, item_id: ItemId, rating: Rating, timestamp: Timestamp) -> Self {
        Interaction {
            user_id,
            item_id,
            rating,
            timestamp,
        }
    }

    /// Dense user index.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
    /// Dense item index.
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }
    /// Rating.
    pub fn rating(&self) -> Rating {
        self.rating
    }
    /// Timestamp.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// A table of interactions together with the shape of the
/// user-item space they live in.
#[derive(Clone, Debug, PartialEq)]
pub struct Interactions {
    num_users: usize,
    num_items: usize,
    interactions: Vec<Interaction>,
}

impl Interactions {
    /// Build an empty table with the given shape.
    pub fn new(num_users: usize, num_items: usize) -> Self {
        Interactions {
            num_users,
            num_items,
            interactions: Vec::new(),
        }
    }

    /// Build a table with the given shape from existing rows.
    pub fn from_parts(num_users: usize, num_items: usize, interactions: Vec<Interaction>) -> Self {
        Interactions {
            num_users,
            num_items,
            interactions,
        }
    }

    /// Append an interaction.
    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    /// Rows in insertion order.
    pub fn data(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Group rows by user, most recent first.
    pub fn to_compressed(&self) -> CompressedInteractions {
        CompressedInteractions::from(self)
    }

    /// Number of users in the user-item space.
    pub fn num_users(&self) -> usize {
        self.num_users
    }

    /// Number of items in the user-item space.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// `(num_users, num_items)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_users, self.num_items)
    }
}

impl From<Vec<Interaction>> for Interactions {
    fn from(data: Vec<Interaction>) -> Interactions {
        let num_users = data.iter().map(|x| x.user_id()).max().map_or(0, |x| x + 1);
        let num_items = data.iter().map(|x| x.item_id()).max().map_or(0, |x| x + 1);

        Interactions {
            num_users,
            num_items,
            interactions: data,
        }
    }
}

/// Recency order: user ascending, then timestamp descending, then
/// original row ascending. The row key makes this a total order, so on a
/// timestamp tie the earlier row ranks as more recent.
fn cmp_recency(x: &(usize, &Interaction), y: &(usize, &Interaction)) -> Ordering {
    let (x_row, x) = *x;
    let (y_row, y) = *y;

    x.user_id()
        .cmp(&y.user_id())
        .then_with(|| y.timestamp().cmp(&x.timestamp()))
        .then_with(|| x_row.cmp(&y_row))
}

/// Interactions grouped per user, each user's slice ordered most recent first.
#[derive(Clone, Debug)]
pub struct CompressedInteractions {
    num_users: usize,
    num_items: usize,
    user_pointers: Vec<usize>,
    rows: Vec<usize>,
    item_ids: Vec<ItemId>,
    timestamps: Vec<Timestamp>,
}

impl<'a> From<&'a Interactions> for CompressedInteractions {
    fn from(interactions: &Interactions) -> CompressedInteractions {
        let mut data: Vec<(usize, &Interaction)> = interactions.data().iter().enumerate().collect();

        data.sort_by(cmp_recency);

        let mut user_pointers = vec![0; interactions.num_users + 1];
        let mut rows = Vec::with_capacity(data.len());
        let mut item_ids = Vec::with_capacity(data.len());
        let mut timestamps = Vec::with_capacity(data.len());

        for &(row, datum) in &data {
            rows.push(row);
            item_ids.push(datum.item_id());
            timestamps.push(datum.timestamp());

            user_pointers[datum.user_id() + 1] += 1;
        }

        for idx in 1..user_pointers.len() {
            user_pointers[idx] += user_pointers[idx - 1];
        }

        CompressedInteractions {
            num_users: interactions.num_users,
            num_items: interactions.num_items,
            user_pointers,
            rows,
            item_ids,
            timestamps,
        }
    }
}

impl CompressedInteractions {
    /// Iterate over all users in index order, including users with no rows.
    pub fn iter_users(&self) -> CompressedInteractionsUserIterator {
        CompressedInteractionsUserIterator {
            interactions: &self,
            idx: 0,
        }
    }

    /// Interactions of a single user, or `None` if the index is out of range.
    pub fn get_user(&self, user_id: UserId) -> Option<CompressedInteractionsUser> {
        if user_id >= self.num_users {
            return None;
        }

        Some(self.user_slice(user_id))
    }

    fn user_slice(&self, user_id: UserId) -> CompressedInteractionsUser {
        let start = self.user_pointers[user_id];
        let stop = self.user_pointers[user_id + 1];

        CompressedInteractionsUser {
            user_id,
            rows: &self.rows[start..stop],
            item_ids: &self.item_ids[start..stop],
            timestamps: &self.timestamps[start..stop],
        }
    }

    /// Number of users.
    pub fn num_users(&self) -> usize {
        self.num_users
    }

    /// Number of items.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// `(num_users, num_items)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_users, self.num_items)
    }
}

/// Iterator over the users of a `CompressedInteractions`.
pub struct CompressedInteractionsUserIterator<'a> {
    interactions: &'a CompressedInteractions,
    idx: usize,
}

/// A single user's interactions, most recent first.
#[derive(Debug)]
pub struct CompressedInteractionsUser<'a> {
    /// Dense user index.
    pub user_id: UserId,
    /// Row positions in the source `Interactions`.
    pub rows: &'a [usize],
    /// Item indices.
    pub item_ids: &'a [ItemId],
    /// Timestamps.
    pub timestamps: &'a [Timestamp],
}

impl<'a> CompressedInteractionsUser<'a> {
    /// Number of interactions of this user.
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    /// Whether the user has no interactions.
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

impl<'a> Iterator for CompressedInteractionsUserIterator<'a> {
    type Item = CompressedInteractionsUser<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let value = if self.idx >= self.interactions.num_users {
            None
        } else {
            Some(self.interactions.user_slice(self.idx))
        };

        self.idx += 1;

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_from_rows() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 3, 1.0, 10),
            Interaction::new(2, 1, 1.0, 20),
        ]);

        assert_eq!(interactions.shape(), (3, 4));
        assert_eq!(Interactions::from(Vec::new()).shape(), (0, 0));
    }

    #[test]
    fn compressed_orders_by_recency() {
        let interactions = Interactions::from(vec![
            Interaction::new(1, 0, 1.0, 5),
            Interaction::new(0, 1, 1.0, 10),
            Interaction::new(1, 2, 1.0, 50),
            Interaction::new(0, 3, 1.0, 30),
            Interaction::new(1, 4, 1.0, 20),
        ]);
        let compressed = interactions.to_compressed();

        let users: Vec<_> = compressed.iter_users().collect();
        assert_eq!(users.len(), 2);

        assert_eq!(users[0].item_ids, &[3, 1]);
        assert_eq!(users[0].rows, &[3, 1]);
        assert_eq!(users[1].item_ids, &[2, 4, 0]);
        assert_eq!(users[1].timestamps, &[50, 20, 5]);
    }

    #[test]
    fn compressed_breaks_ties_by_row() {
        let interactions = Interactions::from(vec![
            Interaction::new(0, 7, 1.0, 100),
            Interaction::new(0, 8, 1.0, 100),
            Interaction::new(0, 9, 1.0, 100),
        ]);
        let compressed = interactions.to_compressed();
        let user = compressed.get_user(0).unwrap();

        assert_eq!(user.rows, &[0, 1, 2]);
        assert_eq!(user.item_ids, &[7, 8, 9]);
    }

    #[test]
    fn compressed_keeps_empty_users() {
        let interactions = Interactions::from_parts(3, 2, vec![Interaction::new(2, 1, 1.0, 1)]);
        let compressed = interactions.to_compressed();

        assert!(compressed.get_user(0).unwrap().is_empty());
        assert!(compressed.get_user(1).unwrap().is_empty());
        assert_eq!(compressed.get_user(2).unwrap().len(), 1);
        assert!(compressed.get_user(3).is_none());
    }
}
