//! Remapping of sparse raw identifiers to dense zero-based indices.
use std::collections::HashMap;

use data::{Interaction, Interactions, RawInteraction};

/// Bijection between raw identifiers and dense indices.
///
/// Indices are assigned in order of first appearance and are
/// exactly `0..len()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IdMapping {
    ids: Vec<String>,
    indices: HashMap<String, usize>,
}

impl IdMapping {
    /// Build an empty mapping.
    pub fn new() -> Self {
        IdMapping::default()
    }

    /// Return the index of `id`, assigning the next free index if it is new.
    pub fn get_or_insert(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.indices.get(id) {
            return idx;
        }

        let idx = self.ids.len();
        self.ids.push(id.to_owned());
        self.indices.insert(id.to_owned(), idx);

        idx
    }

    /// Dense index of a raw identifier.
    pub fn index(&self, id: &str) -> Option<usize> {
        self.indices.get(id).cloned()
    }

    /// Raw identifier of a dense index.
    pub fn raw_id(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(|x| x.as_str())
    }

    /// Raw identifiers in index order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Output of [`remap`](fn.remap.html).
#[derive(Clone, Debug)]
pub struct Remapped {
    /// Input rows with dense indices, in input order.
    pub interactions: Interactions,
    /// User identifier mapping.
    pub users: IdMapping,
    /// Item identifier mapping.
    pub items: IdMapping,
}

/// Replace raw user and item identifiers with dense indices.
///
/// Ratings, timestamps and row order are preserved, duplicates included.
pub fn remap<I: IntoIterator<Item = RawInteraction>>(records: I) -> Remapped {
    let mut users = IdMapping::new();
    let mut items = IdMapping::new();

    let data: Vec<Interaction> = records
        .into_iter()
        .map(|record| {
            Interaction::new(
                users.get_or_insert(&record.user_id),
                items.get_or_insert(&record.item_id),
                record.rating,
                record.timestamp,
            )
        })
        .collect();

    debug!(
        "Remapped {} interactions onto {} users and {} items",
        data.len(),
        users.len(),
        items.len()
    );

    Remapped {
        interactions: Interactions::from_parts(users.len(), items.len(), data),
        users,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<RawInteraction> {
        vec![
            RawInteraction::new("7", "A", 5.0, 100),
            RawInteraction::new("3", "B", 4.0, 90),
            RawInteraction::new("7", "C", 3.0, 80),
            RawInteraction::new("9", "A", 2.0, 70),
            RawInteraction::new("3", "B", 1.0, 60),
        ]
    }

    #[test]
    fn first_appearance_order() {
        let remapped = remap(records());

        assert_eq!(remapped.users.ids(), &["7", "3", "9"]);
        assert_eq!(remapped.items.ids(), &["A", "B", "C"]);
        assert_eq!(remapped.interactions.shape(), (3, 3));

        let pairs: Vec<_> = remapped
            .interactions
            .data()
            .iter()
            .map(|x| (x.user_id(), x.item_id()))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (0, 2), (2, 0), (1, 1)]);
    }

    #[test]
    fn preserves_ratings_and_timestamps() {
        let remapped = remap(records());

        for (raw, dense) in records().iter().zip(remapped.interactions.data()) {
            assert_eq!(raw.rating, dense.rating());
            assert_eq!(raw.timestamp, dense.timestamp());
        }
    }

    #[test]
    fn mapping_is_a_bijection() {
        let remapped = remap(records());

        for (raw, dense) in records().iter().zip(remapped.interactions.data()) {
            assert_eq!(remapped.users.raw_id(dense.user_id()), Some(raw.user_id.as_str()));
            assert_eq!(remapped.items.raw_id(dense.item_id()), Some(raw.item_id.as_str()));
        }

        for idx in 0..remapped.users.len() {
            let raw = remapped.users.raw_id(idx).unwrap();
            assert_eq!(remapped.users.index(raw), Some(idx));
        }

        assert_eq!(remapped.users.index("unknown"), None);
        assert_eq!(remapped.items.raw_id(3), None);
    }

    #[test]
    fn empty_input() {
        let remapped = remap(Vec::new());

        assert!(remapped.interactions.is_empty());
        assert!(remapped.users.is_empty());
        assert!(remapped.items.is_empty());
    }
}
