//! Dense id assignment for vocabulary words and contexts.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Bidirectional map between items and contiguous `u32` ids.
///
/// Ids are handed out in first-seen order starting at 0, so a model built
/// from the same corpus in the same order always numbers its rows and
/// columns the same way. Re-ordering the corpus re-numbers them (the
/// resulting probabilities do not change).
#[derive(Debug, Clone)]
pub struct Interner<K> {
    items: Vec<K>,
    ids: HashMap<K, u32>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> Interner<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `item`, assigning the next free id if it is new.
    pub fn resolve<Q>(&mut self, item: &Q) -> u32
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(&id) = self.ids.get(item) {
            return id;
        }
        let id = self.items.len() as u32;
        let owned = item.to_owned();
        self.items.push(owned.clone());
        self.ids.insert(owned, id);
        id
    }

    /// Build an interner from items already in id order.
    ///
    /// Returns the first duplicate if the items are not unique.
    pub fn from_items(items: Vec<K>) -> std::result::Result<Self, K> {
        let mut ids = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if ids.insert(item.clone(), i as u32).is_some() {
                return Err(item.clone());
            }
        }
        Ok(Self { items, ids })
    }

    pub fn get<Q>(&self, item: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.ids.get(item).copied()
    }

    pub fn item(&self, id: u32) -> Option<&K> {
        self.items.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in id order.
    pub fn items(&self) -> &[K] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut words: Interner<String> = Interner::new();
        assert_eq!(words.resolve("good"), 0);
        assert_eq!(words.resolve("movie"), 1);
        assert_eq!(words.resolve("good"), 0);
        assert_eq!(words.resolve("film"), 2);
        assert_eq!(words.len(), 3);
        assert_eq!(words.items(), &["good", "movie", "film"]);
    }

    #[test]
    fn test_get_does_not_insert() {
        let mut words: Interner<String> = Interner::new();
        words.resolve("good");
        assert_eq!(words.get("good"), Some(0));
        assert_eq!(words.get("bad"), None);
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn test_slice_keys() {
        let mut contexts: Interner<Vec<u32>> = Interner::new();
        assert_eq!(contexts.resolve(&[0u32, 1][..]), 0);
        assert_eq!(contexts.resolve(&[1u32, 2][..]), 1);
        assert_eq!(contexts.get(&[0u32, 1][..]), Some(0));
        assert_eq!(contexts.item(1), Some(&vec![1u32, 2]));
    }

    #[test]
    fn test_from_items_rejects_duplicates() {
        let ok = Interner::from_items(vec!["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(ok.get("b"), Some(1));

        let dup = Interner::from_items(vec!["a".to_string(), "a".to_string()]);
        assert_eq!(dup.unwrap_err(), "a");
    }
}
