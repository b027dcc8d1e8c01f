// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ordered key → entry collection stored as an array of objects.
//!
//! Documents carry several sub-lists that must hold at most one entry per
//! key (`User.activities` and `User.budgets` keyed by trip, `Trip.activities`
//! keyed by activity). `KeyedList` keeps insertion order for the wire format
//! but only exposes keyed operations, so duplicate keys cannot be introduced.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entry addressable by a string key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Which branch of [`KeyedList::upsert_with`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Insertion-ordered list with unique keys.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedList<T> {
    entries: Vec<T>,
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Keyed> KeyedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|e| e.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append `entry` unless its key is already present.
    ///
    /// Returns `false` (and drops `entry`) when the key exists.
    pub fn insert(&mut self, entry: T) -> bool {
        if self.contains_key(entry.key()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Locate the entry for `key` and apply `update`, or append `seed()`.
    pub fn upsert_with<S, U>(&mut self, key: &str, seed: S, update: U) -> Upsert
    where
        S: FnOnce() -> T,
        U: FnOnce(&mut T),
    {
        match self.get_mut(key) {
            Some(entry) => {
                update(entry);
                Upsert::Updated
            }
            None => {
                let entry = seed();
                debug_assert_eq!(entry.key(), key);
                self.entries.push(entry);
                Upsert::Created
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.key() == key)?;
        Some(self.entries.remove(pos))
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.entries.retain(keep);
    }

    pub fn into_vec(self) -> Vec<T> {
        self.entries
    }
}

/// Later duplicates of a key are dropped.
impl<T: Keyed> FromIterator<T> for KeyedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for entry in iter {
            list.insert(entry);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T: Serialize> Serialize for KeyedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for KeyedList<T>
where
    T: Deserialize<'de> + Keyed,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<T>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
