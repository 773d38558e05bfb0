//! Candidate keys.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::heading::Heading;
use crate::{RelError, RelResult};

/// A set of candidate keys.
///
/// Each key is a set of attribute names that functionally determines every
/// other attribute of the relation. Every relation with at least one
/// attribute has at least one candidate key; when nothing better is known
/// the whole heading is the key.
///
/// Keys are kept in canonical order: the attributes of each key sorted by
/// name, and the keys sorted by size and then by their attribute names.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CandKeys(Vec<Vec<String>>);

impl CandKeys {
    /// Keys from attribute names, e.g. `CandKeys::from_names(&[&["SNO"]])`.
    pub fn from_names<K, S>(keys: &[K]) -> Self
    where
        K: AsRef<[S]>,
        S: AsRef<str>,
    {
        Self::from_vecs(
            keys.iter()
                .map(|key| {
                    key.as_ref()
                        .iter()
                        .map(|name| name.as_ref().to_owned())
                        .collect()
                })
                .collect(),
        )
    }

    pub fn from_vecs(keys: Vec<Vec<String>>) -> Self {
        let mut keys = Self(keys);
        keys.order();
        keys
    }

    /// The default candidate key: every attribute of the heading.
    pub fn default_keys(heading: &Heading) -> Self {
        Self::from_vecs(vec![heading.names().map(str::to_owned).collect()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[String]> + '_ {
        self.0.iter().map(Vec::as_slice)
    }

    /// Number of attributes in each key, in key order.
    pub fn sizes(&self) -> Vec<usize> {
        self.0.iter().map(Vec::len).collect()
    }

    /// Sorts into canonical order and drops duplicate keys.
    pub fn order(&mut self) {
        for key in self.0.iter_mut() {
            key.sort();
            key.dedup();
        }
        self.0
            .sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        self.0.dedup();
    }

    /// Checks that every attribute named by a key exists in `heading`.
    pub fn validate(&self, heading: &Heading) -> RelResult<()> {
        for name in self.0.iter().flatten() {
            if !heading.contains(name) {
                return Err(RelError::UnknownAttribute(name.clone()));
            }
        }
        Ok(())
    }

    /// The keys that survive a projection onto `retained`: those whose
    /// attributes are all retained.
    pub fn subset(&self, retained: &Heading) -> CandKeys {
        Self(
            self.0
                .iter()
                .filter(|key| key.iter().all(|name| retained.contains(name)))
                .cloned()
                .collect(),
        )
    }

    /// Applies an old name -> new name map to every attribute of every key.
    pub fn renamed(&self, names: &HashMap<String, String>) -> CandKeys {
        Self::from_vecs(
            self.0
                .iter()
                .map(|key| {
                    key.iter()
                        .map(|name| names.get(name).unwrap_or(name).clone())
                        .collect()
                })
                .collect(),
        )
    }

    /// Keys of a natural join: the union of every pair of operand keys.
    pub fn join(&self, other: &CandKeys) -> CandKeys {
        let mut keys = Vec::with_capacity(self.len() * other.len());
        for left in &self.0 {
            for right in &other.0 {
                let union: BTreeSet<&String> = left.iter().chain(right.iter()).collect();
                keys.push(union.into_iter().cloned().collect());
            }
        }
        Self::from_vecs(keys)
    }
}

impl fmt::Display for CandKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "[{}]", key.join(" "))?;
        }
        write!(f, "]")
    }
}
