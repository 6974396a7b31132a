use crate::db::store::{Command, CommandExecutor, StoreError};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

///
/// Entry
///
/// One key's value. Empty hashes and sets never stay in the keyspace, so
/// `exists` behaves like a Redis-style store.
///

#[derive(Clone, Debug, PartialEq)]
enum Entry {
    String(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    SortedSet(BTreeMap<String, f64>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        match self {
            Self::String(_) => false,
            Self::Hash(hash) => hash.is_empty(),
            Self::Set(set) => set.is_empty(),
            Self::SortedSet(zset) => zset.is_empty(),
        }
    }
}

type Keyspace = BTreeMap<String, Entry>;

///
/// MemoryStore
///
/// In-process executor. Clones share one keyspace; a batch is staged on
/// copies of the touched keys and published under a single lock, so readers
/// see all of it or none of it.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    keyspace: Arc<Mutex<Keyspace>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key currently present, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Remove every key.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Keyspace>, StoreError> {
        self.keyspace
            .lock()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))
    }
}

impl CommandExecutor for MemoryStore {
    fn hash_get_all(&self, key: &str) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        match self.lock()?.get(key) {
            None => Ok(None),
            Some(Entry::Hash(hash)) => Ok(Some(hash.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(key))
    }

    fn set_members(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        match self.lock()?.get(key) {
            None => Ok(BTreeSet::new()),
            Some(Entry::Set(set)) => Ok(set.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self.lock()?.get(key) {
            None => Ok(false),
            Some(Entry::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn sorted_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, StoreError> {
        let keyspace = self.lock()?;
        let zset = match keyspace.get(key) {
            None => return Ok(Vec::new()),
            Some(Entry::SortedSet(zset)) => zset,
            Some(_) => return Err(wrong_type(key)),
        };

        let mut hits: Vec<(f64, &String)> = zset
            .iter()
            .filter(|(_, score)| **score >= min && **score <= max)
            .map(|(member, score)| (*score, member))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        Ok(hits.into_iter().map(|(_, member)| member.clone()).collect())
    }

    fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut keyspace = self.lock()?;
        let current = match keyspace.get(key) {
            None => 0,
            Some(Entry::String(raw)) => raw.parse::<i64>().map_err(|_| not_integer(key))?,
            Some(_) => return Err(wrong_type(key)),
        };
        let next = current.checked_add(1).ok_or_else(|| not_integer(key))?;
        keyspace.insert(key.to_string(), Entry::String(next.to_string()));

        Ok(next)
    }

    fn execute(&self, batch: &[Command]) -> Result<(), StoreError> {
        let mut keyspace = self.lock()?;

        // Phase 1: stage copies of every touched key; an error here leaves the
        // keyspace untouched.
        let mut staged: BTreeMap<&str, Option<Entry>> = BTreeMap::new();
        for command in batch {
            let key = command.key();
            let slot = staged
                .entry(key)
                .or_insert_with(|| keyspace.get(key).cloned());
            apply(slot, command)?;
        }

        // Phase 2: publish.
        for (key, entry) in staged {
            match entry {
                Some(entry) if !entry.is_empty() => {
                    keyspace.insert(key.to_string(), entry);
                }
                _ => {
                    keyspace.remove(key);
                }
            }
        }

        Ok(())
    }
}

// Apply one command to a staged slot.
fn apply(slot: &mut Option<Entry>, command: &Command) -> Result<(), StoreError> {
    let key = command.key();

    match command {
        Command::Delete { .. } => *slot = None,

        Command::HashSet { fields, .. } => {
            let hash = match slot.get_or_insert_with(|| Entry::Hash(BTreeMap::new())) {
                Entry::Hash(hash) => hash,
                _ => return Err(wrong_type(key)),
            };
            for (field, value) in fields {
                hash.insert(field.clone(), value.clone());
            }
        }

        Command::HashDelete { fields, .. } => match slot {
            None => {}
            Some(Entry::Hash(hash)) => {
                for field in fields {
                    hash.remove(field);
                }
            }
            Some(_) => return Err(wrong_type(key)),
        },

        Command::SetAdd { member, .. } => {
            match slot.get_or_insert_with(|| Entry::Set(BTreeSet::new())) {
                Entry::Set(set) => {
                    set.insert(member.clone());
                }
                _ => return Err(wrong_type(key)),
            }
        }

        Command::SetRemove { member, .. } => match slot {
            None => {}
            Some(Entry::Set(set)) => {
                set.remove(member);
            }
            Some(_) => return Err(wrong_type(key)),
        },

        Command::SortedSetAdd { member, score, .. } => {
            match slot.get_or_insert_with(|| Entry::SortedSet(BTreeMap::new())) {
                Entry::SortedSet(zset) => {
                    zset.insert(member.clone(), *score);
                }
                _ => return Err(wrong_type(key)),
            }
        }

        Command::SortedSetRemove { member, .. } => match slot {
            None => {}
            Some(Entry::SortedSet(zset)) => {
                zset.remove(member);
            }
            Some(_) => return Err(wrong_type(key)),
        },
    }

    // Emptied containers disappear, matching the publish step.
    if slot.as_ref().is_some_and(Entry::is_empty) {
        *slot = None;
    }

    Ok(())
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

fn not_integer(key: &str) -> StoreError {
    StoreError::NotAnInteger {
        key: key.to_string(),
    }
}

///
/// TESTS
///
