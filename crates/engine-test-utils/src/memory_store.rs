//! In-memory `Store` implementation for engine testing.
//!
//! Backs the engine's storage collaborator with a `HashMap` behind a mutex.
//! Single-key set operations are atomic by construction; `batch` validates
//! every op against a scratch copy and commits only on success, so a failing
//! batch leaves no partial state behind - the same contract a real backend
//! must honor.
//!
//! Failure injection: `fail_next_ops(n)` makes the next `n` store calls
//! return `StoreError::Unavailable`, for exercising the engine's
//! no-partial-state guarantees.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use room_engine::{Store, StoreError, WriteOp};

/// In-memory store for testing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: HashMap<String, Value>,
    /// Operations to let through before the injected failures start.
    skip_before_fail: usize,
    /// Remaining operations that fail before any state change.
    fail_remaining: usize,
}

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(HashSet<String>),
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store operations fail with `Unavailable` without
    /// touching state.
    pub fn fail_next_ops(&self, n: usize) {
        self.fail_ops_after(0, n);
    }

    /// Let `skip` operations through, then fail the following `n` with
    /// `Unavailable`. Targets a specific write inside a multi-step engine
    /// operation, e.g. the commit batch after its preceding reads.
    pub fn fail_ops_after(&self, skip: usize, n: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.skip_before_fail = skip;
        inner.fail_remaining = n;
    }

    /// Number of keys currently stored (sets count as one key).
    pub fn key_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    fn check_failure(inner: &mut MemoryStoreInner) -> Result<(), StoreError> {
        if inner.fail_remaining > 0 {
            if inner.skip_before_fail > 0 {
                inner.skip_before_fail -= 1;
                return Ok(());
            }
            inner.fail_remaining -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    /// Apply one write op to `entries`, rejecting type mismatches.
    fn apply(entries: &mut HashMap<String, Value>, op: &WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Put { key, value } => {
                if matches!(entries.get(key), Some(Value::Set(_))) {
                    return Err(StoreError::Unavailable(format!(
                        "wrong type at key {key}: set, expected string"
                    )));
                }
                entries.insert(key.clone(), Value::Str(value.clone()));
            }
            WriteOp::Delete { key } => {
                entries.remove(key);
            }
            WriteOp::SetAdd { key, member } => match entries
                .entry(key.clone())
                .or_insert_with(|| Value::Set(HashSet::new()))
            {
                Value::Set(set) => {
                    set.insert(member.clone());
                }
                Value::Str(_) => {
                    return Err(StoreError::Unavailable(format!(
                        "wrong type at key {key}: string, expected set"
                    )));
                }
            },
            WriteOp::SetRemove { key, member } => {
                let now_empty = match entries.get_mut(key) {
                    None => false,
                    Some(Value::Set(set)) => {
                        set.remove(member);
                        set.is_empty()
                    }
                    Some(Value::Str(_)) => {
                        return Err(StoreError::Unavailable(format!(
                            "wrong type at key {key}: string, expected set"
                        )));
                    }
                };
                // A set with no members is indistinguishable from an absent
                // key, so drop it.
                if now_empty {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        match inner.entries.get(key) {
            Some(Value::Str(value)) => Ok(Some(value.clone())),
            Some(Value::Set(_)) => Err(StoreError::Unavailable(format!(
                "wrong type at key {key}: set, expected string"
            ))),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        Self::apply(
            &mut inner.entries,
            &WriteOp::Put {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        inner.entries.remove(key);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        match inner
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()))
        {
            Value::Set(set) => Ok(set.insert(member.to_string())),
            Value::Str(_) => Err(StoreError::Unavailable(format!(
                "wrong type at key {key}: string, expected set"
            ))),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        let (removed, now_empty) = match inner.entries.get_mut(key) {
            None => (false, false),
            Some(Value::Set(set)) => {
                let removed = set.remove(member);
                (removed, set.is_empty())
            }
            Some(Value::Str(_)) => {
                return Err(StoreError::Unavailable(format!(
                    "wrong type at key {key}: string, expected set"
                )));
            }
        };

        if now_empty {
            inner.entries.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        match inner.entries.get(key) {
            None => Ok(HashSet::new()),
            Some(Value::Set(set)) => Ok(set.clone()),
            Some(Value::Str(_)) => Err(StoreError::Unavailable(format!(
                "wrong type at key {key}: string, expected set"
            ))),
        }
    }

    async fn batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;

        // Validate against a scratch copy; commit only a fully valid batch.
        let mut scratch = inner.entries.clone();
        for op in &ops {
            Self::apply(&mut scratch, op)?;
        }

        inner.entries = scratch;
        Ok(())
    }
}
