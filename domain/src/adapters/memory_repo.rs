use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use crate::{CoreError, Counter, CounterDatabase, CounterName, CounterRepository};

/// Simple in-memory counter database for tests and local demos. Every
/// operation takes the internal mutex, so each call is atomic on its own.
pub struct InMemoryDb {
    inner: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    counters: BTreeMap<CounterName, Counter>,
    next_id: i64,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemState>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))
    }
}

impl Default for InMemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterRepository for InMemoryDb {
    fn find(&self, name: &CounterName) -> Result<Option<Counter>, CoreError> {
        let state = self.lock()?;
        Ok(state.counters.get(name).cloned())
    }

    fn insert(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Counter, CoreError> {
        let mut state = self.lock()?;
        if state.counters.contains_key(name) {
            return Err(CoreError::AlreadyExists);
        }
        state.next_id += 1;
        let counter = Counter {
            id: state.next_id,
            name: name.clone(),
            value,
            created_at: now,
            updated_at: now,
        };
        state.counters.insert(name.clone(), counter.clone());
        Ok(counter)
    }

    fn add(
        &self,
        name: &CounterName,
        delta: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        let mut state = self.lock()?;
        match state.counters.get_mut(name) {
            Some(counter) => {
                counter.value = counter.value.checked_add(delta).ok_or(CoreError::Overflow)?;
                counter.updated_at = now;
                Ok(Some(counter.value))
            }
            None => Ok(None),
        }
    }

    fn set(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        let mut state = self.lock()?;
        match state.counters.get_mut(name) {
            Some(counter) => {
                counter.value = value;
                counter.updated_at = now;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl CounterDatabase for InMemoryDb {
    type Session<'a> = &'a InMemoryDb;

    fn session(&self) -> Result<Self::Session<'_>, CoreError> {
        Ok(self)
    }

    fn reset_all(&self) -> Result<(), CoreError> {
        let mut state = self.lock()?;
        *state = MemState::default();
        Ok(())
    }
}
