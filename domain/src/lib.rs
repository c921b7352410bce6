//! Domain library for the counter service.
//!
//! Holds the counter types, the persistence ports (traits) and the error
//! definitions. Adapters and IO concerns stay out of this crate; the only
//! dependency is `thiserror` for `CoreError`.

use std::fmt::{Display, Formatter};
use std::time::SystemTime;

use thiserror::Error;

/// Name used when the caller does not pick a counter.
pub const DEFAULT_COUNTER_NAME: &str = "default";

/// Longest accepted counter name, matching the storage column width.
pub const MAX_NAME_LEN: usize = 100;

/// Unique, case-sensitive key of a counter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterName(String);

impl CounterName {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        validate::validate_counter_name(&val)?;
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CounterName {
    fn default() -> Self {
        Self(DEFAULT_COUNTER_NAME.to_string())
    }
}

impl Display for CounterName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored counter record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    /// Store-assigned identity; stable for the lifetime of the record.
    pub id: i64,
    pub name: CounterName,
    pub value: i64,
    pub created_at: SystemTime,
    /// Last time the value was written.
    pub updated_at: SystemTime,
}

/// Time source abstraction to make code testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock used outside tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Repository port for one storage session.
///
/// A session is acquired from a [`CounterDatabase`] for a single logical
/// operation and released when dropped.
pub trait CounterRepository {
    fn find(&self, name: &CounterName) -> Result<Option<Counter>, CoreError>;
    /// Insert a new counter. Fails with `AlreadyExists` if the name is taken.
    fn insert(&self, name: &CounterName, value: i64, now: SystemTime)
        -> Result<Counter, CoreError>;
    /// Atomically add `delta` and return the new value, or `None` if no
    /// counter has this name. Fails with `Overflow` and leaves the value
    /// untouched if the result does not fit in an `i64`.
    fn add(&self, name: &CounterName, delta: i64, now: SystemTime)
        -> Result<Option<i64>, CoreError>;
    /// Overwrite the value, or `None` if no counter has this name.
    fn set(&self, name: &CounterName, value: i64, now: SystemTime)
        -> Result<Option<i64>, CoreError>;
}

impl<T: CounterRepository + ?Sized> CounterRepository for &T {
    fn find(&self, name: &CounterName) -> Result<Option<Counter>, CoreError> {
        (**self).find(name)
    }

    fn insert(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Counter, CoreError> {
        (**self).insert(name, value, now)
    }

    fn add(
        &self,
        name: &CounterName,
        delta: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        (**self).add(name, delta, now)
    }

    fn set(
        &self,
        name: &CounterName,
        value: i64,
        now: SystemTime,
    ) -> Result<Option<i64>, CoreError> {
        (**self).set(name, value, now)
    }
}

/// Process-wide storage handle that hands out sessions.
pub trait CounterDatabase: Send + Sync {
    type Session<'a>: CounterRepository
    where
        Self: 'a;

    fn session(&self) -> Result<Self::Session<'_>, CoreError>;

    /// Drop every counter and recreate empty storage. Test isolation only.
    fn reset_all(&self) -> Result<(), CoreError>;
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid counter name: {0}")]
    InvalidName(String),
    #[error("counter already exists")]
    AlreadyExists,
    #[error("counter not found")]
    NotFound,
    #[error("counter value out of range")]
    Overflow,
    #[error("storage error: {0}")]
    Storage(String),
}

pub mod adapters;
pub mod store;
pub mod validate;
