use crate::{Clock, CoreError, Counter, CounterName, CounterRepository};

/// Read-modify-write operations on named counters.
///
/// The store owns no connection. Every call runs against the session the
/// caller passes in, and the caller decides when that session is acquired
/// and released. Counters are created lazily with value 0 on first access.
#[derive(Clone, Debug)]
pub struct CounterStore<C: Clock> {
    clock: C,
}

impl<C: Clock> CounterStore<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Return the counter with this name, creating it at 0 if absent.
    pub fn get_or_create<R: CounterRepository + ?Sized>(
        &self,
        session: &R,
        name: &CounterName,
    ) -> Result<Counter, CoreError> {
        if let Some(existing) = session.find(name)? {
            return Ok(existing);
        }
        match session.insert(name, 0, self.clock.now()) {
            Ok(created) => Ok(created),
            // Another writer created it between our find and insert
            Err(CoreError::AlreadyExists) => session.find(name)?.ok_or(CoreError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Add 1 and return the new value.
    pub fn increment<R: CounterRepository + ?Sized>(
        &self,
        session: &R,
        name: &CounterName,
    ) -> Result<i64, CoreError> {
        self.apply_delta(session, name, 1)
    }

    /// Subtract 1 and return the new value. There is no floor.
    pub fn decrement<R: CounterRepository + ?Sized>(
        &self,
        session: &R,
        name: &CounterName,
    ) -> Result<i64, CoreError> {
        self.apply_delta(session, name, -1)
    }

    /// Set the value back to 0 and return it.
    pub fn reset<R: CounterRepository + ?Sized>(
        &self,
        session: &R,
        name: &CounterName,
    ) -> Result<i64, CoreError> {
        let now = self.clock.now();
        if let Some(v) = session.set(name, 0, now)? {
            return Ok(v);
        }
        self.get_or_create(session, name)?;
        session.set(name, 0, now)?.ok_or(CoreError::NotFound)
    }

    // The add itself is atomic in the repository; the fallback only runs the
    // first time a name is touched.
    fn apply_delta<R: CounterRepository + ?Sized>(
        &self,
        session: &R,
        name: &CounterName,
        delta: i64,
    ) -> Result<i64, CoreError> {
        let now = self.clock.now();
        if let Some(v) = session.add(name, delta, now)? {
            return Ok(v);
        }
        self.get_or_create(session, name)?;
        session.add(name, delta, now)?.ok_or(CoreError::NotFound)
    }
}
