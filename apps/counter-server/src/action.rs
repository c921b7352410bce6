//! The three user actions shared by the page and the JSON API.

use domain::store::CounterStore;
use domain::{Clock, CoreError, CounterName, CounterRepository};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterAction {
    Increment,
    Decrement,
    Reset,
}

/// Visual style of a page notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Positive,
    Info,
    Warning,
    Negative,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Positive => "positive",
            NoticeKind::Info => "info",
            NoticeKind::Warning => "warning",
            NoticeKind::Negative => "negative",
        }
    }

    /// Milliseconds before the page hides the notice; errors stay put.
    pub fn timeout_ms(&self) -> Option<u32> {
        match self {
            NoticeKind::Negative => None,
            _ => Some(1000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl CounterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterAction::Increment => "increment",
            CounterAction::Decrement => "decrement",
            CounterAction::Reset => "reset",
        }
    }

    /// Run the action against `session` and return the new value.
    pub fn apply<C: Clock, R: CounterRepository + ?Sized>(
        &self,
        store: &CounterStore<C>,
        session: &R,
        name: &CounterName,
    ) -> Result<i64, CoreError> {
        match self {
            CounterAction::Increment => store.increment(session, name),
            CounterAction::Decrement => store.decrement(session, name),
            CounterAction::Reset => store.reset(session, name),
        }
    }

    pub fn success_notice(&self) -> Notice {
        let (kind, message) = match self {
            CounterAction::Increment => (NoticeKind::Positive, "Counter incremented!"),
            CounterAction::Decrement => (NoticeKind::Info, "Counter decremented!"),
            CounterAction::Reset => (NoticeKind::Warning, "Counter reset to 0!"),
        };
        Notice {
            kind,
            message: message.to_string(),
        }
    }

    pub fn failure_notice(&self, err: &CoreError) -> Notice {
        let verb = match self {
            CounterAction::Increment => "incrementing",
            CounterAction::Decrement => "decrementing",
            CounterAction::Reset => "resetting",
        };
        Notice {
            kind: NoticeKind::Negative,
            message: format!("Error {} counter: {}", verb, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::adapters::memory_repo::InMemoryDb;
    use domain::SystemClock;

    #[test]
    fn actions_deserialize_from_lowercase_path_segments() {
        let a: CounterAction = serde_json::from_str("\"increment\"").unwrap();
        assert_eq!(a, CounterAction::Increment);
        let r: CounterAction = serde_json::from_str("\"reset\"").unwrap();
        assert_eq!(r, CounterAction::Reset);
        assert!(serde_json::from_str::<CounterAction>("\"explode\"").is_err());
    }

    #[test]
    fn notices_match_action() {
        assert_eq!(
            CounterAction::Increment.success_notice().message,
            "Counter incremented!"
        );
        assert_eq!(
            CounterAction::Decrement.success_notice().kind,
            NoticeKind::Info
        );
        let failure =
            CounterAction::Reset.failure_notice(&CoreError::Storage("disk full".into()));
        assert_eq!(
            failure.message,
            "Error resetting counter: storage error: disk full"
        );
        assert_eq!(failure.kind.timeout_ms(), None);
        assert_eq!(NoticeKind::Warning.timeout_ms(), Some(1000));
    }

    #[test]
    fn apply_dispatches_to_store() {
        let db = InMemoryDb::new();
        let store = CounterStore::new(SystemClock);
        let n = CounterName::default();
        assert_eq!(CounterAction::Increment.apply(&store, &db, &n).unwrap(), 1);
        assert_eq!(CounterAction::Increment.apply(&store, &db, &n).unwrap(), 2);
        assert_eq!(CounterAction::Decrement.apply(&store, &db, &n).unwrap(), 1);
        assert_eq!(CounterAction::Reset.apply(&store, &db, &n).unwrap(), 0);
    }
}
