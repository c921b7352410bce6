//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::{CoreError, MAX_NAME_LEN};

/// Validate a counter name: non-empty and at most `MAX_NAME_LEN` characters.
/// Any characters are allowed and comparison stays exact, so `Test` and
/// `test` name different counters.
pub fn validate_counter_name(s: &str) -> Result<(), CoreError> {
    if s.is_empty() {
        return Err(CoreError::InvalidName("empty".into()));
    }
    if s.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::InvalidName(format!(
            "longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}
