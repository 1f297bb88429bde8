//! Sequencing for the `*_all` operations.
//!
//! Two policies exist. [`fail_fast`] stops at the first failure and leaves
//! the remaining items untouched. [`best_effort`] attempts every item and
//! reports the last failure, so items that succeeded stay fully applied.
//! Neither undoes work already done.

use crate::error::{PouchError, Result};

/// Reject an empty bulk input.
pub fn require_items(len: usize, what: &str) -> Result<()> {
    if len == 0 {
        return Err(PouchError::contract(format!("no entities to {what} (empty slice)")));
    }
    Ok(())
}

pub fn fail_fast<T>(items: impl IntoIterator<Item = T>, mut op: impl FnMut(T) -> Result<()>) -> Result<()> {
    for item in items {
        op(item)?;
    }
    Ok(())
}

pub fn best_effort<T>(
    items: impl IntoIterator<Item = T>,
    mut op: impl FnMut(T) -> Result<()>,
) -> Result<()> {
    let mut last = None;
    for (idx, item) in items.into_iter().enumerate() {
        if let Err(e) = op(item) {
            log::debug!("bulk item {idx} failed: {e}");
            last = Some(e);
        }
    }
    last.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn odd_fails(n: i32, seen: &mut Vec<i32>) -> Result<()> {
        seen.push(n);
        if n % 2 == 1 {
            Err(PouchError::NotFound(n.to_string()))
        } else {
            Ok(())
        }
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let mut seen = Vec::new();
        let err = fail_fast([0, 1, 2, 3], |n| odd_fails(n, &mut seen)).unwrap_err();
        assert_eq!(err.to_string(), "not found: 1");
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_best_effort_attempts_all_and_keeps_last_error() {
        let mut seen = Vec::new();
        let err = best_effort([0, 1, 2, 3, 4], |n| odd_fails(n, &mut seen)).unwrap_err();
        assert_eq!(err.to_string(), "not found: 3");
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_require_items() {
        assert!(require_items(0, "insert").unwrap_err().is_contract());
        assert!(require_items(2, "insert").is_ok());
    }
}
