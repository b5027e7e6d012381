//! Per-run answer cache in front of another oracle.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{DerivativeOracle, DerivativeStatus};

/// Remembers answers for the lifetime of one optimization so a derivative referenced several
/// times on a page is only looked up once. Failed lookups are retried on the next reference.
#[derive(Debug)]
pub struct MemoizedOracle<O> {
    inner: O,
    answers: RefCell<HashMap<String, bool>>,
}

impl<O: DerivativeOracle> MemoizedOracle<O> {
    /// Wrap `inner` with an empty answer cache.
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            answers: RefCell::new(HashMap::new()),
        }
    }
}

impl<O: DerivativeOracle> DerivativeOracle for MemoizedOracle<O> {
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        if let Some(&exists) = self.answers.borrow().get(candidate_url) {
            return if exists {
                DerivativeStatus::Found(candidate_url.to_string())
            } else {
                DerivativeStatus::NotFound
            };
        }

        let status = self.inner.check(candidate_url);
        if !matches!(status, DerivativeStatus::CheckFailed(_)) {
            self.answers
                .borrow_mut()
                .insert(candidate_url.to_string(), status.exists());
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::oracle::OracleError;

    struct Counting {
        calls: Cell<usize>,
        fail: bool,
    }

    impl DerivativeOracle for Counting {
        fn check(&self, candidate_url: &str) -> DerivativeStatus {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                DerivativeStatus::CheckFailed(OracleError::Panicked(candidate_url.into()))
            } else if candidate_url.contains("hit") {
                DerivativeStatus::Found(candidate_url.into())
            } else {
                DerivativeStatus::NotFound
            }
        }
    }

    #[test]
    fn answers_repeated_lookups_from_memory() {
        let counting = Counting {
            calls: Cell::new(0),
            fail: false,
        };
        let oracle = MemoizedOracle::new(&counting);
        assert!(oracle.check("/hit.webp").exists());
        assert!(oracle.check("/hit.webp").exists());
        assert!(!oracle.check("/miss.webp").exists());
        assert!(!oracle.check("/miss.webp").exists());
        assert_eq!(oracle.answers.borrow().len(), 2);
        assert_eq!(counting.calls.get(), 2);
    }

    #[test]
    fn does_not_remember_failures() {
        let counting = Counting {
            calls: Cell::new(0),
            fail: true,
        };
        let oracle = MemoizedOracle::new(&counting);
        assert!(!oracle.check("/hit.webp").exists());
        assert!(!oracle.check("/hit.webp").exists());
        assert!(oracle.answers.borrow().is_empty());
        assert_eq!(counting.calls.get(), 2);
    }
}
