//! Lookups answering whether a precomputed derivative asset (e.g. a WebP copy) exists.
//!
//! The rewrite passes only see the [`DerivativeOracle`] trait. Concrete lookups live in focused
//! submodules so the local-store, CDN and memoization behaviour can be tested independently.

mod cdn;
mod local;
mod memo;

use std::panic::{AssertUnwindSafe, catch_unwind};

pub use cdn::CdnOracle;
pub use local::LocalDerivativeStore;
pub use memo::MemoizedOracle;

/// Reasons a derivative lookup could not produce an answer.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The HTTP request to the content-delivery store failed or timed out.
    #[error("derivative request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The CDN answered with a status that is neither success nor not-found.
    #[error("unexpected status {status} for {url}")]
    Status {
        /// Status code returned by the store.
        status: u16,
        /// URL that was checked.
        url: String,
    },
    /// Reading the local derivative store failed.
    #[error("derivative store error: {0}")]
    Io(#[from] std::io::Error),
    /// The lookup panicked; the panic was contained.
    #[error("derivative lookup panicked for {0}")]
    Panicked(String),
}

/// Outcome of a single derivative lookup.
#[derive(Debug)]
pub enum DerivativeStatus {
    /// The derivative exists at the given URL.
    Found(String),
    /// The store answered and the derivative does not exist.
    NotFound,
    /// The store could not be consulted.
    CheckFailed(OracleError),
}

impl DerivativeStatus {
    /// Collapse the status to the only decision the rewrite passes care about.
    pub fn exists(&self) -> bool {
        matches!(self, DerivativeStatus::Found(_))
    }
}

/// External capability checking whether a derivative asset is available.
///
/// Implementations must bound their own latency; a slow store should report
/// [`DerivativeStatus::CheckFailed`] rather than block indefinitely.
pub trait DerivativeOracle {
    /// Check whether `candidate_url` is available.
    fn check(&self, candidate_url: &str) -> DerivativeStatus;
}

impl<T: DerivativeOracle + ?Sized> DerivativeOracle for &T {
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        (**self).check(candidate_url)
    }
}

impl<T: DerivativeOracle + ?Sized> DerivativeOracle for Box<T> {
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        (**self).check(candidate_url)
    }
}

/// Oracle used when no derivative store is configured: nothing ever exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerivatives;

impl DerivativeOracle for NoDerivatives {
    fn check(&self, _candidate_url: &str) -> DerivativeStatus {
        DerivativeStatus::NotFound
    }
}

/// Adapter turning a plain `Fn(&str) -> bool` into an oracle.
pub struct FnOracle<F>(pub F);

impl<F> DerivativeOracle for FnOracle<F>
where
    F: Fn(&str) -> bool,
{
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        if (self.0)(candidate_url) {
            DerivativeStatus::Found(candidate_url.to_string())
        } else {
            DerivativeStatus::NotFound
        }
    }
}

/// Run a lookup, converting a panic inside the oracle into [`DerivativeStatus::CheckFailed`].
pub fn check_contained<O: DerivativeOracle + ?Sized>(
    oracle: &O,
    candidate_url: &str,
) -> DerivativeStatus {
    catch_unwind(AssertUnwindSafe(|| oracle.check(candidate_url))).unwrap_or_else(|_| {
        DerivativeStatus::CheckFailed(OracleError::Panicked(candidate_url.into()))
    })
}
