//! Derivative lookups over HTTP.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;

use super::{DerivativeOracle, DerivativeStatus, OracleError};

/// Derivative lookup issuing `HEAD` requests against a content-delivery store.
///
/// The timeout is enforced by the HTTP client, so a stalled CDN surfaces as
/// [`DerivativeStatus::CheckFailed`] instead of blocking the response.
#[derive(Debug, Clone)]
pub struct CdnOracle {
    client: Client,
    base_url: String,
}

impl CdnOracle {
    /// Build an oracle for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Build an oracle reusing an existing HTTP client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Absolute URL that will be requested for `candidate_url`.
    pub fn resolve(&self, candidate_url: &str) -> String {
        if has_scheme(candidate_url, "http://") || has_scheme(candidate_url, "https://") {
            return candidate_url.to_string();
        }
        if let Some(rest) = candidate_url.strip_prefix("//") {
            return format!("https://{rest}");
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            candidate_url.trim_start_matches('/')
        )
    }
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    url.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

impl DerivativeOracle for CdnOracle {
    fn check(&self, candidate_url: &str) -> DerivativeStatus {
        let url = self.resolve(candidate_url);
        let response = match self.client.head(&url).send() {
            Ok(response) => response,
            Err(err) => return DerivativeStatus::CheckFailed(OracleError::Http(err)),
        };

        let status = response.status();
        if status.is_success() {
            DerivativeStatus::Found(candidate_url.to_string())
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            DerivativeStatus::NotFound
        } else {
            DerivativeStatus::CheckFailed(OracleError::Status {
                status: status.as_u16(),
                url,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle(base: &str) -> CdnOracle {
        CdnOracle::new(base, Duration::from_millis(200)).unwrap()
    }

    #[test]
    fn joins_relative_candidates_onto_base() {
        let cdn = oracle("https://cdn.example.com/static/");
        assert_eq!(
            cdn.resolve("/media/a.webp"),
            "https://cdn.example.com/static/media/a.webp"
        );
        assert_eq!(
            cdn.resolve("media/a.webp"),
            "https://cdn.example.com/static/media/a.webp"
        );
    }

    #[test]
    fn keeps_absolute_candidates() {
        let cdn = oracle("https://cdn.example.com");
        assert_eq!(
            cdn.resolve("http://img.example.com/a.webp"),
            "http://img.example.com/a.webp"
        );
        assert_eq!(
            cdn.resolve("HTTPS://img.example.com/a.webp"),
            "HTTPS://img.example.com/a.webp"
        );
        assert_eq!(
            cdn.resolve("//img.example.com/a.webp"),
            "https://img.example.com/a.webp"
        );
    }

    #[test]
    fn unreachable_store_reports_check_failed() {
        let cdn = oracle("http://127.0.0.1:1");
        let status = cdn.check("/media/a.webp");
        assert!(matches!(
            status,
            DerivativeStatus::CheckFailed(OracleError::Http(_))
        ));
    }
}
