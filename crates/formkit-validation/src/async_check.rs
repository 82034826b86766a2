//! Async field validation
//!
//! For checks that call out to something slow (uniqueness lookups and the
//! like). Per field id the last request wins: starting a validation cancels
//! the one in flight. Each attempt is bounded by a timeout and transient
//! failures are retried with linear backoff.

use crate::result::{ValidationIssue, ValidationResult};
use crate::AsyncValidationConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use formkit_core::field::FieldDefinition;
use formkit_core::value::is_answered;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Message reported for timeouts and exhausted transport failures
pub const NETWORK_ERROR_MESSAGE: &str = "Validation failed due to network error";

/// Failure of the remote check itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AsyncCheckError {
    /// Worth retrying
    #[error("transient check failure: {0}")]
    Transient(String),

    /// Retrying will not help
    #[error("check failure: {0}")]
    Permanent(String),
}

/// Answer of a remote check that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncVerdict {
    /// Value accepted
    Pass,
    /// Value rejected, with the message to show
    Fail(String),
}

/// A check that needs to await something external
#[async_trait]
pub trait AsyncRule: Send + Sync {
    /// Rule name used in issues
    fn name(&self) -> &str;

    /// Run the check. Implementations should stop early once `cancel` fires.
    async fn check(
        &self,
        value: &Value,
        field: &FieldDefinition,
        cancel: &CancellationToken,
    ) -> Result<AsyncVerdict, AsyncCheckError>;
}

/// Result of an async validation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncOutcome {
    /// The check finished; failures are in the result
    Completed(ValidationResult),
    /// A newer request for the same field took over
    Superseded,
}

impl AsyncOutcome {
    /// The result, unless the request was superseded
    pub fn into_result(self) -> Option<ValidationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Superseded => None,
        }
    }
}

/// Runs async rules with last-write-wins per field
pub struct AsyncFieldValidator {
    config: AsyncValidationConfig,
    in_flight: DashMap<String, (u64, CancellationToken)>,
    sequence: AtomicU64,
}

impl AsyncFieldValidator {
    /// Validator with no requests in flight
    pub fn new(config: AsyncValidationConfig) -> Self {
        Self {
            config,
            in_flight: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Timeout, retry and debounce settings
    pub fn config(&self) -> &AsyncValidationConfig {
        &self.config
    }

    /// Validate `value` with `rule`, cancelling any request in flight for the field
    pub async fn validate(&self, value: &Value, field: &FieldDefinition, rule: &dyn AsyncRule) -> AsyncOutcome {
        let (ticket, token) = self.begin(&field.id);

        if !is_answered(field.field_type, value) {
            self.finish(&field.id, ticket);
            return AsyncOutcome::Completed(ValidationResult::valid());
        }

        let result = self.attempt_all(value, field, rule, &token).await;
        self.finish(&field.id, ticket);

        match result {
            Some(result) if !token.is_cancelled() => AsyncOutcome::Completed(result),
            _ => {
                tracing::debug!(field = %field.id, rule = %rule.name(), "async validation superseded");
                AsyncOutcome::Superseded
            }
        }
    }

    /// Cancel the request in flight for a field, if any
    pub fn cancel(&self, field_id: &str) -> bool {
        match self.in_flight.remove(field_id) {
            Some((_, (_, token))) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Fields with a request still running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn begin(&self, field_id: &str) -> (u64, CancellationToken) {
        let ticket = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.in_flight.insert(field_id.to_string(), (ticket, token.clone())) {
            previous.cancel();
        }
        (ticket, token)
    }

    fn finish(&self, field_id: &str, ticket: u64) {
        self.in_flight.remove_if(field_id, |_, (current, _)| *current == ticket);
    }

    /// `None` when cancelled
    async fn attempt_all(
        &self,
        value: &Value,
        field: &FieldDefinition,
        rule: &dyn AsyncRule,
        token: &CancellationToken,
    ) -> Option<ValidationResult> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let check = tokio::time::timeout(self.config.timeout(), rule.check(value, field, token));
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                outcome = check => outcome,
            };

            match outcome {
                Ok(Ok(AsyncVerdict::Pass)) => return Some(ValidationResult::valid()),
                Ok(Ok(AsyncVerdict::Fail(message))) => {
                    return Some(ValidationResult::invalid(
                        ValidationIssue::error(rule.name(), message).for_field(&field.id),
                    ));
                }
                Ok(Err(AsyncCheckError::Transient(reason))) if attempt < max_attempts => {
                    let backoff = self.config.backoff_step() * attempt;
                    tracing::warn!(
                        field = %field.id,
                        rule = %rule.name(),
                        attempt,
                        %reason,
                        "async validation failed, retrying in {:?}",
                        backoff
                    );
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return None,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    attempt += 1;
                }
                Ok(Err(error)) => {
                    tracing::warn!(field = %field.id, rule = %rule.name(), attempt, %error, "async validation gave up");
                    return Some(ValidationResult::invalid(
                        ValidationIssue::error("network", NETWORK_ERROR_MESSAGE).for_field(&field.id),
                    ));
                }
                Err(_) => {
                    tracing::warn!(field = %field.id, rule = %rule.name(), timeout_ms = self.config.timeout_ms, "async validation timed out");
                    return Some(ValidationResult::invalid(
                        ValidationIssue::error("timeout", NETWORK_ERROR_MESSAGE).for_field(&field.id),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::FieldType;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Rejects "taken" after a delay
    struct UniqueUsername {
        delay: Duration,
    }

    #[async_trait]
    impl AsyncRule for UniqueUsername {
        fn name(&self) -> &str {
            "unique"
        }

        async fn check(
            &self,
            value: &Value,
            _field: &FieldDefinition,
            _cancel: &CancellationToken,
        ) -> Result<AsyncVerdict, AsyncCheckError> {
            tokio::time::sleep(self.delay).await;
            if *value == "taken" {
                Ok(AsyncVerdict::Fail("Username is already taken".into()))
            } else {
                Ok(AsyncVerdict::Pass)
            }
        }
    }

    /// Fails transiently a fixed number of times, then passes
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        permanent: bool,
    }

    #[async_trait]
    impl AsyncRule for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn check(
            &self,
            _value: &Value,
            _field: &FieldDefinition,
            _cancel: &CancellationToken,
        ) -> Result<AsyncVerdict, AsyncCheckError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.permanent {
                Err(AsyncCheckError::Permanent("forbidden".into()))
            } else if call < self.failures {
                Err(AsyncCheckError::Transient("connection reset".into()))
            } else {
                Ok(AsyncVerdict::Pass)
            }
        }
    }

    fn flaky(failures: u32) -> Flaky {
        Flaky {
            failures,
            calls: AtomicU32::new(0),
            permanent: false,
        }
    }

    fn username() -> FieldDefinition {
        FieldDefinition::new("username", FieldType::Text, "Username")
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_and_fail() {
        let v = AsyncFieldValidator::new(AsyncValidationConfig::default());
        let rule = UniqueUsername { delay: Duration::from_millis(100) };

        let free = v.validate(&json!("ada"), &username(), &rule).await;
        assert_eq!(free, AsyncOutcome::Completed(ValidationResult::valid()));

        let taken = v.validate(&json!("taken"), &username(), &rule).await.into_result().unwrap();
        assert_eq!(taken.error_rules(), vec!["unique"]);
        assert_eq!(taken.errors[0].field_id.as_deref(), Some("username"));
        assert_eq!(v.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let v = AsyncFieldValidator::new(AsyncValidationConfig::default());
        let rule = UniqueUsername { delay: Duration::from_secs(30) };

        let started = Instant::now();
        let result = v.validate(&json!("ada"), &username(), &rule).await.into_result().unwrap();
        assert_eq!(result.error_rules(), vec!["timeout"]);
        assert_eq!(result.errors[0].message, NETWORK_ERROR_MESSAGE);
        assert_eq!(started.elapsed(), Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_with_linear_backoff() {
        let v = AsyncFieldValidator::new(AsyncValidationConfig::default());
        let rule = flaky(2);

        let started = Instant::now();
        let outcome = v.validate(&json!("ada"), &username(), &rule).await;
        assert_eq!(outcome, AsyncOutcome::Completed(ValidationResult::valid()));
        assert_eq!(rule.calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_network_error() {
        let v = AsyncFieldValidator::new(AsyncValidationConfig::default());
        let rule = flaky(10);

        let result = v.validate(&json!("ada"), &username(), &rule).await.into_result().unwrap();
        assert_eq!(result.error_rules(), vec!["network"]);
        assert_eq!(rule.calls.load(Ordering::SeqCst), 3);

        let permanent = Flaky {
            permanent: true,
            ..flaky(0)
        };
        let result = v.validate(&json!("ada"), &username(), &permanent).await.into_result().unwrap();
        assert_eq!(result.error_rules(), vec!["network"]);
        assert_eq!(permanent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins() {
        let v = Arc::new(AsyncFieldValidator::new(AsyncValidationConfig::default()));
        let rule = Arc::new(UniqueUsername { delay: Duration::from_millis(500) });

        let first = {
            let (v, rule) = (v.clone(), rule.clone());
            tokio::spawn(async move { v.validate(&json!("taken"), &username(), &*rule).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(v.in_flight_count(), 1);

        let second = v.validate(&json!("ada"), &username(), &*rule).await;

        assert_eq!(first.await.unwrap(), AsyncOutcome::Superseded);
        assert_eq!(second, AsyncOutcome::Completed(ValidationResult::valid()));
        assert_eq!(v.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel() {
        let v = Arc::new(AsyncFieldValidator::new(AsyncValidationConfig::default()));
        let rule = Arc::new(UniqueUsername { delay: Duration::from_secs(1) });

        let pending = {
            let (v, rule) = (v.clone(), rule.clone());
            tokio::spawn(async move { v.validate(&json!("ada"), &username(), &*rule).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(v.cancel("username"));
        assert_eq!(pending.await.unwrap(), AsyncOutcome::Superseded);
        assert!(!v.cancel("username"));
    }

    #[tokio::test]
    async fn test_absent_value_skips_check() {
        let v = AsyncFieldValidator::new(AsyncValidationConfig::default());
        let rule = flaky(10);
        let outcome = v.validate(&json!(""), &username(), &rule).await;
        assert_eq!(outcome, AsyncOutcome::Completed(ValidationResult::valid()));
        assert_eq!(rule.calls.load(Ordering::SeqCst), 0);
    }
}
