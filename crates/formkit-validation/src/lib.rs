//! formkit validation engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Form Validator                          │
//! │                                                              │
//! │  ┌─────────────┐  per field  ┌───────────────┐               │
//! │  │   Field     │────────────►│ Rule Registry │               │
//! │  │  Validator  │             │ (templates,   │               │
//! │  └─────────────┘             │  custom rules)│               │
//! │        │  ▲                  └───────────────┘               │
//! │        ▼  │ hit                                              │
//! │  ┌─────────────┐   after all fields   ┌──────────────────┐   │
//! │  │ TTL Cache   │                      │   Cross-Field    │   │
//! │  │ (bounded)   │                      │    Resolver      │   │
//! │  └─────────────┘                      └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here panics or returns `Err` for bad input: every entry point
//! returns a result object with an explicit validity channel.

#![warn(missing_docs)]

pub mod async_check;
pub mod cache;
pub mod cross_field;
pub mod debounce;
pub mod field;
pub mod form;
pub mod message;
pub mod registry;
pub mod result;
mod rules;

pub use async_check::{AsyncCheckError, AsyncFieldValidator, AsyncOutcome, AsyncRule, AsyncVerdict};
pub use cache::ValidationCache;
pub use cross_field::CrossFieldResolver;
pub use debounce::Debouncer;
pub use field::{FieldValidationOptions, FieldValidator, ValidatorStats};
pub use form::{FormValidationOptions, FormValidator};
pub use registry::{CustomRule, RuleRegistry};
pub use result::{FormValidationResult, Severity, ValidationIssue, ValidationResult, ValidationSummary};

use formkit_core::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Lifetime of cached field results
    pub field_cache_ttl_ms: u64,
    /// Lifetime of cached form results
    pub form_cache_ttl_ms: u64,
    /// Maximum cached results per kind
    pub cache_capacity: u64,
    /// Check values against their declared field type
    pub enforce_field_types: bool,
    /// Async validation settings
    pub async_validation: AsyncValidationConfig,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            field_cache_ttl_ms: 5_000,
            form_cache_ttl_ms: 3_000,
            cache_capacity: 10_000,
            enforce_field_types: true,
            async_validation: AsyncValidationConfig::default(),
        }
    }
}

/// Async validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncValidationConfig {
    /// Per-attempt timeout
    pub timeout_ms: u64,
    /// Attempts for transient failures, including the first
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * backoff_step_ms`
    pub backoff_step_ms: u64,
    /// Debounce window for change-triggered validation
    pub debounce_ms: u64,
}

impl AsyncValidationConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff unit between attempts
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    /// Debounce window
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AsyncValidationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 3,
            backoff_step_ms: 1_000,
            debounce_ms: 300,
        }
    }
}

/// All validation services wired to one registry, clock and cache
pub struct ValidationService {
    /// Single field validation
    pub fields: Arc<FieldValidator>,
    /// Whole form validation
    pub forms: FormValidator,
    /// Async (remote) checks
    pub remote: AsyncFieldValidator,
}

impl ValidationService {
    /// Build the services with the system clock
    pub fn new(registry: Arc<RuleRegistry>, config: ValidationConfig) -> Self {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    /// Build the services with an injected clock
    pub fn with_clock(registry: Arc<RuleRegistry>, config: ValidationConfig, clock: Arc<dyn Clock>) -> Self {
        let remote = AsyncFieldValidator::new(config.async_validation.clone());
        let fields = Arc::new(FieldValidator::with_clock(registry, config, clock));
        Self {
            forms: FormValidator::new(fields.clone()),
            fields,
            remote,
        }
    }
}
