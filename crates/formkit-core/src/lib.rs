//! formkit core - shared domain model for the form builder
//!
//! This crate provides:
//! - Form, field and submission definitions
//! - The value presence rules every other crate agrees on
//! - Error types
//! - Collaborator ports (persistence, blob storage, drafts) and in-memory adapters
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        formkit-core                         │
//! │                                                            │
//! │  ┌──────────┐   ┌────────────┐   ┌────────────────────┐    │
//! │  │   Form   │──►│   Field    │   │     Submission     │    │
//! │  │ (builder)│   │ Definition │   │  data + metadata   │    │
//! │  └──────────┘   └────────────┘   └────────────────────┘    │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  Ports: FormRepository │ SubmissionRepository │       │  │
//! │  │         BlobStorage    │ DraftStore                   │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod draft;
pub mod error;
pub mod field;
pub mod form;
pub mod memory;
pub mod ports;
pub mod submission;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use draft::DraftManager;
pub use error::{FormError, FormResult, PortError, PortResult};
pub use field::{
    Condition, FieldDefinition, FieldDependency, FieldOption, FieldType, Rule,
};
pub use form::{Form, FormPatch, FormSettings, FormStatus, LintWarning, NotificationSettings};
pub use submission::{Submission, SubmissionMetadata};
pub use value::Values;
