//! Outbound ports
//!
//! Persistence, blob storage and draft storage are owned by hosted services.
//! The core only talks to them through these traits; [`crate::memory`] holds
//! in-memory implementations for tests and offline tooling.

use crate::error::PortResult;
use crate::form::{Form, FormPatch};
use crate::submission::Submission;
use crate::value::Values;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// Filters for listing submissions
#[derive(Clone, Debug, Default)]
pub struct SubmissionQuery {
    /// Only submissions at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only submissions before this instant
    pub until: Option<DateTime<Utc>>,
    /// Maximum number returned, newest first
    pub limit: Option<usize>,
}

impl SubmissionQuery {
    /// Whether a submission falls inside the time bounds
    pub fn matches(&self, submission: &Submission) -> bool {
        let at = submission.submitted_at();
        self.since.map_or(true, |since| at >= since) && self.until.map_or(true, |until| at < until)
    }
}

/// Push notification for a form's submissions
#[derive(Clone, Debug)]
pub enum SubmissionEvent {
    /// A submission was stored
    Created(Submission),
    /// A submission was removed
    Deleted {
        /// Id of the removed submission
        submission_id: String,
    },
}

/// Form persistence port
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Fetch a form by id
    async fn get_form(&self, id: &str) -> PortResult<Form>;

    /// Store a new form; conflicts on an existing id
    async fn create_form(&self, form: Form) -> PortResult<Form>;

    /// Apply a partial update
    async fn update_form(&self, id: &str, patch: FormPatch) -> PortResult<Form>;

    /// Delete a form together with all of its submissions
    async fn delete_form(&self, id: &str) -> PortResult<()>;
}

/// Submission persistence port
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Submissions for a form, newest first
    async fn get_submissions(&self, form_id: &str, query: SubmissionQuery) -> PortResult<Vec<Submission>>;

    /// Store a new submission for `form_id`
    async fn create_submission(&self, form_id: &str, data: Values) -> PortResult<Submission>;

    /// Receive submission events for one form
    async fn subscribe(&self, form_id: &str) -> PortResult<broadcast::Receiver<SubmissionEvent>>;
}

/// Stored blob location
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Public URL
    pub url: String,
    /// Storage path
    pub path: String,
    /// Size in bytes
    pub size: u64,
}

/// Upload progress report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes sent so far
    pub bytes_transferred: u64,
    /// Bytes in the upload
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Share sent, 0-100. An empty upload is complete.
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            100.0
        } else {
            self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Sender side of an upload progress stream
pub type ProgressSender = mpsc::UnboundedSender<UploadProgress>;

/// File/blob storage port
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` at `path`, reporting progress if asked
    async fn upload(&self, data: Vec<u8>, path: &str, progress: Option<ProgressSender>) -> PortResult<StoredObject>;

    /// Remove the object at `path`
    async fn delete(&self, path: &str) -> PortResult<()>;
}

/// Client-side string key-value store used for drafts.
///
/// Nothing depends on its durability.
pub trait DraftStore: Send + Sync {
    /// Raw value under `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Write `value` under `key`
    fn set(&self, key: &str, value: String) -> PortResult<()>;

    /// Delete `key` if present
    fn remove(&self, key: &str);
}
