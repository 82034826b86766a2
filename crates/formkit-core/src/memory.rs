//! In-memory port adapters (for testing and offline tooling)

use crate::clock::{Clock, SystemClock};
use crate::error::{PortError, PortResult};
use crate::form::{Form, FormPatch};
use crate::ports::*;
use crate::submission::Submission;
use crate::value::Values;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Forms and submissions held in process memory
pub struct InMemoryStore {
    forms: RwLock<HashMap<String, Form>>,
    submissions: RwLock<HashMap<String, Vec<Submission>>>,
    channels: RwLock<HashMap<String, broadcast::Sender<SubmissionEvent>>>,
    /// Error returned by the next call, to simulate backend failures
    next_failure: RwLock<Option<PortError>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// Empty store on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store stamping submissions with `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            forms: RwLock::new(HashMap::new()),
            submissions: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            next_failure: RwLock::new(None),
            clock,
        }
    }

    /// Make the next port call fail with `error`
    pub fn fail_next(&self, error: PortError) {
        *self.next_failure.write() = Some(error);
    }

    /// Insert an already built submission (imports, fixtures)
    pub fn insert_submission(&self, submission: Submission) {
        let event = SubmissionEvent::Created(submission.clone());
        let form_id = submission.form_id.clone();
        self.submissions
            .write()
            .entry(form_id.clone())
            .or_default()
            .push(submission);
        self.publish(&form_id, event);
    }

    fn submission_count(&self, form_id: &str) -> u64 {
        self.submissions.read().get(form_id).map_or(0, |s| s.len() as u64)
    }

    fn check_failure(&self) -> PortResult<()> {
        match self.next_failure.write().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn publish(&self, form_id: &str, event: SubmissionEvent) {
        if let Some(sender) = self.channels.read().get(form_id) {
            // No receivers is fine
            let _ = sender.send(event);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormRepository for InMemoryStore {
    async fn get_form(&self, id: &str) -> PortResult<Form> {
        self.check_failure()?;
        self.forms
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("form {}", id)))
    }

    async fn create_form(&self, form: Form) -> PortResult<Form> {
        self.check_failure()?;
        let mut forms = self.forms.write();
        if forms.contains_key(&form.id) {
            return Err(PortError::Conflict(format!("form {} already exists", form.id)));
        }
        forms.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    async fn update_form(&self, id: &str, patch: FormPatch) -> PortResult<Form> {
        self.check_failure()?;
        let mut forms = self.forms.write();
        let form = forms
            .get_mut(id)
            .ok_or_else(|| PortError::NotFound(format!("form {}", id)))?;
        patch.apply(form);
        Ok(form.clone())
    }

    async fn delete_form(&self, id: &str) -> PortResult<()> {
        self.check_failure()?;
        self.forms
            .write()
            .remove(id)
            .ok_or_else(|| PortError::NotFound(format!("form {}", id)))?;
        let removed = self.submissions.write().remove(id).unwrap_or_default();
        for submission in removed {
            self.publish(id, SubmissionEvent::Deleted { submission_id: submission.id });
        }
        self.channels.write().remove(id);
        tracing::debug!(form_id = id, "deleted form and its submissions");
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryStore {
    async fn get_submissions(&self, form_id: &str, query: SubmissionQuery) -> PortResult<Vec<Submission>> {
        self.check_failure()?;
        let mut matching: Vec<_> = self
            .submissions
            .read()
            .get(form_id)
            .map(|all| all.iter().filter(|s| query.matches(s)).cloned().collect())
            .unwrap_or_default();
        matching.sort_by(|a, b| b.submitted_at().cmp(&a.submitted_at()));
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }

    async fn create_submission(&self, form_id: &str, data: Values) -> PortResult<Submission> {
        self.check_failure()?;
        let form = self
            .forms
            .read()
            .get(form_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("form {}", form_id)))?;
        let now = self.clock.now();
        form.ensure_accepting(now, self.submission_count(form_id))
            .map_err(|e| PortError::Conflict(format!("form {}: {}", form_id, e)))?;
        let submission = Submission::for_form(&form, data, now);
        self.insert_submission(submission.clone());
        Ok(submission)
    }

    async fn subscribe(&self, form_id: &str) -> PortResult<broadcast::Receiver<SubmissionEvent>> {
        self.check_failure()?;
        if !self.forms.read().contains_key(form_id) {
            return Err(PortError::NotFound(format!("form {}", form_id)));
        }
        let receiver = self
            .channels
            .write()
            .entry(form_id.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .subscribe();
        Ok(receiver)
    }
}

/// Blob storage held in process memory
pub struct InMemoryBlobStorage {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStorage {
    /// Storage whose URLs start with `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Whether an object exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().contains_key(path)
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn upload(&self, data: Vec<u8>, path: &str, progress: Option<ProgressSender>) -> PortResult<StoredObject> {
        if path.is_empty() || path.starts_with('/') {
            return Err(PortError::PermissionDenied(format!("invalid object path '{}'", path)));
        }
        let total = data.len() as u64;
        if let Some(progress) = &progress {
            let mut sent = 0u64;
            for chunk in data.chunks(UPLOAD_CHUNK_BYTES) {
                sent += chunk.len() as u64;
                let _ = progress.send(UploadProgress { bytes_transferred: sent, total_bytes: total });
            }
            if total == 0 {
                let _ = progress.send(UploadProgress { bytes_transferred: 0, total_bytes: 0 });
            }
        }
        self.objects.write().insert(path.to_string(), data);
        Ok(StoredObject {
            url: format!("{}/{}", self.base_url.trim_end_matches('/'), path),
            path: path.to_string(),
            size: total,
        })
    }

    async fn delete(&self, path: &str) -> PortResult<()> {
        self.objects
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("object {}", path)))
    }
}

/// Draft store held in process memory
#[derive(Default)]
pub struct InMemoryDraftStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryDraftStore {
    /// Empty draft store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for InMemoryDraftStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> PortResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
