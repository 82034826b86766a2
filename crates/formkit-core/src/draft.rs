//! Draft autosave and recovery

use crate::error::FormResult;
use crate::ports::DraftStore;
use crate::value::Values;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const KEY_PREFIX: &str = "formkit:draft:";

/// Saved in-progress answers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Form the draft belongs to
    pub form_id: String,
    /// Answers so far
    pub values: Values,
    /// When the draft was written
    pub saved_at: DateTime<Utc>,
}

/// Stores one draft per form in a [`DraftStore`]
pub struct DraftManager {
    store: Arc<dyn DraftStore>,
}

impl DraftManager {
    /// Manager over `store`
    pub fn new(store: Arc<dyn DraftStore>) -> Self {
        Self { store }
    }

    /// Storage key for a form's draft
    pub fn key(form_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, form_id)
    }

    /// Replace the form's draft with `values`
    pub fn save(&self, form_id: &str, values: &Values, now: DateTime<Utc>) -> FormResult<()> {
        let draft = Draft {
            form_id: form_id.to_string(),
            values: values.clone(),
            saved_at: now,
        };
        let encoded = serde_json::to_string(&draft)?;
        self.store.set(&Self::key(form_id), encoded)?;
        Ok(())
    }

    /// Load a draft. Unreadable drafts are dropped.
    pub fn load(&self, form_id: &str) -> Option<Draft> {
        let key = Self::key(form_id);
        let raw = self.store.get(&key)?;
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::warn!(form_id, error = %e, "discarding unreadable draft");
                self.store.remove(&key);
                None
            }
        }
    }

    /// Drop the form's draft, e.g. after a successful submit
    pub fn discard(&self, form_id: &str) {
        self.store.remove(&Self::key(form_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDraftStore;
    use serde_json::json;

    #[test]
    fn test_save_load_discard() {
        let store = Arc::new(InMemoryDraftStore::new());
        let drafts = DraftManager::new(store.clone());
        let values: Values = [("name".to_string(), json!("Ada"))].into_iter().collect();
        let now = Utc::now();

        drafts.save("f1", &values, now).unwrap();
        assert!(store.get("formkit:draft:f1").is_some());

        let draft = drafts.load("f1").unwrap();
        assert_eq!(draft.values, values);
        assert!(drafts.load("f2").is_none());

        drafts.discard("f1");
        assert!(drafts.load("f1").is_none());
    }

    #[test]
    fn test_corrupt_draft_is_dropped() {
        let store = Arc::new(InMemoryDraftStore::new());
        store.set("formkit:draft:f1", "{not json".into()).unwrap();
        let drafts = DraftManager::new(store.clone());

        assert!(drafts.load("f1").is_none());
        assert!(store.get("formkit:draft:f1").is_none());
    }
}
