//! Per-key debouncing
//!
//! Only the last call scheduled for a key within the delay window runs.
//! Superseded calls are dropped, not queued.

use crate::AsyncValidationConfig;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delays work per key and drops everything but the latest call
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    generations: Arc<DashMap<String, u64>>,
    sequence: Arc<AtomicU64>,
}

impl Debouncer {
    /// Debouncer waiting `delay` after the last call
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generations: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Debouncer using the configured window
    pub fn from_config(config: &AsyncValidationConfig) -> Self {
        Self::new(config.debounce())
    }

    /// Schedule `f` for `key` after the delay.
    ///
    /// The handle resolves to `None` when a later call for the same key
    /// replaced this one before the delay elapsed.
    pub fn call<F, Fut, T>(&self, key: impl Into<String>, f: F) -> JoinHandle<Option<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send,
        T: Send + 'static,
    {
        let key = key.into();
        let generation = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.generations.insert(key.clone(), generation);

        let generations = self.generations.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generations.remove_if(&key, |_, latest| *latest == generation).is_none() {
                tracing::trace!(%key, generation, "debounced call superseded");
                return None;
            }
            Some(f().await)
        })
    }

    /// Keys with a call waiting for its delay
    pub fn pending(&self) -> usize {
        self.generations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_call_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for text in ["a", "ad", "ada"] {
            let runs = runs.clone();
            handles.push(debouncer.call("username", move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                text.len()
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let results: Vec<_> = futures_results(handles).await;
        assert_eq!(results, vec![None, None, Some(3)]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let email = debouncer.call("email", || async { "email" });
        let name = debouncer.call("name", || async { "name" });
        assert_eq!(email.await.unwrap(), Some("email"));
        assert_eq!(name.await.unwrap(), Some("name"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_outside_the_window_all_run() {
        let debouncer = Debouncer::from_config(&AsyncValidationConfig::default());
        let first = debouncer.call("f", || async { 1 });
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = debouncer.call("f", || async { 2 });
        assert_eq!(first.await.unwrap(), Some(1));
        assert_eq!(second.await.unwrap(), Some(2));
    }

    async fn futures_results<T>(handles: Vec<JoinHandle<Option<T>>>) -> Vec<Option<T>> {
        let mut out = Vec::new();
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }
}
