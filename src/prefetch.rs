//! Per-session prefetch slot and the bounded pool that fills it.
//!
//! The cache holds at most one question per session. Reads consume the slot;
//! writes replace it. The pool caps how many background generations run at
//! once and drops submissions beyond that.

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::domain::GeneratedQuestion;

#[derive(Default)]
pub struct PrefetchCache {
    slots: Mutex<HashMap<String, GeneratedQuestion>>,
}

impl PrefetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `question` for `session_id`, dropping whatever was there.
    pub async fn replace(&self, session_id: &str, question: GeneratedQuestion) {
        let replaced = self.slots.lock().await.insert(session_id.to_string(), question).is_some();
        debug!(target: "quiz", %session_id, replaced, "Prefetch slot filled");
    }

    /// Take the session's question, leaving the slot empty.
    pub async fn consume(&self, session_id: &str) -> Option<GeneratedQuestion> {
        self.slots.lock().await.remove(session_id)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

/// Bounded executor for background prefetch jobs.
#[derive(Clone)]
pub struct PrefetchPool {
    permits: Arc<Semaphore>,
}

impl PrefetchPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(max_concurrent.max(1))) }
    }

    /// Spawn `job` if a slot is free. Returns false (and does nothing) when
    /// the pool is saturated.
    pub fn submit<F>(&self, label: &str, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                warn!(target: "quiz", %label, "Prefetch pool saturated; job dropped");
                return false;
            }
        };
        tokio::spawn(async move {
            job.await;
            drop(permit);
        });
        true
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandidateQuestion;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn generated(text: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            question: CandidateQuestion {
                question_id: "id".into(),
                question_text: text.into(),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_option_index: 0,
                hint: "h".into(),
                explanation: "e".into(),
                code_context: None,
            },
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn consume_empties_the_slot() {
        let cache = PrefetchCache::new();
        cache.replace("s1", generated("first?")).await;
        let got = cache.consume("s1").await.expect("cached");
        assert_eq!(got.question.question_text, "first?");
        assert!(cache.consume("s1").await.is_none());
    }

    #[tokio::test]
    async fn replace_keeps_a_single_slot_per_session() {
        let cache = PrefetchCache::new();
        cache.replace("s1", generated("first?")).await;
        cache.replace("s1", generated("second?")).await;
        cache.replace("s2", generated("other?")).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.consume("s1").await.expect("cached").question.question_text, "second?");
    }

    #[tokio::test]
    async fn pool_drops_jobs_when_saturated() {
        let pool = PrefetchPool::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        assert!(pool.submit("s1", async move {
            let _ = release_rx.await;
        }));
        assert_eq!(pool.available(), 0);
        assert!(!pool.submit("s2", async {}));

        release_tx.send(()).expect("release");
        for _ in 0..50 {
            if pool.available() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(pool.available(), 1);
        assert!(pool.submit("s3", async {}));
    }
}
