//! The one mutable slot of the viewer: the currently loaded document.
//!
//! Loads are tagged with a ticket when they start. When a load finishes, its
//! document is installed only if no newer load has started since, so a slow
//! upload can never overwrite a faster, later one. A failed load leaves the
//! slot untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::document::ExportDocument;
use crate::error::LoadError;
use crate::loader::{self, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn token(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    /// The document is now current.
    Applied,
    /// A newer load started before this one finished; its result was dropped.
    Stale,
    /// The load failed; the previous document, if any, is still current.
    Failed(LoadError),
}

#[derive(Debug, Default)]
pub struct Session {
    current: Mutex<Option<Arc<ExportDocument>>>,
    issued: AtomicU64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<ExportDocument>> {
        self.slot().clone()
    }

    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.issued.load(Ordering::SeqCst)
    }

    pub fn complete_load(
        &self,
        ticket: LoadTicket,
        result: Result<ExportDocument, LoadError>,
    ) -> LoadOutcome {
        let mut slot = self.slot();
        if !self.is_latest(ticket) {
            warn!(token = ticket.0, "discarding stale load");
            return LoadOutcome::Stale;
        }
        match result {
            Ok(doc) => {
                *slot = Some(Arc::new(doc));
                info!(token = ticket.0, "document loaded");
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!(token = ticket.0, error = %e, "load failed");
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Read, extract and parse `file`, then try to make it current.
    pub async fn upload(&self, file: UploadedFile) -> LoadOutcome {
        let ticket = self.begin_load();
        let result = loader::load_async(file)
            .await
            .and_then(|text| ExportDocument::from_json(&text));
        self.complete_load(ticket, result)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<ExportDocument>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Collection;
    use crate::loader::tests::zip_with;
    use crate::stats::total_count;

    fn doc_with_likes(n: usize) -> ExportDocument {
        ExportDocument { likes: Some(vec![serde_json::Value::Null; n]), ..Default::default() }
    }

    fn likes(session: &Session) -> Option<usize> {
        session.current().map(|d| total_count(&d, Collection::Likes))
    }

    #[test]
    fn tickets_increase() {
        let s = Session::new();
        let a = s.begin_load();
        let b = s.begin_load();
        assert!(b.token() > a.token());
        assert!(!s.is_latest(a));
        assert!(s.is_latest(b));
    }

    #[test]
    fn stale_results_are_dropped() {
        let s = Session::new();
        let slow = s.begin_load();
        let fast = s.begin_load();
        assert!(matches!(s.complete_load(fast, Ok(doc_with_likes(2))), LoadOutcome::Applied));
        assert!(matches!(s.complete_load(slow, Ok(doc_with_likes(9))), LoadOutcome::Stale));
        assert_eq!(likes(&s), Some(2));
    }

    #[test]
    fn failures_keep_the_previous_document() {
        let s = Session::new();
        let first = s.begin_load();
        s.complete_load(first, Ok(doc_with_likes(1)));
        let second = s.begin_load();
        let outcome = s.complete_load(second, Err(LoadError::NoMatchingEntry(3)));
        assert!(matches!(outcome, LoadOutcome::Failed(LoadError::NoMatchingEntry(3))));
        assert_eq!(likes(&s), Some(1));
    }

    #[tokio::test]
    async fn upload_replaces_wholesale() {
        let s = Session::new();
        let json = UploadedFile::new("a.json", None, br#"{"likes": [1], "stories": [1]}"#.to_vec());
        assert!(matches!(s.upload(json).await, LoadOutcome::Applied));

        let zip = zip_with(&[("export/content.json", r#"{"likes": [1, 2, 3]}"#)]);
        let archive = UploadedFile::new("b.zip", None, zip);
        assert!(matches!(s.upload(archive).await, LoadOutcome::Applied));

        let current = s.current().unwrap();
        assert_eq!(total_count(&current, Collection::Likes), 3);
        assert_eq!(total_count(&current, Collection::Stories), 0);
    }

    #[tokio::test]
    async fn unparseable_upload_fails() {
        let s = Session::new();
        let file = UploadedFile::new("a.json", None, b"{ not json".to_vec());
        assert!(matches!(s.upload(file).await, LoadOutcome::Failed(LoadError::MalformedDocument(_))));
        assert!(s.current().is_none());
    }
}
