//! Reconciliation engine.
//!
//! One pass runs two phases, strictly in order:
//!
//! 1. **Upload**: every local note without a remote reference is uploaded and
//!    linked to the object the remote store returned.
//! 2. **Download**: every non-trashed remote object without a linked local note
//!    is fetched and inserted as a new local note.
//!
//! Notes already linked on both sides are left untouched; timestamps and
//! content are not compared. Per-item failures are recorded in the
//! [`SyncReport`] and the pass moves on; store-wide failures abort the pass and
//! hand back the partial report. Nothing is retried within a pass.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::events::SyncProgress;
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{NewNote, NoteId, NoteRecord, RemoteObject, SyncPhase, SyncReport};
use crate::storage::RemoteStore;
use crate::util::unix_millis_now;

/// Cooperative cancellation request shared between a controller and a pass.
///
/// Checked between items and between phases, never mid-item.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a pass ended; every variant carries the report accumulated so far
#[derive(Debug)]
pub enum PassOutcome {
    Completed(SyncReport),
    Cancelled(SyncReport),
    Failed { error: Error, report: SyncReport },
}

impl PassOutcome {
    pub const fn report(&self) -> &SyncReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) | Self::Failed { report, .. } => {
                report
            }
        }
    }
}

/// A pass aborted by a store-wide failure
#[derive(Debug, Error)]
#[error("sync pass aborted: {error}")]
pub struct SyncFailure {
    #[source]
    pub error: Error,
    /// Work completed before the abort
    pub report: SyncReport,
}

enum Step {
    Continue,
    Cancelled,
}

/// Mutable state of one pass
struct Pass<'a> {
    cancel: &'a CancelFlag,
    progress: &'a mut dyn FnMut(SyncProgress),
    report: SyncReport,
    /// Remote ids created during this pass, linked or not
    created: HashSet<String>,
    done: usize,
    total: usize,
}

impl Pass<'_> {
    fn emit(&mut self) {
        (self.progress)(SyncProgress {
            items_done: self.done,
            items_total: self.total,
        });
    }

    fn item_done(&mut self) {
        self.done += 1;
        self.emit();
    }

    /// Record a per-item failure, or hand back a store-wide one
    fn item_failed(
        &mut self,
        phase: SyncPhase,
        local_id: Option<NoteId>,
        remote_id: Option<&str>,
        error: Error,
    ) -> Result<()> {
        if !error.is_item_failure() {
            return Err(error);
        }
        warn!(
            %phase,
            ?local_id,
            ?remote_id,
            "Skipping note: {}",
            error
        );
        self.report.record_failure(phase, local_id, remote_id, &error);
        Ok(())
    }
}

/// Reconciles a local store against a remote store
pub struct ReconciliationEngine<'a> {
    local: &'a dyn LocalStore,
    remote: &'a dyn RemoteStore,
}

impl<'a> ReconciliationEngine<'a> {
    pub const fn new(local: &'a dyn LocalStore, remote: &'a dyn RemoteStore) -> Self {
        Self { local, remote }
    }

    /// Run one full pass without cancellation or progress reporting
    pub fn run_sync(&self) -> std::result::Result<SyncReport, SyncFailure> {
        match self.run_pass(&CancelFlag::new(), &mut |_| {}) {
            PassOutcome::Completed(report) | PassOutcome::Cancelled(report) => Ok(report),
            PassOutcome::Failed { error, report } => Err(SyncFailure { error, report }),
        }
    }

    /// Run one pass, honoring `cancel` between items and phases
    pub fn run_pass(
        &self,
        cancel: &CancelFlag,
        progress: &mut dyn FnMut(SyncProgress),
    ) -> PassOutcome {
        let mut pass = Pass {
            cancel,
            progress,
            report: SyncReport::new(),
            created: HashSet::new(),
            done: 0,
            total: 0,
        };

        let result = self.upload_phase(&mut pass).and_then(|step| match step {
            Step::Cancelled => Ok(Step::Cancelled),
            // Phase B must see every link written in phase A
            Step::Continue if pass.cancel.is_cancelled() => Ok(Step::Cancelled),
            Step::Continue => self.download_phase(&mut pass),
        });

        let report = pass.report;
        match result {
            Ok(Step::Continue) => {
                info!(
                    uploaded = report.uploaded,
                    downloaded = report.downloaded,
                    failed = report.failed,
                    "Sync pass completed"
                );
                PassOutcome::Completed(report)
            }
            Ok(Step::Cancelled) => {
                warn!(
                    uploaded = report.uploaded,
                    downloaded = report.downloaded,
                    "Sync pass cancelled"
                );
                PassOutcome::Cancelled(report)
            }
            Err(error) => {
                error!(kind = ?error.kind(), "Sync pass aborted: {}", error);
                PassOutcome::Failed { error, report }
            }
        }
    }

    fn upload_phase(&self, pass: &mut Pass<'_>) -> Result<Step> {
        let pending: Vec<NoteRecord> = self
            .local
            .list_all()?
            .into_iter()
            .filter(|note| !note.is_linked())
            .collect();

        info!(pending = pending.len(), "Upload phase started");
        pass.total += pending.len();
        pass.emit();

        for note in &pending {
            if pass.cancel.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            self.upload_one(note, pass)?;
            pass.item_done();
        }

        Ok(Step::Continue)
    }

    fn upload_one(&self, note: &NoteRecord, pass: &mut Pass<'_>) -> Result<()> {
        let object = match self.remote.upload(&note.title, &note.body) {
            Ok(object) => object,
            Err(error) => return pass.item_failed(SyncPhase::Upload, Some(note.id), None, error),
        };
        pass.created.insert(object.id.clone());

        if let Err(error) = self
            .local
            .link_to_remote(&note.id, &object.id, unix_millis_now())
        {
            return pass.item_failed(SyncPhase::Upload, Some(note.id), Some(&object.id), error);
        }

        debug!(local_id = %note.id, remote_id = %object.id, "Uploaded note");
        pass.report.uploaded += 1;
        Ok(())
    }

    fn download_phase(&self, pass: &mut Pass<'_>) -> Result<Step> {
        let objects = self.remote.list_all()?;

        let mut pending = Vec::new();
        for object in objects {
            if object.trashed {
                pass.report.trashed_skipped += 1;
                continue;
            }
            if pass.created.contains(&object.id) {
                continue;
            }
            match self.local.find_by_remote_id(&object.id) {
                Ok(Some(_)) => pass.report.unchanged += 1,
                Ok(None) => pending.push(object),
                Err(error) => {
                    pass.item_failed(SyncPhase::Download, None, Some(&object.id), error)?;
                }
            }
        }

        info!(pending = pending.len(), "Download phase started");
        pass.total += pending.len();
        pass.emit();

        for object in &pending {
            if pass.cancel.is_cancelled() {
                return Ok(Step::Cancelled);
            }
            self.download_one(object, pass)?;
            pass.item_done();
        }

        Ok(Step::Continue)
    }

    fn download_one(&self, object: &RemoteObject, pass: &mut Pass<'_>) -> Result<()> {
        let content = match self.remote.fetch_content(&object.id) {
            Ok(content) => content,
            Err(error) => {
                return pass.item_failed(SyncPhase::Download, None, Some(&object.id), error)
            }
        };

        let seed = NewNote::new(object.title.clone(), content)
            .linked_to(object.id.clone(), object.modified_at);
        match self.local.create_from_remote(&seed) {
            Ok(local_id) => {
                debug!(%local_id, remote_id = %object.id, "Downloaded note");
                pass.report.downloaded += 1;
                Ok(())
            }
            Err(error) => pass.item_failed(SyncPhase::Download, None, Some(&object.id), error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteNoteStore;
    use crate::error::ErrorKind;
    use crate::test_support::{FakeRemote, UnavailableLocal};
    use pretty_assertions::assert_eq;

    fn local() -> SqliteNoteStore {
        SqliteNoteStore::open_in_memory().unwrap()
    }

    fn uploads(remote: &FakeRemote) -> usize {
        FakeRemote::count(&remote.uploads)
    }

    #[test]
    fn uploads_unlinked_note() {
        let local = local();
        let note = local.create("A", "x").unwrap();
        let remote = FakeRemote::new();

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.uploaded, report.downloaded, report.failed), (1, 0, 0));
        let objects = remote.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].title, "A");
        let linked = local.get(&note.id).unwrap().unwrap();
        assert_eq!(linked.remote_ref.as_deref(), Some(objects[0].id.as_str()));
        assert!(linked.last_modified >= note.last_modified);
    }

    #[test]
    fn downloads_unlinked_remote_object() {
        let local = local();
        let remote = FakeRemote::new();
        remote.insert("r1", "B", "y", false);

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.uploaded, report.downloaded), (0, 1));
        let notes = local.list_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "B");
        assert_eq!(notes[0].body, "y");
        assert_eq!(notes[0].remote_ref.as_deref(), Some("r1"));
        assert_eq!(notes[0].last_modified, 1_000);
    }

    #[test]
    fn already_linked_pair_is_left_untouched() {
        let local = local();
        let note = local.create("A", "x").unwrap();
        local.link_to_remote(&note.id, "r1", 5).unwrap();
        let remote = FakeRemote::new();
        remote.insert("r1", "A (remote edit)", "changed", false);

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.uploaded, report.downloaded), (0, 0));
        assert_eq!(report.unchanged, 1);
        assert_eq!(uploads(&remote), 0);
        assert_eq!(FakeRemote::count(&remote.fetches), 0);
        let notes = local.list_all().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].body, "x");
    }

    #[test]
    fn second_pass_is_idempotent() {
        let local = local();
        local.create("A", "x").unwrap();
        local.create("B", "y").unwrap();
        let remote = FakeRemote::new();
        remote.insert("r1", "C", "z", false);
        let engine = ReconciliationEngine::new(&local, remote.as_ref());

        let first = engine.run_sync().unwrap();
        assert_eq!((first.uploaded, first.downloaded), (2, 1));

        let second = engine.run_sync().unwrap();
        assert_eq!((second.uploaded, second.downloaded, second.failed), (0, 0, 0));
        assert_eq!(second.unchanged, 3);
        assert_eq!(local.list_all().unwrap().len(), 3);
        assert_eq!(remote.objects().len(), 3);
    }

    #[test]
    fn uploaded_notes_are_not_downloaded_again() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();

        ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!(local.list_all().unwrap().len(), 1);
        assert_eq!(FakeRemote::count(&remote.fetches), 0);
    }

    #[test]
    fn trashed_objects_are_never_downloaded() {
        let local = local();
        let remote = FakeRemote::new();
        remote.insert("r1", "gone", "z", true);
        let engine = ReconciliationEngine::new(&local, remote.as_ref());

        for _ in 0..3 {
            let report = engine.run_sync().unwrap();
            assert_eq!(report.downloaded, 0);
            assert_eq!(report.trashed_skipped, 1);
        }
        assert!(local.find_by_remote_id("r1").unwrap().is_none());
        assert!(local.list_all().unwrap().is_empty());
    }

    #[test]
    fn failed_upload_does_not_stop_other_uploads() {
        let local = local();
        let bad = local.create("bad", "x").unwrap();
        local.create("good-1", "y").unwrap();
        local.create("good-2", "z").unwrap();
        let remote = FakeRemote::new();
        remote.fail_upload_of("bad");

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.uploaded, report.failed), (2, 1));
        assert_eq!(report.failures[0].phase, SyncPhase::Upload);
        assert_eq!(report.failures[0].kind, ErrorKind::RemoteWriteFailed);
        assert_eq!(report.failures[0].local_id, Some(bad.id));
        assert!(!local.get(&bad.id).unwrap().unwrap().is_linked());

        let retry = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();
        assert_eq!((retry.uploaded, retry.failed), (0, 1));
    }

    #[test]
    fn failed_fetch_is_skipped_and_recorded() {
        let local = local();
        let remote = FakeRemote::new();
        remote.insert("r1", "broken", "", false);
        remote.insert("r2", "fine", "ok", false);
        remote.fail_fetch_of("r1");

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.downloaded, report.failed), (1, 1));
        assert_eq!(report.failures[0].phase, SyncPhase::Download);
        assert_eq!(report.failures[0].remote_id.as_deref(), Some("r1"));
        assert_eq!(report.failures[0].kind, ErrorKind::RemoteReadFailed);
        assert!(local.find_by_remote_id("r2").unwrap().is_some());
    }

    #[test]
    fn remote_object_with_empty_title_is_an_item_failure() {
        let local = local();
        let remote = FakeRemote::new();
        remote.insert("r1", "", "untitled", false);

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::InvalidRecord);
    }

    #[test]
    fn unavailable_local_store_aborts_pass() {
        let local = UnavailableLocal(ErrorKind::StoreUnavailable);
        let remote = FakeRemote::new();

        let failure = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap_err();

        assert_eq!(failure.error.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(failure.report, SyncReport::default());
        assert_eq!(FakeRemote::count(&remote.lists), 0);
    }

    #[test]
    fn auth_expired_during_upload_aborts_with_partial_report() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();
        remote.fail_uploads_with(ErrorKind::AuthExpired);

        let failure = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap_err();

        assert_eq!(failure.error.kind(), ErrorKind::AuthExpired);
        assert_eq!(failure.report.failed, 0);
        assert_eq!(FakeRemote::count(&remote.lists), 0);
    }

    #[test]
    fn remote_listing_failure_keeps_upload_results() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();
        remote.fail_list_with(ErrorKind::RemoteUnavailable);

        let failure = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap_err();

        assert_eq!(failure.error.kind(), ErrorKind::RemoteUnavailable);
        assert_eq!(failure.report.uploaded, 1);
    }

    #[test]
    fn cancel_between_phases_skips_downloads() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();
        remote.insert("r1", "B", "y", false);
        let cancel = CancelFlag::new();
        let hook_cancel = cancel.clone();
        remote.on_upload(move |_| hook_cancel.cancel());

        let outcome =
            ReconciliationEngine::new(&local, remote.as_ref()).run_pass(&cancel, &mut |_| {});

        let report = match outcome {
            PassOutcome::Cancelled(report) => report,
            other => panic!("expected cancelled outcome, got {other:?}"),
        };
        assert_eq!((report.uploaded, report.downloaded), (1, 0));
        assert_eq!(FakeRemote::count(&remote.lists), 0);
        assert!(local.find_by_remote_id("r1").unwrap().is_none());
    }

    #[test]
    fn cancel_before_start_does_no_work() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome =
            ReconciliationEngine::new(&local, remote.as_ref()).run_pass(&cancel, &mut |_| {});

        assert!(matches!(outcome, PassOutcome::Cancelled(_)));
        assert_eq!(outcome.report().uploaded, 0);
        assert_eq!(uploads(&remote), 0);
    }

    #[test]
    fn progress_reaches_total() {
        let local = local();
        local.create("A", "x").unwrap();
        let remote = FakeRemote::new();
        remote.insert("r1", "B", "y", false);
        remote.insert("r2", "C", "z", false);
        let mut seen = Vec::new();

        let outcome = ReconciliationEngine::new(&local, remote.as_ref())
            .run_pass(&CancelFlag::new(), &mut |progress| seen.push(progress));

        assert!(matches!(outcome, PassOutcome::Completed(_)));
        let last = seen.last().copied().unwrap();
        assert_eq!(
            last,
            SyncProgress {
                items_done: 3,
                items_total: 3
            }
        );
        assert!(seen.windows(2).all(|pair| pair[0].items_done <= pair[1].items_done));
    }

    /// Local store that refuses to link one note
    struct RefusesLink {
        inner: SqliteNoteStore,
        refused: NoteId,
    }

    impl LocalStore for RefusesLink {
        fn list_all(&self) -> Result<Vec<NoteRecord>> {
            self.inner.list_all()
        }

        fn link_to_remote(&self, id: &NoteId, remote_id: &str, linked_at: i64) -> Result<()> {
            if *id == self.refused {
                return Err(Error::RecordNotFound(*id));
            }
            self.inner.link_to_remote(id, remote_id, linked_at)
        }

        fn create_from_remote(&self, seed: &NewNote) -> Result<NoteId> {
            self.inner.create_from_remote(seed)
        }

        fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<NoteRecord>> {
            self.inner.find_by_remote_id(remote_id)
        }
    }

    #[test]
    fn failed_link_is_recorded_and_not_downloaded_back() {
        let inner = local();
        let refused = inner.create("A", "x").unwrap();
        let linked = inner.create("B", "y").unwrap();
        let local = RefusesLink {
            inner,
            refused: refused.id,
        };
        let remote = FakeRemote::new();

        let report = ReconciliationEngine::new(&local, remote.as_ref())
            .run_sync()
            .unwrap();

        assert_eq!((report.uploaded, report.downloaded, report.failed), (1, 0, 1));
        let orphan = remote
            .objects()
            .into_iter()
            .find(|object| object.title == "A")
            .unwrap();
        let failure = &report.failures[0];
        assert_eq!(failure.phase, SyncPhase::Upload);
        assert_eq!(failure.kind, ErrorKind::RecordNotFound);
        assert_eq!(failure.local_id, Some(refused.id));
        assert_eq!(failure.remote_id.as_deref(), Some(orphan.id.as_str()));

        assert_eq!(FakeRemote::count(&remote.fetches), 0);
        assert!(local.find_by_remote_id(&orphan.id).unwrap().is_none());
        assert!(!local.inner.get(&refused.id).unwrap().unwrap().is_linked());
        assert!(local.inner.get(&linked.id).unwrap().unwrap().is_linked());
    }
}
