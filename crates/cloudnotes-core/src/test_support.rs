//! In-memory fakes with failure injection for engine and controller tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::Credential;
use crate::db::LocalStore;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{NewNote, NoteId, NoteRecord, RemoteObject};
use crate::storage::{RemoteConnector, RemoteStore};

type Hook = Box<dyn Fn(&str) + Send + Sync>;

pub fn error_of(kind: ErrorKind, context: &str) -> Error {
    match kind {
        ErrorKind::StoreUnavailable => Error::StoreUnavailable(context.to_string()),
        ErrorKind::RecordNotFound => Error::RecordNotFound(NoteId::new()),
        ErrorKind::InvalidRecord => Error::InvalidRecord(context.to_string()),
        ErrorKind::RemoteUnavailable => Error::RemoteUnavailable(context.to_string()),
        ErrorKind::AuthExpired => Error::AuthExpired(context.to_string()),
        ErrorKind::RemoteWriteFailed => Error::RemoteWriteFailed(context.to_string()),
        ErrorKind::RemoteReadFailed => Error::RemoteReadFailed {
            remote_id: context.to_string(),
            message: "injected".to_string(),
        },
        ErrorKind::NoCredential => Error::NoCredential(context.to_string()),
        ErrorKind::AlreadyRunning => Error::AlreadyRunning,
        ErrorKind::Internal => Error::Worker(context.to_string()),
    }
}

#[derive(Default)]
pub struct FakeRemote {
    objects: Mutex<Vec<(RemoteObject, String)>>,
    next_id: AtomicUsize,
    fail_upload_titles: Mutex<HashSet<String>>,
    fail_fetch_ids: Mutex<HashSet<String>>,
    list_failure: Mutex<Option<ErrorKind>>,
    upload_failure: Mutex<Option<ErrorKind>>,
    upload_hook: Mutex<Option<Hook>>,
    pub uploads: AtomicUsize,
    pub fetches: AtomicUsize,
    pub lists: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, id: &str, title: &str, content: &str, trashed: bool) {
        self.objects.lock().unwrap().push((
            RemoteObject {
                id: id.to_string(),
                title: title.to_string(),
                modified_at: 1_000,
                trashed,
            },
            content.to_string(),
        ));
    }

    pub fn objects(&self) -> Vec<RemoteObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(object, _)| object.clone())
            .collect()
    }

    pub fn fail_upload_of(&self, title: &str) {
        self.fail_upload_titles
            .lock()
            .unwrap()
            .insert(title.to_string());
    }

    pub fn fail_fetch_of(&self, remote_id: &str) {
        self.fail_fetch_ids
            .lock()
            .unwrap()
            .insert(remote_id.to_string());
    }

    pub fn fail_list_with(&self, kind: ErrorKind) {
        *self.list_failure.lock().unwrap() = Some(kind);
    }

    pub fn fail_uploads_with(&self, kind: ErrorKind) {
        *self.upload_failure.lock().unwrap() = Some(kind);
    }

    /// Run `hook` with the title of each note after it is uploaded
    pub fn on_upload(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.upload_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl RemoteStore for FakeRemote {
    fn list_all(&self) -> Result<Vec<RemoteObject>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = *self.list_failure.lock().unwrap() {
            return Err(error_of(kind, "list"));
        }
        Ok(self.objects())
    }

    fn upload(&self, title: &str, content: &str) -> Result<RemoteObject> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = *self.upload_failure.lock().unwrap() {
            return Err(error_of(kind, title));
        }
        if self.fail_upload_titles.lock().unwrap().contains(title) {
            return Err(Error::RemoteWriteFailed(format!("injected failure for {title}")));
        }

        let id = format!("u{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let object = RemoteObject {
            id,
            title: title.to_string(),
            modified_at: 2_000,
            trashed: false,
        };
        self.objects
            .lock()
            .unwrap()
            .push((object.clone(), content.to_string()));

        if let Some(hook) = self.upload_hook.lock().unwrap().as_ref() {
            hook(title);
        }
        Ok(object)
    }

    fn fetch_content(&self, remote_id: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_ids.lock().unwrap().contains(remote_id) {
            return Err(error_of(ErrorKind::RemoteReadFailed, remote_id));
        }
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(object, _)| object.id == remote_id && !object.trashed)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| error_of(ErrorKind::RemoteReadFailed, remote_id))
    }
}

impl RemoteStore for Arc<FakeRemote> {
    fn list_all(&self) -> Result<Vec<RemoteObject>> {
        self.as_ref().list_all()
    }

    fn upload(&self, title: &str, content: &str) -> Result<RemoteObject> {
        self.as_ref().upload(title, content)
    }

    fn fetch_content(&self, remote_id: &str) -> Result<String> {
        self.as_ref().fetch_content(remote_id)
    }
}

pub struct FakeConnector {
    pub remote: Arc<FakeRemote>,
    pub connect_failure: Option<ErrorKind>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(remote: &Arc<FakeRemote>) -> Arc<Self> {
        Arc::new(Self {
            remote: Arc::clone(remote),
            connect_failure: None,
            connects: AtomicUsize::new(0),
        })
    }

    pub fn failing(remote: &Arc<FakeRemote>, kind: ErrorKind) -> Arc<Self> {
        Arc::new(Self {
            remote: Arc::clone(remote),
            connect_failure: Some(kind),
            connects: AtomicUsize::new(0),
        })
    }
}

impl RemoteConnector for FakeConnector {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn RemoteStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.connect_failure {
            return Err(error_of(kind, &credential.account));
        }
        Ok(Box::new(Arc::clone(&self.remote)))
    }
}

/// Local store whose every operation fails with the given kind
pub struct UnavailableLocal(pub ErrorKind);

impl LocalStore for UnavailableLocal {
    fn list_all(&self) -> Result<Vec<NoteRecord>> {
        Err(error_of(self.0, "list"))
    }

    fn link_to_remote(&self, _id: &NoteId, _remote_id: &str, _linked_at: i64) -> Result<()> {
        Err(error_of(self.0, "link"))
    }

    fn create_from_remote(&self, _seed: &NewNote) -> Result<NoteId> {
        Err(error_of(self.0, "create"))
    }

    fn find_by_remote_id(&self, _remote_id: &str) -> Result<Option<NoteRecord>> {
        Err(error_of(self.0, "find"))
    }
}
