//! Sync session controller.
//!
//! Owns the lifecycle of sync runs for one account: single-flight start,
//! cooperative cancellation and event fan-out. The engine pass itself runs on
//! a blocking worker task so the store adapters may block freely.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::engine::{CancelFlag, PassOutcome, ReconciliationEngine};
use super::events::{FailureReason, SyncEvent};
use crate::auth::{Credential, CredentialProvider};
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::SyncReport;
use crate::state::SessionState;
use crate::storage::RemoteConnector;
use crate::util::normalize_text_option;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Terminal result of a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(SyncReport),
    Cancelled(SyncReport),
    Failed {
        reason: FailureReason,
        report: SyncReport,
    },
}

impl SessionOutcome {
    pub const fn state(&self) -> SessionState {
        match self {
            Self::Completed(_) => SessionState::Completed,
            Self::Cancelled(_) => SessionState::Cancelled,
            Self::Failed { .. } => SessionState::Failed,
        }
    }

    pub const fn report(&self) -> &SyncReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) | Self::Failed { report, .. } => {
                report
            }
        }
    }

    fn into_event(self) -> SyncEvent {
        match self {
            Self::Completed(report) => SyncEvent::Completed { report },
            Self::Cancelled(report) => SyncEvent::Cancelled { report },
            Self::Failed { reason, report } => SyncEvent::Failed { reason, report },
        }
    }
}

impl From<PassOutcome> for SessionOutcome {
    fn from(outcome: PassOutcome) -> Self {
        match outcome {
            PassOutcome::Completed(report) => Self::Completed(report),
            PassOutcome::Cancelled(report) => Self::Cancelled(report),
            PassOutcome::Failed { error, report } => Self::Failed {
                reason: FailureReason::from(&error),
                report,
            },
        }
    }
}

#[derive(Default)]
struct Session {
    state: SessionState,
    /// Set while `start` fetches the credential outside the lock
    starting: bool,
    cancel: Option<CancelFlag>,
    last_outcome: Option<SessionOutcome>,
}

impl Session {
    const fn is_busy(&self) -> bool {
        self.starting || matches!(self.state, SessionState::Running)
    }
}

struct Shared {
    local: Arc<dyn LocalStore>,
    connector: Arc<dyn RemoteConnector>,
    credentials: Arc<dyn CredentialProvider>,
    account: Option<String>,
    session: Mutex<Session>,
    events: broadcast::Sender<SyncEvent>,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers hold the session lock so event order matches state order
    fn emit(&self, _session: &Session, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn credential(&self) -> Result<Credential> {
        let account = self
            .account
            .as_deref()
            .ok_or_else(|| Error::NoCredential("no sync account configured".to_string()))?;
        self.credentials.credential(account)
    }

    /// Worker body: connect, run one engine pass, publish the outcome
    fn run(&self, credential: &Credential, cancel: &CancelFlag) -> SessionOutcome {
        let outcome = match self.connector.connect(credential) {
            Ok(remote) => {
                let engine = ReconciliationEngine::new(self.local.as_ref(), remote.as_ref());
                engine.run_pass(cancel, &mut |progress| {
                    let _ = self.events.send(SyncEvent::Progress(progress));
                })
            }
            Err(error) => {
                error!("Failed to connect to remote store: {}", error);
                PassOutcome::Failed {
                    error,
                    report: SyncReport::new(),
                }
            }
        };
        self.finish(SessionOutcome::from(outcome))
    }

    fn finish(&self, outcome: SessionOutcome) -> SessionOutcome {
        let mut session = self.session();
        session.state = outcome.state();
        session.starting = false;
        session.cancel = None;
        session.last_outcome = Some(outcome.clone());
        self.emit(&session, outcome.clone().into_event());
        outcome
    }
}

/// Marks the session failed if a worker unwinds or is dropped before
/// publishing an outcome
struct RunGuard {
    shared: Arc<Shared>,
    finished: bool,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.shared.finish(SessionOutcome::Failed {
                reason: FailureReason::from(&Error::Worker("sync worker stopped".to_string())),
                report: SyncReport::new(),
            });
        }
    }
}

/// Handle to a sync run started by [`SyncController::start`]
pub struct SyncRun {
    handle: JoinHandle<SessionOutcome>,
}

impl SyncRun {
    /// Wait for the run to reach a terminal state
    pub async fn wait(self) -> Result<SessionOutcome> {
        self.handle
            .await
            .map_err(|error| Error::Worker(error.to_string()))
    }
}

/// Single-flight controller for sync runs of one account.
///
/// Cheap to clone; all clones share the same session.
#[derive(Clone)]
pub struct SyncController {
    shared: Arc<Shared>,
}

impl SyncController {
    pub fn new(
        local: Arc<dyn LocalStore>,
        connector: Arc<dyn RemoteConnector>,
        credentials: Arc<dyn CredentialProvider>,
        account: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                local,
                connector,
                credentials,
                account: normalize_text_option(account),
                session: Mutex::new(Session::default()),
                events,
            }),
        }
    }

    /// Subscribe to events of all subsequent runs
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.shared.session().state
    }

    /// Outcome of the most recent finished run
    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.shared.session().last_outcome.clone()
    }

    /// Report of the most recent finished run
    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_outcome().map(|outcome| outcome.report().clone())
    }

    /// Return a terminal session to `Idle`
    pub fn reset(&self) -> Result<()> {
        let mut session = self.shared.session();
        if session.is_busy() {
            return Err(Error::AlreadyRunning);
        }
        if session.state.is_terminal() {
            session.state = SessionState::Idle;
        }
        Ok(())
    }

    /// Start a sync run on a blocking worker task.
    ///
    /// Fails with [`Error::Worker`] outside a Tokio runtime, leaving the
    /// session untouched. A terminal session is reset to `Idle` first; a
    /// running or starting one is rejected with [`Error::AlreadyRunning`].
    /// The credential is fetched without holding the session lock. When none
    /// is available the session goes straight to `Failed` and the engine is
    /// never invoked.
    pub fn start(&self) -> Result<SyncRun> {
        let runtime = Handle::try_current()
            .map_err(|error| Error::Worker(format!("sync needs a Tokio runtime: {error}")))?;

        {
            let mut session = self.shared.session();
            if session.is_busy() {
                return Err(Error::AlreadyRunning);
            }
            if session.state.is_terminal() {
                session.state = SessionState::Idle;
            }
            session.starting = true;
        }

        let credential = match self.shared.credential() {
            Ok(credential) => credential,
            Err(error) => {
                warn!("Sync not started: {}", error);
                self.shared.finish(SessionOutcome::Failed {
                    reason: FailureReason::from(&error),
                    report: SyncReport::new(),
                });
                return Err(error);
            }
        };

        let cancel = CancelFlag::new();
        let mut guard = RunGuard {
            shared: Arc::clone(&self.shared),
            finished: false,
        };
        {
            let mut session = self.shared.session();
            session.starting = false;
            session.state = SessionState::Running;
            session.cancel = Some(cancel.clone());
            info!(account = %credential.account, "Sync started");
            self.shared.emit(&session, SyncEvent::Started);
        }

        let handle = runtime.spawn_blocking(move || {
            let outcome = guard.shared.run(&credential, &cancel);
            guard.finished = true;
            outcome
        });

        Ok(SyncRun { handle })
    }

    /// Request cancellation of the running pass.
    ///
    /// Honored at the next item or phase boundary. Returns `false` when no run
    /// is active.
    pub fn cancel(&self) -> bool {
        let session = self.shared.session();
        match (&session.state, &session.cancel) {
            (SessionState::Running, Some(cancel)) => {
                info!("Sync cancellation requested");
                cancel.cancel();
                true
            }
            _ => false,
        }
    }
}
