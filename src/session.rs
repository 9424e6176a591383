use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::identity::IdentityProvider;
use crate::models::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { user: None, is_authenticated: false, loading: false, error: None }
    }
}

/// Process-wide session, shared by handle. Starts in `loading` until the
/// listener has restored the cache.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let state = SessionState { loading: true, ..SessionState::default() };
        Self { state: Arc::new(RwLock::new(state)) }
    }

    fn update(&self, f: impl FnOnce(&mut SessionState)) {
        match self.state.write() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        match self.state.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The signed-in identity, if any.
    pub fn current(&self) -> Option<Identity> {
        self.snapshot().user
    }

    pub fn sign_in_start(&self) {
        self.update(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    pub fn sign_in_success(&self, identity: Identity) {
        self.update(|s| {
            s.loading = false;
            s.is_authenticated = true;
            s.user = Some(identity);
        });
    }

    pub fn sign_in_failure(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }

    pub fn sign_out(&self) {
        self.update(|s| *s = SessionState::default());
    }

    /// Sync from a provider notification.
    pub fn set_user(&self, user: Option<Identity>) {
        self.update(|s| {
            s.is_authenticated = user.is_some();
            s.user = user;
            s.loading = false;
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self { Self::new() }
}

/// Single persisted `{email, uid}` entry used to avoid a logged-out flash on restart.
#[derive(Clone, Debug)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Identity> {
        let bytes = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice::<Identity>(&bytes) {
            Ok(identity) => Some(identity),
            Err(e) => {
                log::warn!("ignoring unreadable session cache '{}': {e}", self.path.display());
                None
            }
        }
    }

    pub fn store(&self, identity: &Identity) {
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match serde_json::to_vec(identity) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.path, bytes) {
                    log::warn!("failed to write session cache '{}': {e}", self.path.display());
                }
            }
            Err(e) => log::warn!("failed to encode session cache: {e}"),
        }
    }

    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove session cache '{}': {e}", self.path.display()),
        }
    }
}

fn apply(store: &SessionStore, cache: &SessionCache, user: Option<Identity>) {
    match user {
        Some(identity) => {
            cache.store(&identity);
            store.set_user(Some(identity));
        }
        None => {
            cache.clear();
            store.sign_out();
        }
    }
}

/// Long-lived subscription to identity-provider state changes.
pub struct SessionListener {
    task: JoinHandle<()>,
}

impl SessionListener {
    /// Restores the cached identity, then follows the provider until `shutdown`.
    /// Must be called inside a tokio runtime.
    pub fn start(store: SessionStore, provider: Arc<dyn IdentityProvider>, cache: SessionCache) -> Self {
        match cache.load() {
            Some(identity) => {
                log::info!("restored cached session uid={}", identity.uid);
                store.sign_in_success(identity);
            }
            None => store.set_user(None),
        }

        let mut rx = provider.subscribe();
        // a provider that already holds a session wins over the cache; an empty one does not clear it
        let initial = rx.borrow_and_update().clone();
        if let Some(identity) = initial {
            apply(&store, &cache, Some(identity));
        }

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let user = rx.borrow_and_update().clone();
                match &user {
                    Some(identity) => tracing::info!(uid = %identity.uid, "session established"),
                    None => tracing::info!("session cleared"),
                }
                apply(&store, &cache, user);
            }
            tracing::debug!("identity provider dropped; session listener exiting");
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}
