use std::sync::Arc;

use tokengate_authn::{
    AuthConfig, CookieConfig, RevocationStore, SessionService, StorageRevocationStore, TokenCodec,
};
use tokengate_storage::{StorageBackend, users::BackendUserStore};

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    session: SessionService,
    cookie: Arc<CookieConfig>,
    revocations: Arc<dyn RevocationStore>,
    backend: Arc<dyn StorageBackend>,
}

impl AppState {
    /// Builds the service graph over one storage backend, which holds both
    /// user accounts and revocations.
    pub fn new<B>(auth: &AuthConfig, backend: B) -> Self
    where
        B: StorageBackend + Clone + 'static,
    {
        let revocations: Arc<dyn RevocationStore> =
            Arc::new(StorageRevocationStore::new(backend.clone()));
        let session = SessionService::new(
            Arc::new(TokenCodec::new(auth)),
            Arc::clone(&revocations),
            Arc::new(BackendUserStore::new(backend.clone())),
        );

        Self::from_parts(session, auth.cookie().clone(), revocations, Arc::new(backend))
    }

    /// Assembles state from already-built components.
    pub fn from_parts(
        session: SessionService,
        cookie: CookieConfig,
        revocations: Arc<dyn RevocationStore>,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        Self { session, cookie: Arc::new(cookie), revocations, backend }
    }

    /// The session service.
    #[must_use]
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Session cookie attributes.
    #[must_use]
    pub fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }

    /// The revocation store, for the background sweeper.
    #[must_use]
    pub fn revocations(&self) -> Arc<dyn RevocationStore> {
        Arc::clone(&self.revocations)
    }

    /// The storage backend, for health checks.
    #[must_use]
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}
