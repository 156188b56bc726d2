//! Bearer-authenticated requests with a single refresh-and-retry.
//!
//! [`TokenGuard::execute`] runs a request with the stored access token. On a
//! 401 it refreshes the token once and retries once; if either step fails the
//! credentials are cleared and the call ends with
//! [`SongfeedError::SessionExpired`]. Every other status is handed back
//! untouched.

use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::refresher::TokenRefresher;
use super::store::CredentialStore;
use crate::error::{Result, SongfeedError};

/// Anything carrying an HTTP status the guard can inspect.
pub trait HttpStatus {
    fn status_code(&self) -> StatusCode;
}

impl HttpStatus for reqwest::Response {
    fn status_code(&self) -> StatusCode {
        self.status()
    }
}

/// Progress of a single guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// First attempt with the stored token.
    Initial,
    /// The first attempt was rejected; a new token is being obtained.
    Refreshing,
    /// The request has been re-sent with the refreshed token.
    Retried,
}

/// Wraps requests with bearer-token refresh handling.
///
/// Refreshes are serialized: when several calls are rejected at once, the
/// first one refreshes and the others pick up its token instead of hitting
/// the refresh endpoint again.
pub struct TokenGuard<R> {
    store: Arc<dyn CredentialStore>,
    refresher: R,
    refresh_lock: Mutex<()>,
}

impl<R: TokenRefresher> TokenGuard<R> {
    /// Create a guard over a credential store and a refresher.
    pub fn new(store: Arc<dyn CredentialStore>, refresher: R) -> Self {
        Self {
            store,
            refresher,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The credential store this guard reads and updates.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Run `request` with the current access token.
    ///
    /// `request` receives the bearer token to send and may be invoked twice:
    /// once with the stored token and, after a 401, once with the refreshed
    /// one. Transport errors propagate as-is and never trigger a refresh.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no access token is stored.
    /// - `SessionExpired` if the refresh fails or the retry is still 401.
    /// - Whatever `request` itself fails with, converted into [`SongfeedError`].
    pub async fn execute<F, Fut, T, E>(&self, mut request: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: HttpStatus,
        E: Into<SongfeedError>,
    {
        let mut token = self
            .store
            .access_token()
            .ok_or(SongfeedError::AuthRequired)?;
        let mut state = GuardState::Initial;

        loop {
            match state {
                GuardState::Initial | GuardState::Retried => {
                    let response = request(token.clone()).await.map_err(Into::into)?;
                    let status = response.status_code();
                    if status != StatusCode::UNAUTHORIZED {
                        debug!("Request finished with status {} ({:?})", status, state);
                        return Ok(response);
                    }
                    if state == GuardState::Retried {
                        warn!("Request still unauthorized after refresh, clearing session");
                        self.store.clear();
                        return Err(SongfeedError::SessionExpired);
                    }
                    debug!("Request unauthorized, refreshing token");
                    state = GuardState::Refreshing;
                }
                GuardState::Refreshing => {
                    token = self.refreshed_token(&token).await?;
                    state = GuardState::Retried;
                }
            }
        }
    }

    /// Obtain a token to retry with after `rejected` got a 401.
    async fn refreshed_token(&self, rejected: &str) -> Result<String> {
        let _refreshing = self.refresh_lock.lock().await;

        if let Some(current) = self.store.access_token() {
            if current != rejected {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("No refresh token available, clearing session");
            self.store.clear();
            return Err(SongfeedError::SessionExpired);
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(access) => {
                self.store.set_access_token(access.clone());
                info!("Access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!("Token refresh failed: {}, clearing session", e);
                self.store.clear();
                Err(SongfeedError::SessionExpired)
            }
        }
    }
}

impl<R> std::fmt::Debug for TokenGuard<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use crate::models::Credentials;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct FakeResponse(StatusCode);

    impl HttpStatus for FakeResponse {
        fn status_code(&self) -> StatusCode {
            self.0
        }
    }

    /// Endpoint accepting a single token; any other token gets `rejection`.
    struct FakeEndpoint {
        valid: String,
        rejection: StatusCode,
        calls: AtomicUsize,
    }

    impl FakeEndpoint {
        fn accepting(valid: &str) -> Self {
            Self {
                valid: valid.to_string(),
                rejection: StatusCode::UNAUTHORIZED,
                calls: AtomicUsize::new(0),
            }
        }

        fn respond(&self, token: String) -> std::future::Ready<Result<FakeResponse>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = if token == self.valid {
                StatusCode::OK
            } else {
                self.rejection
            };
            std::future::ready(Ok(FakeResponse(status)))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct FakeRefresher {
        new_token: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeRefresher {
        fn issuing(token: &str) -> Self {
            Self {
                new_token: Some(token.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                new_token: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenRefresher for &FakeRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<String> {
            assert_eq!(refresh_token, "refresh");
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.new_token.clone().ok_or(SongfeedError::Domain {
                status: 401,
                message: "refresh token expired".to_string(),
            })
        }
    }

    fn logged_in() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
            "old",
            Some("refresh".to_string()),
        )))
    }

    #[tokio::test]
    async fn test_valid_token_passes_through() {
        let store = logged_in();
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("old");

        let response = guard.execute(|t| endpoint.respond(t)).await.unwrap();
        assert_eq!(response.0, StatusCode::OK);
        assert_eq!(endpoint.calls(), 1);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_then_succeed() {
        let store = logged_in();
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("new");

        let response = guard.execute(|t| endpoint.respond(t)).await.unwrap();
        assert_eq!(response.0, StatusCode::OK);
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_refresh_failure_expires_session() {
        let store = logged_in();
        let refresher = FakeRefresher::failing();
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("new");

        let err = guard.execute(|t| endpoint.respond(t)).await.unwrap_err();
        assert!(matches!(err, SongfeedError::SessionExpired));
        assert_eq!(endpoint.calls(), 1);
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[tokio::test]
    async fn test_retry_still_unauthorized() {
        let store = logged_in();
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("never");

        let err = guard.execute(|t| endpoint.respond(t)).await.unwrap_err();
        assert!(matches!(err, SongfeedError::SessionExpired));
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(store.access_token(), None);

        // Cleared credentials fail fast without touching either endpoint.
        let err = guard.execute(|t| endpoint.respond(t)).await.unwrap_err();
        assert!(matches!(err, SongfeedError::AuthRequired));
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(refresher.calls(), 1);
    }

    #[test]
    fn test_missing_access_token() {
        let store = Arc::new(MemoryCredentialStore::new());
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store, &refresher);
        let endpoint = FakeEndpoint::accepting("old");

        let err = tokio_test::block_on(guard.execute(|t| endpoint.respond(t))).unwrap_err();
        assert!(matches!(err, SongfeedError::AuthRequired));
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_refresh_token() {
        let store = Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
            "old", None,
        )));
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("new");

        let err = guard.execute(|t| endpoint.respond(t)).await.unwrap_err();
        assert!(matches!(err, SongfeedError::SessionExpired));
        assert_eq!(refresher.calls(), 0);
        assert_eq!(store.access_token(), None);
    }

    #[tokio::test]
    async fn test_other_errors_returned_as_is() {
        for rejection in [
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let store = logged_in();
            let refresher = FakeRefresher::issuing("new");
            let guard = TokenGuard::new(store.clone(), &refresher);
            let endpoint = FakeEndpoint {
                rejection,
                ..FakeEndpoint::accepting("new")
            };

            let response = guard.execute(|t| endpoint.respond(t)).await.unwrap();
            assert_eq!(response.0, rejection);
            assert_eq!(endpoint.calls(), 1);
            assert_eq!(refresher.calls(), 0);
            assert_eq!(store.access_token().as_deref(), Some("old"));
        }
    }

    #[tokio::test]
    async fn test_network_error_skips_refresh() {
        let store = logged_in();
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let transport_error = reqwest::get("not a url").await.unwrap_err();
        let mut pending = Some(transport_error);

        let err = guard
            .execute(|_| {
                let result: std::result::Result<FakeResponse, reqwest::Error> =
                    Err(pending.take().unwrap());
                std::future::ready(result)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SongfeedError::Network(_)));
        assert_eq!(refresher.calls(), 0);
        assert_eq!(store.access_token().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_concurrent_rejections_share_one_refresh() {
        let store = logged_in();
        let refresher = FakeRefresher::issuing("new");
        let guard = TokenGuard::new(store.clone(), &refresher);
        let endpoint = FakeEndpoint::accepting("new");

        let (a, b) = tokio::join!(
            guard.execute(|t| endpoint.respond(t)),
            guard.execute(|t| endpoint.respond(t)),
        );
        assert_eq!(a.unwrap().0, StatusCode::OK);
        assert_eq!(b.unwrap().0, StatusCode::OK);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(endpoint.calls(), 4);
    }
}
