// Session lifecycle and the retrying request executor.
//
// The facility invalidates sessions aggressively and answers with either an
// auth redirect or a 5xx when it does. Every session-scoped operation runs
// through `with_session_retry`, which forces exactly one re-login and one
// replay before surfacing the failure.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ApiError;

/// Opaque session credential. The `Debug` form is truncated so tokens do not
/// leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.0.chars().take(8).collect();
        write!(f, "SessionToken({shown}..)")
    }
}

/// Strategy for acquiring a fresh session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> Result<SessionToken, ApiError>;
}

/// Holds the current session token and refreshes it on demand.
///
/// `refresh` is single-flight: concurrent callers that lost their session to
/// the same expiry serialize on the inner lock, and whoever arrives second
/// reuses the token the first one obtained instead of logging in again.
pub struct SessionManager {
    auth: Arc<dyn Authenticator>,
    token: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self {
            auth,
            token: Mutex::new(None),
        }
    }

    /// Seed with a caller-supplied token, e.g. one lifted from a browser.
    pub fn with_token(auth: Arc<dyn Authenticator>, token: SessionToken) -> Self {
        Self {
            auth,
            token: Mutex::new(Some(token)),
        }
    }

    /// Current token, logging in first if none is held yet.
    pub async fn current(&self) -> Result<SessionToken, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        debug!("no session held, logging in");
        let token = self.auth.login().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Replace a token observed to be stale.
    ///
    /// If the held token already differs from `stale`, another caller
    /// refreshed in the meantime and that token is returned as-is.
    pub async fn refresh(&self, stale: &SessionToken) -> Result<SessionToken, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(current) = guard.as_ref() {
            if current != stale {
                debug!("session already refreshed by another caller");
                return Ok(current.clone());
            }
        }
        info!("refreshing expired session");
        let token = self.auth.login().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Currently held token without triggering a login.
    pub async fn peek(&self) -> Option<SessionToken> {
        self.token.lock().await.clone()
    }

    pub async fn clear(&self) {
        *self.token.lock().await = None;
    }
}

/// Run a session-scoped operation with at most one forced refresh-and-retry.
///
/// The first failure, if retryable, triggers a session refresh and a single
/// replay. The second failure is surfaced unchanged. Parse and unexpected
/// errors are never retried: replaying a request whose response we could not
/// decode will not decode any better.
pub async fn with_session_retry<T, F, Fut>(
    session: &SessionManager,
    retry_delay: Duration,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut(SessionToken) -> Fut,
    Fut: std::future::Future<Output = Result<T, ApiError>>,
{
    let mut token = session.current().await?;
    for attempt in 0..=1u8 {
        match op(token.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt == 0 && err.is_retryable() => {
                warn!(error = %err, "session-scoped request failed, refreshing session");
                if !retry_delay.is_zero() {
                    tokio::time::sleep(retry_delay).await;
                }
                token = session.refresh(&token).await?;
            }
            Err(err) => return Err(err),
        }
    }
    // Loop always returns out of its second iteration.
    Err(ApiError::Unexpected("retry loop exhausted".to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingAuth {
        logins: AtomicUsize,
    }

    impl CountingAuth {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                logins: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.logins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for CountingAuth {
        async fn login(&self) -> Result<SessionToken, ApiError> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SessionToken::new(format!("token-{n}")))
        }
    }

    struct FailingAuth;

    #[async_trait]
    impl Authenticator for FailingAuth {
        async fn login(&self) -> Result<SessionToken, ApiError> {
            Err(ApiError::Auth("bad credentials".to_string()))
        }
    }

    #[tokio::test]
    async fn current_logs_in_once_and_caches() {
        let auth = CountingAuth::new();
        let session = SessionManager::new(auth.clone());
        let first = session.current().await.unwrap();
        let second = session.current().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(auth.count(), 1);
    }

    #[tokio::test]
    async fn seeded_token_skips_login() {
        let auth = CountingAuth::new();
        let session = SessionManager::with_token(auth.clone(), SessionToken::new("external"));
        let token = session.current().await.unwrap();
        assert_eq!(token.as_str(), "external");
        assert_eq!(auth.count(), 0);
    }

    #[tokio::test]
    async fn refresh_skips_login_when_token_already_replaced() {
        let auth = CountingAuth::new();
        let session = SessionManager::new(auth.clone());
        let stale = session.current().await.unwrap();
        let fresh = session.refresh(&stale).await.unwrap();
        assert_ne!(stale, fresh);
        // A second caller still holding the stale token gets the fresh one
        // without another login round-trip.
        let reused = session.refresh(&stale).await.unwrap();
        assert_eq!(reused, fresh);
        assert_eq!(auth.count(), 2);
    }

    #[tokio::test]
    async fn retryable_error_gets_exactly_one_replay() {
        let auth = CountingAuth::new();
        let session = SessionManager::new(auth.clone());
        let attempts = AtomicUsize::new(0);
        let result: Result<(), ApiError> = with_session_retry(&session, Duration::ZERO, |_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Http {
                    status: 500,
                    details: None,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ApiError::Http { status: 500, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        // Initial login plus one forced refresh.
        assert_eq!(auth.count(), 2);
    }

    #[tokio::test]
    async fn retry_succeeds_with_fresh_session() {
        let auth = CountingAuth::new();
        let session = SessionManager::new(auth.clone());
        let attempts = AtomicUsize::new(0);
        let result = with_session_retry(&session, Duration::ZERO, |token| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ApiError::Auth("session expired".to_string()))
                } else {
                    Ok(token.as_str().to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "token-2");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn parse_error_is_not_retried() {
        let auth = CountingAuth::new();
        let session = SessionManager::new(auth.clone());
        let attempts = AtomicUsize::new(0);
        let result: Result<(), ApiError> = with_session_retry(&session, Duration::ZERO, |_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Parse("missing anchor".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::Parse(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(auth.count(), 1);
    }

    #[tokio::test]
    async fn login_failure_is_fatal() {
        let session = SessionManager::new(Arc::new(FailingAuth));
        let result: Result<(), ApiError> =
            with_session_retry(&session, Duration::ZERO, |_token| async { Ok(()) }).await;
        assert!(matches!(result, Err(ApiError::Auth(_))));
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("69184bbcb7df0abcdef");
        let debug = format!("{token:?}");
        assert_eq!(debug, "SessionToken(69184bbc..)");
        assert!(!debug.contains("abcdef"));
    }
}
