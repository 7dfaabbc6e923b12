//! Expiry-aware credential handling for feed clients.
//!
//! Feed transports that need bearer tokens hold a [`CachedCredentials`]
//! value instead of consulting any process-global cache. The cache is an
//! injected object: it wraps a [`TokenSource`] that knows how to issue a
//! token, remembers the last one, and re-issues when the remembered token is
//! expired or close enough to expiry that an in-flight request could outlive
//! it. All expiry decisions take `now` as a parameter.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::error::FeedResult;

/// A bearer token with its expiry instant.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The token value to present to the upstream source.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the token expires within `margin` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues fresh tokens on demand.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Issue a new token.
    ///
    /// # Returns
    /// * `Ok(AccessToken)` - A freshly issued token
    /// * `Err(FeedError)` - If the credential endpoint rejects the request
    async fn issue(&self) -> FeedResult<AccessToken>;
}

/// A token cache scoped to one feed client.
pub struct CachedCredentials {
    source: Arc<dyn TokenSource>,
    refresh_margin: Duration,
    current: RwLock<Option<AccessToken>>,
}

impl CachedCredentials {
    pub fn new(source: Arc<dyn TokenSource>, refresh_margin: Duration) -> Self {
        Self {
            source,
            refresh_margin,
            current: RwLock::new(None),
        }
    }

    /// The cached token, re-issued first if it is missing, expired, or
    /// expires within the refresh margin.
    ///
    /// Concurrent callers may each trigger an issue; the last write wins,
    /// which is harmless since every issued token is valid.
    pub async fn token(&self, now: DateTime<Utc>) -> FeedResult<AccessToken> {
        {
            let guard = self.current.read();
            if let Some(token) = guard.as_ref() {
                if !token.expires_within(now, self.refresh_margin) {
                    return Ok(token.clone());
                }
            }
        }

        // The lock is not held across the issue await.
        let fresh = self.source.issue().await?;
        *self.current.write() = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token so the next access re-issues.
    ///
    /// Called after an upstream `AuthFailed` response, which means the
    /// token was revoked before its stated expiry.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }
}

impl fmt::Debug for CachedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentials")
            .field("refresh_margin", &self.refresh_margin)
            .field("cached", &self.current.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        issued: AtomicUsize,
        lifetime: Duration,
        base: DateTime<Utc>,
    }

    impl CountingSource {
        fn new(base: DateTime<Utc>, lifetime: Duration) -> Self {
            Self {
                issued: AtomicUsize::new(0),
                lifetime,
                base,
            }
        }

        fn count(&self) -> usize {
            self.issued.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn issue(&self) -> FeedResult<AccessToken> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken::new(
                format!("token-{n}"),
                self.base + self.lifetime,
            ))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_expiry_checks() {
        let token = AccessToken::new("abc", now() + Duration::minutes(30));
        assert!(!token.is_expired(now()));
        assert!(token.is_expired(now() + Duration::minutes(30)));
        assert!(token.is_expired(now() + Duration::hours(1)));
        assert!(!token.expires_within(now(), Duration::minutes(5)));
        assert!(token.expires_within(now(), Duration::minutes(30)));
        assert!(token.expires_within(now() + Duration::minutes(26), Duration::minutes(5)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let token = AccessToken::new("super-secret", now());
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_fresh_token_served_from_cache() {
        let source = Arc::new(CountingSource::new(now(), Duration::hours(1)));
        let credentials = CachedCredentials::new(source.clone(), Duration::minutes(5));

        let first = credentials.token(now()).await.unwrap();
        let second = credentials.token(now() + Duration::minutes(10)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.count(), 1);
    }

    #[tokio::test]
    async fn test_token_expiring_within_margin_reissued() {
        let source = Arc::new(CountingSource::new(now(), Duration::minutes(20)));
        let credentials = CachedCredentials::new(source.clone(), Duration::minutes(5));

        credentials.token(now()).await.unwrap();
        // 16 minutes in, the 20-minute token is inside the 5-minute margin.
        let refreshed = credentials
            .token(now() + Duration::minutes(16))
            .await
            .unwrap();
        assert_eq!(source.count(), 2);
        assert_eq!(refreshed.secret(), "token-2");
    }

    #[tokio::test]
    async fn test_invalidate_forces_reissue() {
        let source = Arc::new(CountingSource::new(now(), Duration::hours(1)));
        let credentials = CachedCredentials::new(source.clone(), Duration::minutes(5));

        credentials.token(now()).await.unwrap();
        credentials.invalidate();
        credentials.token(now()).await.unwrap();
        assert_eq!(source.count(), 2);
    }
}
