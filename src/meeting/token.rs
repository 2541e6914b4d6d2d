use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens are treated as expired this long before the provider says they are
pub const REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Process-local access token cache. Writers replace the whole entry, so
/// concurrent refreshes at worst fetch one token too many.
pub struct AccessTokenCache {
    current: RwLock<Option<CachedToken>>,
    margin: Duration,
}

impl Default for AccessTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessTokenCache {
    pub fn new() -> Self {
        Self::with_margin(Duration::seconds(REFRESH_MARGIN_SECS))
    }

    pub fn with_margin(margin: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            margin,
        }
    }

    /// Returns the cached token if it is still usable at `now`
    pub async fn get(&self, now: DateTime<Utc>) -> Option<String> {
        let current = self.current.read().await;
        match current.as_ref() {
            Some(token) if now + self.margin < token.expires_at => Some(token.access_token.clone()),
            Some(token) => {
                debug!(expires_at = %token.expires_at, "Cached access token inside refresh margin");
                None
            }
            None => None,
        }
    }

    pub async fn store(&self, access_token: String, expires_in_secs: i64, now: DateTime<Utc>) {
        let expires_at = now + Duration::seconds(expires_in_secs);
        debug!(expires_at = %expires_at, "Caching access token");

        *self.current.write().await = Some(CachedToken {
            access_token,
            expires_at,
        });
    }

    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = AccessTokenCache::new();
        assert_eq!(cache.get(Utc::now()).await, None);
    }

    #[tokio::test]
    async fn test_token_served_until_refresh_margin() {
        let cache = AccessTokenCache::new();
        let now = Utc::now();
        cache.store("abc".to_string(), 3600, now).await;

        assert_eq!(cache.get(now).await, Some("abc".to_string()));
        assert_eq!(
            cache.get(now + Duration::minutes(54)).await,
            Some("abc".to_string())
        );
        // Inside the final five minutes the token is no longer handed out
        assert_eq!(cache.get(now + Duration::minutes(55)).await, None);
        assert_eq!(cache.get(now + Duration::minutes(61)).await, None);
    }

    #[tokio::test]
    async fn test_short_lived_token_never_served() {
        let cache = AccessTokenCache::new();
        let now = Utc::now();
        cache.store("short".to_string(), 120, now).await;

        assert_eq!(cache.get(now).await, None);
    }

    #[tokio::test]
    async fn test_store_replaces_and_invalidate_clears() {
        let cache = AccessTokenCache::new();
        let now = Utc::now();
        cache.store("first".to_string(), 3600, now).await;
        cache.store("second".to_string(), 3600, now).await;
        assert_eq!(cache.get(now).await, Some("second".to_string()));

        cache.invalidate().await;
        assert_eq!(cache.get(now).await, None);
    }
}
