use std::collections::HashMap;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::http::request::Parts;
use axum::TypedHeader;
use tokio::sync::RwLock;

use crate::error::ReviewError;
use crate::store::ReviewStore;

/// Resolves bearer tokens to reviewer ids. Sessions are issued elsewhere; this
/// only reads them and keeps recent answers for `ttl`, never past the
/// session's own expiry.
pub struct SessionResolver {
    store: Arc<dyn ReviewStore>,
    ttl: chrono::Duration,
    cache: RwLock<HashMap<String, CachedSession>>,
}

#[derive(Debug, Clone)]
struct CachedSession {
    faculty_id: i32,
    expiry: chrono::DateTime<chrono::Utc>,
}

impl SessionResolver {
    pub fn new(store: Arc<dyn ReviewStore>, ttl_secs: i64) -> Self {
        Self {
            store,
            ttl: chrono::Duration::seconds(ttl_secs),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<i32, ReviewError> {
        if let Some(cached) = self.cache.read().await.get(token) {
            if cached.expiry > chrono::Utc::now() {
                return Ok(cached.faculty_id);
            }
        }

        let (faculty_id, expires_at) = self
            .store
            .session_faculty(token)
            .await?
            .ok_or(ReviewError::Unauthorized)?;

        let now = chrono::Utc::now();
        let expiry = expires_at.min(now + self.ttl);
        let mut cache = self.cache.write().await;
        cache.retain(|_, session| session.expiry > now);
        cache.insert(token.to_string(), CachedSession { faculty_id, expiry });

        Ok(faculty_id)
    }
}

/// The reviewer making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedReviewer(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedReviewer
where
    Arc<SessionResolver>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ReviewError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ReviewError::Unauthorized)?;

        let sessions = Arc::<SessionResolver>::from_ref(state);
        Ok(AuthenticatedReviewer(sessions.resolve(bearer.token()).await?))
    }
}
