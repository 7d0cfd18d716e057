//! Identity resolution and first-sight user bootstrap.
//!
//! Neither step is allowed to block a request: store trouble degrades to an
//! anonymous caller (identity) or a free-plan user (bootstrap).

use axum::http::HeaderMap;
use tracing::{info, warn};

use crate::limits::device::{cookie_value, SESSION_COOKIE};
use crate::models::user::{AuthIdentity, UserRecord};
use crate::store::UserStore;

/// Resolves the `session` cookie to an auth identity. Missing, expired or
/// unverifiable sessions are anonymous.
pub async fn resolve_identity(users: &dyn UserStore, headers: &HeaderMap) -> Option<AuthIdentity> {
    let session_id = cookie_value(headers, SESSION_COOKIE)?;
    match users.resolve_session(session_id).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "session lookup failed, treating caller as anonymous");
            None
        }
    }
}

/// Returns the user row for `identity`, inserting the default row on first
/// sight. No identity yields the synthetic guest, which is never persisted.
pub async fn bootstrap_user(users: &dyn UserStore, identity: Option<&AuthIdentity>) -> UserRecord {
    let Some(identity) = identity else {
        return UserRecord::guest();
    };
    let auth_id = identity.auth_id.as_str();
    let email = identity.email.as_deref();

    let existing = match users.find_user(auth_id).await {
        Ok(row) => row,
        Err(e) => {
            warn!(auth_id, error = %e, "user lookup failed, proceeding as free user");
            return UserRecord::fallback(auth_id, email);
        }
    };

    if let Some(row) = existing {
        return row.into();
    }

    match users.insert_default_user(auth_id, email).await {
        Ok(row) => {
            info!(auth_id, "bootstrapped new user");
            row.into()
        }
        Err(e) => {
            warn!(auth_id, error = %e, "user bootstrap insert failed, proceeding as free user");
            UserRecord::fallback(auth_id, email)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Plan, PlanStatus, Role};
    use crate::store::MemoryStore;
    use axum::http::{header, HeaderValue};

    fn identity(id: &str) -> AuthIdentity {
        AuthIdentity {
            auth_id: id.to_string(),
            email: Some(format!("{id}@example.com")),
        }
    }

    #[tokio::test]
    async fn test_anonymous_is_guest_and_not_persisted() {
        let store = MemoryStore::new();
        let user = bootstrap_user(&store, None).await;
        assert_eq!(user.role, Role::Guest);
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_first_sight_creates_single_row() {
        let store = MemoryStore::new();
        let first = bootstrap_user(&store, Some(&identity("a1"))).await;
        let second = bootstrap_user(&store, Some(&identity("a1"))).await;
        assert_eq!(first, second);
        assert_eq!(first.role, Role::User);
        assert_eq!(first.plan_status, PlanStatus::Active);
        assert_eq!(first.email.as_deref(), Some("a1@example.com"));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_row_is_normalized() {
        let store = MemoryStore::new();
        store.put_user("a1", "PREMIUM", "Admin");
        let user = bootstrap_user(&store, Some(&identity("a1"))).await;
        assert_eq!(user.plan, Plan::Premium);
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_free_user() {
        let store = MemoryStore::new();
        store.set_fail_users(true);
        let user = bootstrap_user(&store, Some(&identity("a1"))).await;
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.auth_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_resolve_identity_from_session_cookie() {
        let store = MemoryStore::new();
        store.add_session("sess1", "a1", None);
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=sess1"));
        let id = resolve_identity(&store, &headers).await.unwrap();
        assert_eq!(id.auth_id, "a1");

        headers.insert(header::COOKIE, HeaderValue::from_static("session=nope"));
        assert!(resolve_identity(&store, &headers).await.is_none());
        assert!(resolve_identity(&store, &HeaderMap::new()).await.is_none());
    }
}
