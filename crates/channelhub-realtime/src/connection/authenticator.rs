//! Identity binding. Resolves a client's identity token to a member.

use std::sync::Arc;

use tracing::debug;

use channelhub_core::error::AppError;
use channelhub_core::result::AppResult;

use super::handle::ConnectionHandle;
use crate::auth::service::{AuthService, IdentityRequest};

/// Binds members to connections through the authorization service.
#[derive(Debug, Clone)]
pub struct IdentityBinder {
    /// Authorization service.
    service: Arc<dyn AuthService>,
}

impl IdentityBinder {
    /// Creates a new binder.
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self { service }
    }

    /// Handles an identity bind request and returns the bound member ID.
    ///
    /// The token is always stored so later channel authorizations present
    /// the latest one. The member itself is bound only once; rebinding an
    /// already bound connection keeps the original member and skips the
    /// service.
    pub async fn bind(&self, conn: &ConnectionHandle, token: String) -> AppResult<String> {
        conn.set_token(token.clone());

        if let Some(member_id) = conn.member_id() {
            debug!(conn_id = %conn.id, member_id = %member_id, "Connection already bound");
            return Ok(member_id);
        }

        let request = IdentityRequest {
            socket_id: conn.id.clone(),
            token,
            headers: conn.forwarded_headers.clone(),
        };
        let member_id = self.service.identify(&request).await?.ok_or_else(|| {
            AppError::authentication(format!("Token for {} is not tied to a member", conn.id))
        })?;

        if !conn.bind_member(&member_id) {
            // Closed meanwhile, or a concurrent bind got there first.
            return conn.member_id().ok_or_else(|| {
                AppError::transport(format!("Connection {} closed during binding", conn.id))
            });
        }

        debug!(conn_id = %conn.id, member_id = %member_id, "Member bound to connection");
        Ok(member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedAuthService, connection};
    use channelhub_core::error::ErrorKind;

    #[tokio::test]
    async fn test_bind_resolves_member() {
        let service = Arc::new(ScriptedAuthService::new());
        let binder = IdentityBinder::new(service.clone());
        let (conn, _rx) = connection("A");

        assert_eq!(binder.bind(&conn, "token-u1".into()).await.unwrap(), "u1");
        assert_eq!(conn.member_id().as_deref(), Some("u1"));
        assert_eq!(conn.token().as_deref(), Some("token-u1"));
    }

    #[tokio::test]
    async fn test_rebind_refreshes_token_only() {
        let service = Arc::new(ScriptedAuthService::new());
        let binder = IdentityBinder::new(service.clone());
        let (conn, _rx) = connection("A");

        binder.bind(&conn, "token-u1".into()).await.unwrap();
        assert_eq!(binder.bind(&conn, "token-u2".into()).await.unwrap(), "u1");

        assert_eq!(conn.member_id().as_deref(), Some("u1"));
        assert_eq!(conn.token().as_deref(), Some("token-u2"));
        assert_eq!(service.identity_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_leaves_connection_unbound() {
        let binder = IdentityBinder::new(Arc::new(ScriptedAuthService::new()));
        let (conn, _rx) = connection("A");

        let err = binder.bind(&conn, "garbage".into()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(conn.member_id(), None);
    }
}
