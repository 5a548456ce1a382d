use anyhow::{bail, Result};

use issuehub::api::ApiClient;
use issuehub::models::CurrentUser;
use issuehub::notify::{NotificationKind, NotificationQueue};

/// Every protected command goes through this gate: no stored credential
/// means unauthenticated, full stop.
pub fn require_session(client: &ApiClient) -> Result<()> {
    if client.session().get()?.is_none() {
        bail!("Not logged in. Run 'issuehub login' first.");
    }
    Ok(())
}

/// Fetches the authenticated user. A credential that cannot produce one is
/// treated as absent: the stored token is cleared before the error surfaces.
pub async fn current_user(client: &ApiClient) -> Result<CurrentUser> {
    require_session(client)?;
    match client.me().await {
        Ok(user) => Ok(user),
        Err(err) => {
            client.session().set(None)?;
            Err(err.into())
        }
    }
}

pub async fn login(
    client: &ApiClient,
    notifier: &NotificationQueue,
    email: &str,
    password: &str,
) -> Result<()> {
    let token = client.login(email, password).await?;
    client.session().set(Some(&token.access_token))?;

    let me = current_user(client).await?;
    notifier.push("Logged in successfully", NotificationKind::Success);
    println!("Logged in as {} <{}>", me.name, me.email);
    Ok(())
}

pub async fn signup(
    client: &ApiClient,
    notifier: &NotificationQueue,
    name: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let token = client.signup(name, email, password).await?;
    client.session().set(Some(&token.access_token))?;

    let me = current_user(client).await?;
    notifier.push("Account created", NotificationKind::Success);
    println!("Logged in as {} <{}>", me.name, me.email);
    Ok(())
}

pub fn logout(client: &ApiClient) -> Result<()> {
    client.session().set(None)?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(client: &ApiClient) -> Result<()> {
    let me = current_user(client).await?;
    println!("#{} {} <{}>", me.id, me.name, me.email);
    println!("Member since: {}", me.created_at.format("%Y-%m-%d"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuehub::api::ApiClient;
    use issuehub::session::SessionStore;
    use issuehub::test_support::StubTransport;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn test_client() -> (ApiClient, Arc<StubTransport>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let session = SessionStore::open(&dir.path().join("session.db")).unwrap();
        let transport = Arc::new(StubTransport::new());
        let client = ApiClient::with_transport(transport.clone(), session);
        (client, transport, dir)
    }

    fn user_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Dana",
            "email": "dana@example.com",
            "created_at": "2026-08-01T10:00:00"
        })
    }

    #[tokio::test]
    async fn test_login_stores_token_and_fetches_user() {
        let (client, transport, _dir) = test_client();
        let notifier = NotificationQueue::new();
        transport.push_json(200, json!({ "access_token": "tok-1" }));
        transport.push_json(200, user_json(1));

        login(&client, &notifier, "dana@example.com", "pw").await.unwrap();

        assert_eq!(client.session().get().unwrap(), Some("tok-1".to_string()));
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/auth/login");
        assert_eq!(requests[0].bearer, None);
        assert_eq!(requests[1].path, "/me");
        // The /me call runs with the freshly stored credential.
        assert_eq!(requests[1].bearer.as_deref(), Some("tok-1"));
        assert_eq!(notifier.active().len(), 1);
    }

    #[tokio::test]
    async fn test_login_clears_token_when_user_fetch_fails() {
        let (client, transport, _dir) = test_client();
        let notifier = NotificationQueue::new();
        transport.push_json(200, json!({ "access_token": "tok-1" }));
        transport.push_json(401, json!({ "error": { "message": "Not authenticated" } }));

        let result = login(&client, &notifier, "dana@example.com", "pw").await;

        assert!(result.is_err());
        assert_eq!(client.session().get().unwrap(), None);
    }

    #[tokio::test]
    async fn test_whoami_without_session_does_not_call_api() {
        let (client, transport, _dir) = test_client();

        let result = whoami(&client).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Not logged in"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (client, _transport, _dir) = test_client();
        client.session().set(Some("tok-1")).unwrap();

        logout(&client).unwrap();

        assert_eq!(client.session().get().unwrap(), None);
    }
}
