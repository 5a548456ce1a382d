use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    Comment, CurrentUser, Issue, IssuePatch, MemberInvite, MemberOnboard, NewIssue, NewProject,
    Project, ProjectMembership, Role, TokenResponse,
};
use crate::session::SessionStore;

pub use reqwest::Method;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Single error surface for everything the request layer can fail with.
/// Callers never branch on variants, they display the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("session store error: {0}")]
    Session(String),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: reqwest::Client,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent("issuehub-client")
            .build()
            .map_err(|err| ApiError::Network(format!("failed to initialize HTTP client: {err}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method, &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?
            .to_vec();

        Ok(RawResponse { status, body })
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Typed client over the IssueHub HTTP API. Attaches the stored bearer
/// credential, normalizes non-2xx responses into [`ApiError`], and treats
/// 204 as "no body". Never retries and never refreshes the credential;
/// a 401 surfaces like any other failure.
pub struct ApiClient {
    transport: Arc<dyn ApiTransport>,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(api_url: &str, session: SessionStore) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(api_url)?;
        Ok(Self::with_transport(Arc::new(transport), session))
    }

    pub fn with_transport(transport: Arc<dyn ApiTransport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    /// The sole mutation entry point for the stored credential.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Performs one call. `Ok(None)` is a 204; any non-2xx becomes an
    /// [`ApiError::Api`] carrying the server's `{error:{message}}` when it
    /// decodes, or `Request failed (<status>)` when it does not.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, ApiError> {
        let bearer = self
            .session
            .get()
            .map_err(|err| ApiError::Session(err.to_string()))?;
        let request = ApiRequest {
            method,
            path: path.to_owned(),
            body,
            bearer,
        };

        debug!(method = %request.method, path = %request.path, "api request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, path, "api response");

        if !(200..300).contains(&response.status) {
            let message = serde_json::from_slice::<ErrorEnvelope>(&response.body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("Request failed ({})", response.status));
            return Err(ApiError::Api(message));
        }

        if response.status == 204 {
            return Ok(None);
        }

        serde_json::from_slice(&response.body)
            .map(Some)
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let value = self
            .call(method, path, body)
            .await?
            .ok_or_else(|| ApiError::Decode("expected a response body".to_string()))?;
        serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
    }

    fn encode<T: serde::Serialize>(payload: &T) -> Result<Value, ApiError> {
        serde_json::to_value(payload).map_err(|err| ApiError::Decode(err.to_string()))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.request(Method::POST, "/auth/login", Some(body)).await
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.request(Method::POST, "/auth/signup", Some(body)).await
    }

    pub async fn me(&self) -> Result<CurrentUser, ApiError> {
        self.request(Method::GET, "/me", None).await
    }

    pub async fn projects(&self) -> Result<Vec<Project>, ApiError> {
        self.request(Method::GET, "/projects", None).await
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        self.request(Method::POST, "/projects", Some(Self::encode(project)?))
            .await
    }

    pub async fn maintained_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.request(Method::GET, "/projects/maintained", None).await
    }

    pub async fn members(&self, project_id: i64) -> Result<Vec<ProjectMembership>, ApiError> {
        self.request(Method::GET, &format!("/projects/{project_id}/members"), None)
            .await
    }

    pub async fn add_member(&self, project_id: i64, invite: &MemberInvite) -> Result<(), ApiError> {
        self.call(
            Method::POST,
            &format!("/projects/{project_id}/members"),
            Some(Self::encode(invite)?),
        )
        .await?;
        Ok(())
    }

    pub async fn onboard_member(
        &self,
        project_id: i64,
        onboard: &MemberOnboard,
    ) -> Result<(), ApiError> {
        self.call(
            Method::POST,
            &format!("/projects/{project_id}/members/onboard"),
            Some(Self::encode(onboard)?),
        )
        .await?;
        Ok(())
    }

    pub async fn set_member_role(
        &self,
        project_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<(), ApiError> {
        self.call(
            Method::PATCH,
            &format!("/projects/{project_id}/members/{user_id}"),
            Some(serde_json::json!({ "role": role })),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_member(&self, project_id: i64, user_id: i64) -> Result<(), ApiError> {
        self.call(
            Method::DELETE,
            &format!("/projects/{project_id}/members/{user_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    /// `query` is a prebuilt query string (see [`crate::query::IssueQuery`]).
    pub async fn issues(&self, project_id: i64, query: &str) -> Result<Vec<Issue>, ApiError> {
        self.request(
            Method::GET,
            &format!("/projects/{project_id}/issues?{query}"),
            None,
        )
        .await
    }

    pub async fn create_issue(&self, project_id: i64, issue: &NewIssue) -> Result<Issue, ApiError> {
        self.request(
            Method::POST,
            &format!("/projects/{project_id}/issues"),
            Some(Self::encode(issue)?),
        )
        .await
    }

    pub async fn issue(&self, issue_id: i64) -> Result<Issue, ApiError> {
        self.request(Method::GET, &format!("/issues/{issue_id}"), None)
            .await
    }

    pub async fn update_issue(&self, issue_id: i64, patch: &IssuePatch) -> Result<Issue, ApiError> {
        self.request(
            Method::PATCH,
            &format!("/issues/{issue_id}"),
            Some(Self::encode(patch)?),
        )
        .await
    }

    pub async fn comments(&self, issue_id: i64) -> Result<Vec<Comment>, ApiError> {
        self.request(Method::GET, &format!("/issues/{issue_id}/comments"), None)
            .await
    }

    pub async fn add_comment(&self, issue_id: i64, body: &str) -> Result<Comment, ApiError> {
        self.request(
            Method::POST,
            &format!("/issues/{issue_id}/comments"),
            Some(serde_json::json!({ "body": body })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTransport;
    use serde_json::json;
    use tempfile::tempdir;

    fn test_client() -> (ApiClient, Arc<StubTransport>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let session = SessionStore::open(&dir.path().join("session.db")).unwrap();
        let transport = Arc::new(StubTransport::new());
        let client = ApiClient::with_transport(transport.clone(), session);
        (client, transport, dir)
    }

    #[tokio::test]
    async fn test_bearer_attached_when_session_exists() {
        let (client, transport, _dir) = test_client();
        client.session().set(Some("tok-abc")).unwrap();
        transport.push_json(200, json!([]));

        client.projects().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer.as_deref(), Some("tok-abc"));
    }

    #[tokio::test]
    async fn test_bearer_omitted_without_session() {
        let (client, transport, _dir) = test_client();
        transport.push_json(200, json!({ "access_token": "t" }));

        client.login("a@example.com", "pw").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].bearer, None);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/auth/login");
    }

    #[tokio::test]
    async fn test_error_envelope_message_is_surfaced() {
        let (client, transport, _dir) = test_client();
        transport.push_json(403, json!({ "error": { "message": "Maintainer role required" } }));

        let err = client.projects().await.unwrap_err();
        assert_eq!(err, ApiError::Api("Maintainer role required".to_string()));
    }

    #[tokio::test]
    async fn test_undecodable_error_body_synthesizes_message() {
        let (client, transport, _dir) = test_client();
        transport.push_raw(502, b"<html>bad gateway</html>");

        let err = client.projects().await.unwrap_err();
        assert_eq!(err, ApiError::Api("Request failed (502)".to_string()));
    }

    #[tokio::test]
    async fn test_no_content_yields_none() {
        let (client, transport, _dir) = test_client();
        transport.push_raw(204, b"");

        let result = client.call(Method::DELETE, "/projects/1/members/2", None).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let (client, transport, _dir) = test_client();
        transport.push_raw(200, b"not json");

        let err = client.projects().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_401_is_an_ordinary_error_and_session_is_kept() {
        let (client, transport, _dir) = test_client();
        client.session().set(Some("expired")).unwrap();
        transport.push_json(401, json!({ "error": { "message": "Not authenticated" } }));

        let err = client.me().await.unwrap_err();
        assert_eq!(err, ApiError::Api("Not authenticated".to_string()));
        // Clearing the credential is the caller's decision, not the client's.
        assert_eq!(client.session().get().unwrap(), Some("expired".to_string()));
    }

    #[tokio::test]
    async fn test_json_body_is_sent_for_mutations() {
        let (client, transport, _dir) = test_client();
        transport.push_json(200, json!({ "ok": true }));

        client
            .add_member(
                4,
                &MemberInvite {
                    email: "new@example.com".to_string(),
                    role: Role::Member,
                },
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/projects/4/members");
        assert_eq!(
            requests[0].body,
            Some(json!({ "email": "new@example.com", "role": "member" }))
        );
    }
}
