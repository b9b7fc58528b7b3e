use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::ApiErrorBody,
    protocol::{ListResponse, LoginRequest, LoginResponse},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{ClientError, Result},
    page::{ListQuery, Listing},
    session::{LogoutReason, Session, SessionProvider},
};

pub const DEFAULT_API_BASE_URL: &str = "https://localhost:8080/api";

pub type QueryParams<'a> = [(&'a str, String)];

/// HTTP access to the back-office service.
///
/// Every request carries the bearer token of the injected session. A `401`
/// on any call tears that session down here, once, instead of in each view.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Arc<SessionProvider>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<SessionProvider>) -> Result<Self> {
        Self::with_http(base_url, session, Client::new())
    }

    pub fn with_timeout(
        base_url: &str,
        session: Arc<SessionProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_http(base_url, session, http)
    }

    fn with_http(base_url: &str, session: Arc<SessionProvider>, http: Client) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionProvider> {
        &self.session
    }

    /// Percent-encodes each segment below the base path.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let body = LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let response: LoginResponse = self
            .send(
                self.http
                    .post(self.endpoint(&["auth", "login"]))
                    .json(&body),
            )
            .await?;
        let session = Session {
            username: response.username,
            role: response.role,
            token: response.token,
        };
        self.session.sign_in(session.clone())?;
        info!(username = %session.username, "api: login succeeded");
        Ok(session)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &QueryParams<'_>,
    ) -> Result<T> {
        self.send(self.request(Method::GET, segments, params)).await
    }

    /// GET a list endpoint and canonicalize its shape for `query`.
    pub(crate) async fn get_listing<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &QueryParams<'_>,
        query: &ListQuery,
    ) -> Result<Listing<T>> {
        let response: ListResponse<T> = self.get(segments, params).await?;
        Ok(Listing::from_response(response, query))
    }

    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &QueryParams<'_>,
    ) -> Result<T> {
        self.send(self.request(Method::POST, segments, params)).await
    }

    pub(crate) async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, segments, &[]).json(body))
            .await
    }

    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &QueryParams<'_>,
    ) -> Result<T> {
        self.send(self.request(Method::PUT, segments, params)).await
    }

    pub(crate) async fn put_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, segments, &[]).json(body))
            .await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        self.send(self.request(Method::DELETE, segments, &[])).await
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        params: &QueryParams<'_>,
    ) -> RequestBuilder {
        let mut builder = self.http.request(method, self.endpoint(segments));
        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_owned();

        if status == StatusCode::UNAUTHORIZED {
            warn!(%path, "api: unauthorized, ending session");
            self.session.teardown(LogoutReason::Unauthorized);
            return Err(ClientError::Unauthorized);
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            let parsed: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            let err = ClientError::from_body(status.as_u16(), &parsed);
            debug!(%path, status = status.as_u16(), "api: request rejected: {err}");
            return Err(err);
        }

        // Some mutations answer 200 with no body at all.
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &body
        };
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
