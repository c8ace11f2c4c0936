//! Bearer-token HTTP transport
//!
//! Attaches the stored access token to outgoing requests and turns a `401`
//! on an authorized call into a notification on the [`UnauthorizedHook`].

use crate::auth::guard::UnauthorizedHook;
use crate::auth::token_store::TokenStore;
use crate::auth::wire::ErrorBody;
use crate::error::{Error, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;

#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    store: TokenStore,
    hook: UnauthorizedHook,
}

impl Transport {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: TokenStore,
        hook: UnauthorizedHook,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            hook,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request carrying the current access token, if one is stored
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.store.get_access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Request without credentials (login, refresh)
    pub fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send an authorized request; a `401` notifies the unauthorized hook
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Server rejected the access token");
            self.hook.notify();
            return Err(Error::Unauthorized);
        }

        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(response).await,
        })
    }

    /// Send an anonymous request; `401`/`403` mean the credential was refused
    pub async fn send_anonymous(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::CredentialRejected(message));
        }
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Read a JSON response body
    pub async fn json(response: Response) -> Result<serde_json::Value> {
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON body: {}", e)))
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
        return body.error;
    }
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageMedia;

    fn transport(base_url: &str) -> Transport {
        Transport::new(
            base_url,
            Duration::from_secs(5),
            TokenStore::new(StorageMedia::in_memory()),
            UnauthorizedHook::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_slashes() {
        let transport = transport("http://localhost:9000/");
        assert_eq!(
            transport.url("/api/auth/login"),
            "http://localhost:9000/api/auth/login"
        );
        assert_eq!(
            transport.url("api/auth/verify"),
            "http://localhost:9000/api/auth/verify"
        );
    }
}
