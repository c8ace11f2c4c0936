//! `AuthApi` over HTTP/JSON

use crate::auth::api::{AuthApi, LoginResponse, PermissionsResponse, RefreshResponse};
use crate::auth::models::LoginRequest;
use crate::auth::transport::Transport;
use crate::auth::wire::{self, LoginBody, RefreshBody};
use crate::config::EndpointConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Method;

pub struct HttpAuthApi {
    transport: Transport,
    endpoints: EndpointConfig,
}

impl HttpAuthApi {
    pub fn new(transport: Transport, endpoints: EndpointConfig) -> Self {
        Self {
            transport,
            endpoints,
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login_with_captcha(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let body = LoginBody {
            phone: request.phone.clone(),
            code: request.sms_code.clone(),
            login_type: request.login_type,
        };
        let response = self
            .transport
            .send_anonymous(
                self.transport
                    .anonymous(Method::POST, &self.endpoints.login)
                    .json(&body),
            )
            .await?;
        wire::parse_login_response(Transport::json(response).await?)
    }

    async fn logout(&self) -> Result<()> {
        self.transport
            .send(self.transport.request(Method::POST, &self.endpoints.logout))
            .await?;
        Ok(())
    }

    async fn verify_token(&self) -> Result<()> {
        self.transport
            .send(self.transport.request(Method::GET, &self.endpoints.verify))
            .await?;
        Ok(())
    }

    async fn fetch_permissions(&self) -> Result<PermissionsResponse> {
        let response = self
            .transport
            .send(self.transport.request(Method::GET, &self.endpoints.permissions))
            .await?;
        wire::parse_permissions_response(Transport::json(response).await?)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let body = RefreshBody {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .transport
            .send_anonymous(
                self.transport
                    .anonymous(Method::POST, &self.endpoints.refresh)
                    .json(&body),
            )
            .await?;
        wire::parse_refresh_response(Transport::json(response).await?)
    }
}
