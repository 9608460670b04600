//! HttpNotificationApi - reqwest implementation of `NotificationApi`.
//!
//! Every request carries `Authorization: Bearer <token>`. After
//! `set_credential(None)` requests fail with `Unauthorized` locally. Bodies
//! are parsed
//! by [`super::responses`], which is the only place that knows about the
//! service's historical response shapes.
//!
//! # Configuration
//!
//! ```ignore
//! let api = HttpNotificationApi::from_config(&config.api, token)?;
//! let batch = api.fetch_notifications(&NotificationQuery::first_page(20)).await?;
//! ```

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};

use super::responses::{parse_created, parse_listing, parse_stats, parse_unread_count};
use crate::config::ApiConfig;
use crate::domain::foundation::NotificationId;
use crate::domain::notification::Notification;
use crate::ports::{
    ApiError, NewNotification, NotificationApi, NotificationBatch, NotificationQuery,
    NotificationStats,
};

/// Notification REST client.
pub struct HttpNotificationApi {
    base_url: String,
    token: RwLock<Option<Secret<String>>>,
    timeout: Duration,
    client: Client,
}

impl HttpNotificationApi {
    /// Creates a client for `base_url` (e.g. `https://host/api`).
    pub fn new(
        base_url: impl Into<String>,
        token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            token: RwLock::new(Some(token)),
            timeout,
            client,
        })
    }

    /// Creates a client from the `[api]` configuration section.
    pub fn from_config(config: &ApiConfig, token: Secret<String>) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), token, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/notifications{}", self.base_url, path)
    }

    fn item_url(&self, id: &NotificationId, action: Option<&str>) -> String {
        match action {
            Some(action) => self.url(&format!("/{}/{}", id, action)),
            None => self.url(&format!("/{}", id)),
        }
    }

    /// Sends an authenticated request and maps transport errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.expose_secret().clone())
            .ok_or(ApiError::Unauthorized)?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    ApiError::network(format!("Connection failed: {}", e))
                } else {
                    ApiError::network(e.to_string())
                }
            })?;

        Self::check_status(response).await
    }

    /// Maps non-success statuses to `ApiError`.
    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ApiError::Unauthorized),
            404 => Err(ApiError::NotFound(body)),
            code => Err(ApiError::Status { status: code, body }),
        }
    }

    async fn json(response: Response) -> Result<Value, ApiError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::invalid_response(e.to_string()))
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    fn set_credential(&self, credential: Option<&str>) {
        let token = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Secret::new(c.to_string()));
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    async fn fetch_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<NotificationBatch, ApiError> {
        let response = self.send(self.client.get(self.url("")).query(query)).await?;
        let batch = parse_listing(Self::json(response).await?)?;

        tracing::debug!(
            count = batch.notifications.len(),
            unread_count = batch.unread_count,
            "Fetched notifications"
        );
        Ok(batch)
    }

    async fn fetch_unread_count(&self) -> Result<usize, ApiError> {
        let response = self.send(self.client.get(self.url("/unread-count"))).await?;
        parse_unread_count(Self::json(response).await?)
    }

    async fn fetch_stats(&self) -> Result<NotificationStats, ApiError> {
        let response = self.send(self.client.get(self.url("/stats"))).await?;
        parse_stats(Self::json(response).await?)
    }

    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, ApiError> {
        notification.validate()?;
        let response = self
            .send(self.client.post(self.url("")).json(notification))
            .await?;
        let created = parse_created(Self::json(response).await?)?;

        tracing::debug!(notification_id = %created.id, "Created notification");
        Ok(created)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.send(self.client.put(self.item_url(id, Some("read"))))
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.send(self.client.put(self.url("/mark-all-read"))).await?;
        Ok(())
    }

    async fn archive(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.send(self.client.put(self.item_url(id, Some("archive"))))
            .await?;
        Ok(())
    }

    async fn archive_many(&self, ids: &[NotificationId]) -> Result<(), ApiError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "notificationIds": ids });
        self.send(self.client.put(self.url("/archive")).json(&body))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.send(self.client.delete(self.item_url(id, None))).await?;
        Ok(())
    }
}
