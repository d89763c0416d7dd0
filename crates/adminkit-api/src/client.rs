// Async HTTP client for the console backend.
//
// List endpoints: GET {resource}?page=&per_page=&search=&{filter}=
// Job endpoints:  POST {job}/sync, GET {job}/sync-status

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{DataEnvelope, ErrorBody, JobStatus, ListEnvelope, ListQuery};
use crate::transport::TransportConfig;

/// Async client for the console REST API.
///
/// Cheap to clone: `reqwest::Client` is internally reference counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` (e.g. `https://admin.example.com/api/v1`).
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages headers and TLS).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout_secs: TransportConfig::default().timeout_secs(),
        })
    }

    /// Ensure the base path ends with `/` so relative joins append.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fetch one page of `resource`.
    ///
    /// `GET {resource}?page={n}&per_page={n}&search={s}&{filter}={value}*`
    pub async fn list(&self, resource: &str, query: &ListQuery) -> Result<ListEnvelope, Error> {
        let url = self.url(resource)?;
        let params = query.query_pairs();
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let raw: Value = self.handle_response(resp).await?;
        ListEnvelope::from_value(raw)
    }

    /// Ask the server to queue a sync job for `job_resource`.
    ///
    /// `POST {job_resource}/sync`. The response body is ignored.
    pub async fn start_sync(&self, job_resource: &str) -> Result<(), Error> {
        let url = self.url(&format!("{}/sync", job_resource.trim_end_matches('/')))?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        self.handle_empty(resp).await
    }

    /// Read the status of the most recent sync job for `job_resource`.
    ///
    /// `GET {job_resource}/sync-status`
    pub async fn sync_status(&self, job_resource: &str) -> Result<JobStatus, Error> {
        let url = self.url(&format!("{}/sync-status", job_resource.trim_end_matches('/')))?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let envelope: DataEnvelope<JobStatus> = self.handle_response(resp).await?;
        Ok(envelope.data)
    }

    // ── Response handling ────────────────────────────────────────────

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.map_transport(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// Classify a non-success response by status code.
    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let raw = resp.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = body.message.clone().unwrap_or_else(|| {
            if raw.is_empty() || raw.trim_start().starts_with('{') {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            } else {
                raw.chars().take(200).collect()
            }
        });

        match status {
            StatusCode::UNAUTHORIZED => Error::Authentication { message },
            StatusCode::FORBIDDEN => Error::PermissionDenied { message },
            StatusCode::NOT_FOUND => Error::NotFound { message },
            StatusCode::UNPROCESSABLE_ENTITY => Error::Validation {
                message: body.aggregate_errors().unwrap_or(message),
                fields: body.errors.unwrap_or_default(),
            },
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { retry_after_secs },
            s if s.is_server_error() => Error::Server {
                status: s.as_u16(),
                message,
            },
            s => Error::Api {
                status: s.as_u16(),
                message,
            },
        }
    }
}
