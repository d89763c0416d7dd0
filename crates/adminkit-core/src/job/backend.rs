// ── Job transport seam ──

use std::future::Future;
use std::sync::Arc;

use adminkit_api::{ApiClient, Error as ApiError, JobStatus};

use super::run::TargetId;

/// Submits a job for a target and reports its status.
pub trait JobBackend: Send + Sync + 'static {
    fn submit(&self, target: &TargetId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn status(&self, target: &TargetId)
    -> impl Future<Output = Result<JobStatus, ApiError>> + Send;
}

impl<T: JobBackend> JobBackend for Arc<T> {
    fn submit(&self, target: &TargetId) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).submit(target)
    }

    fn status(
        &self,
        target: &TargetId,
    ) -> impl Future<Output = Result<JobStatus, ApiError>> + Send {
        (**self).status(target)
    }
}

/// Sync jobs exposed as `POST {resource}/{id}/sync` and
/// `GET {resource}/{id}/sync-status`.
#[derive(Debug, Clone)]
pub struct HttpJobBackend {
    client: ApiClient,
    resource: String,
}

impl HttpJobBackend {
    /// `resource` is the collection path, e.g. `"email-accounts"`.
    pub fn new(client: ApiClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into(),
        }
    }

    fn job_path(&self, target: &TargetId) -> String {
        format!("{}/{}", self.resource.trim_end_matches('/'), target)
    }
}

impl JobBackend for HttpJobBackend {
    async fn submit(&self, target: &TargetId) -> Result<(), ApiError> {
        self.client.start_sync(&self.job_path(target)).await
    }

    async fn status(&self, target: &TargetId) -> Result<JobStatus, ApiError> {
        self.client.sync_status(&self.job_path(target)).await
    }
}
