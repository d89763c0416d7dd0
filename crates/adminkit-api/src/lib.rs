// adminkit-api: Async REST transport for the admin console backend

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::{
    FilterValue, Filters, JobState, JobStats, JobStatus, ListEnvelope, ListQuery, Record,
};
pub use transport::TransportConfig;
