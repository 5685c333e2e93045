pub mod client;
pub mod error;
pub mod types;

pub use client::{AnalysisBackend, ProcurexClient};
pub use error::BackendError;
pub use types::{HealthResponse, StatusResponse};
