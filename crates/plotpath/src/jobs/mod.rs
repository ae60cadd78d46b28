//! In-memory job records.

pub mod job;
pub mod registry;
pub mod request;

pub use job::{AiImage, Job, JobId, JobStatus};
pub use registry::JobRegistry;
pub use request::{JobRequest, RawJobRequest};
