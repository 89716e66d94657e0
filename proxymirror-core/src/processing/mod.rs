//! Proxy build processing: the per-job invoker and the scan pipeline driving it.

pub mod invoker;
pub mod pipeline;

pub use invoker::{EncodeErrorKind, EncodeInvoker, EncodeJob, EncodeResult};
pub use pipeline::{FailedJob, RunContext, ScanPipeline, Summary};
