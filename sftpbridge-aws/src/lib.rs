//! AWS adapters for the sync engine.
//!
//! - [`S3ObjectStore`]: object reads, writes and in-place metadata replacement
//! - [`SqsRetryQueue`]: the durable retry queue, named after the invoked function

pub mod config;
pub mod error;
pub mod s3_store;
pub mod sqs_queue;

pub use config::AwsConfig;
pub use s3_store::S3ObjectStore;
pub use sqs_queue::SqsRetryQueue;
