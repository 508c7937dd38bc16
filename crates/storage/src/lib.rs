//! Object storage for checklist evidence media.
//!
//! [`S3Storage`] implements the `StorageSigner` and `StorageUploader` ports
//! against any S3-compatible endpoint.

pub mod config;
pub mod s3;

pub use config::StorageConfig;
pub use s3::S3Storage;
