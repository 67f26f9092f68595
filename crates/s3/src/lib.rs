//! logstore-s3: S3 backend for logstore
//!
//! This crate provides the implementation of the LogStore trait
//! using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
mod error;
pub mod multipart;

pub use client::S3LogStore;
pub use multipart::UploadConfig;
