//! Blob storage for document contents
//!
//! Each document version is stored as an individual file named after the
//! hash of its [`BucketKey`](crate::BucketKey).

mod store;

pub use store::{FileBucket, FileBucketConfig};
