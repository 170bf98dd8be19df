//! Persistence: blob container access and the cost-table wire format.

mod blob_store;
pub mod cache_file;

pub use blob_store::{BlobStore, FileBlobStore, NullBlobStore};
