//! Dataset storage
//!
//! Local directories and S3-compatible buckets behind one handle.
//! All keys are relative to the dataset location.

pub mod local;
pub mod location;
pub mod s3;

pub use local::LocalStore;
pub use location::DatasetLocation;
pub use s3::{S3Client, S3Config};

use bytes::Bytes;

use crate::error::Result;

/// Storage backend for one dataset location
pub enum Storage {
    Local(LocalStore),
    S3(S3Client),
}

impl Storage {
    /// Open storage for a location
    pub fn open(location: &DatasetLocation, s3: S3Config) -> Result<Self> {
        match location {
            DatasetLocation::Local { root } => Ok(Storage::Local(LocalStore::new(root.clone()))),
            DatasetLocation::S3 { bucket, prefix } => {
                Ok(Storage::S3(S3Client::new(s3, bucket.clone(), prefix.clone())?))
            }
        }
    }

    /// Parse a location string and open storage for it
    pub fn from_location_str(location: &str, s3: S3Config) -> Result<Self> {
        Self::open(&DatasetLocation::parse(location)?, s3)
    }

    /// Location this storage is scoped to
    pub fn location(&self) -> DatasetLocation {
        match self {
            Storage::Local(store) => DatasetLocation::Local {
                root: store.root().to_path_buf(),
            },
            Storage::S3(client) => DatasetLocation::S3 {
                bucket: client.bucket().into(),
                prefix: client.prefix().into(),
            },
        }
    }

    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        match self {
            Storage::Local(store) => store.get_object(key).await,
            Storage::S3(client) => client.get_object(key).await,
        }
    }

    pub async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        match self {
            Storage::Local(store) => store.put_object(key, data).await,
            Storage::S3(client) => client.put_object(key, data).await,
        }
    }

    /// All object keys under the location, sorted
    pub async fn list_objects(&self) -> Result<Vec<String>> {
        match self {
            Storage::Local(store) => store.list_objects().await,
            Storage::S3(client) => client.list_objects().await,
        }
    }

    pub async fn object_exists(&self, key: &str) -> Result<bool> {
        match self {
            Storage::Local(store) => store.object_exists(key).await,
            Storage::S3(client) => client.object_exists(key).await,
        }
    }

    /// Copy one object from `self` into `dst`, returning bytes copied
    pub async fn copy_object(&self, key: &str, dst: &Storage, dst_key: &str) -> Result<u64> {
        let data = self.get_object(key).await?;
        let len = data.len() as u64;
        dst.put_object(dst_key, data).await?;
        Ok(len)
    }
}
