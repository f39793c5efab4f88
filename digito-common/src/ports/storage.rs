//! Object storage port used to stage alarm templates.

use super::{AwsPortError, lock};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

pub trait ObjectStore: Send + Sync {
    /// Store `body` and return a URL CloudFormation can read it from.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<String, AwsPortError>> + Send;
}

/// Virtual-hosted style S3 URL.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

#[derive(Debug, Clone, Default)]
pub struct MockObjectStore {
    objects: Arc<Mutex<BTreeMap<(String, String), Vec<u8>>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().map(|(_, key)| key.clone()).collect()
    }
}

impl ObjectStore for MockObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String, AwsPortError> {
        if bucket.is_empty() {
            return Err(AwsPortError::InvalidRequest {
                operation: "PutObject",
                resource: key.to_string(),
                detail: "bucket name is empty".to_string(),
            });
        }
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), body);
        Ok(object_url(bucket, key))
    }
}
