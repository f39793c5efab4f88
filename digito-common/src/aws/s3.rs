use crate::ports::storage::object_url;
use crate::ports::{AwsPortError, ObjectStore};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

#[derive(Debug, Clone)]
pub struct S3Adapter {
    client: aws_sdk_s3::Client,
}

impl S3Adapter {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for S3Adapter {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<String, AwsPortError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| AwsPortError::service("PutObject", key, DisplayErrorContext(&err)))?;
        Ok(object_url(bucket, key))
    }
}
