//! S3-compatible gateway implementation.
//!
//! Works against MinIO (path-style addressing, custom endpoint) as well as
//! AWS S3 proper.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use tracing::{debug, info};

use crate::{retry::with_retry, ObjectInfo, ObjectStorage, ObjectStoreError};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key,
            config.secret_key,
            None,
            None,
            "notebook-hub",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .endpoint_url(config.endpoint)
            .credentials_provider(credentials)
            // MinIO does not serve virtual-hosted-style requests.
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket,
        }
    }

    fn transport<E: std::fmt::Display>(context: &str, e: E) -> ObjectStoreError {
        ObjectStoreError::Transport(format!("{context}: {e}"))
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        with_retry("ensure_bucket", || async {
            match self
                .client
                .create_bucket()
                .bucket(&self.bucket)
                .send()
                .await
            {
                Ok(_) => {
                    info!(bucket = %self.bucket, "Created bucket");
                    Ok(())
                }
                Err(e) => {
                    let service_err = e.into_service_error();
                    if service_err.is_bucket_already_owned_by_you()
                        || service_err.is_bucket_already_exists()
                    {
                        debug!(bucket = %self.bucket, "Bucket already exists");
                        Ok(())
                    } else {
                        Err(Self::transport("create_bucket", service_err))
                    }
                }
            }
        })
        .await
    }

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        with_retry("put", || {
            let bytes = bytes.clone();
            async move {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(bytes))
                    .send()
                    .await
                    .map_err(|e| Self::transport("put_object", e.into_service_error()))?;
                Ok(())
            }
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        with_retry("get", || async {
            let output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    let service_err = e.into_service_error();
                    if service_err.is_no_such_key() {
                        ObjectStoreError::NotFound(key.to_string())
                    } else {
                        Self::transport("get_object", service_err)
                    }
                })?;

            let data = output
                .body
                .collect()
                .await
                .map_err(|e| Self::transport("read body", e))?;
            Ok(data.into_bytes())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        with_retry("delete", || async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| Self::transport("delete_object", e.into_service_error()))?;
            Ok(())
        })
        .await
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ObjectStoreError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Self::transport("presigning config", e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| Self::transport("presign", e.into_service_error()))?;
        Ok(request.uri().to_string())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        with_retry("list", || async {
            let mut objects = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let output = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .set_prefix(prefix.map(str::to_string))
                    .set_continuation_token(continuation.clone())
                    .send()
                    .await
                    .map_err(|e| Self::transport("list_objects", e.into_service_error()))?;

                for object in output.contents() {
                    let Some(key) = object.key() else { continue };
                    objects.push(ObjectInfo {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0),
                        last_modified: object.last_modified().map(|t| t.secs()),
                    });
                }

                match output.next_continuation_token() {
                    Some(token) => continuation = Some(token.to_string()),
                    None => break,
                }
            }
            Ok(objects)
        })
        .await
    }
}
