//! S3 log store implementation
//!
//! Wraps aws-sdk-s3 and implements the LogStore trait from logstore-core.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

use logstore_core::{Context, Error, LogKey, LogReader, LogStore, Result, StoreUrl};

use crate::error::map_sdk_error;
use crate::multipart::{Upload, UploadConfig};

/// Location S3 expects to be given without a LocationConstraint
const DEFAULT_LOCATION: &str = "us-east-1";

/// Log store backed by one bucket of an S3-compatible service
#[derive(Clone)]
pub struct S3LogStore {
    inner: aws_sdk_s3::Client,
    bucket: String,
    upload: UploadConfig,
}

impl fmt::Debug for S3LogStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3LogStore")
            .field("bucket", &self.bucket)
            .field("part_size", &self.upload.get_part_size())
            .finish()
    }
}

impl S3LogStore {
    /// Parse a store URL, connect, and make sure the bucket exists
    pub async fn connect(uri: &str) -> Result<Self> {
        let url = StoreUrl::parse(uri)?;
        Self::connect_url(&url).await
    }

    /// Connect with already-parsed settings and make sure the bucket exists
    pub async fn connect_url(url: &StoreUrl) -> Result<Self> {
        let client = build_client(url).await?;
        let store = Self::from_client(client, url.bucket.clone());
        store.ensure_bucket(&url.location).await?;
        Ok(store)
    }

    /// Wrap a pre-built client without touching the bucket
    pub fn from_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            inner: client,
            bucket: bucket.into(),
            upload: UploadConfig::default(),
        }
    }

    /// Override the upload part size
    pub fn with_upload_config(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Create the bucket at `location`, accepting a bucket that already exists
    pub async fn ensure_bucket(&self, location: &str) -> Result<()> {
        let mut request = self.inner.create_bucket().bucket(&self.bucket);
        if location != DEFAULT_LOCATION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(location))
                    .build(),
            );
        }

        let create_err = match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, location, "created log bucket");
                return Ok(());
            }
            Err(e) => e,
        };

        // Creating a bucket we already own fails on most backends
        tracing::debug!(
            bucket = %self.bucket,
            error = %DisplayErrorContext(&create_err),
            "bucket creation failed, checking whether it exists"
        );
        if self.bucket_exists().await? {
            return Ok(());
        }

        Err(Error::Provision(format!(
            "could not create bucket '{}' and bucket does not exist, please check permissions: {}",
            self.bucket,
            DisplayErrorContext(&create_err)
        )))
    }

    /// Check if the bucket exists
    pub async fn bucket_exists(&self) -> Result<bool> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, &self.bucket, HeadBucketError::is_not_found) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }
}

#[async_trait]
impl LogStore for S3LogStore {
    async fn insert_log(
        &self,
        ctx: &Context,
        app_name: &str,
        call_id: &str,
        log: LogReader,
    ) -> Result<()> {
        let key = LogKey::new(app_name, call_id)?;
        let object_key = key.object_key();

        let upload = Upload {
            client: &self.inner,
            bucket: &self.bucket,
            key: &object_key,
            config: &self.upload,
        };
        let size = upload.run(ctx, log).await?;

        tracing::debug!(key = %key, size, "inserted log");
        Ok(())
    }

    async fn get_log(&self, ctx: &Context, app_name: &str, call_id: &str) -> Result<LogReader> {
        let key = LogKey::new(app_name, call_id)?;
        let object_key = key.object_key();

        let response = ctx
            .run(async {
                self.inner
                    .get_object()
                    .bucket(&self.bucket)
                    .key(&object_key)
                    .send()
                    .await
                    .map_err(|e| map_sdk_error(e, &object_key, GetObjectError::is_no_such_key))
            })
            .await?;

        tracing::debug!(key = %key, size = ?response.content_length(), "opened log");
        Ok(Box::new(response.body.into_async_read()))
    }
}

/// Build an SDK client for the endpoint and credentials in `url`
async fn build_client(url: &StoreUrl) -> Result<aws_sdk_s3::Client> {
    let endpoint = url.endpoint_url();
    url::Url::parse(&endpoint)
        .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;

    let loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(url.location.clone()))
        .endpoint_url(&endpoint);

    let loader = if url.is_anonymous() {
        loader.no_credentials()
    } else {
        loader.credentials_provider(aws_credential_types::Credentials::new(
            url.access_key.clone(),
            url.secret_key.clone(),
            None, // session token
            None, // expiry
            "logstore-static-credentials",
        ))
    };

    let config = loader.load().await;

    // Path-style addressing works against every S3-compatible backend
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .force_path_style(true)
        .build();

    tracing::debug!(endpoint = %endpoint, location = %url.location, "built s3 client");
    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}
