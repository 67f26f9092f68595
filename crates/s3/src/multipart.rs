//! Streaming upload of logs with unknown length
//!
//! The body is read one part at a time. A log that ends inside the first part
//! goes up as a single PutObject; anything longer becomes a multipart upload
//! that is completed once the stream is exhausted. A multipart upload that
//! fails or is canceled is aborted, so a partial log never becomes visible.

use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use tokio::io::AsyncReadExt;

use logstore_core::{Context, Error, LOG_CONTENT_TYPE, LogReader, Result};

use crate::error::map_sdk_error;

/// Default part size: 8 MiB
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum part size held in memory: 512 MiB
pub const MAX_PART_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: i32 = 10_000;

/// Upload tuning
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub(crate) part_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl UploadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part size, clamped to what S3 accepts
    pub fn part_size(mut self, size: usize) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    pub fn get_part_size(&self) -> usize {
        self.part_size
    }
}

/// Target of one upload
pub(crate) struct Upload<'a> {
    pub client: &'a Client,
    pub bucket: &'a str,
    pub key: &'a str,
    pub config: &'a UploadConfig,
}

impl Upload<'_> {
    /// Upload the whole stream, returning the number of bytes written
    pub async fn run(&self, ctx: &Context, mut body: LogReader) -> Result<u64> {
        let first = ctx.run(read_part(&mut body, self.config.part_size)).await?;

        if first.len() < self.config.part_size {
            let size = first.len() as u64;
            ctx.run(self.put_single(first)).await?;
            return Ok(size);
        }

        // Not raced against the context: once the service has started an upload
        // its ID must be known so the upload can be aborted below
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let upload_id = self.create().await?;
        tracing::debug!(key = self.key, upload_id = %upload_id, "started multipart upload");

        match self.upload_parts(ctx, &upload_id, first, &mut body).await {
            Ok(size) => Ok(size),
            Err(e) => {
                self.abort(&upload_id).await;
                Err(e)
            }
        }
    }

    async fn put_single(&self, data: Vec<u8>) -> Result<()> {
        let size = data.len() as i64;
        tracing::debug!(key = self.key, size, "putting log object");

        self.client
            .put_object()
            .bucket(self.bucket)
            .key(self.key)
            .content_type(LOG_CONTENT_TYPE)
            .content_length(size)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.key, |_| false))?;

        Ok(())
    }

    async fn create(&self) -> Result<String> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(self.bucket)
            .key(self.key)
            .content_type(LOG_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.key, |_| false))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Network(format!("{}: no upload ID in response", self.key)))
    }

    async fn upload_parts(
        &self,
        ctx: &Context,
        upload_id: &str,
        first: Vec<u8>,
        body: &mut LogReader,
    ) -> Result<u64> {
        let mut completed = Vec::new();
        let mut part = first;
        let mut part_number = 1;
        let mut total = 0u64;

        loop {
            total += part.len() as u64;
            let e_tag = ctx
                .run(self.upload_part(upload_id, part_number, part))
                .await?;
            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(e_tag)
                    .build(),
            );

            part = ctx.run(read_part(body, self.config.part_size)).await?;
            if part.is_empty() {
                break;
            }
            if part_number >= MAX_PARTS {
                return Err(Error::General(format!(
                    "{}: log exceeds {MAX_PARTS} parts of {} bytes",
                    self.key, self.config.part_size
                )));
            }
            part_number += 1;
        }

        let parts = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();
        ctx.run(async {
            self.client
                .complete_multipart_upload()
                .bucket(self.bucket)
                .key(self.key)
                .upload_id(upload_id)
                .multipart_upload(parts)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, self.key, |_| false))
        })
        .await?;

        tracing::debug!(key = self.key, parts = part_number, size = total, "completed multipart upload");
        Ok(total)
    }

    async fn upload_part(
        &self,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> Result<Option<String>> {
        let response = self
            .client
            .upload_part()
            .bucket(self.bucket)
            .key(self.key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(data.len() as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, self.key, |_| false))?;

        Ok(response.e_tag().map(str::to_string))
    }

    /// Best-effort cleanup; runs even when the context is already done
    async fn abort(&self, upload_id: &str) {
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(self.bucket)
            .key(self.key)
            .upload_id(upload_id)
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!(
                key = self.key,
                upload_id,
                error = %DisplayErrorContext(&e),
                "failed to abort multipart upload"
            );
        }
    }
}

/// Read up to `part_size` bytes; a short result means the stream is exhausted
async fn read_part(body: &mut LogReader, part_size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    AsyncReadExt::take(&mut *body, part_size as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadOutput;
    use aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadOutput;
    use aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadOutput;
    use aws_sdk_s3::operation::put_object::PutObjectOutput;
    use aws_sdk_s3::operation::upload_part::{UploadPartError, UploadPartOutput};
    use aws_smithy_mocks::{RuleMode, mock, mock_client};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn reader(data: &'static [u8]) -> LogReader {
        Box::new(data)
    }

    #[test]
    fn test_part_size_is_clamped() {
        assert_eq!(UploadConfig::new().get_part_size(), DEFAULT_PART_SIZE);
        assert_eq!(UploadConfig::new().part_size(1).get_part_size(), MIN_PART_SIZE);
        assert_eq!(
            UploadConfig::new().part_size(usize::MAX).get_part_size(),
            MAX_PART_SIZE
        );
    }

    #[tokio::test]
    async fn test_read_part_splits_stream() {
        let mut body = reader(b"abcdefghij");
        assert_eq!(read_part(&mut body, 4).await.unwrap(), b"abcd");
        assert_eq!(read_part(&mut body, 4).await.unwrap(), b"efgh");
        assert_eq!(read_part(&mut body, 4).await.unwrap(), b"ij");
        assert!(read_part(&mut body, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_small_log_uses_single_put() {
        let put = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(|r| {
                r.key() == Some("/app/call")
                    && r.content_type() == Some(LOG_CONTENT_TYPE)
                    && r.content_length() == Some(11)
            })
            .then_output(|| PutObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&put]);

        let config = UploadConfig { part_size: 16 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let size = upload
            .run(&Context::background(), reader(b"hello world"))
            .await
            .unwrap();
        assert_eq!(size, 11);
        assert_eq!(put.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_log_of_exactly_one_part_uses_multipart() {
        let put = mock!(aws_sdk_s3::Client::put_object)
            .then_output(|| PutObjectOutput::builder().build());
        let create = mock!(aws_sdk_s3::Client::create_multipart_upload).then_output(|| {
            CreateMultipartUploadOutput::builder()
                .upload_id("upload-exact")
                .build()
        });
        let part_1 = mock!(aws_sdk_s3::Client::upload_part)
            .match_requests(|r| r.part_number() == Some(1) && r.content_length() == Some(8))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let complete = mock!(aws_sdk_s3::Client::complete_multipart_upload)
            .match_requests(|r| {
                r.multipart_upload()
                    .map(|m| m.parts().len() == 1)
                    .unwrap_or(false)
            })
            .then_output(|| CompleteMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            &[&put, &create, &part_1, &complete]
        );

        let config = UploadConfig { part_size: 8 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let size = upload
            .run(&Context::background(), reader(b"01234567"))
            .await
            .unwrap();
        assert_eq!(size, 8);
        assert_eq!(put.num_calls(), 0);
        assert_eq!(part_1.num_calls(), 1);
        assert_eq!(complete.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_log_is_stored() {
        let put = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(|r| r.content_length() == Some(0))
            .then_output(|| PutObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&put]);

        let config = UploadConfig { part_size: 16 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let size = upload
            .run(&Context::background(), reader(b""))
            .await
            .unwrap();
        assert_eq!(size, 0);
        assert_eq!(put.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_large_log_uses_multipart() {
        let create = mock!(aws_sdk_s3::Client::create_multipart_upload)
            .match_requests(|r| r.content_type() == Some(LOG_CONTENT_TYPE))
            .then_output(|| {
                CreateMultipartUploadOutput::builder()
                    .upload_id("upload-1")
                    .build()
            });
        let part_1 = mock!(aws_sdk_s3::Client::upload_part)
            .match_requests(|r| {
                r.upload_id() == Some("upload-1")
                    && r.part_number() == Some(1)
                    && r.content_length() == Some(8)
            })
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let part_2 = mock!(aws_sdk_s3::Client::upload_part)
            .match_requests(|r| r.part_number() == Some(2) && r.content_length() == Some(8))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-2").build());
        let part_3 = mock!(aws_sdk_s3::Client::upload_part)
            .match_requests(|r| r.part_number() == Some(3) && r.content_length() == Some(3))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-3").build());
        let complete = mock!(aws_sdk_s3::Client::complete_multipart_upload)
            .match_requests(|r| {
                r.upload_id() == Some("upload-1")
                    && r.multipart_upload()
                        .map(|m| m.parts().len() == 3)
                        .unwrap_or(false)
            })
            .then_output(|| CompleteMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::Sequential,
            &[&create, &part_1, &part_2, &part_3, &complete]
        );

        let config = UploadConfig { part_size: 8 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let size = upload
            .run(&Context::background(), reader(b"0123456789abcdefXYZ"))
            .await
            .unwrap();
        assert_eq!(size, 19);
        assert_eq!(complete.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_part_aborts_upload() {
        let create = mock!(aws_sdk_s3::Client::create_multipart_upload).then_output(|| {
            CreateMultipartUploadOutput::builder()
                .upload_id("upload-2")
                .build()
        });
        let part_1 = mock!(aws_sdk_s3::Client::upload_part)
            .then_error(|| {
                UploadPartError::generic(ErrorMetadata::builder().code("AccessDenied").build())
            });
        let abort = mock!(aws_sdk_s3::Client::abort_multipart_upload)
            .match_requests(|r| r.upload_id() == Some("upload-2"))
            .then_output(|| AbortMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::Sequential,
            &[&create, &part_1, &abort]
        );

        let config = UploadConfig { part_size: 4 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let err = upload
            .run(&Context::background(), reader(b"0123456789"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(abort.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_mid_upload_aborts() {
        let create = mock!(aws_sdk_s3::Client::create_multipart_upload).then_output(|| {
            CreateMultipartUploadOutput::builder()
                .upload_id("upload-3")
                .build()
        });
        let part_1 = mock!(aws_sdk_s3::Client::upload_part)
            .match_requests(|r| r.part_number() == Some(1))
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let complete = mock!(aws_sdk_s3::Client::complete_multipart_upload)
            .then_output(|| CompleteMultipartUploadOutput::builder().build());
        let abort = mock!(aws_sdk_s3::Client::abort_multipart_upload)
            .match_requests(|r| r.upload_id() == Some("upload-3"))
            .then_output(|| AbortMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            &[&create, &part_1, &complete, &abort]
        );

        // One full part plus a byte, then the writer stalls without closing
        let (mut writer, body) = tokio::io::duplex(64);
        writer.write_all(b"012345678").await.unwrap();

        let ctx = Context::background();
        let canceler = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceler.cancel();
        });

        let config = UploadConfig { part_size: 8 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let err = upload.run(&ctx, Box::new(body)).await.unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(part_1.num_calls(), 1);
        assert_eq!(complete.num_calls(), 0);
        assert_eq!(abort.num_calls(), 1);
        drop(writer);
    }

    #[tokio::test]
    async fn test_cancel_during_create_still_aborts() {
        let ctx = Context::background();
        let canceler = ctx.clone();

        // The service starts the upload, but the caller gives up meanwhile
        let create = mock!(aws_sdk_s3::Client::create_multipart_upload).then_output(move || {
            canceler.cancel();
            CreateMultipartUploadOutput::builder()
                .upload_id("upload-4")
                .build()
        });
        let part_1 = mock!(aws_sdk_s3::Client::upload_part)
            .then_output(|| UploadPartOutput::builder().e_tag("etag-1").build());
        let abort = mock!(aws_sdk_s3::Client::abort_multipart_upload)
            .match_requests(|r| r.upload_id() == Some("upload-4"))
            .then_output(|| AbortMultipartUploadOutput::builder().build());
        let client = mock_client!(
            aws_sdk_s3,
            RuleMode::MatchAny,
            &[&create, &part_1, &abort]
        );

        let config = UploadConfig { part_size: 4 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let err = upload.run(&ctx, reader(b"0123456789")).await.unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(create.num_calls(), 1);
        assert_eq!(part_1.num_calls(), 0);
        assert_eq!(abort.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_canceled_context_sends_nothing() {
        let put = mock!(aws_sdk_s3::Client::put_object)
            .then_output(|| PutObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::Sequential, &[&put]);

        let config = UploadConfig { part_size: 16 };
        let upload = Upload {
            client: &client,
            bucket: "logs",
            key: "/app/call",
            config: &config,
        };

        let ctx = Context::background();
        ctx.cancel();
        let err = upload.run(&ctx, reader(b"hello")).await.unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(put.num_calls(), 0);
    }
}
