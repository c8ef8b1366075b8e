//! AWS backends: SSM Parameter Store, SQS and S3.
//!
//! All clients are built from one [`SdkConfig`], loaded with the default
//! credential chain and an optional region override.

use super::{
    MessageQueue, ObjectStore, QueueError, QueueMessage, SecretError, SecretSource, StoreError,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sqs::types::Message;
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, warn};

/// Largest batch a single SQS receive may request.
const SQS_MAX_BATCH: usize = 10;
/// Longest long-poll wait SQS accepts.
const SQS_MAX_WAIT_SECS: u64 = 20;

/// Load the shared SDK configuration from the environment.
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

// -- SSM ----------------------------------------------------------------

/// Reads SecureString / String parameters from SSM Parameter Store.
#[derive(Debug, Clone)]
pub struct SsmSecretSource {
    client: aws_sdk_ssm::Client,
}

impl SsmSecretSource {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl SecretSource for SsmSecretSource {
    async fn fetch(&self, name: &str) -> Result<String, SecretError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_parameter_not_found())
                {
                    SecretError::NotFound(name.to_owned())
                } else {
                    SecretError::Service(aws_sdk_ssm::Error::from(e).into())
                }
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_owned)
            .ok_or_else(|| SecretError::NotFound(name.to_owned()))
    }
}

// -- SQS ----------------------------------------------------------------

/// A single SQS queue addressed by URL.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(config: &SdkConfig, queue_url: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(config),
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(&self, body: String) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::service(aws_sdk_sqs::Error::from(e)))?;

        output
            .message_id()
            .map(str::to_owned)
            .ok_or(QueueError::MalformedMessage("a message id"))
    }

    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, SQS_MAX_BATCH) as i32)
            .wait_time_seconds(wait_time.as_secs().min(SQS_MAX_WAIT_SECS) as i32)
            .send()
            .await
            .map_err(|e| QueueError::service(aws_sdk_sqs::Error::from(e)))?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| match convert_message(m) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed SQS message");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(count = messages.len(), "SQS receive completed");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|se| se.is_receipt_handle_is_invalid())
                {
                    QueueError::InvalidReceiptHandle
                } else {
                    QueueError::service(aws_sdk_sqs::Error::from(e))
                }
            })?;
        Ok(())
    }
}

fn convert_message(message: &Message) -> Result<QueueMessage, QueueError> {
    Ok(QueueMessage {
        message_id: message
            .message_id()
            .ok_or(QueueError::MalformedMessage("a message id"))?
            .to_owned(),
        body: message.body().unwrap_or_default().to_owned(),
        receipt_handle: message
            .receipt_handle()
            .ok_or(QueueError::MalformedMessage("a receipt handle"))?
            .to_owned(),
    })
}

// -- S3 -----------------------------------------------------------------

/// A single S3 bucket. Objects are written as `application/json`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: &SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, content: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| StoreError::service(aws_sdk_s3::Error::from(e)))?;
        Ok(())
    }
}
