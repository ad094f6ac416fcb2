use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    types::{Delete, ObjectIdentifier},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;

/// Reference to an uploaded picture, stored verbatim in the database and
/// returned verbatim in responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    pub secure_url: String,
    pub public_id: String,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload one object and return its public reference.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<ImageRef>;

    /// Delete every object whose key starts with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> anyhow::Result<()>;

    /// Remove the (now empty) folder itself. Stores without folder objects
    /// may treat this as a no-op.
    async fn delete_folder(&self, prefix: &str) -> anyhow::Result<()>;
}

pub fn offer_folder(namespace: &str, offer_id: &uuid::Uuid) -> String {
    format!("{}/offers/{}", namespace, offer_id)
}

pub fn user_folder(namespace: &str, user_id: &uuid::Uuid) -> String {
    format!("{}/users/{}", namespace, user_id)
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<ImageRef> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(ImageRef {
            secure_url: self.public_url(key),
            public_id: key.to_string(),
        })
    }

    async fn delete_prefix(&self, prefix: &str) -> anyhow::Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let listed = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .context("s3 list_objects_v2")?;

            let keys: Vec<ObjectIdentifier> = listed
                .contents()
                .iter()
                .filter_map(|o| o.key())
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<Result<_, _>>()
                .context("build object identifiers")?;

            if !keys.is_empty() {
                self.client
                    .delete_objects()
                    .bucket(&self.bucket)
                    .delete(
                        Delete::builder()
                            .set_objects(Some(keys))
                            .build()
                            .context("build delete request")?,
                    )
                    .send()
                    .await
                    .context("s3 delete_objects")?;
            }

            match listed.next_continuation_token() {
                Some(t) => continuation = Some(t.to_string()),
                None => break,
            }
        }
        Ok(())
    }

    async fn delete_folder(&self, prefix: &str) -> anyhow::Result<()> {
        // S3 folders are virtual; delete the marker object if one exists.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(format!("{}/", prefix.trim_end_matches('/')))
            .send()
            .await
            .context("s3 delete_object (folder marker)")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn folder_naming_convention() {
        let id = Uuid::nil();
        assert_eq!(
            offer_folder("vinted", &id),
            "vinted/offers/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            user_folder("vinted", &id),
            "vinted/users/00000000-0000-0000-0000-000000000000"
        );
    }
}
