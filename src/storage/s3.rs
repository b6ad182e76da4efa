use super::{list_operator_folder, operator_dir, Credential, RemoteEntry, RemoteStore, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;
use opendal::{layers::TimeoutLayer, Operator};
use std::time::Duration;

/// S3 兼容存储，凭据为 secret key
pub struct S3Store {
    operator: Operator,
    name: String,
}

impl S3Store {
    pub fn new(
        bucket: &str,
        region: &str,
        access_key: &str,
        credential: &Credential,
        endpoint: Option<String>,
    ) -> Result<Self, RemoteError> {
        use opendal::services::S3;

        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(credential.secret());

        if let Some(ref ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        Ok(Self {
            operator,
            name: format!("s3://{}", bucket),
        })
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        // S3 没有真正的目录，不存在的前缀会列出空结果，按目录不存在处理
        let entries = list_operator_folder(&self.operator, path).await?;
        let dir = operator_dir(path);
        if entries.is_empty() && !dir.is_empty() {
            return Err(RemoteError::NotFound(format!("{}{}", self.name, path)));
        }
        Ok(entries)
    }

    async fn fetch_content(&self, handle: &str) -> Result<Bytes, RemoteError> {
        let data = self.operator.read(handle).await?;
        Ok(data.to_bytes())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
