use super::{list_operator_folder, operator_dir, Credential, RemoteEntry, RemoteStore};
use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;
use opendal::Operator;

/// WebDAV 远程存储，凭据为账户密码
pub struct WebDavStore {
    operator: Operator,
    name: String,
}

impl WebDavStore {
    pub fn new(endpoint: &str, username: &str, credential: &Credential) -> Result<Self, RemoteError> {
        use opendal::services::Webdav;

        let builder = Webdav::default()
            .endpoint(endpoint)
            .username(username)
            .password(credential.secret());

        let operator = Operator::new(builder)?.finish();
        let name = format!("webdav://{}", endpoint.trim_end_matches('/'));

        Ok(Self { operator, name })
    }
}

#[async_trait]
impl RemoteStore for WebDavStore {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        // 不存在的目录在 PROPFIND 列表时返回空，必须先确认目录存在
        let dir = operator_dir(path);
        if !dir.is_empty() {
            self.operator.stat(&dir).await?;
        }
        list_operator_folder(&self.operator, path).await
    }

    async fn fetch_content(&self, handle: &str) -> Result<Bytes, RemoteError> {
        let data = self.operator.read(handle).await?;
        Ok(data.to_bytes())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
