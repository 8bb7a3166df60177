use std::path::{Path, PathBuf};

use crate::models::errors::StoreError;

/// cookie文本块的持久化
///
/// 职责单一: 在操作者配置的路径上读、写、删一个文本文件。
/// 登录成功后覆盖写入;检测到失效后删除。
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取持久化的cookie文本块
    ///
    /// 文件不存在或不可读按"无可恢复状态"处理,返回None。
    pub async fn load(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(blob) if !blob.trim().is_empty() => Some(blob),
            Ok(_) => None,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "cookie文件读取失败");
                }
                None
            }
        }
    }

    /// 覆盖写入cookie文本块
    pub async fn save(&self, blob: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, blob).await?;
        tracing::info!(path = %self.path.display(), "cookie已持久化");
        Ok(())
    }

    /// 删除持久化的cookie (检测到失效时)
    pub async fn remove(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::info!(path = %self.path.display(), "已删除失效cookie"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "删除cookie文件失败")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qq-bot-test-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_保存读取删除() {
        let path = temp_path("roundtrip.cookie");
        let store = CookieStore::new(&path);

        assert!(store.load().await.is_none());

        store.save("ptwebqq=abc; qrsig=def").await.unwrap();
        assert_eq!(store.load().await.unwrap(), "ptwebqq=abc; qrsig=def");

        store.remove().await;
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_空文件视为无状态() {
        let path = temp_path("empty.cookie");
        let store = CookieStore::new(&path);
        store.save("").await.unwrap();
        assert!(store.load().await.is_none());
        store.remove().await;
    }
}
