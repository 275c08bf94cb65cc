// ==========================================
// 合作社收款台账 - 导出文件存储与分享
// ==========================================
// FileStore: 写入/读取/删除/列出导出文件
// ShareTarget: 设备分享能力（可选；CLI 环境下通常不存在）
// 实现者: DirectoryFileStore（本地目录）；测试中使用内存实现
// ==========================================

use crate::export::error::{ExportError, ExportResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// 写入文件,返回文件 URI
    async fn write_file(&self, file_name: &str, bytes: &[u8]) -> ExportResult<String>;

    async fn read_file(&self, file_name: &str) -> ExportResult<Vec<u8>>;

    async fn delete_file(&self, file_name: &str) -> ExportResult<()>;

    /// 列出全部文件名（按名称排序）
    async fn list_files(&self) -> ExportResult<Vec<String>>;
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, file_uri: &str, mime_type: &str) -> ExportResult<()>;
}

// ==========================================
// DirectoryFileStore - 本地目录
// ==========================================
pub struct DirectoryFileStore {
    root: PathBuf,
}

impl DirectoryFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 文件名不允许包含路径分隔符
    fn resolve(&self, file_name: &str) -> ExportResult<PathBuf> {
        let trimmed = file_name.trim();
        if trimmed.is_empty()
            || trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed == "."
            || trimmed == ".."
        {
            return Err(ExportError::FileWriteError(format!(
                "非法文件名: {}",
                file_name
            )));
        }
        Ok(self.root.join(trimmed))
    }
}

#[async_trait]
impl FileStore for DirectoryFileStore {
    async fn write_file(&self, file_name: &str, bytes: &[u8]) -> ExportResult<String> {
        let path = self.resolve(file_name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "导出文件已写入");
        Ok(path.display().to_string())
    }

    async fn read_file(&self, file_name: &str) -> ExportResult<Vec<u8>> {
        let path = self.resolve(file_name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| ExportError::FileReadError(format!("{}: {}", path.display(), e)))
    }

    async fn delete_file(&self, file_name: &str) -> ExportResult<()> {
        let path = self.resolve(file_name)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn list_files(&self) -> ExportResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
