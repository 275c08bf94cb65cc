// ==========================================
// 合作社收款台账 - 导出持久化接口
// ==========================================
// 用途: 导出生成器所需的数据访问接口（不包含实现）
// 实现者: CollectionRepository（SQLite）；测试中使用内存实现
// ==========================================

use crate::domain::entities::{ExportCollectionRow, ExportRecord};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ExportStore: Send + Sync {
    /// 代理人全部 PENDING 收款（含账户批次字段）
    async fn list_pending_collections(
        &self,
        agent_id: &str,
    ) -> RepositoryResult<Vec<ExportCollectionRow>>;

    /// 标记一批收款为 EXPORTED 并追加导出审计（同一事务）
    ///
    /// # 返回
    /// - 实际更新的收款条数
    async fn mark_exported(
        &self,
        collection_ids: &[String],
        record: &ExportRecord,
    ) -> RepositoryResult<usize>;
}

// 共享仓储（Arc）同样可作为导出存储
#[async_trait]
impl<T: ExportStore + ?Sized> ExportStore for Arc<T> {
    async fn list_pending_collections(
        &self,
        agent_id: &str,
    ) -> RepositoryResult<Vec<ExportCollectionRow>> {
        (**self).list_pending_collections(agent_id).await
    }

    async fn mark_exported(
        &self,
        collection_ids: &[String],
        record: &ExportRecord,
    ) -> RepositoryResult<usize> {
        (**self).mark_exported(collection_ids, record).await
    }
}
