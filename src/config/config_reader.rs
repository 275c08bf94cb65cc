// ==========================================
// 合作社收款台账 - 配置读取 Trait
// ==========================================
// 职责: 定义导入/导出/检索/登录所需的配置读取接口（不包含实现）
// 实现者: ConfigManager（从 config_kv 表读取）
// ==========================================

use crate::domain::types::ExportFormat;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait AppConfigReader: Send + Sync {
    // ===== 导出 =====

    /// 默认导出格式
    ///
    /// # 默认值
    /// - XLSX
    async fn get_export_format(&self) -> RepositoryResult<ExportFormat>;

    /// 导出目录
    ///
    /// # 默认值
    /// - ./exports
    async fn get_export_output_dir(&self) -> RepositoryResult<PathBuf>;

    /// 导出成功后是否清除已导出批次的客户数据
    async fn get_clear_after_export(&self) -> RepositoryResult<bool>;

    // ===== 导入 =====

    /// 报表导入是否默认按批次替换
    async fn get_replace_existing(&self) -> RepositoryResult<bool>;

    // ===== 检索与登录 =====

    /// 尾号检索的结果上限（默认 20）
    async fn get_search_max_results(&self) -> RepositoryResult<usize>;

    /// 新建代理人的默认 PIN（明文,仅用于计算摘要）
    async fn get_default_pin(&self) -> RepositoryResult<String>;
}
