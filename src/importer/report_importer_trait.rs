// ==========================================
// 合作社收款台账 - 报表导入 Trait
// ==========================================
// 职责: 定义报表导入接口（不包含实现）
// 实现者: ReportImporterImpl
// ==========================================

use crate::domain::report::ParsedReport;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 导入选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// true: 先按批次清除该代理人的旧数据（仅限报表中出现的批次）
    pub replace_existing: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            replace_existing: true,
        }
    }
}

impl ImportOptions {
    pub fn append() -> Self {
        Self {
            replace_existing: false,
        }
    }
}

/// 报表导入结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub society_code: String,
    pub society_name: String,
    pub agent_code: String,
    pub agent_name: String,
    pub accounts_upserted: usize,
    pub accounts_created: usize,
    /// 替换模式下清除的批次键
    pub lots_replaced: Vec<String>,
}

// ==========================================
// ReportImporter Trait
// ==========================================
#[async_trait]
pub trait ReportImporter: Send + Sync {
    /// 导入已解析的报表（单事务）
    ///
    /// # 参数
    /// - report: 文本或表格解析器输出
    /// - options: replace_existing 默认 true
    ///
    /// # 返回
    /// - Ok(ImportSummary)
    /// - Err: 数据库错误（事务回滚,无部分写入）
    async fn import_parsed_report(
        &self,
        report: &ParsedReport,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary>;

    /// 读取文件 → 解析 → 导入
    async fn import_report_file(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary>;
}
