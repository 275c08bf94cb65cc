// ==========================================
// 合作社收款台账 - 导入 API
// ==========================================
// 职责: 报表文件导入（文本/表格）与主数据 JSON 导入的统一入口
// replace_existing 未显式给出时取 import.replace_existing 配置
// 新建代理人的 PIN 摘要取 auth.default_pin 配置
// ==========================================

use crate::api::error::ApiResult;
use crate::config::{AppConfigReader, ConfigManager};
use crate::credential::default_pin_hash;
use crate::db::SharedConnection;
use crate::domain::report::ParsedReport;
use crate::importer::file_parser::load_report;
use crate::importer::master_json_importer::{MasterImportSummary, MasterJsonImporter};
use crate::importer::report_importer::ReportImporterImpl;
use crate::importer::report_importer_trait::{ImportOptions, ImportSummary, ReportImporter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

pub struct ImportApi {
    conn: SharedConnection,
    config: Arc<ConfigManager>,
}

impl ImportApi {
    pub fn new(conn: SharedConnection, config: Arc<ConfigManager>) -> Self {
        Self { conn, config }
    }

    async fn resolve_options(&self, replace_existing: Option<bool>) -> ApiResult<ImportOptions> {
        let replace_existing = match replace_existing {
            Some(value) => value,
            None => self.config.get_replace_existing().await?,
        };
        Ok(ImportOptions { replace_existing })
    }

    async fn report_importer(&self) -> ApiResult<ReportImporterImpl> {
        let pin_hash = default_pin_hash(self.config.as_ref()).await?;
        Ok(ReportImporterImpl::new(self.conn.clone(), pin_hash))
    }

    /// 只解析不落库（导入前预览）
    pub fn preview_report(&self, path: &Path) -> ApiResult<ParsedReport> {
        Ok(load_report(path)?)
    }

    /// 导入报表文件
    ///
    /// # 参数
    /// - replace_existing: None 时取配置（默认 true,按批次替换）
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn import_report_file(
        &self,
        path: &Path,
        replace_existing: Option<bool>,
    ) -> ApiResult<ImportSummary> {
        let started = Instant::now();
        let options = self.resolve_options(replace_existing).await?;
        let summary = self
            .report_importer()
            .await?
            .import_report_file(path, options)
            .await?;
        info!(
            society_code = %summary.society_code,
            agent_code = %summary.agent_code,
            accounts = summary.accounts_upserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "报表导入完成"
        );
        Ok(summary)
    }

    /// 导入已解析的报表
    pub async fn import_parsed_report(
        &self,
        report: &ParsedReport,
        replace_existing: Option<bool>,
    ) -> ApiResult<ImportSummary> {
        let options = self.resolve_options(replace_existing).await?;
        Ok(self
            .report_importer()
            .await?
            .import_parsed_report(report, options)
            .await?)
    }

    /// 导入主数据 JSON 文件
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn import_master_json_file(&self, path: &Path) -> ApiResult<MasterImportSummary> {
        let pin_hash = default_pin_hash(self.config.as_ref()).await?;
        let summary = MasterJsonImporter::new(self.conn.clone(), pin_hash)
            .import_file(path)
            .await?;
        Ok(summary)
    }

    /// 导入主数据 JSON 文本
    pub async fn import_master_json_str(&self, text: &str) -> ApiResult<MasterImportSummary> {
        let pin_hash = default_pin_hash(self.config.as_ref()).await?;
        Ok(MasterJsonImporter::new(self.conn.clone(), pin_hash)
            .import_str(text)
            .await?)
    }
}
