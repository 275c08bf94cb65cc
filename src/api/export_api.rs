// ==========================================
// 合作社收款台账 - 导出 API
// ==========================================
// 流程:
//   1. 取待导出收款,无则返回 None
//   2. 一致性校验（必经,失败则整批中止,不写文件）
//   3. 生成器按批次写文件并标记已导出
//   4. 可选: 清除本次导出批次的客户数据
// ==========================================

use crate::api::error::ApiResult;
use crate::api::session_api::AgentSession;
use crate::config::{AppConfigReader, ConfigManager};
use crate::domain::entities::ExportRecord;
use crate::domain::types::ExportFormat;
use crate::export::file_name::{parse_export_file_name, ExportFileName};
use crate::export::file_store::{FileStore, ShareTarget};
use crate::export::generator::{ExportGenerator, ExportOutcome, ExportRequest};
use crate::export::validator::validate_pending_collections_for_export;
use crate::repository::account_repo::{AccountRepository, ClearSummary};
use crate::repository::collection_repo::CollectionRepository;
use crate::repository::export_repo::ExportRecordRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 一次导出的结果（含可选清理统计）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub outcome: ExportOutcome,
    pub cleared: Option<ClearSummary>,
}

pub struct ExportApi {
    collection_repo: Arc<CollectionRepository>,
    account_repo: Arc<AccountRepository>,
    export_repo: Arc<ExportRecordRepository>,
    config: Arc<ConfigManager>,
    file_store: Arc<dyn FileStore>,
    share_target: Option<Arc<dyn ShareTarget>>,
}

impl ExportApi {
    pub fn new(
        collection_repo: Arc<CollectionRepository>,
        account_repo: Arc<AccountRepository>,
        export_repo: Arc<ExportRecordRepository>,
        config: Arc<ConfigManager>,
        file_store: Arc<dyn FileStore>,
        share_target: Option<Arc<dyn ShareTarget>>,
    ) -> Self {
        Self {
            collection_repo,
            account_repo,
            export_repo,
            config,
            file_store,
            share_target,
        }
    }

    /// 导出会话代理人的全部待导出收款
    ///
    /// # 参数
    /// - format: None 时取 export.format
    /// - clear_after_export: None 时取 export.clear_after_export
    ///
    /// # 返回
    /// - Ok(None): 没有待导出收款（非错误）
    /// - Err(ExportValidation): 一致性校验失败,未写任何文件
    pub async fn export_pending(
        &self,
        session: &AgentSession,
        format: Option<ExportFormat>,
        clear_after_export: Option<bool>,
    ) -> ApiResult<Option<ExportSummary>> {
        self.export_pending_at(session, format, clear_after_export, Utc::now())
            .await
    }

    /// 以指定导出时刻执行导出
    #[instrument(skip(self, session), fields(agent = %session.agent.code))]
    pub async fn export_pending_at(
        &self,
        session: &AgentSession,
        format: Option<ExportFormat>,
        clear_after_export: Option<bool>,
        exported_at: DateTime<Utc>,
    ) -> ApiResult<Option<ExportSummary>> {
        let format = match format {
            Some(format) => format,
            None => self.config.get_export_format().await?,
        };
        let clear_after_export = match clear_after_export {
            Some(value) => value,
            None => self.config.get_clear_after_export().await?,
        };

        // ===== 校验 =====
        let pending = self
            .collection_repo
            .list_pending_collections(&session.agent.id)?;
        if pending.is_empty() {
            info!("无待导出收款");
            return Ok(None);
        }
        if let Err(e) = validate_pending_collections_for_export(&pending) {
            warn!(error = %e, pending = pending.len(), "导出前校验未通过");
            return Err(e.into());
        }

        // ===== 生成 =====
        let generator = ExportGenerator::new(
            self.collection_repo.clone(),
            self.file_store.clone(),
            self.share_target.clone(),
        );
        let request = ExportRequest {
            society: session.society.clone(),
            agent: session.agent.clone(),
            format,
        };
        let outcome = match generator.export_pending_at(&request, exported_at).await? {
            Some(outcome) => outcome,
            None => return Ok(None),
        };

        // ===== 清理 =====
        let cleared = if clear_after_export {
            let summary = self.account_repo.clear_client_data_by_lots(
                &session.society.id,
                &session.agent.id,
                &outcome.lots(),
            )?;
            Some(summary)
        } else {
            None
        };

        info!(
            files = outcome.files.len(),
            collections = outcome.collections_count(),
            shared = outcome.shared,
            cleared = cleared.is_some(),
            "导出完成"
        );
        Ok(Some(ExportSummary { outcome, cleared }))
    }

    /// 列出导出目录中的导出文件（新→旧）
    ///
    /// 给出会话时只保留该代理人的文件；不符合文件名格式的文件忽略
    pub async fn list_export_files(
        &self,
        session: Option<&AgentSession>,
    ) -> ApiResult<Vec<ExportFileName>> {
        let mut files: Vec<ExportFileName> = self
            .file_store
            .list_files()
            .await?
            .iter()
            .filter_map(|name| parse_export_file_name(name))
            .filter(|parsed| match session {
                Some(s) => parsed.belongs_to(&s.society.code, &s.agent.code),
                None => true,
            })
            .collect();
        files.sort_by(|a, b| {
            b.exported_at()
                .cmp(&a.exported_at())
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(files)
    }

    /// 读取导出文件内容
    pub async fn read_export_file(&self, file_name: &str) -> ApiResult<Vec<u8>> {
        Ok(self.file_store.read_file(file_name).await?)
    }

    /// 删除导出文件
    pub async fn delete_export_file(&self, file_name: &str) -> ApiResult<()> {
        self.file_store.delete_file(file_name).await?;
        info!(file_name, "导出文件已删除");
        Ok(())
    }

    /// 导出审计记录
    pub fn list_export_history(&self, session: &AgentSession) -> ApiResult<Vec<ExportRecord>> {
        Ok(self.export_repo.list_exports(&session.agent.id)?)
    }
}
