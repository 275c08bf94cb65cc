// ==========================================
// 合作社收款台账 - 导出生成器
// ==========================================
// 流程:
//   取代理人全部 PENDING 收款 → 无则返回 None（无任何副作用）
//   → 按批次分组 → 每批次: 编码 → 写文件 → mark_exported（单事务）
//   → 恰好一个批次且有分享能力时自动分享
// 同一次导出共用一个 exported_at
// 本组件不做一致性校验（由 api::export_api 在调用前完成）
// ==========================================

use crate::domain::entities::{Agent, ExportCollectionRow, ExportRecord, Society};
use crate::domain::lot::Lot;
use crate::domain::types::ExportFormat;
use crate::export::error::ExportResult;
use crate::export::file_name::build_export_file_name;
use crate::export::file_store::{FileStore, ShareTarget};
use crate::export::writer::{build_export_document, encode_document, mime_type};
use crate::repository::export_store::ExportStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 导出请求
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub society: Society,
    pub agent: Agent,
    pub format: ExportFormat,
}

/// 单个批次文件的导出结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFileResult {
    pub file_name: String,
    pub file_uri: String,
    pub lot: Lot,
    pub lot_key: String,
    pub lot_label: String,
    pub collection_ids: Vec<String>,
    pub collections_count: usize,
    pub total_paise: i64,
}

/// 一次导出的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOutcome {
    pub exported_at: DateTime<Utc>,
    pub files: Vec<ExportFileResult>,
    pub shared: bool,
}

impl ExportOutcome {
    pub fn lots(&self) -> Vec<Lot> {
        self.files.iter().map(|f| f.lot.clone()).collect()
    }

    pub fn collections_count(&self) -> usize {
        self.files.iter().map(|f| f.collections_count).sum()
    }
}

/// 一个批次的待导出收款
#[derive(Debug, Clone, PartialEq)]
pub struct LotGroup {
    pub lot: Lot,
    pub lot_label: String,
    pub rows: Vec<ExportCollectionRow>,
}

/// 按批次键分组（批次键有序；标签取组内首行）
pub fn group_by_lot(rows: Vec<ExportCollectionRow>) -> BTreeMap<String, LotGroup> {
    let mut groups: BTreeMap<String, LotGroup> = BTreeMap::new();
    for row in rows {
        groups
            .entry(row.lot_key())
            .or_insert_with(|| LotGroup {
                lot: Lot::new(
                    row.account_head_code.as_deref(),
                    row.account_type,
                    row.frequency,
                ),
                lot_label: row.lot_label(),
                rows: Vec::new(),
            })
            .rows
            .push(row);
    }
    groups
}

// ==========================================
// ExportGenerator
// ==========================================
pub struct ExportGenerator<S: ExportStore> {
    store: S,
    file_store: Arc<dyn FileStore>,
    share_target: Option<Arc<dyn ShareTarget>>,
}

impl<S: ExportStore> ExportGenerator<S> {
    pub fn new(
        store: S,
        file_store: Arc<dyn FileStore>,
        share_target: Option<Arc<dyn ShareTarget>>,
    ) -> Self {
        Self {
            store,
            file_store,
            share_target,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 导出全部待导出收款（时间取当前 UTC）
    pub async fn export_pending_and_share(
        &self,
        request: &ExportRequest,
    ) -> ExportResult<Option<ExportOutcome>> {
        self.export_pending_at(request, Utc::now()).await
    }

    /// 以指定导出时刻执行导出
    #[instrument(skip(self, request), fields(agent = %request.agent.code, format = %request.format))]
    pub async fn export_pending_at(
        &self,
        request: &ExportRequest,
        exported_at: DateTime<Utc>,
    ) -> ExportResult<Option<ExportOutcome>> {
        let pending = self
            .store
            .list_pending_collections(&request.agent.id)
            .await?;
        if pending.is_empty() {
            info!("无待导出收款");
            return Ok(None);
        }

        let groups = group_by_lot(pending);
        info!(lots = groups.len(), "开始按批次导出");

        let mut files = Vec::with_capacity(groups.len());
        for (lot_key, group) in groups {
            let file = self
                .export_lot(request, exported_at, &lot_key, group)
                .await?;
            files.push(file);
        }

        // 文件已写入并标记,分享失败不回退导出结果
        let mut shared = false;
        if let ([file], Some(target)) = (files.as_slice(), self.share_target.as_ref()) {
            match target.share(&file.file_uri, mime_type(request.format)).await {
                Ok(()) => shared = true,
                Err(e) => warn!(error = %e, file = %file.file_name, "分享导出文件失败"),
            }
        } else if files.len() > 1 {
            warn!(files = files.len(), "多个批次文件,未自动分享");
        }

        Ok(Some(ExportOutcome {
            exported_at,
            files,
            shared,
        }))
    }

    async fn export_lot(
        &self,
        request: &ExportRequest,
        exported_at: DateTime<Utc>,
        lot_key: &str,
        group: LotGroup,
    ) -> ExportResult<ExportFileResult> {
        let LotGroup {
            lot,
            lot_label,
            rows,
        } = group;

        let doc = build_export_document(
            &request.society,
            &request.agent,
            &lot_label,
            exported_at,
            &rows,
        );
        let bytes = encode_document(&doc, request.format)?;
        let file_name = build_export_file_name(
            &request.society.code,
            &request.agent.code,
            &lot,
            exported_at,
            request.format,
        );
        let file_uri = self.file_store.write_file(&file_name, &bytes).await?;

        let collection_ids: Vec<String> = rows.iter().map(|r| r.collection_id.clone()).collect();
        let record = ExportRecord {
            id: Uuid::new_v4().to_string(),
            society_id: request.society.id.clone(),
            agent_id: request.agent.id.clone(),
            exported_at,
            file_uri: Some(file_uri.clone()),
            collections_count: collection_ids.len() as i64,
        };
        let marked = self.store.mark_exported(&collection_ids, &record).await?;

        info!(
            lot_key,
            file_name = %file_name,
            collections = collection_ids.len(),
            marked,
            "批次导出完成"
        );

        Ok(ExportFileResult {
            file_name,
            file_uri,
            lot,
            lot_key: lot_key.to_string(),
            lot_label,
            collections_count: collection_ids.len(),
            total_paise: rows.iter().map(|r| r.collected_paise).sum(),
            collection_ids,
        })
    }
}
