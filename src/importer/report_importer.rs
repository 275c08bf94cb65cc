// ==========================================
// 合作社收款台账 - 报表导入器实现
// ==========================================
// 流程（单事务）:
//   合作社 upsert → 代理人 upsert → [替换模式] 按批次清除 → 账户 upsert
// 批次隔离: 同一账号可存在于不同批次,替换只作用于报表中出现的批次
// ==========================================

use crate::db::SharedConnection;
use crate::domain::money::rupees_to_paise;
use crate::domain::report::ParsedReport;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::load_report;
use crate::importer::report_importer_trait::{ImportOptions, ImportSummary, ReportImporter};
use crate::repository::account_repo::{AccountRepository, AccountUpsert};
use crate::repository::agent_repo::{AgentRepository, AgentUpsert};
use crate::repository::error::RepositoryError;
use crate::repository::export_repo::ExportRecordRepository;
use crate::repository::society_repo::SocietyRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, error, info, instrument};

// ==========================================
// ReportImporterImpl
// ==========================================
pub struct ReportImporterImpl {
    conn: SharedConnection,
    // 新建代理人时使用的 PIN 摘要
    default_pin_hash: String,
}

impl ReportImporterImpl {
    pub fn new(conn: SharedConnection, default_pin_hash: impl Into<String>) -> Self {
        Self {
            conn,
            default_pin_hash: default_pin_hash.into(),
        }
    }

    fn import_blocking(
        &self,
        report: &ParsedReport,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary> {
        let now = Utc::now();
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn.unchecked_transaction()?;

        let society = SocietyRepository::upsert_tx(&tx, &report.society_code, &report.society_name, now)?;

        let agent_input = AgentUpsert {
            code: report.agent_code.clone(),
            name: report.agent_name.clone(),
            phone: None,
            pin_hash: None,
        };
        let (agent, agent_created) =
            AgentRepository::upsert_tx(&tx, &society.id, &agent_input, &self.default_pin_hash, now)?;
        debug!(agent_id = %agent.id, agent_created, "代理人已解析");

        let mut lots_replaced = Vec::new();
        if options.replace_existing {
            let exports_deleted = ExportRecordRepository::delete_for_agent_tx(&tx, &society.id, &agent.id)?;
            for lot in report.distinct_lots() {
                let cleared = AccountRepository::delete_lot_scope_tx(&tx, &society.id, &agent.id, &lot)?;
                debug!(
                    lot_key = %lot.key(),
                    accounts_deleted = cleared.accounts_deleted,
                    collections_deleted = cleared.collections_deleted,
                    "批次已清除"
                );
                lots_replaced.push(lot.key());
            }
            debug!(exports_deleted, "导出记录已清除");
        }

        let mut accounts_created = 0;
        for parsed in &report.accounts {
            let input = AccountUpsert {
                society_id: society.id.clone(),
                agent_id: agent.id.clone(),
                account_no: parsed.account_no.clone(),
                client_name: parsed.client_name.clone(),
                account_type: parsed.account_type,
                frequency: parsed.frequency,
                account_head: parsed.account_head.clone(),
                account_head_code: parsed.account_head_code.clone(),
                installment_paise: rupees_to_paise(parsed.installment_rupees),
                balance_paise: rupees_to_paise(parsed.balance_rupees),
                last_txn_at: report.report_date,
                opened_at: None,
                closes_at: None,
                status: None,
            };
            let (_, created) = AccountRepository::upsert_tx(&tx, &input, now)?;
            if created {
                accounts_created += 1;
            }
        }

        tx.commit()?;

        Ok(ImportSummary {
            society_code: society.code,
            society_name: society.name,
            agent_code: agent.code,
            agent_name: agent.name,
            accounts_upserted: report.accounts.len(),
            accounts_created,
            lots_replaced,
        })
    }
}

#[async_trait]
impl ReportImporter for ReportImporterImpl {
    #[instrument(skip(self, report), fields(society = %report.society_code, agent = %report.agent_code))]
    async fn import_parsed_report(
        &self,
        report: &ParsedReport,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary> {
        info!(
            accounts = report.accounts.len(),
            replace_existing = options.replace_existing,
            "开始导入报表"
        );
        let summary = self.import_blocking(report, options)?;
        info!(
            accounts_upserted = summary.accounts_upserted,
            accounts_created = summary.accounts_created,
            lots_replaced = summary.lots_replaced.len(),
            "报表导入完成"
        );
        Ok(summary)
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn import_report_file(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> ImportResult<ImportSummary> {
        let report = load_report(path).map_err(|e| {
            error!(error = %e, "报表解析失败");
            e
        })?;
        self.import_parsed_report(&report, options).await
    }
}

