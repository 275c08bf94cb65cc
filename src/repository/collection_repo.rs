// ==========================================
// 合作社收款台账 - 收款仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 唯一约束: (agent_id, account_id, collection_date)
// 同日重复收款覆盖金额/备注/时间
// ==========================================

use crate::db::SharedConnection;
use crate::domain::entities::{
    Account, CollectionEntry, CollectionTotals, ExportCollectionRow, ExportRecord,
};
use crate::domain::money::{to_iso_date, to_iso_timestamp, today};
use crate::domain::types::CollectionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::export_repo::ExportRecordRepository;
use crate::repository::export_store::ExportStore;
use crate::repository::row_mapping::{
    map_collection, map_export_row, COLLECTION_COLUMNS, EXPORT_ROW_COLUMNS,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// CollectionRepository - 收款仓储
// ==========================================
pub struct CollectionRepository {
    conn: SharedConnection,
}

impl CollectionRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记今日收款（本地日历日）
    pub fn upsert_collection_for_today(
        &self,
        account: &Account,
        collected_paise: i64,
        remarks: Option<&str>,
    ) -> RepositoryResult<CollectionEntry> {
        self.upsert_collection(
            account,
            collected_paise,
            remarks,
            Utc::now(),
            today(),
        )
    }

    /// 按 (agent, account, date) 插入或覆盖收款
    ///
    /// 已存在时覆盖金额/备注/收款时间,并重置为 PENDING 等待再次导出
    pub fn upsert_collection(
        &self,
        account: &Account,
        collected_paise: i64,
        remarks: Option<&str>,
        collected_at: DateTime<Utc>,
        collection_date: NaiveDate,
    ) -> RepositoryResult<CollectionEntry> {
        let conn = self.get_conn()?;
        let remarks = remarks.map(str::trim).filter(|r| !r.is_empty());
        let date_str = to_iso_date(collection_date);

        conn.execute(
            r#"
            INSERT INTO collection_entry (
                id, society_id, agent_id, account_id, account_no,
                collected_paise, collected_at, collection_date, status, exported_at, remarks
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'PENDING', NULL, ?9)
            ON CONFLICT (agent_id, account_id, collection_date) DO UPDATE SET
                collected_paise = excluded.collected_paise,
                collected_at = excluded.collected_at,
                remarks = excluded.remarks,
                status = 'PENDING',
                exported_at = NULL
            "#,
            params![
                Uuid::new_v4().to_string(),
                account.society_id,
                account.agent_id,
                account.id,
                account.account_no,
                collected_paise,
                to_iso_timestamp(collected_at),
                date_str,
                remarks,
            ],
        )?;

        let entry = conn.query_row(
            &format!(
                r#"
                SELECT {} FROM collection_entry
                WHERE agent_id = ?1 AND account_id = ?2 AND collection_date = ?3
                "#,
                COLLECTION_COLUMNS
            ),
            params![account.agent_id, account.id, date_str],
            map_collection,
        )?;
        debug!(
            account_no = %entry.account_no,
            collected_paise = entry.collected_paise,
            collection_date = %date_str,
            "收款已登记"
        );
        Ok(entry)
    }

    /// 代理人全部待导出收款（含账户批次信息）
    pub fn list_pending_collections(
        &self,
        agent_id: &str,
    ) -> RepositoryResult<Vec<ExportCollectionRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM collection_entry c
            JOIN account a ON a.id = c.account_id
            WHERE c.agent_id = ?1 AND c.status = 'PENDING'
            ORDER BY a.lot_key ASC, c.account_no ASC, c.collection_date ASC
            "#,
            EXPORT_ROW_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![agent_id], map_export_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 代理人某日收款明细
    pub fn list_collections_for_date(
        &self,
        agent_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<CollectionEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM collection_entry
            WHERE agent_id = ?1 AND collection_date = ?2
            ORDER BY collected_at ASC
            "#,
            COLLECTION_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![agent_id, to_iso_date(date)], map_collection)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 代理人某日收款笔数与金额合计
    pub fn get_collection_totals_for_date(
        &self,
        agent_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<CollectionTotals> {
        let conn = self.get_conn()?;
        let totals = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(collected_paise), 0)
            FROM collection_entry
            WHERE agent_id = ?1 AND collection_date = ?2
            "#,
            params![agent_id, to_iso_date(date)],
            |row| {
                Ok(CollectionTotals {
                    count: row.get(0)?,
                    total_paise: row.get(1)?,
                })
            },
        )?;
        Ok(totals)
    }

    /// 标记导出: 批量置 EXPORTED + 追加一条导出审计,单事务
    pub fn mark_exported(
        &self,
        collection_ids: &[String],
        record: &ExportRecord,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let exported_at = to_iso_timestamp(record.exported_at);
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE collection_entry SET status = ?1, exported_at = ?2 WHERE id = ?3",
            )?;
            for id in collection_ids {
                updated += stmt.execute(params![
                    CollectionStatus::Exported.to_db_str(),
                    exported_at,
                    id
                ])?;
            }
        }
        ExportRecordRepository::insert_tx(&tx, record)?;

        tx.commit()?;
        info!(
            export_id = %record.id,
            requested = collection_ids.len(),
            updated = updated,
            "收款已标记导出"
        );
        Ok(updated)
    }
}

#[async_trait]
impl ExportStore for CollectionRepository {
    async fn list_pending_collections(
        &self,
        agent_id: &str,
    ) -> RepositoryResult<Vec<ExportCollectionRow>> {
        CollectionRepository::list_pending_collections(self, agent_id)
    }

    async fn mark_exported(
        &self,
        collection_ids: &[String],
        record: &ExportRecord,
    ) -> RepositoryResult<usize> {
        CollectionRepository::mark_exported(self, collection_ids, record)
    }
}
