// ==========================================
// 合作社收款台账 - 导出审计仓储
// ==========================================
// export_record 只追加；仅替换式导入会按 (society, agent) 清除
// ==========================================

use crate::db::SharedConnection;
use crate::domain::entities::ExportRecord;
use crate::domain::money::to_iso_timestamp;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{map_export_record, EXPORT_RECORD_COLUMNS};
use rusqlite::{params, Connection, Result as SqliteResult};

pub struct ExportRecordRepository {
    conn: SharedConnection,
}

impl ExportRecordRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 代理人导出历史（最新在前）
    pub fn list_exports(&self, agent_id: &str) -> RepositoryResult<Vec<ExportRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM export_record WHERE agent_id = ?1 ORDER BY exported_at DESC, id ASC",
            EXPORT_RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![agent_id], map_export_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    pub fn insert_tx(conn: &Connection, record: &ExportRecord) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO export_record (id, society_id, agent_id, exported_at, file_uri, collections_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.society_id,
                record.agent_id,
                to_iso_timestamp(record.exported_at),
                record.file_uri,
                record.collections_count,
            ],
        )?;
        Ok(())
    }

    pub fn delete_for_agent_tx(
        conn: &Connection,
        society_id: &str,
        agent_id: &str,
    ) -> RepositoryResult<usize> {
        let deleted = conn.execute(
            "DELETE FROM export_record WHERE society_id = ?1 AND agent_id = ?2",
            params![society_id, agent_id],
        )?;
        Ok(deleted)
    }
}
