// ==========================================
// 合作社收款台账 - 合作社仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 合作社只由导入创建/更新（按 code 幂等）
// ==========================================

use crate::db::SharedConnection;
use crate::domain::entities::Society;
use crate::domain::money::to_iso_timestamp;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{map_society, SOCIETY_COLUMNS};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use uuid::Uuid;

// ==========================================
// SocietyRepository - 合作社仓储
// ==========================================
pub struct SocietyRepository {
    conn: SharedConnection,
}

impl SocietyRepository {
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

    /// 按 code 查询（大小写不敏感）
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Society>> {
        let conn = self.get_conn()?;
        Self::find_by_code_tx(&conn, code)
    }

    /// 查询全部合作社
    pub fn list(&self) -> RepositoryResult<Vec<Society>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM society ORDER BY code ASC",
            SOCIETY_COLUMNS
        ))?;
        let societies = stmt
            .query_map([], map_society)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(societies)
    }

    // ==========================================
    // 事务内操作（供导入器在同一事务中调用）
    // ==========================================

    pub fn find_by_code_tx(conn: &Connection, code: &str) -> RepositoryResult<Option<Society>> {
        let society = conn
            .query_row(
                &format!("SELECT {} FROM society WHERE code = ?1", SOCIETY_COLUMNS),
                params![code.trim().to_uppercase()],
                map_society,
            )
            .optional()?;
        Ok(society)
    }

    /// 按 code 解析或创建合作社；已存在时刷新名称
    pub fn upsert_tx(
        conn: &Connection,
        code: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Society> {
        let code = code.trim().to_uppercase();
        let name = name.trim().to_string();
        let now_str = to_iso_timestamp(now);

        if let Some(existing) = Self::find_by_code_tx(conn, &code)? {
            conn.execute(
                "UPDATE society SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now_str, existing.id],
            )?;
            return Ok(Society { name, ..existing });
        }

        let society = Society {
            id: Uuid::new_v4().to_string(),
            code,
            name,
        };
        conn.execute(
            r#"
            INSERT INTO society (id, code, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![society.id, society.code, society.name, now_str],
        )?;
        Ok(society)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn test_upsert_creates_then_renames() {
        let conn = open_in_memory().unwrap();
        let repo = SocietyRepository::new(conn.clone());
        let now = Utc::now();

        let created = {
            let guard = conn.lock().unwrap();
            SocietyRepository::upsert_tx(&guard, " sbcs ", "Sri Bank Co-op", now).unwrap()
        };
        assert_eq!(created.code, "SBCS");

        let renamed = {
            let guard = conn.lock().unwrap();
            SocietyRepository::upsert_tx(&guard, "SBCS", "Sri Bank Co-operative", now).unwrap()
        };
        assert_eq!(renamed.id, created.id);

        let found = repo.find_by_code("sbcs").unwrap().unwrap();
        assert_eq!(found.name, "Sri Bank Co-operative");
        assert_eq!(repo.list().unwrap().len(), 1);
    }
}
